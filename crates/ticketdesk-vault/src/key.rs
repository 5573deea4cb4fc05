// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material resolution from the environment.
//!
//! The key is resolved once at startup and injected into the store:
//! - a 64-character hex string is used as the raw 32-byte key;
//! - any other non-empty string is stretched with scrypt and the salt;
//! - no value at all yields a random ephemeral key, which means data written
//!   by this process cannot be read after a restart.

use secrecy::{ExposeSecret, SecretString};
use ticketdesk_config::EncryptionConfig;
use ticketdesk_core::TicketdeskError;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{crypto, kdf};

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

/// How the active key was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Decoded from a 64-char hex string.
    Raw,
    /// Derived from an arbitrary string with scrypt.
    Derived,
    /// Randomly generated for this process only.
    Ephemeral,
}

/// The 32-byte AES key used for every envelope.
///
/// Debug output intentionally omits the key bytes.
#[derive(Clone)]
pub struct KeyMaterial {
    key: Zeroizing<[u8; KEY_LEN]>,
    source: KeySource,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl KeyMaterial {
    /// Wrap raw key bytes. Any length other than 32 is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TicketdeskError> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            TicketdeskError::Vault(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            key: Zeroizing::new(key),
            source: KeySource::Raw,
        })
    }

    /// A fresh random key that lives only as long as the process.
    pub fn ephemeral() -> Result<Self, TicketdeskError> {
        Ok(Self {
            key: Zeroizing::new(crypto::generate_random_key()?),
            source: KeySource::Ephemeral,
        })
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// Whether data sealed with this key survives a restart.
    pub fn is_persistent(&self) -> bool {
        self.source != KeySource::Ephemeral
    }

    pub(crate) fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Short, non-reversible identifier for logs.
    pub fn fingerprint(&self) -> String {
        let digest = ring::digest::digest(&ring::digest::SHA256, self.key.as_ref());
        hex::encode(&digest.as_ref()[..4])
    }
}

/// Resolve key material from an optional configured value and a salt.
///
/// Pure apart from the random draw for the ephemeral fallback.
pub fn derive_key(env_value: Option<&str>, salt: &str) -> Result<KeyMaterial, TicketdeskError> {
    let value = match env_value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return KeyMaterial::ephemeral(),
    };

    if value.len() == KEY_LEN * 2
        && let Ok(bytes) = hex::decode(value)
    {
        let bytes = Zeroizing::new(bytes);
        return KeyMaterial::from_bytes(&bytes);
    }

    let derived = kdf::derive_key(value.as_bytes(), salt.as_bytes())?;
    Ok(KeyMaterial {
        key: derived,
        source: KeySource::Derived,
    })
}

/// Resolve key material from the environment variables named in `config`.
pub fn load_key_material(config: &EncryptionConfig) -> Result<KeyMaterial, TicketdeskError> {
    let secret = std::env::var(&config.key_env).ok().map(SecretString::from);
    let salt = std::env::var(&config.salt_env)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.default_salt.clone());

    let key = derive_key(secret.as_ref().map(|s| s.expose_secret()), &salt)?;

    let verbose = debug_enabled(&config.debug_env);
    match key.source() {
        KeySource::Ephemeral => warn!(
            env = %config.key_env,
            "no encryption key configured -- using an ephemeral key, data will not survive a restart"
        ),
        source if verbose => info!(
            ?source,
            fingerprint = %key.fingerprint(),
            salt_from_env = std::env::var(&config.salt_env).is_ok(),
            "encryption key resolved"
        ),
        source => debug!(?source, "encryption key resolved"),
    }

    Ok(key)
}

/// Whether the named variable asks for verbose key diagnostics.
pub fn debug_enabled(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn hex_value_is_used_raw() {
        let key = derive_key(Some(HEX_KEY), "salt").unwrap();
        assert_eq!(key.source(), KeySource::Raw);
        assert_eq!(key.bytes()[31], 0x1f);
    }

    #[test]
    fn non_hex_value_is_derived() {
        let key = derive_key(Some("correct horse battery staple"), "salt").unwrap();
        assert_eq!(key.source(), KeySource::Derived);

        let again = derive_key(Some("correct horse battery staple"), "salt").unwrap();
        assert_eq!(key.bytes(), again.bytes());
    }

    #[test]
    fn short_hex_is_derived_not_rejected() {
        let key = derive_key(Some("deadbeef"), "salt").unwrap();
        assert_eq!(key.source(), KeySource::Derived);
    }

    #[test]
    fn missing_value_is_ephemeral() {
        let a = derive_key(None, "salt").unwrap();
        let b = derive_key(Some("   "), "salt").unwrap();
        assert_eq!(a.source(), KeySource::Ephemeral);
        assert!(!a.is_persistent());
        assert_eq!(b.source(), KeySource::Ephemeral);
        assert_ne!(a.bytes(), b.bytes());
    }

    #[test]
    fn wrong_length_bytes_are_fatal() {
        let err = KeyMaterial::from_bytes(&[0u8; 16]).unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn debug_output_redacts_key() {
        let key = derive_key(Some(HEX_KEY), "salt").unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("1f"));
    }

    #[test]
    #[serial]
    fn load_key_material_reads_configured_vars() {
        let config = EncryptionConfig {
            key_env: "TICKETDESK_TEST_KEY".to_string(),
            salt_env: "TICKETDESK_TEST_SALT".to_string(),
            ..EncryptionConfig::default()
        };

        // SAFETY: test-only env mutation, serialized with #[serial].
        unsafe { std::env::set_var("TICKETDESK_TEST_KEY", HEX_KEY) };
        let key = load_key_material(&config);
        unsafe { std::env::remove_var("TICKETDESK_TEST_KEY") };

        assert_eq!(key.unwrap().source(), KeySource::Raw);
    }

    #[test]
    #[serial]
    fn salt_env_changes_derived_key() {
        let config = EncryptionConfig {
            key_env: "TICKETDESK_TEST_KEY".to_string(),
            salt_env: "TICKETDESK_TEST_SALT".to_string(),
            ..EncryptionConfig::default()
        };

        unsafe { std::env::set_var("TICKETDESK_TEST_KEY", "passphrase") };
        let default_salted = load_key_material(&config).unwrap();
        unsafe { std::env::set_var("TICKETDESK_TEST_SALT", "other-salt") };
        let custom_salted = load_key_material(&config).unwrap();
        unsafe {
            std::env::remove_var("TICKETDESK_TEST_KEY");
            std::env::remove_var("TICKETDESK_TEST_SALT");
        }

        assert_ne!(default_salted.bytes(), custom_salted.bytes());
    }

    #[test]
    #[serial]
    fn debug_flag_accepts_truthy_values() {
        unsafe { std::env::set_var("TICKETDESK_TEST_DEBUG", "true") };
        assert!(debug_enabled("TICKETDESK_TEST_DEBUG"));
        unsafe { std::env::set_var("TICKETDESK_TEST_DEBUG", "0") };
        assert!(!debug_enabled("TICKETDESK_TEST_DEBUG"));
        unsafe { std::env::remove_var("TICKETDESK_TEST_DEBUG") };
        assert!(!debug_enabled("TICKETDESK_TEST_DEBUG"));
    }
}
