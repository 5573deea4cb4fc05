// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hex-encoded ciphertext envelopes as stored in the data files.
//!
//! Current envelopes are AES-256-GCM with the tag in `authTag`. Envelopes
//! written by older releases are AES-256-CBC without a tag. [`decode`] is a
//! pure function that reports which format it found; rewriting legacy data is
//! left to the caller.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ticketdesk_core::TicketdeskError;

use crate::crypto::{self, NONCE_LEN, TAG_LEN};
use crate::key::KeyMaterial;
use crate::legacy;

/// Encrypted payload as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub encrypted_data: String,
    pub iv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_tag: Option<String>,
}

/// Which cipher an envelope was sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormat {
    /// Authenticated AES-256-GCM.
    Gcm,
    /// Unauthenticated AES-256-CBC; should be rewritten as GCM.
    LegacyCbc,
}

impl EnvelopeFormat {
    pub fn is_legacy(self) -> bool {
        self == Self::LegacyCbc
    }
}

/// Result of a successful [`decode`].
#[derive(Debug)]
pub struct Decoded {
    pub plaintext: Vec<u8>,
    pub format: EnvelopeFormat,
}

/// Seal `plaintext` into a GCM envelope.
pub fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> Result<Envelope, TicketdeskError> {
    let (mut sealed, nonce) = crypto::seal(key.bytes(), plaintext)?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(Envelope {
        encrypted_data: hex::encode(sealed),
        iv: hex::encode(nonce),
        auth_tag: Some(hex::encode(tag)),
    })
}

/// Serialize `value` to JSON and seal it.
pub fn encrypt_json<T: Serialize + ?Sized>(
    key: &KeyMaterial,
    value: &T,
) -> Result<Envelope, TicketdeskError> {
    let json = serde_json::to_vec(value)?;
    encrypt(key, &json)
}

/// Open an envelope, trying GCM first and falling back to legacy CBC.
pub fn decode(key: &KeyMaterial, envelope: &Envelope) -> Result<Decoded, TicketdeskError> {
    let data = decode_hex("encryptedData", &envelope.encrypted_data)?;
    let iv = decode_hex("iv", &envelope.iv)?;
    let tag = envelope
        .auth_tag
        .as_deref()
        .map(|t| decode_hex("authTag", t))
        .transpose()?;

    let mut combined = data;
    if let Some(tag) = &tag {
        combined.extend_from_slice(tag);
    }

    // Without an explicit tag, the last TAG_LEN bytes may still be one.
    let gcm_candidate = tag.is_some() || combined.len() > TAG_LEN;
    if gcm_candidate && let Ok(nonce) = <[u8; NONCE_LEN]>::try_from(iv.as_slice()) {
        if let Ok(plaintext) = crypto::open(key.bytes(), &nonce, &combined) {
            return Ok(Decoded {
                plaintext,
                format: EnvelopeFormat::Gcm,
            });
        }
    }

    let plaintext = legacy::open_cbc(key.bytes(), &iv, &combined).map_err(|e| {
        TicketdeskError::Vault(format!("envelope could not be decrypted as GCM or CBC: {e}"))
    })?;

    Ok(Decoded {
        plaintext,
        format: EnvelopeFormat::LegacyCbc,
    })
}

/// Open an envelope and parse its plaintext as JSON.
pub fn decrypt_json<T: DeserializeOwned>(
    key: &KeyMaterial,
    envelope: &Envelope,
) -> Result<(T, EnvelopeFormat), TicketdeskError> {
    let decoded = decode(key, envelope)?;
    let value = serde_json::from_slice(&decoded.plaintext)?;
    Ok((value, decoded.format))
}

/// Seal `plaintext` in the legacy CBC format (random 16-byte IV, no tag).
pub fn seal_legacy(key: &KeyMaterial, plaintext: &[u8]) -> Result<Envelope, TicketdeskError> {
    let mut iv = [0u8; legacy::IV_LEN];
    crypto::fill_random(&mut iv)?;
    let ciphertext = legacy::seal_cbc(key.bytes(), &iv, plaintext)?;

    Ok(Envelope {
        encrypted_data: hex::encode(ciphertext),
        iv: hex::encode(iv),
        auth_tag: None,
    })
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, TicketdeskError> {
    hex::decode(value).map_err(|e| TicketdeskError::Vault(format!("envelope {field} is not valid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;
    use crate::key::derive_key;

    fn test_key() -> KeyMaterial {
        derive_key(
            Some("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"),
            "salt",
        )
        .unwrap()
    }

    #[test]
    fn gcm_envelope_has_all_fields() {
        let envelope = encrypt_json(&test_key(), &vec!["s1", "s2"]).unwrap();
        assert_eq!(hex::decode(&envelope.iv).unwrap().len(), NONCE_LEN);
        assert_eq!(
            hex::decode(envelope.auth_tag.as_ref().unwrap()).unwrap().len(),
            TAG_LEN
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("encryptedData").is_some());
        assert!(json.get("authTag").is_some());
    }

    #[test]
    fn staff_list_roundtrip() {
        let key = test_key();
        let staff = vec!["111".to_string(), "222".to_string()];
        let envelope = encrypt_json(&key, &staff).unwrap();

        let (decoded, format): (Vec<String>, _) = decrypt_json(&key, &envelope).unwrap();
        assert_eq!(decoded, staff);
        assert_eq!(format, EnvelopeFormat::Gcm);
    }

    #[test]
    fn tag_appended_to_data_still_decodes_as_gcm() {
        let key = test_key();
        let mut envelope = encrypt(&key, b"{\"a\":1}").unwrap();
        let tag = envelope.auth_tag.take().unwrap();
        envelope.encrypted_data.push_str(&tag);

        let decoded = decode(&key, &envelope).unwrap();
        assert_eq!(decoded.format, EnvelopeFormat::Gcm);
        assert_eq!(decoded.plaintext, b"{\"a\":1}");
    }

    #[test]
    fn legacy_cbc_envelope_falls_back() {
        let key = test_key();
        let envelope = seal_legacy(&key, br#"["legacy-staff"]"#).unwrap();
        assert!(envelope.auth_tag.is_none());

        let (staff, format): (Vec<String>, _) = decrypt_json(&key, &envelope).unwrap();
        assert_eq!(staff, vec!["legacy-staff"]);
        assert!(format.is_legacy());
    }

    #[test]
    fn wrong_key_fails_both_formats() {
        let envelope = encrypt_json(&test_key(), &vec!["x"]).unwrap();
        let other = derive_key(Some("some other key"), "salt").unwrap();
        assert!(decode(&other, &envelope).is_err());
    }

    #[test]
    fn invalid_hex_is_reported() {
        let envelope = Envelope {
            encrypted_data: "zz".to_string(),
            iv: "00".to_string(),
            auth_tag: None,
        };
        let err = decode(&test_key(), &envelope).unwrap_err();
        assert!(err.to_string().contains("encryptedData"));
    }

    proptest! {
        #[test]
        fn ticket_map_roundtrip(map in proptest::collection::btree_map("[0-9]{1,19}", "[ -~]{0,40}", 0..8)) {
            let key = test_key();
            let envelope = encrypt_json(&key, &map).unwrap();
            let (decoded, format): (BTreeMap<String, String>, _) = decrypt_json(&key, &envelope).unwrap();
            prop_assert_eq!(decoded, map);
            prop_assert_eq!(format, EnvelopeFormat::Gcm);
        }
    }
}
