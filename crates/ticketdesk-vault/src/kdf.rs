// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! scrypt key derivation from an arbitrary key string.
//!
//! Parameters match the defaults the bot has always used (N = 2^14, r = 8,
//! p = 1), so keys derived from existing configuration keep decrypting
//! existing files.

use ticketdesk_core::TicketdeskError;
use zeroize::Zeroizing;

const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Derive a 32-byte key from `secret` and `salt` with scrypt.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(secret: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, TicketdeskError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
        .map_err(|e| TicketdeskError::Vault(format!("invalid scrypt parameters: {e}")))?;

    let mut output = Zeroizing::new([0u8; 32]);
    scrypt::scrypt(secret, salt, &params, output.as_mut())
        .map_err(|e| TicketdeskError::Vault(format!("scrypt key derivation failed: {e}")))?;

    Ok(output)
}
