// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unauthenticated AES-256-CBC format used by older data files.
//!
//! Only read on load. New data is always sealed with GCM; [`seal_cbc`] exists
//! to build legacy fixtures.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ticketdesk_core::TicketdeskError;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// CBC block size, which is also the IV length.
pub const IV_LEN: usize = 16;

/// Decrypt a PKCS#7-padded AES-256-CBC buffer.
///
/// IVs longer than 16 bytes are truncated; shorter IVs are rejected.
pub fn open_cbc(key: &[u8; 32], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, TicketdeskError> {
    let iv = iv.get(..IV_LEN).ok_or_else(|| {
        TicketdeskError::Vault(format!(
            "legacy CBC payload needs a {IV_LEN}-byte IV, got {} bytes",
            iv.len()
        ))
    })?;

    Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| TicketdeskError::Vault("failed to create AES-256-CBC key".to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| {
            TicketdeskError::Vault(
                "AES-256-CBC decryption failed -- wrong key or corrupted data".to_string(),
            )
        })
}

/// Encrypt with AES-256-CBC and PKCS#7 padding.
pub fn seal_cbc(key: &[u8; 32], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, TicketdeskError> {
    let encryptor = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|_| TicketdeskError::Vault("failed to create AES-256-CBC key".to_string()))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}
