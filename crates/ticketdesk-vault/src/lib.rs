// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted-at-rest envelopes for the Ticketdesk store.
//!
//! Staff and ticket payloads are sealed with AES-256-GCM under a single key
//! resolved from the environment at startup. Envelopes written by older
//! releases used unauthenticated AES-256-CBC; they still decode, and callers
//! are told so they can rewrite them.

pub mod crypto;
pub mod envelope;
pub mod kdf;
pub mod key;
pub mod legacy;

pub use envelope::{decode, decrypt_json, encrypt, encrypt_json, seal_legacy, Decoded, Envelope, EnvelopeFormat};
pub use key::{derive_key, load_key_material, KeyMaterial, KeySource};
