// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ticketdesk state store.

use thiserror::Error;

/// The primary error type used across Ticketdesk crates.
#[derive(Debug, Error)]
pub enum TicketdeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage errors (data directory, file read/write, backup).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Encryption, decryption, or key material errors.
    #[error("vault error: {0}")]
    Vault(String),

    /// JSON encoding or decoding of a persisted document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collaborator (for example a thread-existence checker) failed.
    #[error("collaborator error: {message}")]
    Collaborator {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketdeskError {
    /// Wrap any I/O-like error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

impl From<std::io::Error> for TicketdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}
