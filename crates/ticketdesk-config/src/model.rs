// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Ticketdesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Ticketdesk configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TicketdeskConfig {
    /// Data directory and persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where the encryption key and salt come from.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data directory and persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the staff and tickets documents. Created on load.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File name of the staff/config document inside `data_dir`.
    #[serde(default = "default_staff_file")]
    pub staff_file: String,

    /// File name of the tickets document inside `data_dir`.
    #[serde(default = "default_tickets_file")]
    pub tickets_file: String,

    /// Quiet period before a burst of mutations is written out.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Snapshot a file to `<file>.bak` before rewriting it during migration.
    #[serde(default = "default_true")]
    pub backup_on_migrate: bool,
}

impl StorageConfig {
    pub fn staff_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.staff_file)
    }

    pub fn tickets_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.tickets_file)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            staff_file: default_staff_file(),
            tickets_file: default_tickets_file(),
            save_debounce_ms: default_save_debounce_ms(),
            backup_on_migrate: true,
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_staff_file() -> String {
    "staff.json".to_string()
}

fn default_tickets_file() -> String {
    "tickets.json".to_string()
}

fn default_save_debounce_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

/// Names of the environment variables that carry key material.
///
/// The key itself is never read from a config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Variable holding a 64-char hex key or an arbitrary string to derive from.
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// Variable holding the scrypt salt.
    #[serde(default = "default_salt_env")]
    pub salt_env: String,

    /// Salt used when `salt_env` is unset.
    #[serde(default = "default_salt")]
    pub default_salt: String,

    /// Variable that switches on verbose key diagnostics.
    #[serde(default = "default_debug_env")]
    pub debug_env: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            salt_env: default_salt_env(),
            default_salt: default_salt(),
            debug_env: default_debug_env(),
        }
    }
}

fn default_key_env() -> String {
    "STAFF_ENCRYPTION_KEY".to_string()
}

fn default_salt_env() -> String {
    "STAFF_ENCRYPTION_SALT".to_string()
}

fn default_salt() -> String {
    "ticketdesk-staff-salt".to_string()
}

fn default_debug_env() -> String {
    "DEBUG_STAFF_KEY".to_string()
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
