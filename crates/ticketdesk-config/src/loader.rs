// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports `./ticketdesk.toml` > `~/.config/ticketdesk/ticketdesk.toml` >
//! `/etc/ticketdesk/ticketdesk.toml` with `TICKETDESK_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TicketdeskConfig;

/// Local config file name, also used under the XDG and system directories.
pub const CONFIG_FILE_NAME: &str = "ticketdesk.toml";

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ticketdesk/ticketdesk.toml`
/// 3. `~/.config/ticketdesk/ticketdesk.toml`
/// 4. `./ticketdesk.toml`
/// 5. `TICKETDESK_*` environment variables
pub fn load_config() -> Result<TicketdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TicketdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TicketdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TicketdeskConfig::default()))
        .merge(Toml::file(system_config_path()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ticketdesk").join(CONFIG_FILE_NAME))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

pub(crate) fn system_config_path() -> &'static Path {
    Path::new("/etc/ticketdesk/ticketdesk.toml")
}

/// Environment provider mapping `TICKETDESK_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TICKETDESK_STORAGE_SAVE_DEBOUNCE_MS` must map to
/// `storage.save_debounce_ms`.
fn env_provider() -> Env {
    Env::prefixed("TICKETDESK_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("encryption_", "encryption.", 1)
            .replacen("logging_", "logging.", 1);
        mapped.into()
    })
}
