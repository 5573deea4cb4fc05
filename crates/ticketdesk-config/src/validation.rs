// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TicketdeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest debounce window accepted; beyond this a crash loses too much.
const MAX_SAVE_DEBOUNCE_MS: u64 = 60_000;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every error instead of failing fast.
pub fn validate_config(config: &TicketdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let storage = &config.storage;

    if storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.data_dir must not be empty".to_string(),
        });
    }

    for (key, name) in [
        ("storage.staff_file", &storage.staff_file),
        ("storage.tickets_file", &storage.tickets_file),
    ] {
        if name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        } else if name.contains('/') || name.contains('\\') {
            errors.push(ConfigError::Validation {
                message: format!("{key} `{name}` must be a file name, not a path"),
            });
        }
    }

    if storage.staff_file == storage.tickets_file {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.staff_file and storage.tickets_file must differ, both are `{}`",
                storage.staff_file
            ),
        });
    }

    if storage.save_debounce_ms > MAX_SAVE_DEBOUNCE_MS {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.save_debounce_ms must be at most {MAX_SAVE_DEBOUNCE_MS}, got {}",
                storage.save_debounce_ms
            ),
        });
    }

    if config.encryption.key_env.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "encryption.key_env must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TicketdeskConfig::default()).is_ok());
    }

    #[test]
    fn same_file_names_fail_validation() {
        let mut config = TicketdeskConfig::default();
        config.storage.tickets_file = config.storage.staff_file.clone();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("must differ"));
    }

    #[test]
    fn path_in_file_name_fails_validation() {
        let mut config = TicketdeskConfig::default();
        config.storage.staff_file = "nested/staff.json".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("file name"));
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let mut config = TicketdeskConfig::default();
        config.storage.data_dir = " ".to_string();
        config.storage.save_debounce_ms = 120_000;
        config.logging.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
