// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Ticketdesk configuration system.

use ticketdesk_config::diagnostic::ConfigError;
use ticketdesk_config::model::TicketdeskConfig;
use ticketdesk_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

#[test]
fn valid_toml_deserializes() {
    let toml = r#"
[storage]
data_dir = "/var/lib/ticketdesk"
staff_file = "staff-data.json"
tickets_file = "ticket-data.json"
save_debounce_ms = 500
backup_on_migrate = false

[encryption]
key_env = "MY_KEY"
default_salt = "pepper"

[logging]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.storage.data_dir, "/var/lib/ticketdesk");
    assert_eq!(
        config.storage.staff_path(),
        std::path::Path::new("/var/lib/ticketdesk/staff-data.json")
    );
    assert_eq!(config.storage.save_debounce().as_millis(), 500);
    assert!(!config.storage.backup_on_migrate);
    assert_eq!(config.encryption.key_env, "MY_KEY");
    assert_eq!(config.encryption.salt_env, "STAFF_ENCRYPTION_SALT");
    assert_eq!(config.encryption.default_salt, "pepper");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    let defaults = TicketdeskConfig::default();
    assert_eq!(config.storage.data_dir, defaults.storage.data_dir);
    assert_eq!(config.storage.save_debounce_ms, 200);
    assert_eq!(config.encryption.key_env, "STAFF_ENCRYPTION_KEY");
    assert_eq!(config.encryption.debug_env, "DEBUG_STAFF_KEY");
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[discord]\ntoken = \"x\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[storage]\nsave_debounce_ms = \"soon\"\n").unwrap_err();
    match &errors[0] {
        ConfigError::InvalidType { key, .. } => assert_eq!(key, "storage.save_debounce_ms"),
        other => panic!("expected InvalidType, got {other:?}"),
    }
}

#[test]
fn validation_runs_after_deserialization() {
    let errors = load_and_validate_str("[logging]\nlevel = \"verbose\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "[storage]\ndata_dir = \"from-file\"\n")?;
        jail.set_env("TICKETDESK_STORAGE_DATA_DIR", "from-env");
        jail.set_env("TICKETDESK_STORAGE_SAVE_DEBOUNCE_MS", "50");

        let config = load_config_from_path(std::path::Path::new("custom.toml"))?;
        assert_eq!(config.storage.data_dir, "from-env");
        assert_eq!(config.storage.save_debounce_ms, 50);
        Ok(())
    });
}
