// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketdesk check` command implementation.
//!
//! Runs diagnostic checks against the configured data directory and key to
//! find problems before the bot loads the store.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use ticketdesk_config::TicketdeskConfig;
use ticketdesk_core::TicketdeskError;
use ticketdesk_storage::FileRepository;
use ticketdesk_store::{inspect, DocumentInspection, DocumentState};
use ticketdesk_vault::{load_key_material, KeyMaterial, KeySource};

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `ticketdesk check` command. Returns `false` if any check failed.
pub async fn run_check(config: &TicketdeskConfig, plain: bool) -> Result<bool, TicketdeskError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = Vec::new();

    let start = Instant::now();
    results.push(CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        "valid",
        start,
    ));

    let start = Instant::now();
    let key = match load_key_material(&config.encryption) {
        Ok(key) => {
            results.push(check_key(&key, &config.encryption.key_env, start));
            Some(key)
        }
        Err(e) => {
            results.push(CheckResult::new(
                "Encryption key",
                CheckStatus::Fail,
                e.to_string(),
                start,
            ));
            None
        }
    };

    let repo = FileRepository::from_config(&config.storage);
    results.push(check_data_dir(&repo).await);

    if let Some(key) = &key {
        let start = Instant::now();
        match inspect(&repo, key).await {
            Ok(inspection) => {
                for doc in inspection.documents() {
                    results.push(check_document(doc, start));
                }
            }
            Err(e) => results.push(CheckResult::new(
                "Documents",
                CheckStatus::Fail,
                format!("could not read: {e}"),
                start,
            )),
        }
    }

    let failed = print_results(&results, use_color);
    Ok(!failed)
}

fn check_key(key: &KeyMaterial, key_env: &str, start: Instant) -> CheckResult {
    match key.source() {
        KeySource::Ephemeral => CheckResult::new(
            "Encryption key",
            CheckStatus::Warn,
            format!("{key_env} not set -- data written now cannot be read after restart"),
            start,
        ),
        KeySource::Raw => CheckResult::new("Encryption key", CheckStatus::Pass, "raw 32-byte key", start),
        KeySource::Derived => CheckResult::new(
            "Encryption key",
            CheckStatus::Pass,
            "derived with scrypt",
            start,
        ),
    }
}

/// Check the data directory exists (or can be created) and is writable.
async fn check_data_dir(repo: &FileRepository) -> CheckResult {
    let start = Instant::now();
    if let Err(e) = repo.ensure_data_dir().await {
        return CheckResult::new("Data directory", CheckStatus::Fail, e.to_string(), start);
    }

    let probe = repo.data_dir().join(".ticketdesk-write-probe");
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            CheckResult::new(
                "Data directory",
                CheckStatus::Pass,
                repo.data_dir().display().to_string(),
                start,
            )
        }
        Err(e) => CheckResult::new(
            "Data directory",
            CheckStatus::Fail,
            format!("not writable: {e}"),
            start,
        ),
    }
}

fn check_document(doc: &DocumentInspection, start: Instant) -> CheckResult {
    let name = format!("{} document", doc.kind);
    let undecryptable: Vec<&str> = doc.undecryptable().map(|g| g.guild_id.as_str()).collect();
    let legacy = doc.legacy().count();

    let (status, message) = match &doc.state {
        DocumentState::Corrupt(reason) => (
            CheckStatus::Fail,
            format!("not valid JSON ({reason}) -- it will be reset on load"),
        ),
        DocumentState::Empty => (CheckStatus::Pass, "empty".to_string()),
        DocumentState::Loaded if !undecryptable.is_empty() => (
            CheckStatus::Fail,
            format!(
                "cannot decrypt guild(s) {} with this key",
                undecryptable.join(", ")
            ),
        ),
        DocumentState::Loaded if legacy > 0 => (
            CheckStatus::Warn,
            format!("{legacy} guild(s) in legacy CBC format -- run `ticketdesk migrate`"),
        ),
        DocumentState::Loaded => (
            CheckStatus::Pass,
            format!("{} guild(s), all GCM", doc.guilds.len()),
        ),
    };

    CheckResult::new(&name, status, message, start)
}

/// Print results. Returns whether any check failed.
fn print_results(results: &[CheckResult], use_color: bool) -> bool {
    println!();
    println!("  ticketdesk check");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;

    for result in results {
        let duration_ms = result.duration.as_millis();
        let (tag, symbol) = match result.status {
            CheckStatus::Pass => ("[OK]  ", "✓"),
            CheckStatus::Warn => {
                warn_count += 1;
                ("[WARN]", "!")
            }
            CheckStatus::Fail => {
                fail_count += 1;
                ("[FAIL]", "✗")
            }
        };

        if use_color {
            use colored::Colorize;
            let (symbol, message) = match result.status {
                CheckStatus::Pass => (symbol.green(), result.message.normal()),
                CheckStatus::Warn => (symbol.yellow(), result.message.yellow()),
                CheckStatus::Fail => (symbol.red(), result.message.red()),
            };
            println!(
                "    {symbol} {:<20} {message} ({duration_ms}ms)",
                result.name
            );
        } else {
            println!(
                "    {tag} {:<20} {} ({duration_ms}ms)",
                result.name, result.message
            );
        }
    }

    println!();
    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    fail_count > 0
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use ticketdesk_storage::DocumentKind;
    use ticketdesk_store::GuildInspection;
    use ticketdesk_vault::{derive_key, EnvelopeFormat};

    fn doc(state: DocumentState, formats: Vec<Result<EnvelopeFormat, String>>) -> DocumentInspection {
        DocumentInspection {
            kind: DocumentKind::Staff,
            path: PathBuf::from("data/staff.json"),
            state,
            guilds: formats
                .into_iter()
                .enumerate()
                .map(|(i, format)| GuildInspection {
                    guild_id: format!("g{i}"),
                    format,
                    entries: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn corrupt_document_fails() {
        let result = check_document(&doc(DocumentState::Corrupt("eof".into()), vec![]), Instant::now());
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.name, "staff document");
    }

    #[test]
    fn legacy_guild_warns() {
        let result = check_document(
            &doc(
                DocumentState::Loaded,
                vec![Ok(EnvelopeFormat::Gcm), Ok(EnvelopeFormat::LegacyCbc)],
            ),
            Instant::now(),
        );
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("1 guild(s)"));
    }

    #[test]
    fn undecryptable_guild_fails_before_legacy_warning() {
        let result = check_document(
            &doc(
                DocumentState::Loaded,
                vec![Err("tag mismatch".into()), Ok(EnvelopeFormat::LegacyCbc)],
            ),
            Instant::now(),
        );
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("g0"));
    }

    #[test]
    fn ephemeral_key_warns() {
        let key = derive_key(None, "salt").unwrap();
        let result = check_key(&key, "STAFF_ENCRYPTION_KEY", Instant::now());
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("STAFF_ENCRYPTION_KEY"));
    }

    #[tokio::test]
    async fn writable_data_dir_passes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path().join("data"), "staff.json", "tickets.json");
        let result = check_data_dir(&repo).await;
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(!dir.path().join("data/.ticketdesk-write-probe").exists());
    }
}
