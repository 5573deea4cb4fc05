// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketdesk migrate` command implementation.
//!
//! Opening the store rewrites any legacy envelopes, so this command opens it,
//! reports what changed and shuts it down cleanly.

use std::io::IsTerminal;

use ticketdesk_config::TicketdeskConfig;
use ticketdesk_core::TicketdeskError;
use ticketdesk_store::{LoadReport, TicketManager};
use ticketdesk_vault::{load_key_material, KeySource};
use tracing::info;

pub async fn run_migrate(config: &TicketdeskConfig, plain: bool) -> Result<bool, TicketdeskError> {
    let key = load_key_material(&config.encryption)?;
    if key.source() == KeySource::Ephemeral {
        return Err(TicketdeskError::Vault(format!(
            "{} is not set -- refusing to migrate with a throwaway key",
            config.encryption.key_env
        )));
    }

    let store = TicketManager::open(&config.storage, key, None).await?;
    let report = store.load_report().clone();
    store.shutdown().await;
    info!(
        migrated = report.migration.migrated.len(),
        warnings = report.migration.warnings.len(),
        "migration finished"
    );

    let use_color = !plain && std::io::stdout().is_terminal();
    print_report(&report, use_color);
    Ok(report.migration.warnings.is_empty() && report.undecryptable.is_empty())
}

fn print_report(report: &LoadReport, use_color: bool) {
    println!();
    println!("  ticketdesk migrate");
    println!("  {}", "-".repeat(40));

    let migration = &report.migration;
    if migration.migrated.is_empty() && report.legacy.is_empty() {
        println!("    Nothing to migrate: all envelopes already use GCM.");
    }
    for guild in &migration.migrated {
        println!("    rewrote {} envelope for guild {}", guild.document, guild.guild_id);
    }
    for path in &migration.backups {
        println!("    backup: {}", path.display());
    }
    for kind in &report.reset {
        println!("    {kind} document was corrupt and has been reset");
    }
    for (kind, guild_id) in &report.undecryptable {
        print_problem(
            &format!("{kind} envelope for guild {guild_id} could not be decrypted"),
            use_color,
        );
    }
    for warning in &migration.warnings {
        print_problem(warning, use_color);
    }
    println!();
}

fn print_problem(message: &str, use_color: bool) {
    if use_color {
        use colored::Colorize;
        println!("    {} {}", "!".yellow(), message.yellow());
    } else {
        println!("    [WARN] {message}");
    }
}
