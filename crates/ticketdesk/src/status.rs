// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketdesk status` command implementation.
//!
//! Scans both documents without modifying them and prints guild, staff and
//! ticket counts along with the envelope formats found.

use std::io::IsTerminal;

use serde::Serialize;
use ticketdesk_config::TicketdeskConfig;
use ticketdesk_core::TicketdeskError;
use ticketdesk_storage::FileRepository;
use ticketdesk_store::{inspect, DocumentInspection, DocumentState};
use ticketdesk_vault::load_key_material;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub data_dir: String,
    pub key_source: String,
    pub key_fingerprint: String,
    pub documents: Vec<DocumentStatus>,
}

#[derive(Debug, Serialize)]
pub struct DocumentStatus {
    pub document: String,
    pub path: String,
    pub state: String,
    pub guilds: usize,
    pub entries: usize,
    pub legacy_guilds: usize,
    pub undecryptable_guilds: usize,
}

impl From<&DocumentInspection> for DocumentStatus {
    fn from(doc: &DocumentInspection) -> Self {
        Self {
            document: doc.kind.to_string(),
            path: doc.path.display().to_string(),
            state: state_label(&doc.state).to_string(),
            guilds: doc.guilds.len(),
            entries: doc.entries(),
            legacy_guilds: doc.legacy().count(),
            undecryptable_guilds: doc.undecryptable().count(),
        }
    }
}

fn state_label(state: &DocumentState) -> &'static str {
    match state {
        DocumentState::Empty => "empty",
        DocumentState::Corrupt(_) => "corrupt",
        DocumentState::Loaded => "ok",
    }
}

/// Run the `ticketdesk status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &TicketdeskConfig,
    json: bool,
    plain: bool,
) -> Result<bool, TicketdeskError> {
    let key = load_key_material(&config.encryption)?;
    let repo = FileRepository::from_config(&config.storage);
    let inspection = inspect(&repo, &key).await?;

    let response = StatusResponse {
        data_dir: config.storage.data_dir.clone(),
        key_source: format!("{:?}", key.source()).to_lowercase(),
        key_fingerprint: key.fingerprint(),
        documents: inspection.documents().into_iter().map(Into::into).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&response, use_color);
    }

    Ok(true)
}

fn print_status(response: &StatusResponse, use_color: bool) {
    println!();
    println!("  ticketdesk status");
    println!("  {}", "-".repeat(40));
    println!("    Data dir: {}", response.data_dir);
    println!(
        "    Key:      {} ({})",
        response.key_source, response.key_fingerprint
    );

    for doc in &response.documents {
        println!();
        let label = format!("{:<8}", doc.document);
        if use_color {
            use colored::Colorize;
            let state = match doc.state.as_str() {
                "ok" => doc.state.green(),
                "empty" => doc.state.normal(),
                _ => doc.state.red(),
            };
            println!("    {label} {state}  {}", doc.path);
        } else {
            println!("    {label} [{}]  {}", doc.state, doc.path);
        }
        println!(
            "             {} guild(s), {} entr{}",
            doc.guilds,
            doc.entries,
            if doc.entries == 1 { "y" } else { "ies" }
        );
        if doc.legacy_guilds > 0 {
            println!(
                "             {} guild(s) in legacy format (run `ticketdesk migrate`)",
                doc.legacy_guilds
            );
        }
        if doc.undecryptable_guilds > 0 {
            println!(
                "             {} guild(s) cannot be decrypted with this key",
                doc.undecryptable_guilds
            );
        }
    }

    println!();
}
