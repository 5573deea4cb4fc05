// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only scan of the data documents.
//!
//! Decodes every guild envelope without touching the files, so operators can
//! see what a load would find: legacy envelopes, undecryptable guilds and
//! corrupt documents.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use ticketdesk_core::TicketdeskError;
use ticketdesk_storage::{
    DocumentKind, FileRepository, LoadOutcome, LoadedDocument, StaffPayload, TicketsPayload,
};
use ticketdesk_vault::{decrypt_json, Envelope, EnvelopeFormat, KeyMaterial};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    /// No file, or an empty one.
    Empty,
    /// Not valid JSON. A load would reset it.
    Corrupt(String),
    Loaded,
}

#[derive(Debug, Clone)]
pub struct GuildInspection {
    pub guild_id: String,
    /// `Err` carries the decryption or decoding error.
    pub format: Result<EnvelopeFormat, String>,
    /// Staff members or tickets in the envelope.
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentInspection {
    pub kind: DocumentKind,
    pub path: PathBuf,
    pub state: DocumentState,
    pub guilds: Vec<GuildInspection>,
}

impl DocumentInspection {
    pub fn entries(&self) -> usize {
        self.guilds.iter().map(|g| g.entries).sum()
    }

    pub fn legacy(&self) -> impl Iterator<Item = &GuildInspection> {
        self.guilds
            .iter()
            .filter(|g| matches!(g.format, Ok(EnvelopeFormat::LegacyCbc)))
    }

    pub fn undecryptable(&self) -> impl Iterator<Item = &GuildInspection> {
        self.guilds.iter().filter(|g| g.format.is_err())
    }

    /// Corrupt, or holding a guild that cannot be decrypted.
    pub fn has_problems(&self) -> bool {
        matches!(self.state, DocumentState::Corrupt(_)) || self.undecryptable().next().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Inspection {
    pub staff: DocumentInspection,
    pub tickets: DocumentInspection,
}

impl Inspection {
    pub fn documents(&self) -> [&DocumentInspection; 2] {
        [&self.staff, &self.tickets]
    }

    pub fn has_problems(&self) -> bool {
        self.documents().iter().any(|d| d.has_problems())
    }

    pub fn legacy_count(&self) -> usize {
        self.documents().iter().map(|d| d.legacy().count()).sum()
    }
}

pub async fn inspect(repo: &FileRepository, key: &KeyMaterial) -> Result<Inspection, TicketdeskError> {
    let staff = match repo.load_staff().await? {
        LoadOutcome::Empty => document(repo, DocumentKind::Staff, DocumentState::Empty, Vec::new()),
        LoadOutcome::Corrupt(reason) => {
            document(repo, DocumentKind::Staff, DocumentState::Corrupt(reason), Vec::new())
        }
        LoadOutcome::Loaded(doc) => {
            let guilds = guilds(doc, |id, record| {
                guild::<StaffPayload>(key, id, &record.encrypted_staff, |p| p.staff.len())
            });
            document(repo, DocumentKind::Staff, DocumentState::Loaded, guilds)
        }
    };

    let tickets = match repo.load_tickets().await? {
        LoadOutcome::Empty => {
            document(repo, DocumentKind::Tickets, DocumentState::Empty, Vec::new())
        }
        LoadOutcome::Corrupt(reason) => {
            document(repo, DocumentKind::Tickets, DocumentState::Corrupt(reason), Vec::new())
        }
        LoadOutcome::Loaded(doc) => {
            let guilds = guilds(doc, |id, record| {
                guild::<TicketsPayload>(key, id, &record.encrypted_tickets, |p| p.len())
            });
            document(repo, DocumentKind::Tickets, DocumentState::Loaded, guilds)
        }
    };

    Ok(Inspection { staff, tickets })
}

fn document(
    repo: &FileRepository,
    kind: DocumentKind,
    state: DocumentState,
    guilds: Vec<GuildInspection>,
) -> DocumentInspection {
    DocumentInspection {
        kind,
        path: repo.path(kind).to_path_buf(),
        state,
        guilds,
    }
}

/// Inspect every record, listing malformed ones as failures, in guild id order.
fn guilds<R>(
    doc: LoadedDocument<R>,
    inspect_record: impl Fn(&str, &R) -> GuildInspection,
) -> Vec<GuildInspection> {
    let mut guilds: Vec<GuildInspection> = doc
        .guilds
        .iter()
        .map(|(id, record)| inspect_record(id, record))
        .chain(doc.malformed.into_iter().map(|(guild_id, reason)| GuildInspection {
            guild_id,
            format: Err(format!("malformed record: {reason}")),
            entries: 0,
        }))
        .collect();
    guilds.sort_by(|a, b| a.guild_id.cmp(&b.guild_id));
    guilds
}

fn guild<T: DeserializeOwned>(
    key: &KeyMaterial,
    guild_id: &str,
    envelope: &Envelope,
    count: impl Fn(&T) -> usize,
) -> GuildInspection {
    let (format, entries) = match decrypt_json::<T>(key, envelope) {
        Ok((payload, format)) => (Ok(format), count(&payload)),
        Err(e) => (Err(e.to_string()), 0),
    };
    GuildInspection {
        guild_id: guild_id.to_owned(),
        format,
        entries,
    }
}
