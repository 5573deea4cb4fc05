// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rewriting legacy CBC envelopes as GCM.
//!
//! Runs once after load, only for documents that had at least one guild
//! decoded through the CBC fallback. Each affected document is optionally
//! backed up to `<file>.bak` and then rewritten in full. Nothing here is
//! fatal: failures end up as warnings in the [`MigrationReport`].

use std::path::PathBuf;

use ticketdesk_storage::DocumentKind;
use tracing::{info, warn};

use crate::persist::Persister;

/// Guild ids that decoded from legacy envelopes, per document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyGuilds {
    pub staff: Vec<String>,
    pub tickets: Vec<String>,
}

impl LegacyGuilds {
    pub fn get(&self, kind: DocumentKind) -> &[String] {
        match kind {
            DocumentKind::Staff => &self.staff,
            DocumentKind::Tickets => &self.tickets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty() && self.tickets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.staff.len() + self.tickets.len()
    }
}

/// One guild envelope that was rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedGuild {
    pub document: DocumentKind,
    pub guild_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: Vec<MigratedGuild>,
    pub backups: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty() && self.warnings.is_empty()
    }
}

pub(crate) async fn migrate_legacy(
    persister: &Persister,
    legacy: &LegacyGuilds,
    backup: bool,
) -> MigrationReport {
    let mut report = MigrationReport::default();

    for kind in [DocumentKind::Staff, DocumentKind::Tickets] {
        let guilds = legacy.get(kind);
        if guilds.is_empty() {
            continue;
        }

        if backup {
            match persister.repo().backup(kind).await {
                Some(path) => report.backups.push(path),
                None => report
                    .warnings
                    .push(format!("{kind} document could not be backed up before migration")),
            }
        }

        match persister.save(kind).await {
            Ok(()) => {
                info!(document = %kind, guilds = guilds.len(), "legacy envelopes rewritten as GCM");
                report
                    .migrated
                    .extend(guilds.iter().map(|guild_id| MigratedGuild {
                        document: kind,
                        guild_id: guild_id.clone(),
                    }));
            }
            Err(e) => {
                warn!(document = %kind, error = %e, "legacy migration failed -- will retry on next save");
                report
                    .warnings
                    .push(format!("{kind} document could not be rewritten: {e}"));
            }
        }
    }

    report
}
