// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moves guild state between memory and the encrypted documents on disk.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ticketdesk_core::{Ticket, TicketdeskError};
use ticketdesk_storage::{
    DirtySet, DocumentKind, FileRepository, LoadOutcome, LoadedDocument, SnapshotSink,
    StaffDocument, StaffPayload, StaffRecord, TicketRecord, TicketsDocument, TicketsPayload,
};
use ticketdesk_vault::{decrypt_json, encrypt_json, KeyMaterial};
use tracing::{debug, info, warn};

use crate::guild::{lock_table, GuildTable};
use crate::migration::{LegacyGuilds, MigrationReport};

/// What happened while loading the documents at startup.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Guilds present in memory after load.
    pub guilds: usize,
    /// Tickets present in memory after load.
    pub tickets: usize,
    /// Documents that were not valid JSON and were reset to empty.
    pub reset: Vec<DocumentKind>,
    /// Guilds whose record was malformed or whose envelope could not be
    /// decrypted. They load empty.
    pub undecryptable: Vec<(DocumentKind, String)>,
    /// Guilds that decoded from the legacy CBC format.
    pub legacy: LegacyGuilds,
    /// Outcome of rewriting legacy guilds, if any were found.
    pub migration: MigrationReport,
}

/// Single writer for both documents.
pub(crate) struct Persister {
    repo: FileRepository,
    key: KeyMaterial,
    table: Arc<Mutex<GuildTable>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl Persister {
    pub(crate) fn new(repo: FileRepository, key: KeyMaterial, table: Arc<Mutex<GuildTable>>) -> Self {
        Self {
            repo,
            key,
            table,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn repo(&self) -> &FileRepository {
        &self.repo
    }

    pub(crate) fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Write a full snapshot of one document.
    ///
    /// The write lock is taken before the snapshot so a slower earlier save
    /// can never overwrite a newer one.
    pub(crate) async fn save(&self, kind: DocumentKind) -> Result<(), TicketdeskError> {
        let _guard = self.write_lock.lock().await;
        match kind {
            DocumentKind::Staff => {
                let doc = self.staff_snapshot()?;
                self.repo.save_staff(&doc).await
            }
            DocumentKind::Tickets => {
                let doc = self.tickets_snapshot()?;
                self.repo.save_tickets(&doc).await
            }
        }
    }

    /// Read both documents into the table.
    ///
    /// Documents that are not valid JSON are reset and written back
    /// immediately. Guilds with a malformed record or an envelope that fails
    /// to decrypt load empty. Legacy guilds are only reported here.
    pub(crate) async fn load(&self) -> Result<LoadReport, TicketdeskError> {
        let mut report = LoadReport::default();
        let staff = self.repo.load_staff().await?;
        let tickets = self.repo.load_tickets().await?;

        {
            let mut table = lock_table(&self.table);
            match staff {
                LoadOutcome::Empty => {}
                LoadOutcome::Corrupt(reason) => {
                    warn!(reason = %reason, "staff document is not valid JSON -- resetting to empty");
                    report.reset.push(DocumentKind::Staff);
                }
                LoadOutcome::Loaded(doc) => self.apply_staff(&mut table, doc, &mut report),
            }
            match tickets {
                LoadOutcome::Empty => {}
                LoadOutcome::Corrupt(reason) => {
                    warn!(reason = %reason, "tickets document is not valid JSON -- resetting to empty");
                    report.reset.push(DocumentKind::Tickets);
                }
                LoadOutcome::Loaded(doc) => self.apply_tickets(&mut table, doc, &mut report),
            }
            report.guilds = table.len();
            report.tickets = table.iter().map(|(_, g)| g.ticket_count()).sum();
        }

        for kind in report.reset.clone() {
            match self.save(kind).await {
                Ok(()) => info!(document = %kind, "reset document written"),
                Err(e) => warn!(document = %kind, error = %e, "could not write reset document"),
            }
        }

        Ok(report)
    }

    fn apply_staff(
        &self,
        table: &mut GuildTable,
        doc: LoadedDocument<StaffRecord>,
        report: &mut LoadReport,
    ) {
        skip_malformed(table, DocumentKind::Staff, doc.malformed, report);
        for (guild_id, record) in doc.guilds {
            let state = table.entry(&guild_id);
            state.config = record.config.unwrap_or_default();

            match decrypt_json::<StaffPayload>(&self.key, &record.encrypted_staff) {
                Ok((payload, format)) => {
                    state.staff = payload.staff.into_iter().collect();
                    state.presence = payload.presence.into_iter().collect();
                    state.offline_queue = payload.offline_queue;
                    if format.is_legacy() {
                        debug!(guild_id = %guild_id, "staff envelope uses the legacy format");
                        report.legacy.staff.push(guild_id);
                    }
                }
                Err(e) => {
                    warn!(guild_id = %guild_id, error = %e, "staff envelope could not be decrypted -- guild loads with no staff");
                    report.undecryptable.push((DocumentKind::Staff, guild_id));
                }
            }
        }
    }

    fn apply_tickets(
        &self,
        table: &mut GuildTable,
        doc: LoadedDocument<TicketRecord>,
        report: &mut LoadReport,
    ) {
        skip_malformed(table, DocumentKind::Tickets, doc.malformed, report);
        for (guild_id, record) in doc.guilds {
            let state = table.entry(&guild_id);
            state.ticket_counter = record.ticket_counter;

            match decrypt_json::<TicketsPayload>(&self.key, &record.encrypted_tickets) {
                Ok((payload, format)) => {
                    for ticket in payload.into_values() {
                        state.insert_ticket(ticket);
                    }
                    if format.is_legacy() {
                        debug!(guild_id = %guild_id, "tickets envelope uses the legacy format");
                        report.legacy.tickets.push(guild_id);
                    }
                }
                Err(e) => {
                    warn!(guild_id = %guild_id, error = %e, "tickets envelope could not be decrypted -- guild loads with no tickets");
                    report.undecryptable.push((DocumentKind::Tickets, guild_id));
                }
            }
        }
    }

    fn staff_snapshot(&self) -> Result<StaffDocument, TicketdeskError> {
        let table = lock_table(&self.table);
        let mut doc = StaffDocument::default();
        for (guild_id, state) in table.iter() {
            let payload = StaffPayload {
                staff: state.staff.iter().cloned().collect(),
                presence: state
                    .presence
                    .iter()
                    .map(|(id, p)| (id.clone(), p.clone()))
                    .collect(),
                offline_queue: state.offline_queue.clone(),
            };
            doc.guilds.insert(
                guild_id.to_owned(),
                StaffRecord {
                    encrypted_staff: encrypt_json(&self.key, &payload)?,
                    config: Some(state.config.clone()),
                },
            );
        }
        Ok(doc)
    }

    fn tickets_snapshot(&self) -> Result<TicketsDocument, TicketdeskError> {
        let table = lock_table(&self.table);
        let mut doc = TicketsDocument::default();
        for (guild_id, state) in table.iter() {
            let payload: BTreeMap<&str, &Ticket> = state
                .tickets
                .iter()
                .map(|(key, ticket)| (key.as_str(), ticket))
                .collect();
            doc.guilds.insert(
                guild_id.to_owned(),
                TicketRecord {
                    encrypted_tickets: encrypt_json(&self.key, &payload)?,
                    ticket_counter: state.ticket_counter,
                },
            );
        }
        Ok(doc)
    }
}

fn skip_malformed(
    table: &mut GuildTable,
    kind: DocumentKind,
    malformed: BTreeMap<String, String>,
    report: &mut LoadReport,
) {
    for (guild_id, reason) in malformed {
        warn!(
            guild_id = %guild_id,
            document = %kind,
            reason = %reason,
            "guild record is malformed -- guild loads empty"
        );
        table.entry(&guild_id);
        report.undecryptable.push((kind, guild_id));
    }
}

/// Adapter that lets the debounced writer drive the persister.
pub(crate) struct PersistSink(pub(crate) Arc<Persister>);

#[async_trait]
impl SnapshotSink for PersistSink {
    async fn flush(&self, dirty: DirtySet) -> Result<(), TicketdeskError> {
        let mut first_error = None;
        for (kind, is_dirty) in [
            (DocumentKind::Staff, dirty.staff),
            (DocumentKind::Tickets, dirty.tickets),
        ] {
            if is_dirty && let Err(e) = self.0.save(kind).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn persister(dir: &std::path::Path) -> Persister {
        let repo = FileRepository::new(dir.join("data"), "staff.json", "tickets.json");
        let key = KeyMaterial::from_bytes(&[7u8; 32]).unwrap();
        Persister::new(repo, key, Arc::new(Mutex::new(GuildTable::default())))
    }

    #[tokio::test]
    #[traced_test]
    async fn corrupt_staff_document_is_reset_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let persister = persister(dir.path());
        persister.repo().ensure_data_dir().await.unwrap();
        std::fs::write(persister.repo().path(DocumentKind::Staff), "[not json").unwrap();

        let report = persister.load().await.unwrap();

        assert_eq!(report.reset, vec![DocumentKind::Staff]);
        assert!(logs_contain("resetting to empty"));
        let healed = std::fs::read_to_string(persister.repo().path(DocumentKind::Staff)).unwrap();
        assert!(serde_json::from_str::<StaffDocument>(&healed).is_ok());
    }

    #[tokio::test]
    async fn snapshot_roundtrips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let first = persister(dir.path());
        {
            let mut table = lock_table(&first.table);
            let guild = table.entry("g1");
            guild.staff.insert("s1".into());
            guild.ticket_counter = 9;
        }
        first.save(DocumentKind::Staff).await.unwrap();
        first.save(DocumentKind::Tickets).await.unwrap();

        let second = persister(dir.path());
        let report = second.load().await.unwrap();
        assert_eq!(report.guilds, 1);
        assert!(report.legacy.is_empty());

        let table = lock_table(&second.table);
        let guild = table.get("g1").unwrap();
        assert!(guild.is_staff("s1"));
        assert_eq!(guild.ticket_counter(), 9);
    }
}
