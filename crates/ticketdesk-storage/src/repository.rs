// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads and writes the staff and tickets documents.
//!
//! Every save writes the full document. Writes go to a sibling temp file
//! which is then renamed over the target, so a crash mid-write leaves the
//! previous version in place.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use ticketdesk_config::StorageConfig;
use ticketdesk_core::TicketdeskError;
use tracing::{debug, info, warn};

use crate::documents::{
    DocumentKind, LoadedDocument, RawDocument, StaffDocument, StaffRecord, TicketRecord,
    TicketsDocument,
};

/// What a load found on disk.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// No file, or a file with only whitespace. Start empty.
    Empty,
    /// A well-formed document.
    Loaded(T),
    /// The file exists but is not valid JSON, or has no usable `guilds` map.
    /// Carries the parse error.
    Corrupt(String),
}

impl<T> LoadOutcome<T> {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

/// File-backed repository for the two documents.
#[derive(Debug, Clone)]
pub struct FileRepository {
    data_dir: PathBuf,
    staff_path: PathBuf,
    tickets_path: PathBuf,
}

impl FileRepository {
    pub fn new(data_dir: impl Into<PathBuf>, staff_file: &str, tickets_file: &str) -> Self {
        let data_dir = data_dir.into();
        Self {
            staff_path: data_dir.join(staff_file),
            tickets_path: data_dir.join(tickets_file),
            data_dir,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.data_dir, &config.staff_file, &config.tickets_file)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, kind: DocumentKind) -> &Path {
        match kind {
            DocumentKind::Staff => &self.staff_path,
            DocumentKind::Tickets => &self.tickets_path,
        }
    }

    /// Path of the snapshot taken before a migration rewrite.
    pub fn backup_path(&self, kind: DocumentKind) -> PathBuf {
        let mut name = self.path(kind).as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Create the data directory if it does not exist.
    pub async fn ensure_data_dir(&self) -> Result<(), TicketdeskError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    pub async fn load_staff(
        &self,
    ) -> Result<LoadOutcome<LoadedDocument<StaffRecord>>, TicketdeskError> {
        self.load(DocumentKind::Staff).await
    }

    pub async fn load_tickets(
        &self,
    ) -> Result<LoadOutcome<LoadedDocument<TicketRecord>>, TicketdeskError> {
        self.load(DocumentKind::Tickets).await
    }

    pub async fn save_staff(&self, doc: &StaffDocument) -> Result<(), TicketdeskError> {
        self.write(DocumentKind::Staff, doc).await
    }

    pub async fn save_tickets(&self, doc: &TicketsDocument) -> Result<(), TicketdeskError> {
        self.write(DocumentKind::Tickets, doc).await
    }

    /// Copy a document to its `.bak` path. Best effort: failures are logged
    /// and reported as `None`.
    pub async fn backup(&self, kind: DocumentKind) -> Option<PathBuf> {
        let source = self.path(kind);
        let target = self.backup_path(kind);
        match tokio::fs::copy(source, &target).await {
            Ok(bytes) => {
                info!(document = %kind, path = %target.display(), bytes, "backup written");
                Some(target)
            }
            Err(e) => {
                warn!(document = %kind, error = %e, "backup failed -- continuing without it");
                None
            }
        }
    }

    async fn load<R: DeserializeOwned>(
        &self,
        kind: DocumentKind,
    ) -> Result<LoadOutcome<LoadedDocument<R>>, TicketdeskError> {
        self.ensure_data_dir().await?;
        let path = self.path(kind);

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(document = %kind, path = %path.display(), "no file yet -- starting empty");
                return Ok(LoadOutcome::Empty);
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            debug!(document = %kind, "file is empty -- starting empty");
            return Ok(LoadOutcome::Empty);
        }

        match serde_json::from_str::<RawDocument>(&content) {
            Ok(raw) => Ok(LoadOutcome::Loaded(raw.decode())),
            Err(e) => Ok(LoadOutcome::Corrupt(e.to_string())),
        }
    }

    async fn write<T: Serialize>(&self, kind: DocumentKind, doc: &T) -> Result<(), TicketdeskError> {
        self.ensure_data_dir().await?;
        let path = self.path(kind);
        let json = serde_json::to_vec_pretty(doc)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(document = %kind, bytes = json.len(), "document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo(dir: &Path) -> FileRepository {
        FileRepository::new(dir.join("data"), "staff.json", "tickets.json")
    }

    #[tokio::test]
    async fn missing_file_loads_empty_and_creates_dir() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());

        assert!(matches!(repo.load_tickets().await.unwrap(), LoadOutcome::Empty));
        assert!(repo.data_dir().is_dir());
    }

    #[tokio::test]
    async fn whitespace_file_loads_empty() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());
        repo.ensure_data_dir().await.unwrap();
        std::fs::write(repo.path(DocumentKind::Staff), "  \n").unwrap();

        assert!(matches!(repo.load_staff().await.unwrap(), LoadOutcome::Empty));
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());
        repo.ensure_data_dir().await.unwrap();
        std::fs::write(repo.path(DocumentKind::Tickets), b"\x00\x01not json").unwrap();

        assert!(repo.load_tickets().await.unwrap().is_corrupt());
    }

    #[tokio::test]
    async fn bad_guild_record_does_not_corrupt_document() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());
        repo.ensure_data_dir().await.unwrap();
        std::fs::write(
            repo.path(DocumentKind::Tickets),
            r#"{"guilds":{"g1":{"encryptedTickets":"nope","ticketCounter":3}}}"#,
        )
        .unwrap();

        match repo.load_tickets().await.unwrap() {
            LoadOutcome::Loaded(loaded) => {
                assert!(loaded.guilds.is_empty());
                assert!(loaded.malformed.contains_key("g1"));
            }
            other => panic!("expected Loaded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_without_guild_map_is_corrupt() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());
        repo.ensure_data_dir().await.unwrap();
        std::fs::write(repo.path(DocumentKind::Staff), r#"{"guilds":[1,2]}"#).unwrap();

        assert!(repo.load_staff().await.unwrap().is_corrupt());
    }

    #[tokio::test]
    async fn save_then_load_returns_document() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());

        let doc = TicketsDocument::default();
        repo.save_tickets(&doc).await.unwrap();

        match repo.load_tickets().await.unwrap() {
            LoadOutcome::Loaded(loaded) => {
                assert_eq!(loaded.guilds, doc.guilds);
                assert!(loaded.malformed.is_empty());
            }
            other => panic!("expected Loaded, got {other:?}"),
        }
        assert!(!dir.path().join("data/tickets.json.tmp").exists());
    }

    #[tokio::test]
    async fn backup_copies_current_file() {
        let dir = tempdir().unwrap();
        let repo = repo(dir.path());
        repo.save_staff(&StaffDocument::default()).await.unwrap();

        let backup = repo.backup(DocumentKind::Staff).await.unwrap();
        assert_eq!(backup, dir.path().join("data/staff.json.bak"));
        assert_eq!(
            std::fs::read(&backup).unwrap(),
            std::fs::read(repo.path(DocumentKind::Staff)).unwrap()
        );
    }

    #[tokio::test]
    async fn backup_of_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert!(repo(dir.path()).backup(DocumentKind::Tickets).await.is_none());
    }
}
