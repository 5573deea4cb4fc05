// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ticketdesk support-ticket store.
//!
//! This crate provides the domain types, the shared error type, and the
//! collaborator traits used throughout the Ticketdesk workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TicketdeskError;
pub use traits::ThreadChecker;
pub use types::{
    EscalationLevel, GuildConfig, NotificationPriority, PresenceStatus, PresenceTrackingConfig,
    PresenceTransition, QueuedTicketNotification, SmartPingConfig, StaffPresence, Ticket,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticketdesk_error_has_all_variants() {
        let _config = TicketdeskError::Config("test".into());
        let _storage = TicketdeskError::storage(std::io::Error::other("test"));
        let _vault = TicketdeskError::Vault("test".into());
        let _serde = TicketdeskError::Serialization(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        );
        let _collab = TicketdeskError::Collaborator {
            message: "test".into(),
            source: None,
        };
        let _internal = TicketdeskError::Internal("test".into());
    }

    #[test]
    fn io_errors_convert_to_storage() {
        let err: TicketdeskError = std::io::Error::other("disk full").into();
        assert!(err.to_string().contains("disk full"));
        assert!(matches!(err, TicketdeskError::Storage { .. }));
    }

    struct AlwaysGone;

    #[async_trait::async_trait]
    impl ThreadChecker for AlwaysGone {
        async fn thread_exists(&self, _guild_id: &str, _thread_id: &str) -> Result<bool, TicketdeskError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn thread_checker_is_object_safe() {
        let checker: Box<dyn ThreadChecker> = Box::new(AlwaysGone);
        assert!(!checker.thread_exists("g1", "t1").await.unwrap());
    }
}
