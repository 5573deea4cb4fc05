// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON document persistence for the Ticketdesk store.
//!
//! Two documents live in the data directory: the staff/config document and
//! the tickets document. Both are rewritten whole on every save. Writes are
//! coalesced by a single background writer task.

pub mod documents;
pub mod repository;
pub mod writer;

pub use documents::{
    DocumentKind, LoadedDocument, StaffDocument, StaffPayload, StaffRecord, TicketRecord,
    TicketsDocument, TicketsPayload,
};
pub use repository::{FileRepository, LoadOutcome};
pub use writer::{DirtySet, SaveScheduler, SnapshotSink};
