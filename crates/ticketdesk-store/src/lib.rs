// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket and staff state store for the Ticketdesk support bot.
//!
//! All per-guild state (tickets, staff, presence, the offline queue and
//! guild configuration) lives in memory behind [`TicketManager`] and is
//! persisted as two encrypted JSON documents.

pub mod guild;
pub mod identity;
pub mod inspect;
pub mod manager;
pub mod migration;
pub mod persist;
pub mod presence;
pub mod tickets;

pub use guild::{GuildState, GuildTable};
pub use identity::{resolve_key, ticket_key};
pub use inspect::{inspect, DocumentInspection, DocumentState, GuildInspection, Inspection};
pub use manager::TicketManager;
pub use migration::{LegacyGuilds, MigratedGuild, MigrationReport};
pub use persist::LoadReport;
pub use tickets::{NewTicket, TicketActionError};
