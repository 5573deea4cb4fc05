// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket lookup keys.
//!
//! Channel tickets and thread tickets share one map per guild. A ticket is
//! stored under its thread id when it has one, otherwise under its channel
//! id, so interactions can find it by whichever id Discord hands them.

use ticketdesk_core::Ticket;

/// The map key for a ticket with these ids.
pub fn resolve_key<'a>(channel_id: &'a str, thread_id: Option<&'a str>) -> &'a str {
    thread_id.unwrap_or(channel_id)
}

/// The map key for an existing ticket.
pub fn ticket_key(ticket: &Ticket) -> &str {
    resolve_key(&ticket.channel_id, ticket.thread_id.as_deref())
}
