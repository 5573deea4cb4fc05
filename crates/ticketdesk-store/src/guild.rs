// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-guild state aggregate and the table that owns it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use ticketdesk_core::{GuildConfig, QueuedTicketNotification, StaffPresence, Ticket};
use tracing::warn;

/// Everything the store knows about one guild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuildState {
    /// Open tickets keyed by `thread_id ?? channel_id`.
    pub(crate) tickets: HashMap<String, Ticket>,
    pub(crate) staff: BTreeSet<String>,
    pub(crate) presence: HashMap<String, StaffPresence>,
    /// FIFO of held-back notifications, unique by `ticket_id`.
    pub(crate) offline_queue: Vec<QueuedTicketNotification>,
    pub(crate) config: GuildConfig,
    /// Last ticket number handed out. Zero before the first ticket.
    pub(crate) ticket_counter: u64,
}

impl GuildState {
    pub fn is_staff(&self, user_id: &str) -> bool {
        self.staff.contains(user_id)
    }

    pub fn staff(&self) -> impl Iterator<Item = &str> {
        self.staff.iter().map(String::as_str)
    }

    pub fn config(&self) -> &GuildConfig {
        &self.config
    }

    pub fn ticket_counter(&self) -> u64 {
        self.ticket_counter
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Advance and return the guild's ticket counter.
    pub(crate) fn next_ticket_number(&mut self) -> u64 {
        self.ticket_counter += 1;
        self.ticket_counter
    }
}

/// All guild state, created lazily on first write.
#[derive(Debug, Default)]
pub struct GuildTable {
    guilds: HashMap<String, GuildState>,
}

impl GuildTable {
    pub fn get(&self, guild_id: &str) -> Option<&GuildState> {
        self.guilds.get(guild_id)
    }

    pub(crate) fn get_mut(&mut self, guild_id: &str) -> Option<&mut GuildState> {
        self.guilds.get_mut(guild_id)
    }

    /// The guild's state, creating an empty entry if needed.
    pub fn entry(&mut self, guild_id: &str) -> &mut GuildState {
        self.guilds.entry(guild_id.to_owned()).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GuildState)> {
        self.guilds.iter().map(|(id, state)| (id.as_str(), state))
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }
}

/// Lock the table. A poisoned lock is recovered: every mutation replaces
/// whole values, so the state behind it is still consistent.
pub(crate) fn lock_table(table: &Mutex<GuildTable>) -> MutexGuard<'_, GuildTable> {
    table.lock().unwrap_or_else(|poisoned| {
        warn!("guild table lock was poisoned -- recovering");
        poisoned.into_inner()
    })
}
