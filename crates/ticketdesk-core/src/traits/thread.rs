// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread-existence checks for thread-backed tickets.

use async_trait::async_trait;

use crate::error::TicketdeskError;

/// Answers whether a Discord thread still exists.
///
/// Implemented by the Discord client layer. The store only uses it as a
/// best-effort staleness check: when no checker is configured, or the checker
/// fails, the thread is assumed to exist.
#[async_trait]
pub trait ThreadChecker: Send + Sync + 'static {
    /// Returns `Ok(false)` only when the thread is known to be gone.
    async fn thread_exists(&self, guild_id: &str, thread_id: &str) -> Result<bool, TicketdeskError>;
}
