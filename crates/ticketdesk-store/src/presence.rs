// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff presence tracking and the offline notification queue.

use chrono::{DateTime, Utc};
use ticketdesk_core::{
    PresenceStatus, PresenceTrackingConfig, PresenceTransition, QueuedTicketNotification,
    StaffPresence,
};

use crate::guild::GuildState;

impl GuildState {
    pub fn presence_tracking(&self) -> PresenceTrackingConfig {
        self.config.presence_tracking.clone().unwrap_or_default()
    }

    pub fn presence_enabled(&self) -> bool {
        self.config.presence_enabled()
    }

    pub fn staff_presence(&self, user_id: &str) -> Option<&StaffPresence> {
        self.presence.get(user_id)
    }

    /// Staff ids whose last known status matches `pred`, sorted.
    pub fn staff_where(&self, pred: impl Fn(PresenceStatus) -> bool) -> Vec<String> {
        let mut ids: Vec<String> = self
            .staff
            .iter()
            .filter(|id| self.presence.get(*id).is_some_and(|p| pred(p.status)))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Whether a new ticket notification should be held for later.
    pub fn should_queue_offline(&self) -> bool {
        let tracking = self.presence_tracking();
        tracking.enabled
            && tracking.smart_ping.enabled
            && tracking.smart_ping.offline_queueing
            && self.staff_where(PresenceStatus::is_available).is_empty()
    }

    pub fn offline_queue(&self) -> &[QueuedTicketNotification] {
        &self.offline_queue
    }

    /// Record a status change for a staff member.
    ///
    /// Returns `None` without touching state unless the user is staff and
    /// tracking is enabled for the guild.
    pub(crate) fn apply_presence(
        &mut self,
        user_id: &str,
        status: PresenceStatus,
        now: DateTime<Utc>,
    ) -> Option<PresenceTransition> {
        if !self.is_staff(user_id) || !self.presence_enabled() {
            return None;
        }

        let previous = self.presence.get(user_id);
        let was_offline = previous.is_none_or(|p| p.status == PresenceStatus::Offline);
        let last_seen = match previous {
            Some(p) if p.status == PresenceStatus::Offline && status == PresenceStatus::Offline => {
                p.last_seen
            }
            _ => now,
        };

        self.presence.insert(
            user_id.to_owned(),
            StaffPresence {
                user_id: user_id.to_owned(),
                status,
                last_seen,
                last_updated: now,
            },
        );

        Some(PresenceTransition {
            was_offline,
            is_now_available: status.is_available(),
        })
    }

    /// Queue a notification, replacing any entry for the same ticket in place.
    pub(crate) fn enqueue(&mut self, notification: QueuedTicketNotification) {
        match self
            .offline_queue
            .iter_mut()
            .find(|q| q.ticket_id == notification.ticket_id)
        {
            Some(slot) => *slot = notification,
            None => self.offline_queue.push(notification),
        }
    }

    pub(crate) fn dequeue(&mut self, ticket_id: &str) -> bool {
        let before = self.offline_queue.len();
        self.offline_queue.retain(|q| q.ticket_id != ticket_id);
        self.offline_queue.len() != before
    }

    pub(crate) fn drain_queue(&mut self) -> Vec<QueuedTicketNotification> {
        std::mem::take(&mut self.offline_queue)
    }
}
