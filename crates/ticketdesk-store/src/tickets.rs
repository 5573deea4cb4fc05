// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket lifecycle and authorization rules.
//!
//! Each operation reads the current ticket, builds a replacement with the
//! changed field and re-inserts it under the same key. The caller holds the
//! table lock for the whole step.

use chrono::{DateTime, Utc};
use thiserror::Error;
use ticketdesk_core::{EscalationLevel, Ticket};

use crate::guild::GuildState;
use crate::identity::{resolve_key, ticket_key};

/// Why a ticket action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketActionError {
    #[error("ticket not found")]
    NotFound,

    #[error("ticket is already claimed by {0}")]
    AlreadyClaimed(String),

    #[error("only the staff member who claimed this ticket can do that")]
    NotClaimer,

    #[error("only staff members can do that")]
    NotStaff,

    #[error("ticket is already locked")]
    AlreadyLocked,

    #[error("ticket is not locked")]
    NotLocked,

    #[error("ticket is claimed by {0}")]
    ClaimedByOther(String),

    #[error("ticket is already at the maximum escalation level")]
    MaxEscalation,
}

/// Fields supplied when a ticket is opened.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub guild_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub ticket_number: u64,
    pub channel_name: String,
    pub description: Option<String>,
    pub thread_id: Option<String>,
}

impl NewTicket {
    pub(crate) fn into_ticket(self, created_at: DateTime<Utc>) -> Ticket {
        Ticket {
            guild_id: self.guild_id,
            user_id: self.user_id,
            channel_id: self.channel_id,
            thread_id: self.thread_id,
            ticket_number: self.ticket_number,
            channel_name: self.channel_name,
            created_at,
            description: self.description,
            claimed_by: None,
            is_locked: false,
            notes: None,
            escalation_level: EscalationLevel::Normal,
            whitelisted_users: Vec::new(),
        }
    }
}

type ActionResult = Result<Ticket, TicketActionError>;

impl GuildState {
    pub fn ticket(&self, key: &str) -> Option<&Ticket> {
        self.tickets.get(key)
    }

    pub fn ticket_by_ids(&self, channel_id: &str, thread_id: Option<&str>) -> Option<&Ticket> {
        self.tickets.get(resolve_key(channel_id, thread_id))
    }

    /// Open tickets ordered by ticket number.
    pub fn tickets_by_number(&self) -> Vec<&Ticket> {
        let mut tickets: Vec<&Ticket> = self.tickets.values().collect();
        tickets.sort_by_key(|t| t.ticket_number);
        tickets
    }

    /// The ticket owner and whitelisted users may see the ticket.
    pub fn is_user_whitelisted(&self, key: &str, user_id: &str) -> bool {
        self.tickets.get(key).is_some_and(|t| {
            t.user_id == user_id || t.whitelisted_users.iter().any(|u| u == user_id)
        })
    }

    pub(crate) fn insert_ticket(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket_key(&ticket).to_owned(), ticket);
    }

    pub(crate) fn remove_ticket(&mut self, key: &str) -> Option<Ticket> {
        self.tickets.remove(key)
    }

    pub(crate) fn claim(&mut self, key: &str, staff_id: &str) -> ActionResult {
        let current = self.current(key)?;
        if let Some(by) = &current.claimed_by {
            return Err(TicketActionError::AlreadyClaimed(by.clone()));
        }
        Ok(self.replace(current.with_claimed_by(Some(staff_id.to_owned()))))
    }

    pub(crate) fn unclaim(&mut self, key: &str, staff_id: &str) -> ActionResult {
        let current = self.current(key)?;
        if current.claimed_by.as_deref() != Some(staff_id) {
            return Err(TicketActionError::NotClaimer);
        }
        Ok(self.replace(current.with_claimed_by(None)))
    }

    pub(crate) fn lock(&mut self, key: &str, staff_id: &str) -> ActionResult {
        let current = self.staff_gate(key, staff_id)?;
        if current.is_locked {
            return Err(TicketActionError::AlreadyLocked);
        }
        Self::claimer_gate(&current, staff_id)?;
        Ok(self.replace(current.with_locked(true)))
    }

    pub(crate) fn unlock(&mut self, key: &str, staff_id: &str) -> ActionResult {
        let current = self.staff_gate(key, staff_id)?;
        Self::claimer_gate(&current, staff_id)?;
        if !current.is_locked {
            return Err(TicketActionError::NotLocked);
        }
        Ok(self.replace(current.with_locked(false)))
    }

    pub(crate) fn escalate(&mut self, key: &str, staff_id: &str) -> ActionResult {
        let current = self.staff_gate(key, staff_id)?;
        let next = current
            .escalation_level
            .next()
            .ok_or(TicketActionError::MaxEscalation)?;
        Ok(self.replace(current.with_escalation(next)))
    }

    pub(crate) fn update_notes(&mut self, key: &str, staff_id: &str, notes: &str) -> ActionResult {
        let current = self.staff_gate(key, staff_id)?;
        let notes = Some(notes.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_owned);
        Ok(self.replace(current.with_notes(notes)))
    }

    pub(crate) fn whitelist_add(&mut self, key: &str, staff_id: &str, user_id: &str) -> ActionResult {
        let current = self.staff_gate(key, staff_id)?;
        if current.whitelisted_users.iter().any(|u| u == user_id) {
            return Ok(current);
        }
        let mut users = current.whitelisted_users.clone();
        users.push(user_id.to_owned());
        Ok(self.replace(current.with_whitelist(users)))
    }

    pub(crate) fn whitelist_remove(
        &mut self,
        key: &str,
        staff_id: &str,
        user_id: &str,
    ) -> ActionResult {
        let current = self.staff_gate(key, staff_id)?;
        let users = current
            .whitelisted_users
            .iter()
            .filter(|u| *u != user_id)
            .cloned()
            .collect();
        Ok(self.replace(current.with_whitelist(users)))
    }

    fn current(&self, key: &str) -> ActionResult {
        self.tickets.get(key).cloned().ok_or(TicketActionError::NotFound)
    }

    fn staff_gate(&self, key: &str, staff_id: &str) -> ActionResult {
        let current = self.current(key)?;
        if !self.is_staff(staff_id) {
            return Err(TicketActionError::NotStaff);
        }
        Ok(current)
    }

    fn claimer_gate(ticket: &Ticket, staff_id: &str) -> Result<(), TicketActionError> {
        match &ticket.claimed_by {
            Some(by) if by != staff_id => Err(TicketActionError::ClaimedByOther(by.clone())),
            _ => Ok(()),
        }
    }

    fn replace(&mut self, ticket: Ticket) -> Ticket {
        self.insert_ticket(ticket.clone());
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_with_ticket() -> GuildState {
        let mut guild = GuildState::default();
        guild.staff.insert("s1".into());
        guild.staff.insert("s2".into());
        guild.insert_ticket(
            NewTicket {
                guild_id: "g1".into(),
                user_id: "u1".into(),
                channel_id: "c1".into(),
                ticket_number: 1,
                channel_name: "ticket-0001".into(),
                description: Some("printer on fire".into()),
                thread_id: None,
            }
            .into_ticket(Utc::now()),
        );
        guild
    }

    #[test]
    fn missing_ticket_is_not_found() {
        let mut guild = GuildState::default();
        assert_eq!(guild.claim("nope", "s1"), Err(TicketActionError::NotFound));
        assert_eq!(guild.escalate("nope", "s1"), Err(TicketActionError::NotFound));
    }

    #[test]
    fn claim_then_second_claim_fails() {
        let mut guild = guild_with_ticket();
        let claimed = guild.claim("c1", "s1").unwrap();
        assert_eq!(claimed.claimed_by.as_deref(), Some("s1"));
        assert_eq!(
            guild.claim("c1", "s2"),
            Err(TicketActionError::AlreadyClaimed("s1".into()))
        );
    }

    #[test]
    fn claim_does_not_require_staff() {
        let mut guild = guild_with_ticket();
        assert!(guild.claim("c1", "outsider").is_ok());
    }

    #[test]
    fn only_claimer_can_unclaim() {
        let mut guild = guild_with_ticket();
        guild.claim("c1", "s1").unwrap();
        assert_eq!(guild.unclaim("c1", "s2"), Err(TicketActionError::NotClaimer));
        assert!(guild.unclaim("c1", "s1").unwrap().claimed_by.is_none());
        assert_eq!(guild.unclaim("c1", "s1"), Err(TicketActionError::NotClaimer));
    }

    #[test]
    fn lock_rules() {
        let mut guild = guild_with_ticket();
        assert_eq!(guild.lock("c1", "u1"), Err(TicketActionError::NotStaff));

        guild.claim("c1", "s1").unwrap();
        assert_eq!(
            guild.lock("c1", "s2"),
            Err(TicketActionError::ClaimedByOther("s1".into()))
        );
        assert!(guild.lock("c1", "s1").unwrap().is_locked);
        assert_eq!(guild.lock("c1", "s1"), Err(TicketActionError::AlreadyLocked));
    }

    #[test]
    fn unlock_rules() {
        let mut guild = guild_with_ticket();
        assert_eq!(guild.unlock("c1", "s1"), Err(TicketActionError::NotLocked));

        guild.lock("c1", "s1").unwrap();
        guild.claim("c1", "s1").unwrap();
        assert_eq!(
            guild.unlock("c1", "s2"),
            Err(TicketActionError::ClaimedByOther("s1".into()))
        );
        assert!(!guild.unlock("c1", "s1").unwrap().is_locked);
    }

    #[test]
    fn escalation_stops_at_ceiling() {
        let mut guild = guild_with_ticket();
        let levels: Vec<u8> = (0..3)
            .map(|_| guild.escalate("c1", "s1").unwrap().escalation_level.as_u8())
            .collect();
        assert_eq!(levels, vec![1, 2, 3]);

        assert_eq!(guild.escalate("c1", "s1"), Err(TicketActionError::MaxEscalation));
        assert_eq!(guild.ticket("c1").unwrap().escalation_level, EscalationLevel::Critical);
    }

    #[test]
    fn blank_notes_clear() {
        let mut guild = guild_with_ticket();
        let noted = guild.update_notes("c1", "s1", " needs a refund ").unwrap();
        assert_eq!(noted.notes.as_deref(), Some("needs a refund"));
        assert!(guild.update_notes("c1", "s1", "   ").unwrap().notes.is_none());
        assert_eq!(
            guild.update_notes("c1", "u1", "x"),
            Err(TicketActionError::NotStaff)
        );
    }

    #[test]
    fn whitelist_add_is_idempotent() {
        let mut guild = guild_with_ticket();
        guild.whitelist_add("c1", "s1", "u2").unwrap();
        let ticket = guild.whitelist_add("c1", "s1", "u2").unwrap();
        assert_eq!(ticket.whitelisted_users, vec!["u2"]);
        assert!(guild.is_user_whitelisted("c1", "u2"));
        assert!(guild.is_user_whitelisted("c1", "u1"));

        guild.whitelist_remove("c1", "s1", "u2").unwrap();
        assert!(!guild.is_user_whitelisted("c1", "u2"));
    }

    #[test]
    fn thread_ticket_is_found_by_both_ids() {
        let mut guild = GuildState::default();
        guild.insert_ticket(
            NewTicket {
                guild_id: "g1".into(),
                user_id: "u1".into(),
                channel_id: "c1".into(),
                ticket_number: 4,
                channel_name: "ticket-0004".into(),
                description: None,
                thread_id: Some("t1".into()),
            }
            .into_ticket(Utc::now()),
        );

        assert!(guild.ticket("t1").is_some());
        assert!(guild.ticket("c1").is_none());
        assert_eq!(guild.ticket_by_ids("c1", Some("t1")).unwrap().ticket_number, 4);
    }
}
