// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public face of the store.
//!
//! [`TicketManager`] owns all guild state. Ticket and presence mutations are
//! synchronous and schedule a debounced save. Staff and configuration
//! setters are async: they save before returning and undo the in-memory
//! change if the save fails.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use ticketdesk_config::StorageConfig;
use ticketdesk_core::{
    GuildConfig, PresenceStatus, PresenceTrackingConfig, PresenceTransition,
    QueuedTicketNotification, StaffPresence, ThreadChecker, Ticket, TicketdeskError,
};
use ticketdesk_storage::{DocumentKind, FileRepository, SaveScheduler};
use ticketdesk_vault::{KeyMaterial, KeySource};
use tracing::{debug, info, warn};

use crate::guild::{lock_table, GuildState, GuildTable};
use crate::migration::migrate_legacy;
use crate::persist::{LoadReport, PersistSink, Persister};
use crate::tickets::{NewTicket, TicketActionError};

pub struct TicketManager {
    table: Arc<Mutex<GuildTable>>,
    persister: Arc<Persister>,
    scheduler: SaveScheduler,
    threads: Option<Arc<dyn ThreadChecker>>,
    report: LoadReport,
}

impl std::fmt::Debug for TicketManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketManager")
            .field("data_dir", &self.persister.repo().data_dir())
            .field("thread_checker", &self.threads.is_some())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl TicketManager {
    /// Load both documents, migrate legacy envelopes and start the writer.
    ///
    /// The returned manager is ready: every guild on disk is in memory.
    pub async fn open(
        storage: &StorageConfig,
        key: KeyMaterial,
        threads: Option<Arc<dyn ThreadChecker>>,
    ) -> Result<Self, TicketdeskError> {
        let repo = FileRepository::from_config(storage);
        let table = Arc::new(Mutex::new(GuildTable::default()));
        let persister = Arc::new(Persister::new(repo, key, Arc::clone(&table)));

        let mut report = persister.load().await?;
        if !report.legacy.is_empty() {
            report.migration =
                migrate_legacy(&persister, &report.legacy, storage.backup_on_migrate).await;
        }

        let scheduler = SaveScheduler::spawn(
            PersistSink(Arc::clone(&persister)),
            storage.save_debounce(),
        );

        info!(
            data_dir = %persister.repo().data_dir().display(),
            guilds = report.guilds,
            tickets = report.tickets,
            migrated = report.migration.migrated.len(),
            "ticket store ready"
        );

        Ok(Self {
            table,
            persister,
            scheduler,
            threads,
            report,
        })
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn data_dir(&self) -> &Path {
        self.persister.repo().data_dir()
    }

    pub fn key_source(&self) -> KeySource {
        self.persister.key().source()
    }

    // --- tickets -------------------------------------------------------

    pub fn create_ticket(&self, new: NewTicket) -> Ticket {
        let guild_id = new.guild_id.clone();
        let ticket = new.into_ticket(Utc::now());
        self.with_guild(&guild_id, |g| g.insert_ticket(ticket.clone()));
        self.scheduler.schedule(DocumentKind::Tickets);

        info!(
            guild_id = %guild_id,
            key = %ticket.storage_key(),
            number = ticket.ticket_number,
            "ticket created"
        );
        ticket
    }

    /// Claim an unclaimed ticket. The caller is not checked against the
    /// staff list.
    pub fn claim_ticket(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.claim(key, staff_id))
    }

    pub fn unclaim_ticket(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.unclaim(key, staff_id))
    }

    pub fn lock_ticket(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.lock(key, staff_id))
    }

    pub fn unlock_ticket(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.unlock(key, staff_id))
    }

    /// Raise the escalation level by one. At the top level this fails with
    /// [`TicketActionError::MaxEscalation`] and the ticket is unchanged.
    pub fn escalate_ticket(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.escalate(key, staff_id))
    }

    /// Replace the staff notes. Blank input clears them.
    pub fn update_ticket_notes(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
        notes: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.update_notes(key, staff_id, notes))
    }

    pub fn add_user_to_whitelist(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
        user_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.whitelist_add(key, staff_id, user_id))
    }

    pub fn remove_user_from_whitelist(
        &self,
        guild_id: &str,
        key: &str,
        staff_id: &str,
        user_id: &str,
    ) -> Result<Ticket, TicketActionError> {
        self.mutate_ticket(guild_id, |g| g.whitelist_remove(key, staff_id, user_id))
    }

    /// Delete a ticket. Returns whether it existed.
    pub fn close_ticket(&self, guild_id: &str, key: &str) -> bool {
        self.take_ticket(guild_id, key).is_some()
    }

    pub fn get_next_ticket_number(&self, guild_id: &str) -> u64 {
        let number = self.with_guild(guild_id, GuildState::next_ticket_number);
        self.scheduler.schedule(DocumentKind::Tickets);
        number
    }

    pub fn get_ticket(&self, guild_id: &str, key: &str) -> Option<Ticket> {
        self.read(guild_id, |g| g.ticket(key).cloned()).flatten()
    }

    pub fn get_ticket_by_ids(
        &self,
        guild_id: &str,
        channel_id: &str,
        thread_id: Option<&str>,
    ) -> Option<Ticket> {
        self.read(guild_id, |g| g.ticket_by_ids(channel_id, thread_id).cloned())
            .flatten()
    }

    /// Open tickets in a guild, ordered by ticket number.
    pub fn get_guild_tickets(&self, guild_id: &str) -> Vec<Ticket> {
        self.read(guild_id, |g| g.tickets_by_number().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_user_tickets(&self, guild_id: &str, user_id: &str) -> Vec<Ticket> {
        self.read(guild_id, |g| {
            g.tickets_by_number()
                .into_iter()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn is_user_whitelisted(&self, guild_id: &str, key: &str, user_id: &str) -> bool {
        self.read(guild_id, |g| g.is_user_whitelisted(key, user_id))
            .unwrap_or(false)
    }

    pub fn ticket_count(&self, guild_id: &str) -> usize {
        self.read(guild_id, GuildState::ticket_count).unwrap_or(0)
    }

    /// Whether the ticket's thread still exists.
    ///
    /// Channel tickets always pass. Without a checker, or when the checker
    /// fails, the thread is assumed to exist. A missing ticket does not.
    pub async fn thread_exists(&self, guild_id: &str, key: &str) -> bool {
        let Some(ticket) = self.get_ticket(guild_id, key) else {
            return false;
        };
        match ticket.thread_id {
            Some(thread_id) => self.check_thread(guild_id, &thread_id).await,
            None => true,
        }
    }

    /// Close every thread ticket whose thread is gone. Returns the closed
    /// tickets. Does nothing without a checker.
    pub async fn prune_missing_threads(&self, guild_id: &str) -> Vec<Ticket> {
        if self.threads.is_none() {
            return Vec::new();
        }

        let candidates: Vec<(String, String)> = self
            .read(guild_id, |g| {
                g.tickets
                    .iter()
                    .filter_map(|(key, t)| t.thread_id.clone().map(|thread| (key.clone(), thread)))
                    .collect()
            })
            .unwrap_or_default();

        let mut closed = Vec::new();
        for (key, thread_id) in candidates {
            if !self.check_thread(guild_id, &thread_id).await
                && let Some(ticket) = self.take_ticket(guild_id, &key)
            {
                closed.push(ticket);
            }
        }

        if !closed.is_empty() {
            info!(guild_id = %guild_id, closed = closed.len(), "closed tickets with missing threads");
        }
        closed
    }

    // --- staff & config ------------------------------------------------

    pub fn is_staff(&self, guild_id: &str, user_id: &str) -> bool {
        self.read(guild_id, |g| g.is_staff(user_id)).unwrap_or(false)
    }

    /// Staff ids for a guild, sorted.
    pub fn get_staff(&self, guild_id: &str) -> Vec<String> {
        self.read(guild_id, |g| g.staff().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Add a staff member and save. Returns `false` if they were already staff.
    pub async fn add_staff(&self, guild_id: &str, user_id: &str) -> Result<bool, TicketdeskError> {
        let added = self.with_guild(guild_id, |g| g.staff.insert(user_id.to_owned()));
        if !added {
            return Ok(false);
        }
        self.save_or_rollback(guild_id, |g| {
            g.staff.remove(user_id);
        })
        .await?;
        info!(guild_id = %guild_id, user_id = %user_id, "staff member added");
        Ok(true)
    }

    /// Remove a staff member (and their presence) and save. Returns `false`
    /// if they were not staff.
    pub async fn remove_staff(&self, guild_id: &str, user_id: &str) -> Result<bool, TicketdeskError> {
        let Some(presence) = self
            .with_existing_guild(guild_id, |g| {
                g.staff
                    .remove(user_id)
                    .then(|| g.presence.remove(user_id))
            })
            .flatten()
        else {
            return Ok(false);
        };

        self.save_or_rollback(guild_id, |g| {
            g.staff.insert(user_id.to_owned());
            if let Some(presence) = presence {
                g.presence.entry(user_id.to_owned()).or_insert(presence);
            }
        })
        .await?;
        info!(guild_id = %guild_id, user_id = %user_id, "staff member removed");
        Ok(true)
    }

    pub fn get_guild_config(&self, guild_id: &str) -> GuildConfig {
        self.read(guild_id, |g| g.config().clone()).unwrap_or_default()
    }

    pub fn get_support_channel(&self, guild_id: &str) -> Option<String> {
        self.read(guild_id, |g| g.config().support_channel_id.clone())
            .flatten()
    }

    pub async fn set_support_channel(
        &self,
        guild_id: &str,
        channel_id: Option<&str>,
    ) -> Result<(), TicketdeskError> {
        let previous = self.with_guild(guild_id, |g| {
            std::mem::replace(
                &mut g.config.support_channel_id,
                channel_id.map(str::to_owned),
            )
        });
        self.save_or_rollback(guild_id, |g| g.config.support_channel_id = previous)
            .await
    }

    // --- presence ------------------------------------------------------

    pub fn get_presence_config(&self, guild_id: &str) -> PresenceTrackingConfig {
        self.read(guild_id, GuildState::presence_tracking)
            .unwrap_or_default()
    }

    pub fn is_presence_tracking_enabled(&self, guild_id: &str) -> bool {
        self.read(guild_id, GuildState::presence_enabled)
            .unwrap_or(false)
    }

    /// Turn tracking on or off and save. Turning it off forgets every
    /// recorded presence for the guild.
    pub async fn set_presence_tracking(
        &self,
        guild_id: &str,
        enabled: bool,
    ) -> Result<(), TicketdeskError> {
        let tracking = PresenceTrackingConfig {
            enabled,
            ..self.get_presence_config(guild_id)
        };
        self.replace_presence_config(guild_id, tracking).await
    }

    /// Replace the guild's presence settings and save. A disabled config
    /// clears recorded presences, as with [`Self::set_presence_tracking`].
    pub async fn set_presence_config(
        &self,
        guild_id: &str,
        tracking: PresenceTrackingConfig,
    ) -> Result<(), TicketdeskError> {
        self.replace_presence_config(guild_id, tracking).await
    }

    /// Apply a gateway presence update. `None` means it was ignored.
    pub fn update_staff_presence(
        &self,
        guild_id: &str,
        user_id: &str,
        status: PresenceStatus,
    ) -> Option<PresenceTransition> {
        let transition = self
            .with_existing_guild(guild_id, |g| g.apply_presence(user_id, status, Utc::now()))
            .flatten()?;
        self.scheduler.schedule(DocumentKind::Staff);
        debug!(guild_id = %guild_id, user_id = %user_id, %status, ?transition, "presence updated");
        Some(transition)
    }

    pub fn get_staff_presence(&self, guild_id: &str, user_id: &str) -> Option<StaffPresence> {
        self.read(guild_id, |g| g.staff_presence(user_id).cloned())
            .flatten()
    }

    pub fn get_online_staff(&self, guild_id: &str) -> Vec<String> {
        self.read(guild_id, |g| g.staff_where(|s| s == PresenceStatus::Online))
            .unwrap_or_default()
    }

    /// Staff who are online or idle.
    pub fn get_available_staff(&self, guild_id: &str) -> Vec<String> {
        self.read(guild_id, |g| g.staff_where(PresenceStatus::is_available))
            .unwrap_or_default()
    }

    pub fn should_queue_offline(&self, guild_id: &str) -> bool {
        self.read(guild_id, GuildState::should_queue_offline)
            .unwrap_or(false)
    }

    /// Hold a notification until staff come back. An entry for the same
    /// ticket is replaced in place.
    pub fn queue_offline_ticket(&self, notification: QueuedTicketNotification) {
        let guild_id = notification.guild_id.clone();
        self.with_guild(&guild_id, |g| g.enqueue(notification));
        self.scheduler.schedule(DocumentKind::Staff);
    }

    pub fn get_offline_queue(&self, guild_id: &str) -> Vec<QueuedTicketNotification> {
        self.read(guild_id, |g| g.offline_queue().to_vec())
            .unwrap_or_default()
    }

    pub fn remove_from_offline_queue(&self, guild_id: &str, ticket_id: &str) -> bool {
        let removed = self
            .with_existing_guild(guild_id, |g| g.dequeue(ticket_id))
            .unwrap_or(false);
        if removed {
            self.scheduler.schedule(DocumentKind::Staff);
        }
        removed
    }

    /// Take every queued notification, oldest first.
    pub fn drain_offline_queue(&self, guild_id: &str) -> Vec<QueuedTicketNotification> {
        let drained = self
            .with_existing_guild(guild_id, GuildState::drain_queue)
            .unwrap_or_default();
        if !drained.is_empty() {
            self.scheduler.schedule(DocumentKind::Staff);
        }
        drained
    }

    // --- lifecycle -----------------------------------------------------

    /// Write both documents now.
    pub async fn flush(&self) -> Result<(), TicketdeskError> {
        self.persister.save(DocumentKind::Staff).await?;
        self.persister.save(DocumentKind::Tickets).await
    }

    /// Write anything pending and stop the background writer.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        info!("ticket store shut down");
    }

    /// Stop the background writer without writing pending changes.
    pub async fn destroy(&self) {
        self.scheduler.destroy().await;
    }

    // --- helpers -------------------------------------------------------

    fn with_guild<R>(&self, guild_id: &str, f: impl FnOnce(&mut GuildState) -> R) -> R {
        let mut table = lock_table(&self.table);
        f(table.entry(guild_id))
    }

    /// Like [`Self::with_guild`] for calls that never create state: an
    /// unknown guild yields `None` and stays unknown.
    fn with_existing_guild<R>(
        &self,
        guild_id: &str,
        f: impl FnOnce(&mut GuildState) -> R,
    ) -> Option<R> {
        let mut table = lock_table(&self.table);
        table.get_mut(guild_id).map(f)
    }

    fn read<R>(&self, guild_id: &str, f: impl FnOnce(&GuildState) -> R) -> Option<R> {
        let table = lock_table(&self.table);
        table.get(guild_id).map(f)
    }

    fn mutate_ticket(
        &self,
        guild_id: &str,
        f: impl FnOnce(&mut GuildState) -> Result<Ticket, TicketActionError>,
    ) -> Result<Ticket, TicketActionError> {
        let ticket = self
            .with_existing_guild(guild_id, f)
            .unwrap_or(Err(TicketActionError::NotFound))?;
        self.scheduler.schedule(DocumentKind::Tickets);
        Ok(ticket)
    }

    fn take_ticket(&self, guild_id: &str, key: &str) -> Option<Ticket> {
        let removed = self
            .with_existing_guild(guild_id, |g| g.remove_ticket(key))
            .flatten()?;
        self.scheduler.schedule(DocumentKind::Tickets);
        info!(guild_id = %guild_id, key = %key, number = removed.ticket_number, "ticket closed");
        Some(removed)
    }

    async fn check_thread(&self, guild_id: &str, thread_id: &str) -> bool {
        let Some(checker) = &self.threads else {
            return true;
        };
        match checker.thread_exists(guild_id, thread_id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(guild_id = %guild_id, thread_id = %thread_id, error = %e, "thread check failed -- assuming it exists");
                true
            }
        }
    }

    async fn replace_presence_config(
        &self,
        guild_id: &str,
        tracking: PresenceTrackingConfig,
    ) -> Result<(), TicketdeskError> {
        let enabled = tracking.enabled;
        let (previous, cleared) = self.with_guild(guild_id, |g| {
            let previous = g.config.presence_tracking.replace(tracking);
            let cleared = if enabled {
                Default::default()
            } else {
                std::mem::take(&mut g.presence)
            };
            (previous, cleared)
        });

        self.save_or_rollback(guild_id, |g| {
            g.config.presence_tracking = previous;
            for (user_id, presence) in cleared {
                g.presence.entry(user_id).or_insert(presence);
            }
        })
        .await?;
        info!(guild_id = %guild_id, enabled, "presence tracking updated");
        Ok(())
    }

    /// Save the staff document now; on failure apply `rollback` to the guild
    /// and return the error.
    async fn save_or_rollback(
        &self,
        guild_id: &str,
        rollback: impl FnOnce(&mut GuildState),
    ) -> Result<(), TicketdeskError> {
        if let Err(e) = self.persister.save(DocumentKind::Staff).await {
            warn!(guild_id = %guild_id, error = %e, "save failed -- rolling back");
            self.with_guild(guild_id, rollback);
            return Err(e);
        }
        Ok(())
    }
}
