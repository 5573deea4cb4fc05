// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage and store layers.
//!
//! Field names serialize in camelCase so that documents written by earlier
//! releases of the bot stay readable.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One open support request.
///
/// Tickets are immutable values: every mutation builds a new `Ticket` with the
/// `with_*` helpers and the store re-inserts it under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub guild_id: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub ticket_number: u64,
    #[serde(default)]
    pub channel_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub escalation_level: EscalationLevel,
    #[serde(default)]
    pub whitelisted_users: Vec<String>,
}

impl Ticket {
    /// Whether this ticket lives in a thread rather than its own channel.
    pub fn is_thread(&self) -> bool {
        self.thread_id.is_some()
    }

    /// The key this ticket is stored under: the thread id when present,
    /// otherwise the channel id.
    pub fn storage_key(&self) -> &str {
        self.thread_id.as_deref().unwrap_or(&self.channel_id)
    }

    pub fn with_claimed_by(&self, claimed_by: Option<String>) -> Self {
        Self {
            claimed_by,
            ..self.clone()
        }
    }

    pub fn with_locked(&self, is_locked: bool) -> Self {
        Self {
            is_locked,
            ..self.clone()
        }
    }

    pub fn with_notes(&self, notes: Option<String>) -> Self {
        Self {
            notes,
            ..self.clone()
        }
    }

    pub fn with_escalation(&self, escalation_level: EscalationLevel) -> Self {
        Self {
            escalation_level,
            ..self.clone()
        }
    }

    pub fn with_whitelist(&self, whitelisted_users: Vec<String>) -> Self {
        Self {
            whitelisted_users,
            ..self.clone()
        }
    }
}

/// Four-step escalation ladder. Stored on disk as the integer level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum EscalationLevel {
    #[default]
    Normal,
    Elevated,
    High,
    Critical,
}

impl EscalationLevel {
    /// The highest level a ticket can reach.
    pub const MAX: EscalationLevel = EscalationLevel::Critical;

    /// The next level up, or `None` at the ceiling.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Normal => Some(Self::Elevated),
            Self::Elevated => Some(Self::High),
            Self::High => Some(Self::Critical),
            Self::Critical => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Elevated => "Elevated",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl TryFrom<u8> for EscalationLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Elevated),
            2 => Ok(Self::High),
            3 => Ok(Self::Critical),
            other => Err(format!("escalation level {other} is out of range 0..=3")),
        }
    }
}

impl From<EscalationLevel> for u8 {
    fn from(level: EscalationLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.as_u8())
    }
}

/// Staff availability as reported by the Discord gateway.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

impl PresenceStatus {
    /// Whether a staff member in this state can pick up a new ticket.
    pub fn is_available(self) -> bool {
        matches!(self, Self::Online | Self::Idle)
    }
}

/// Last known presence for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPresence {
    pub user_id: String,
    pub status: PresenceStatus,
    /// Last moment the member was seen online. Frozen while they stay offline.
    pub last_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of applying a presence update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceTransition {
    /// The member had no recorded presence or was offline before this update.
    pub was_offline: bool,
    /// The member is available after this update.
    pub is_now_available: bool,
}

impl PresenceTransition {
    /// A member came back from offline; queued notifications can be replayed.
    pub fn came_online(&self) -> bool {
        self.was_offline && self.is_now_available
    }
}

/// Relative urgency of a queued notification.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A ticket announcement held back while no staff member was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTicketNotification {
    pub ticket_id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: NotificationPriority,
}

/// Per-guild bot configuration, persisted unencrypted next to the staff envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_tracking: Option<PresenceTrackingConfig>,
}

impl GuildConfig {
    /// Whether presence tracking is switched on for this guild.
    pub fn presence_enabled(&self) -> bool {
        self.presence_tracking.as_ref().is_some_and(|p| p.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceTrackingConfig {
    pub enabled: bool,
    #[serde(default)]
    pub smart_ping: SmartPingConfig,
    #[serde(default = "default_true")]
    pub show_in_embeds: bool,
}

impl Default for PresenceTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smart_ping: SmartPingConfig::default(),
            show_in_embeds: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartPingConfig {
    pub enabled: bool,
    /// Minutes a member may sit idle before they stop receiving pings.
    #[serde(default = "default_idle_delay_minutes")]
    pub idle_delay_minutes: u32,
    /// Do-not-disturb members are only mentioned, never pinged directly.
    #[serde(default)]
    pub dnd_mention_only: bool,
    /// Hold new-ticket notifications while no staff member is available.
    #[serde(default)]
    pub offline_queueing: bool,
}

impl Default for SmartPingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_delay_minutes: default_idle_delay_minutes(),
            dnd_mention_only: true,
            offline_queueing: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_idle_delay_minutes() -> u32 {
    5
}
