// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk document shapes.
//!
//! The staff/config file looks like
//! `{"guilds": {"<guildId>": {"encryptedStaff": {..}, "config": {..}}}}` and
//! the tickets file like
//! `{"guilds": {"<guildId>": {"encryptedTickets": {..}, "ticketCounter": 7}}}`.
//! The decrypted payloads are [`StaffPayload`] and [`TicketsPayload`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ticketdesk_core::{GuildConfig, QueuedTicketNotification, StaffPresence, Ticket};
use ticketdesk_vault::Envelope;

/// Which of the two documents a write concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Staff,
    Tickets,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staff => f.write_str("staff"),
            Self::Tickets => f.write_str("tickets"),
        }
    }
}

/// The staff/config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffDocument {
    #[serde(default)]
    pub guilds: BTreeMap<String, StaffRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRecord {
    pub encrypted_staff: Envelope,
    /// Absent in files written before per-guild config existed.
    #[serde(default)]
    pub config: Option<GuildConfig>,
}

/// The tickets file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketsDocument {
    #[serde(default)]
    pub guilds: BTreeMap<String, TicketRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub encrypted_tickets: Envelope,
    #[serde(default)]
    pub ticket_counter: u64,
}

/// A document as read from disk.
///
/// Guild records are decoded one at a time, so a record with a missing or
/// mistyped field only costs that guild.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument<R> {
    pub guilds: BTreeMap<String, R>,
    /// Records that are valid JSON but not a valid record, with the decode
    /// error.
    pub malformed: BTreeMap<String, String>,
}

impl<R> Default for LoadedDocument<R> {
    fn default() -> Self {
        Self {
            guilds: BTreeMap::new(),
            malformed: BTreeMap::new(),
        }
    }
}

/// Outer layer of either document, records left undecoded.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    guilds: BTreeMap<String, serde_json::Value>,
}

impl RawDocument {
    pub(crate) fn decode<R: DeserializeOwned>(self) -> LoadedDocument<R> {
        let mut doc = LoadedDocument::default();
        for (guild_id, value) in self.guilds {
            match serde_json::from_value::<R>(value) {
                Ok(record) => {
                    doc.guilds.insert(guild_id, record);
                }
                Err(e) => {
                    doc.malformed.insert(guild_id, e.to_string());
                }
            }
        }
        doc
    }
}

/// Decrypted contents of `encryptedStaff`.
///
/// Older files stored only the array of staff ids; that shape still decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StaffPayloadRepr")]
pub struct StaffPayload {
    pub staff: Vec<String>,
    pub presence: BTreeMap<String, StaffPresence>,
    pub offline_queue: Vec<QueuedTicketNotification>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StaffPayloadRepr {
    Full {
        staff: Vec<String>,
        #[serde(default)]
        presence: BTreeMap<String, StaffPresence>,
        #[serde(default, rename = "offlineQueue")]
        offline_queue: Vec<QueuedTicketNotification>,
    },
    Ids(Vec<String>),
}

impl From<StaffPayloadRepr> for StaffPayload {
    fn from(repr: StaffPayloadRepr) -> Self {
        match repr {
            StaffPayloadRepr::Full {
                staff,
                presence,
                offline_queue,
            } => Self {
                staff,
                presence,
                offline_queue,
            },
            StaffPayloadRepr::Ids(staff) => Self {
                staff,
                ..Self::default()
            },
        }
    }
}

/// Decrypted contents of `encryptedTickets`: storage key to ticket.
pub type TicketsPayload = BTreeMap<String, Ticket>;
