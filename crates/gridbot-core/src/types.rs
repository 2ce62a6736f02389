// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the conversation engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identity of a chat participant. Sole key for state and favourites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the chat a reply is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Unique identifier for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
}

// --- Inbound events ---

/// What the sender did. Exactly one of command, button press or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// A slash command, stored without the leading `/` and lowercased (`start`).
    Command(String),
    /// The opaque payload of a pressed inline button (`menu:files`).
    Button(String),
    /// Free text typed by the user.
    Text(String),
}

/// Where an event came from, so replies can be routed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOrigin {
    pub chat_id: ChatId,
    /// The message carrying the pressed keyboard, for edit-in-place replies.
    pub message_id: Option<MessageId>,
    /// Button press handle that must be acknowledged.
    pub callback_id: Option<String>,
}

/// An inbound event delivered by a messaging channel.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub id: String,
    pub sender: UserId,
    pub payload: EventPayload,
    pub origin: EventOrigin,
    pub timestamp: String,
}

// --- Outbound replies ---

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// An inline keyboard: ordered rows of ordered buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row holding a single button.
    pub fn single(mut self, label: impl Into<String>, payload: impl Into<String>) -> Self {
        self.rows.push(vec![Button::new(label, payload)]);
        self
    }

    /// Returns the payloads of every button, row by row.
    pub fn payloads(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .map(|b| b.payload.as_str())
            .collect()
    }

    /// Returns the last row, if any.
    pub fn last_row(&self) -> Option<&[Button]> {
        self.rows.last().map(Vec::as_slice)
    }
}

/// An action the engine asks the channel to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send a new message.
    Send {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Replace the text (and keyboard) of the message that carried the pressed button.
    Edit {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Acknowledge a button press, optionally with a notice.
    Answer { text: Option<String>, alert: bool },
}

impl Reply {
    pub fn send(text: impl Into<String>, keyboard: Option<Keyboard>) -> Self {
        Reply::Send {
            text: text.into(),
            keyboard,
        }
    }

    pub fn edit(text: impl Into<String>, keyboard: Option<Keyboard>) -> Self {
        Reply::Edit {
            text: text.into(),
            keyboard,
        }
    }

    /// The visible text of this reply, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Send { text, .. } | Reply::Edit { text, .. } => Some(text),
            Reply::Answer { text, .. } => text.as_deref(),
        }
    }

    /// The keyboard attached to this reply, if any.
    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Reply::Send { keyboard, .. } | Reply::Edit { keyboard, .. } => keyboard.as_ref(),
            Reply::Answer { .. } => None,
        }
    }
}

// --- Favourites ---

/// A saved spreadsheet lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favourite {
    pub id: i64,
    pub user_id: UserId,
    pub nickname: String,
    pub file_path: String,
    pub sheet_name: String,
    pub cell: String,
}

/// A favourite that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFavourite {
    pub user_id: UserId,
    pub nickname: String,
    pub file_path: String,
    pub sheet_name: String,
    pub cell: String,
}
