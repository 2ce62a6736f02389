// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the messaging transport (Telegram).

use async_trait::async_trait;

use crate::error::GridbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, InboundEvent, Keyboard, MessageId};

/// Adapter for a bidirectional chat transport.
///
/// The channel delivers inbound events one at a time and carries the
/// engine's replies back: new messages, in-place edits of a keyboard
/// message, and button acknowledgements.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), GridbotError>;

    /// Receives the next inbound event.
    async fn receive(&self) -> Result<InboundEvent, GridbotError>;

    /// Sends a new message with an optional inline keyboard.
    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, GridbotError>;

    /// Replaces the text and keyboard of an existing message.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: &MessageId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GridbotError>;

    /// Acknowledges a button press, optionally showing a notice or alert.
    async fn answer_button(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), GridbotError>;
}
