// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for Gridbot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for messages and button presses, inline keyboards, and
//! edit-in-place replies. Texts are sent as plain text.

pub mod handler;

use async_trait::async_trait;
use gridbot_config::model::TelegramConfig;
use gridbot_core::{
    AdapterType, ChannelAdapter, ChatId, GridbotError, HealthStatus, InboundEvent, Keyboard,
    MessageId, PluginAdapter,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const INBOUND_CAPACITY: usize = 100;

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Private-chat messages and all button presses are forwarded to
/// [`receive`](ChannelAdapter::receive); everything else is ignored.
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, GridbotError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            GridbotError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.trim().is_empty() {
            return Err(GridbotError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Ok(Self {
            bot: Bot::new(token.trim()),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl Drop for TelegramChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.polling_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, GridbotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), GridbotError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), GridbotError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = message_tx.clone();
                    async move {
                        if !handler::is_dm(&msg) {
                            debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                            return respond(());
                        }
                        match handler::message_event(&msg) {
                            Some(event) => forward(&tx, event).await,
                            None => debug!(msg_id = msg.id.0, "ignoring unsupported message type"),
                        }
                        respond(())
                    }
                }))
                .branch(Update::filter_callback_query().endpoint(
                    move |query: CallbackQuery| {
                        let tx = callback_tx.clone();
                        async move {
                            match handler::callback_event(&query) {
                                Some(event) => forward(&tx, event).await,
                                None => debug!("ignoring button press without data or chat"),
                            }
                            respond(())
                        }
                    },
                ));

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, GridbotError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| GridbotError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, GridbotError> {
        let mut request = self.bot.send_message(TgChatId(chat_id.0), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(markup(keyboard));
        }
        let sent = request.await.map_err(|e| GridbotError::Channel {
            message: format!("failed to send message: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: &MessageId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GridbotError> {
        let msg_id = parse_message_id(message_id)?;

        let mut request = self
            .bot
            .edit_message_text(TgChatId(chat_id.0), msg_id, text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(markup(keyboard));
        }

        match request.await {
            Ok(_) => Ok(()),
            // Pressing the same button twice re-renders identical content.
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(GridbotError::Channel {
                message: format!("failed to edit message: {e}"),
                source: Some(Box::new(e)),
            }),
        }
    }

    async fn answer_button(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), GridbotError> {
        let mut request = self.bot.answer_callback_query(teloxide::types::CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text).show_alert(alert);
        }
        request.await.map_err(|e| GridbotError::Channel {
            message: format!("failed to answer button press: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(())
    }
}

async fn forward(tx: &mpsc::Sender<InboundEvent>, event: InboundEvent) {
    if tx.send(event).await.is_err() {
        warn!("inbound channel closed, dropping event");
    }
}

/// Converts a keyboard into Telegram inline markup, one callback button per
/// entry.
pub fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

fn parse_message_id(id: &MessageId) -> Result<teloxide::types::MessageId, GridbotError> {
    id.0.parse::<i32>()
        .map(teloxide::types::MessageId)
        .map_err(|e| GridbotError::Channel {
            message: format!("invalid message_id {:?}: {e}", id.0),
            source: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            allowed_users: vec![],
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(&config(None)).is_err());
    }

    #[test]
    fn new_rejects_blank_token() {
        assert!(TelegramChannel::new(&config(Some(""))).is_err());
        assert!(TelegramChannel::new(&config(Some("   "))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let channel = TelegramChannel::new(&config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11")));
        assert!(channel.is_ok());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let channel = TelegramChannel::new(&config(Some("test:token"))).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[test]
    fn markup_keeps_rows_and_payloads() {
        let keyboard = Keyboard::new()
            .single("📂 Browse files", "menu:files")
            .single("❌ Exit", "exit");
        let markup = markup(&keyboard);

        assert_eq!(markup.inline_keyboard.len(), 2);
        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "📂 Browse files");
        assert_eq!(
            first.kind,
            InlineKeyboardButtonKind::CallbackData("menu:files".into())
        );
    }

    #[test]
    fn message_ids_must_be_numeric() {
        assert_eq!(
            parse_message_id(&MessageId("42".into())).unwrap(),
            teloxide::types::MessageId(42)
        );
        assert!(parse_message_id(&MessageId("mock-msg-1".into())).is_err());
    }
}
