// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! Events injected with [`MockChannel::inject`] come out of `receive()`; every
//! send, edit and button acknowledgement is recorded as a [`Delivery`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use gridbot_core::{
    AdapterType, ChannelAdapter, ChatId, EventOrigin, EventPayload, GridbotError, HealthStatus,
    InboundEvent, Keyboard, MessageId, PluginAdapter, UserId,
};

/// Something the bot did through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edited {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Answered {
        callback_id: String,
        text: Option<String>,
        alert: bool,
    },
}

impl Delivery {
    /// Visible text of a sent or edited message, or the answer notice.
    pub fn text(&self) -> Option<&str> {
        match self {
            Delivery::Sent { text, .. } | Delivery::Edited { text, .. } => Some(text),
            Delivery::Answered { text, .. } => text.as_deref(),
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Delivery::Sent { keyboard, .. } | Delivery::Edited { keyboard, .. } => {
                keyboard.as_ref()
            }
            Delivery::Answered { .. } => None,
        }
    }
}

/// A scripted messaging channel.
#[derive(Clone, Default)]
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    inbound_ready: Arc<Notify>,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    delivered: Arc<Notify>,
    next_message: Arc<AtomicU64>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event for `receive()`.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.inbound_ready.notify_one();
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }

    /// Waits until at least `count` deliveries were recorded, then returns them all.
    ///
    /// Panics after `timeout`; this type only exists for tests.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Delivery> {
        let waiting = async {
            loop {
                let notified = self.delivered.notified();
                {
                    let deliveries = self.deliveries.lock().await;
                    if deliveries.len() >= count {
                        return deliveries.clone();
                    }
                }
                notified.await;
            }
        };
        match tokio::time::timeout(timeout, waiting).await {
            Ok(deliveries) => deliveries,
            Err(_) => panic!(
                "expected {count} deliveries, got {:?}",
                self.deliveries.lock().await
            ),
        }
    }

    async fn record(&self, delivery: Delivery) {
        self.deliveries.lock().await.push(delivery);
        self.delivered.notify_waiters();
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, GridbotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridbotError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), GridbotError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, GridbotError> {
        loop {
            let notified = self.inbound_ready.notified();
            if let Some(event) = self.inbound.lock().await.pop_front() {
                return Ok(event);
            }
            notified.await;
        }
    }

    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, GridbotError> {
        let id = MessageId(format!(
            "mock-msg-{}",
            self.next_message.fetch_add(1, Ordering::SeqCst) + 1
        ));
        self.record(Delivery::Sent {
            chat_id,
            message_id: id.clone(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        })
        .await;
        Ok(id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: &MessageId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), GridbotError> {
        self.record(Delivery::Edited {
            chat_id,
            message_id: message_id.clone(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        })
        .await;
        Ok(())
    }

    async fn answer_button(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), GridbotError> {
        self.record(Delivery::Answered {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
            alert,
        })
        .await;
        Ok(())
    }
}

/// Builders for inbound events. Chat id equals the user id, as in a private chat.
pub mod events {
    use super::*;

    fn event(user: i64, payload: EventPayload, message_id: Option<&str>, callback: bool) -> InboundEvent {
        let id = uuid::Uuid::new_v4().to_string();
        InboundEvent {
            origin: EventOrigin {
                chat_id: ChatId(user),
                message_id: message_id.map(|m| MessageId(m.to_string())),
                callback_id: callback.then(|| format!("cb-{id}")),
            },
            id,
            sender: UserId(user),
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// `/name` typed by `user`.
    pub fn command(user: i64, name: &str) -> InboundEvent {
        event(user, EventPayload::Command(name.to_string()), None, false)
    }

    pub fn text(user: i64, text: &str) -> InboundEvent {
        event(user, EventPayload::Text(text.to_string()), None, false)
    }

    /// A press on a button carried by message `mock-msg-1`.
    pub fn button(user: i64, payload: &str) -> InboundEvent {
        event(
            user,
            EventPayload::Button(payload.to_string()),
            Some("mock-msg-1"),
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_returns_injected_events_in_order() {
        let channel = MockChannel::new();
        channel.inject(events::command(1, "start")).await;
        channel.inject(events::text(1, "C3")).await;

        assert_eq!(
            channel.receive().await.unwrap().payload,
            EventPayload::Command("start".into())
        );
        assert_eq!(
            channel.receive().await.unwrap().payload,
            EventPayload::Text("C3".into())
        );
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = MockChannel::new();
        let injector = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            injector.inject(events::text(9, "late")).await;
        });

        let event = tokio::time::timeout(Duration::from_secs(2), channel.receive())
            .await
            .expect("receive timed out")
            .unwrap();
        assert_eq!(event.sender, UserId(9));
    }

    #[tokio::test]
    async fn deliveries_are_recorded() {
        let channel = MockChannel::new();
        let kb = Keyboard::new().single("❌ Exit", "exit");
        let id = channel.send(ChatId(1), "hello", Some(&kb)).await.unwrap();
        assert_eq!(id, MessageId("mock-msg-1".into()));
        channel.edit_message(ChatId(1), &id, "edited", None).await.unwrap();
        channel.answer_button("cb-1", Some("Not authorized"), true).await.unwrap();

        let all = channel.wait_for(3, Duration::from_secs(1)).await;
        assert_eq!(all[0].keyboard(), Some(&kb));
        assert_eq!(all[1].text(), Some("edited"));
        assert!(matches!(&all[2], Delivery::Answered { alert: true, .. }));

        channel.clear().await;
        assert!(channel.deliveries().await.is_empty());
    }

    #[test]
    fn button_events_carry_callback_and_message() {
        let ev = events::button(5, "file:0");
        assert!(ev.origin.callback_id.is_some());
        assert_eq!(ev.origin.message_id, Some(MessageId("mock-msg-1".into())));
        assert_eq!(ev.origin.chat_id, ChatId(5));
    }
}
