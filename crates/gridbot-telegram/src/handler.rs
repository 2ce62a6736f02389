// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into channel-agnostic [`InboundEvent`]s.
//!
//! Authorization is not decided here: every sender reaches the engine, which
//! owns the rejection reply.

use gridbot_core::{ChatId, EventOrigin, EventPayload, InboundEvent, MessageId, UserId};
use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Splits a slash command into its lowercase name.
///
/// `/Start@GridBot now` yields `start`. Returns `None` when `text` is not a
/// command.
pub fn parse_command(text: &str) -> Option<String> {
    let token = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    let name = token.split('@').next().unwrap_or(token);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

fn sender(user: Option<&teloxide::types::User>) -> Option<UserId> {
    let user = user?;
    i64::try_from(user.id.0).ok().map(UserId)
}

/// Converts a text message into an event.
///
/// Returns `None` for messages without a sender or without text (stickers,
/// photos, etc.).
pub fn message_event(msg: &Message) -> Option<InboundEvent> {
    let sender = sender(msg.from.as_ref())?;
    let text = msg.text()?;

    let payload = match parse_command(text) {
        Some(name) => EventPayload::Command(name),
        None => EventPayload::Text(text.to_string()),
    };

    Some(InboundEvent {
        id: format!("{}:{}", msg.chat.id.0, msg.id.0),
        sender,
        payload,
        origin: EventOrigin {
            chat_id: ChatId(msg.chat.id.0),
            message_id: None,
            callback_id: None,
        },
        timestamp: msg.date.to_rfc3339(),
    })
}

/// Converts an inline button press into an event.
///
/// The origin carries the message holding the keyboard so the reply can edit
/// it in place. Presses without data or without a reachable chat are dropped.
pub fn callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let sender = sender(Some(&query.from))?;
    let data = query.data.as_ref()?;
    let message = query.message.as_ref()?;
    let callback_id = query.id.to_string();

    Some(InboundEvent {
        id: callback_id.clone(),
        sender,
        payload: EventPayload::Button(data.clone()),
        origin: EventOrigin {
            chat_id: ChatId(message.chat().id.0),
            message_id: Some(MessageId(message.id().0.to_string())),
            callback_id: Some(callback_id),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "is_bot": false,
            "first_name": "Test",
        })
    }

    fn make_private_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": user(user_id),
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": user(user_id),
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    fn make_callback(user_id: u64, data: Option<&str>) -> CallbackQuery {
        let mut json = serde_json::json!({
            "id": "4382bfdwdsb323b2d9",
            "from": user(user_id),
            "chat_instance": "-8812",
            "message": {
                "message_id": 42,
                "date": 1700000000i64,
                "chat": {
                    "id": user_id as i64,
                    "type": "private",
                    "first_name": "Test",
                },
                "from": {
                    "id": 555u64,
                    "is_bot": true,
                    "first_name": "Gridbot",
                },
                "text": "Choose an option:",
            },
        });
        if let Some(data) = data {
            json["data"] = data.into();
        }
        serde_json::from_value(json).expect("failed to deserialize mock callback")
    }

    #[test]
    fn commands_are_lowercased_without_slash_or_mention() {
        assert_eq!(parse_command("/start").as_deref(), Some("start"));
        assert_eq!(parse_command("/Start@GridBot").as_deref(), Some("start"));
        assert_eq!(parse_command("  /EXIT now").as_deref(), Some("exit"));
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/@bot"), None);
        assert_eq!(parse_command("C3"), None);
    }

    #[test]
    fn text_message_becomes_text_event() {
        let event = message_event(&make_private_message(12345, "c3")).unwrap();
        assert_eq!(event.sender, UserId(12345));
        assert_eq!(event.payload, EventPayload::Text("c3".into()));
        assert_eq!(event.origin.chat_id, ChatId(12345));
        assert!(event.origin.message_id.is_none());
        assert!(event.origin.callback_id.is_none());
        assert_eq!(event.id, "12345:1");
    }

    #[test]
    fn slash_message_becomes_command_event() {
        let event = message_event(&make_private_message(12345, "/start")).unwrap();
        assert_eq!(event.payload, EventPayload::Command("start".into()));
    }

    #[test]
    fn callback_carries_message_and_callback_ids() {
        let event = callback_event(&make_callback(12345, Some("file:2"))).unwrap();
        assert_eq!(event.sender, UserId(12345));
        assert_eq!(event.payload, EventPayload::Button("file:2".into()));
        assert_eq!(event.origin.chat_id, ChatId(12345));
        assert_eq!(event.origin.message_id, Some(MessageId("42".into())));
        assert_eq!(
            event.origin.callback_id.as_deref(),
            Some("4382bfdwdsb323b2d9")
        );
    }

    #[test]
    fn callback_without_data_is_dropped() {
        assert!(callback_event(&make_callback(12345, None)).is_none());
    }

    #[test]
    fn is_dm_private_chat() {
        assert!(is_dm(&make_private_message(12345, "hello")));
    }

    #[test]
    fn is_dm_group_chat() {
        assert!(!is_dm(&make_group_message(12345, "hello")));
    }
}
