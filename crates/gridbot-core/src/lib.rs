// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Gridbot.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by the spreadsheet resolver, the conversation engine, and the
//! channel and storage adapters.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::GridbotError;
pub use types::{
    AdapterType, Button, ChatId, EventOrigin, EventPayload, Favourite, HealthStatus, InboundEvent,
    Keyboard, MessageId, NewFavourite, Reply, UserId,
};

pub use traits::{ChannelAdapter, FavouritesStore, PluginAdapter};
