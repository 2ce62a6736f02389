// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine and event dispatch for Gridbot.
//!
//! The [`Dispatcher`] is the central coordinator that:
//! - Receives events from a channel adapter
//! - Routes them to per-user lanes
//! - Runs the [`ConversationEngine`] state machine for each event
//! - Delivers replies back through the channel
//! - Handles graceful shutdown

pub mod dispatcher;
pub mod engine;
pub mod keyboards;
pub mod messages;
pub mod shutdown;
pub mod state;

pub use dispatcher::{DRAIN_TIMEOUT, Dispatcher, deliver};
pub use engine::ConversationEngine;
pub use keyboards::ButtonAction;
pub use state::{ConversationState, StateStore};
