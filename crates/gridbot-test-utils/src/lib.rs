// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Gridbot integration tests.
//!
//! Provides mock adapters, workbook fixtures and test harness infrastructure
//! for fast, deterministic tests without a Telegram connection.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock messaging channel with event injection and capture
//! - [`MemoryFavourites`] - In-memory favourites store with failure injection
//! - [`XlsxBuilder`] - Writes small `.xlsx` workbooks
//! - [`XlsBuilder`] - Writes small legacy `.xls` workbooks
//! - [`TestHarness`] - Engine wired to all of the above

pub mod fixtures;
pub mod harness;
pub mod memory_store;
pub mod mock_channel;
pub mod xls;

pub use fixtures::XlsxBuilder;
pub use harness::TestHarness;
pub use memory_store::MemoryFavourites;
pub use mock_channel::{Delivery, MockChannel, events};
pub use xls::XlsBuilder;
