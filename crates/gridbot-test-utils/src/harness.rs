// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a conversation engine over a temp spreadsheet
//! folder, a favourites store and a [`MockChannel`]. Events can be fed to the
//! engine directly or through a real [`Dispatcher`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gridbot_agent::{ConversationEngine, ConversationState, Dispatcher};
use gridbot_config::model::StorageConfig;
use gridbot_core::{FavouritesStore, GridbotError, InboundEvent, Reply, UserId};
use gridbot_sheets::SheetResolver;
use gridbot_storage::SqliteFavourites;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fixtures::XlsxBuilder;
use crate::memory_store::MemoryFavourites;
use crate::mock_channel::{MockChannel, events};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    users: Vec<UserId>,
    workbooks: Vec<(String, XlsxBuilder)>,
    files: Vec<(String, Vec<u8>)>,
    sqlite: bool,
    eval_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            users: Vec::new(),
            workbooks: Vec::new(),
            files: Vec::new(),
            sqlite: false,
            eval_timeout: Duration::from_secs(5),
        }
    }

    /// Adds a user to the allow-list.
    pub fn with_user(mut self, id: i64) -> Self {
        self.users.push(UserId(id));
        self
    }

    /// Writes a workbook into the spreadsheet folder.
    pub fn with_workbook(mut self, name: &str, workbook: XlsxBuilder) -> Self {
        self.workbooks.push((name.to_string(), workbook));
        self
    }

    /// Writes an arbitrary file into the spreadsheet folder.
    pub fn with_file(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.to_string(), contents.into()));
        self
    }

    /// Uses the SQLite store in the temp directory instead of the in-memory one.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, GridbotError> {
        let temp_dir = tempfile::TempDir::new().map_err(GridbotError::storage)?;
        let folder = temp_dir.path().join("sheets");
        std::fs::create_dir_all(&folder).map_err(GridbotError::storage)?;

        for (name, workbook) in &self.workbooks {
            workbook
                .write_in(&folder, name)
                .map_err(GridbotError::storage)?;
        }
        for (name, contents) in &self.files {
            std::fs::write(folder.join(name), contents).map_err(GridbotError::storage)?;
        }

        let (favourites, memory): (Arc<dyn FavouritesStore>, Option<Arc<MemoryFavourites>>) =
            if self.sqlite {
                let store = SqliteFavourites::new(StorageConfig {
                    database_path: temp_dir
                        .path()
                        .join("favourites.db")
                        .to_string_lossy()
                        .into_owned(),
                    wal_mode: true,
                });
                store.initialize().await?;
                (Arc::new(store) as Arc<dyn FavouritesStore>, None)
            } else {
                let store = Arc::new(MemoryFavourites::new());
                (store.clone() as Arc<dyn FavouritesStore>, Some(store))
            };

        let resolver = SheetResolver::new(&folder, self.eval_timeout);
        let engine = Arc::new(ConversationEngine::new(
            resolver,
            favourites.clone(),
            self.users,
        ));

        Ok(TestHarness {
            engine,
            channel: MockChannel::new(),
            favourites,
            memory,
            folder,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock channel and temp storage.
pub struct TestHarness {
    pub engine: Arc<ConversationEngine>,
    pub channel: MockChannel,
    pub favourites: Arc<dyn FavouritesStore>,
    /// Set when the in-memory store is used, for failure injection.
    pub memory: Option<Arc<MemoryFavourites>>,
    folder: PathBuf,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The spreadsheet folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Runs one event through the engine and returns its replies.
    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<Reply>, GridbotError> {
        self.engine.handle(&event).await
    }

    pub async fn command(&self, user: i64, name: &str) -> Result<Vec<Reply>, GridbotError> {
        self.handle(events::command(user, name)).await
    }

    pub async fn text(&self, user: i64, text: &str) -> Result<Vec<Reply>, GridbotError> {
        self.handle(events::text(user, text)).await
    }

    pub async fn press(&self, user: i64, payload: &str) -> Result<Vec<Reply>, GridbotError> {
        self.handle(events::button(user, payload)).await
    }

    pub async fn state(&self, user: i64) -> Option<ConversationState> {
        self.engine.states().get(UserId(user)).await
    }

    /// A dispatcher reading from this harness's mock channel.
    pub fn dispatcher(&self, max_concurrent_events: usize) -> Dispatcher {
        Dispatcher::new(
            Arc::new(self.channel.clone()),
            self.engine.clone(),
            max_concurrent_events,
        )
        .with_drain_timeout(Duration::from_secs(5))
    }

    /// Runs a dispatcher in the background until the returned token is cancelled.
    pub fn spawn_dispatcher(
        &self,
        max_concurrent_events: usize,
    ) -> (CancellationToken, JoinHandle<Result<(), GridbotError>>) {
        let cancel = CancellationToken::new();
        let mut dispatcher = self.dispatcher(max_concurrent_events);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { dispatcher.run(token).await });
        (cancel, handle)
    }
}
