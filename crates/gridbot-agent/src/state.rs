// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation state.
//!
//! Each user has their own `tokio::sync::Mutex`, so a transition can hold the
//! lock across awaits (listing files, reading cells, writing favourites)
//! without blocking anybody else. State lives for the process lifetime only.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use gridbot_core::UserId;
use gridbot_sheets::CellRef;
use strum::IntoStaticStr;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Where a user is in the navigation flow. A user with no record has no state.
///
/// Each variant carries exactly the data its step needs.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConversationState {
    MainMenu,
    ChoosingFile {
        files: Vec<PathBuf>,
    },
    ChoosingSheet {
        file: PathBuf,
        sheets: Vec<String>,
    },
    ChoosingCell {
        file: PathBuf,
        sheet: String,
    },
    AskingNickname {
        file: PathBuf,
        sheet: String,
        cell: CellRef,
    },
    ChoosingFavourite,
}

impl ConversationState {
    /// Short step name for logs.
    pub fn step(&self) -> &'static str {
        self.into()
    }
}

/// Step name of an optional state, `none` when absent.
pub fn step_name(state: Option<&ConversationState>) -> &'static str {
    state.map_or("none", ConversationState::step)
}

type Slot = Arc<Mutex<Option<ConversationState>>>;

/// Keyed store of conversation states.
#[derive(Debug, Default)]
pub struct StateStore {
    slots: DashMap<UserId, Slot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user: UserId) -> Slot {
        // The shard guard is released before anyone awaits the mutex.
        self.slots.entry(user).or_default().value().clone()
    }

    /// Locks the user's state for a read-modify-write transition.
    ///
    /// Holders for different users never contend.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<Option<ConversationState>> {
        self.slot(user).lock_owned().await
    }

    /// A snapshot of the user's state.
    pub async fn get(&self, user: UserId) -> Option<ConversationState> {
        match self.slots.get(&user).map(|s| s.value().clone()) {
            Some(slot) => slot.lock().await.clone(),
            None => None,
        }
    }

    /// Replaces the user's state.
    pub async fn set(&self, user: UserId, state: ConversationState) {
        *self.lock(user).await = Some(state);
    }

    /// Forgets the user's state.
    ///
    /// The slot itself is kept so that a concurrent holder and the next
    /// locker share one mutex.
    pub async fn clear(&self, user: UserId) {
        *self.lock(user).await = None;
    }

    /// Number of users that currently have a state.
    pub async fn active_users(&self) -> usize {
        let slots: Vec<Slot> = self.slots.iter().map(|e| e.value().clone()).collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unknown_user_has_no_state() {
        let store = StateStore::new();
        assert_eq!(store.get(UserId(1)).await, None);
    }

    #[tokio::test]
    async fn set_replaces_and_clear_forgets() {
        let store = StateStore::new();
        store.set(UserId(1), ConversationState::MainMenu).await;
        store
            .set(
                UserId(1),
                ConversationState::ChoosingFile {
                    files: vec![PathBuf::from("a.xlsx")],
                },
            )
            .await;
        assert!(matches!(
            store.get(UserId(1)).await,
            Some(ConversationState::ChoosingFile { .. })
        ));
        assert_eq!(store.active_users().await, 1);

        store.clear(UserId(1)).await;
        assert_eq!(store.get(UserId(1)).await, None);
        assert_eq!(store.active_users().await, 0);
    }

    #[tokio::test]
    async fn users_are_independent() {
        let store = StateStore::new();
        store.set(UserId(1), ConversationState::MainMenu).await;
        store.set(UserId(2), ConversationState::ChoosingFavourite).await;
        store.clear(UserId(1)).await;
        assert_eq!(
            store.get(UserId(2)).await,
            Some(ConversationState::ChoosingFavourite)
        );
    }

    #[tokio::test]
    async fn lock_serializes_same_user_only() {
        let store = Arc::new(StateStore::new());
        let held = store.lock(UserId(1)).await;

        // Another user proceeds while user 1 is locked.
        tokio::time::timeout(Duration::from_millis(200), store.set(UserId(2), ConversationState::MainMenu))
            .await
            .expect("other users must not block");

        // User 1 waits until the guard is dropped.
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.set(UserId(1), ConversationState::MainMenu).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        drop(held);
        waiter.await.unwrap();
        assert_eq!(store.get(UserId(1)).await, Some(ConversationState::MainMenu));
    }

    #[test]
    fn step_names_are_snake_case() {
        assert_eq!(ConversationState::MainMenu.step(), "main_menu");
        assert_eq!(ConversationState::ChoosingFavourite.step(), "choosing_favourite");
        assert_eq!(step_name(None), "none");
    }
}
