// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes inbound events to per-user lanes.
//!
//! Each authorized user gets a lane: an unbounded queue drained by one task,
//! so that user's events are handled strictly in arrival order while other
//! users run concurrently. A semaphore caps in-flight handlers across all
//! lanes. Every event is handled in its own task; an error or panic produces
//! a generic failure reply for that user only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gridbot_core::{ChannelAdapter, ChatId, EventOrigin, GridbotError, InboundEvent, Reply, UserId};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::ConversationEngine;
use crate::messages;
use crate::shutdown;

/// How long shutdown waits for queued events to finish.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(500);

struct Shared {
    channel: Arc<dyn ChannelAdapter>,
    engine: Arc<ConversationEngine>,
    permits: Arc<Semaphore>,
}

struct Lane {
    tx: mpsc::UnboundedSender<InboundEvent>,
    task: JoinHandle<()>,
}

/// Pulls events off a channel and feeds them to the engine.
pub struct Dispatcher {
    shared: Arc<Shared>,
    lanes: HashMap<UserId, Lane>,
    drain_timeout: Duration,
}

impl Dispatcher {
    /// `max_concurrent_events` is clamped to at least one.
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        engine: Arc<ConversationEngine>,
        max_concurrent_events: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                channel,
                engine,
                permits: Arc::new(Semaphore::new(max_concurrent_events.max(1))),
            }),
            lanes: HashMap::new(),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Number of user lanes currently open.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Runs until `cancel` fires or the channel closes, then drains lanes and
    /// closes the favourites store.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), GridbotError> {
        info!("dispatcher running");

        loop {
            tokio::select! {
                received = self.shared.channel.receive() => {
                    match received {
                        Ok(event) => self.route(event),
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                            tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping dispatcher");
                    break;
                }
            }
        }

        // Dropping the senders lets each lane finish its queue and exit.
        let tasks = self
            .lanes
            .drain()
            .map(|(_, lane)| lane.task)
            .collect::<Vec<_>>();
        shutdown::drain_lanes(tasks, self.drain_timeout).await;

        self.shared.engine.favourites().close().await?;
        info!("dispatcher stopped");
        Ok(())
    }

    fn route(&mut self, event: InboundEvent) {
        let user = event.sender;

        // Rejections touch no state; they need no lane.
        if !self.shared.engine.is_authorized(user) {
            let shared = self.shared.clone();
            tokio::spawn(async move { handle_event(&shared, event).await });
            return;
        }

        let shared = &self.shared;
        let lane = self
            .lanes
            .entry(user)
            .or_insert_with(|| spawn_lane(user, shared.clone()));

        if let Err(mpsc::error::SendError(event)) = lane.tx.send(event) {
            warn!(user_id = %user, "lane stopped unexpectedly, restarting it");
            let fresh = spawn_lane(user, self.shared.clone());
            // A brand-new receiver cannot be closed.
            let _ = fresh.tx.send(event);
            self.lanes.insert(user, fresh);
        }
    }
}

fn spawn_lane(user: UserId, shared: Arc<Shared>) -> Lane {
    let (tx, mut rx) = mpsc::unbounded_channel::<InboundEvent>();
    debug!(user_id = %user, "opening lane");

    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(permit) = shared.permits.clone().acquire_owned().await else {
                break;
            };
            let chat_id = event.origin.chat_id;
            let callback_id = event.origin.callback_id.clone();

            let task_shared = shared.clone();
            let handled = tokio::spawn(async move {
                let _permit = permit;
                handle_event(&task_shared, event).await;
            })
            .await;

            if let Err(e) = handled {
                error!(user_id = %user, error = %e, "event handler panicked");
                deliver_failure(shared.channel.as_ref(), chat_id, callback_id.as_deref()).await;
            }
        }
        debug!(user_id = %user, "lane closed");
    });

    Lane { tx, task }
}

async fn handle_event(shared: &Shared, event: InboundEvent) {
    match shared.engine.handle(&event).await {
        Ok(replies) => deliver(shared.channel.as_ref(), &event.origin, replies).await,
        Err(e) => {
            error!(
                user_id = %event.sender,
                event_id = event.id.as_str(),
                error = %e,
                "failed to handle event"
            );
            deliver_failure(
                shared.channel.as_ref(),
                event.origin.chat_id,
                event.origin.callback_id.as_deref(),
            )
            .await;
        }
    }
}

/// Delivers replies in order. An `Edit` without a message to edit, or whose
/// edit fails, is sent as a new message. Delivery failures are logged and
/// do not stop later replies.
pub async fn deliver(channel: &dyn ChannelAdapter, origin: &EventOrigin, replies: Vec<Reply>) {
    for reply in replies {
        let result = match reply {
            Reply::Send { text, keyboard } => channel
                .send(origin.chat_id, &text, keyboard.as_ref())
                .await
                .map(|_| ()),
            Reply::Edit { text, keyboard } => {
                let edited = match &origin.message_id {
                    Some(message_id) => channel
                        .edit_message(origin.chat_id, message_id, &text, keyboard.as_ref())
                        .await
                        .map_err(|e| debug!(error = %e, "edit failed, sending a new message"))
                        .is_ok(),
                    None => false,
                };
                if edited {
                    Ok(())
                } else {
                    channel
                        .send(origin.chat_id, &text, keyboard.as_ref())
                        .await
                        .map(|_| ())
                }
            }
            Reply::Answer { text, alert } => match &origin.callback_id {
                Some(callback_id) => {
                    channel
                        .answer_button(callback_id, text.as_deref(), alert)
                        .await
                }
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            warn!(chat_id = origin.chat_id.0, error = %e, "failed to deliver reply");
        }
    }
}

async fn deliver_failure(channel: &dyn ChannelAdapter, chat_id: ChatId, callback_id: Option<&str>) {
    if let Some(callback_id) = callback_id
        && let Err(e) = channel.answer_button(callback_id, None, false).await
    {
        debug!(error = %e, "failed to acknowledge button after failure");
    }
    if let Err(e) = channel.send(chat_id, messages::FAILURE, None).await {
        warn!(chat_id = chat_id.0, error = %e, "failed to deliver failure notice");
    }
}
