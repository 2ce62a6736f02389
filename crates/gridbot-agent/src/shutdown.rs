// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the dispatcher monitors. User lanes are drained
//! before the process exits.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "cannot install SIGTERM handler, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for every lane task to finish its queued events.
///
/// Returns the number of lanes that were still running when time ran out;
/// those are aborted.
pub async fn drain_lanes(lanes: Vec<JoinHandle<()>>, timeout: Duration) -> usize {
    if lanes.is_empty() {
        info!("no active lanes to drain");
        return 0;
    }
    info!(count = lanes.len(), "waiting for user lanes to finish");

    let deadline = tokio::time::Instant::now() + timeout;
    let mut interrupted = 0;
    for mut lane in lanes {
        if tokio::time::timeout_at(deadline, &mut lane).await.is_err() {
            lane.abort();
            interrupted += 1;
        }
    }

    if interrupted == 0 {
        info!("all lanes drained");
    } else {
        warn!(remaining = interrupted, "drain timeout reached, lanes interrupted");
    }
    interrupted
}
