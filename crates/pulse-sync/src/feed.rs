//! Background tasks that keep the client state current.
//!
//! The change listener turns source notifications into refreshes. Writes
//! tend to arrive in bursts (a message plus its reply, a conversation plus
//! its participant rows), so after the first notification the listener waits
//! out the debounce window, drains whatever else arrived and refreshes once.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::SyncEngine;
use crate::source::ChangeEvent;

impl SyncEngine {
    /// Refresh on every burst of change notifications. Runs until the feed
    /// closes or the task is aborted.
    pub fn spawn_change_listener(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let mut rx = self.context().source.subscribe();
        let window = self.config().debounce;

        tokio::spawn(async move {
            info!(debounce_ms = window.as_millis() as u64, "Change listener started");
            loop {
                match rx.recv().await {
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Change listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }

                let (coalesced, closed) = drain_burst(&mut rx, window).await;
                debug!(coalesced, "Refreshing after change notifications");
                if let Err(e) = engine.refresh().await {
                    warn!(error = %e, "Refresh after change notification failed");
                }
                if closed {
                    break;
                }
            }
            info!("Change feed closed, listener stopped");
        })
    }

    /// Refresh every `every`, on top of whatever the change feed triggers.
    pub fn spawn_poller(&self, every: Duration) -> JoinHandle<()> {
        let engine = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;

            info!(every_secs = every.as_secs(), "Poller started");
            loop {
                interval.tick().await;
                if let Err(e) = engine.refresh().await {
                    warn!(error = %e, "Periodic refresh failed");
                }
            }
        })
    }
}

/// Swallow notifications until `window` has passed since the call. Returns
/// how many were swallowed and whether the feed closed meanwhile.
async fn drain_burst(rx: &mut broadcast::Receiver<ChangeEvent>, window: Duration) -> (usize, bool) {
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);
    let mut coalesced = 0;

    loop {
        tokio::select! {
            _ = &mut deadline => return (coalesced, false),
            event = rx.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => coalesced += 1,
                Err(RecvError::Closed) => return (coalesced, true),
            },
        }
    }
}
