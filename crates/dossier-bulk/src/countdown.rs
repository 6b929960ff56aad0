//! Countdown task for an open undo window.
//!
//! One tokio task per window ticks the shared [`UndoWindow`] every quantum.
//! The window state decides whether a tick counts; the task only drives it
//! and fires the expiry callback. Dropping the handle aborts the task.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::undo::{TickOutcome, UndoWindow};

pub struct Countdown {
    window: Arc<Mutex<UndoWindow>>,
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Spawn the countdown. `on_expire` runs at most once, on the task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(window: Arc<Mutex<UndoWindow>>, quantum: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = window.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + quantum, quantum);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let outcome = shared.lock().tick(quantum);
                match outcome {
                    TickOutcome::Ticked | TickOutcome::Paused => {}
                    TickOutcome::Expired => {
                        tracing::debug!("Undo window expired");
                        on_expire();
                        break;
                    }
                    TickOutcome::Closed => break,
                }
            }
        });

        Self { window, handle }
    }

    /// Hold the countdown (pointer over the toast).
    pub fn pause(&self) {
        self.window.lock().set_hover_paused(true);
    }

    pub fn resume(&self) {
        self.window.lock().set_hover_paused(false);
    }

    /// Stop ticking. The window itself is left as is.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
