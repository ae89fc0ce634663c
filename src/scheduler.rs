//! Trailing-edge debounce on a tokio runtime.
//!
//! Every `schedule` call restarts the quiet window. At most one timer is
//! pending at a time; a cancelled timer never fires. Fired work runs on
//! the blocking pool, since it may block on the settings backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::lock;

struct PendingTimer {
    generation: u64,
    token: CancellationToken,
}

pub struct Debouncer {
    runtime: Handle,
    delay: Duration,
    pending: Arc<Mutex<Option<PendingTimer>>>,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(runtime: Handle, delay: Duration) -> Self {
        Self {
            runtime,
            delay,
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Runs `fire` once the quiet window elapses, replacing any pending timer.
    pub fn schedule<F>(&self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let replaced = lock(&self.pending).replace(PendingTimer {
            generation,
            token: token.clone(),
        });
        if let Some(previous) = replaced {
            previous.token.cancel();
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            // The timer may have been cancelled or replaced between the sleep
            // completing and this task being polled.
            {
                let mut slot = lock(&pending);
                match slot.as_ref() {
                    Some(timer) if timer.generation == generation && !timer.token.is_cancelled() => {
                        *slot = None;
                    }
                    _ => return,
                }
            }

            if let Err(e) = tokio::task::spawn_blocking(fire).await {
                tracing::error!("[scheduler] debounced task failed: {e}");
            }
        });
    }

    /// Cancels the pending timer, if any. Returns whether one was pending.
    pub fn cancel_pending(&self) -> bool {
        match lock(&self.pending).take() {
            Some(timer) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
