//! Display refresh requests.
//!
//! The refresh target belongs to the host UI. It is injected as a callback
//! and run from a low-priority task; failures are logged and dropped.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::logging::LogManager;

const COMPONENT: &str = "refresh";

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("display refresh target unavailable")]
    Unavailable,
    #[error("display refresh failed: {0}")]
    Failed(String),
}

pub type RefreshCallback = Arc<dyn Fn() -> Result<(), RefreshError> + Send + Sync>;

pub struct RefreshScheduler {
    runtime: Handle,
    callback: Option<RefreshCallback>,
    log: Arc<LogManager>,
}

impl RefreshScheduler {
    pub fn new(runtime: Handle, callback: Option<RefreshCallback>, log: Arc<LogManager>) -> Self {
        Self {
            runtime,
            callback,
            log,
        }
    }

    /// Queues one refresh behind whatever is already runnable.
    pub fn request(&self) {
        let callback = self.callback.clone();
        let log = Arc::clone(&self.log);
        self.runtime.spawn(async move {
            tokio::task::yield_now().await;
            run_refresh(callback.as_ref(), &log);
        });
    }
}

fn run_refresh(callback: Option<&RefreshCallback>, log: &LogManager) {
    let Some(callback) = callback else {
        log.warn(COMPONENT, "no display refresh target registered");
        return;
    };

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback())) {
        Ok(Ok(())) => log.debug(COMPONENT, "app display refreshed"),
        Ok(Err(e)) => log.error(COMPONENT, &format!("Error refreshing app display: {e}")),
        Err(_) => log.error(COMPONENT, "Error refreshing app display: refresh target panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_request_runs_callback_later() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let callback: RefreshCallback = Arc::new(move || -> Result<(), RefreshError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let scheduler = RefreshScheduler::new(
            Handle::current(),
            Some(callback),
            Arc::new(LogManager::default()),
        );

        scheduler.request();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_target_is_logged_not_fatal() {
        let log = Arc::new(LogManager::default());
        let scheduler = RefreshScheduler::new(Handle::current(), None, log.clone());

        scheduler.request();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let entries = log.entries_for(COMPONENT);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("no display refresh target"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_target_is_swallowed() {
        let log = Arc::new(LogManager::default());
        let callback: RefreshCallback = Arc::new(|| -> Result<(), RefreshError> { Err(RefreshError::Unavailable) });
        let scheduler = RefreshScheduler::new(Handle::current(), Some(callback), log.clone());

        scheduler.request();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_target_is_swallowed() {
        let log = Arc::new(LogManager::default());
        let callback: RefreshCallback = Arc::new(|| -> Result<(), RefreshError> { panic!("host UI gone") });
        let scheduler = RefreshScheduler::new(Handle::current(), Some(callback), log.clone());

        scheduler.request();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(log.errors().len(), 1);
    }
}
