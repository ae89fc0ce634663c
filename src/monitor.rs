//! Enable/disable glue between a host toggle, the install notifier and the
//! reconciler.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::folders::ReconcileOutcome;
use crate::lock;
use crate::logging::LogManager;
use crate::reconciler::FolderReconciler;
use crate::watcher::{InstallNotifier, MonitorError, Subscription};

const COMPONENT: &str = "monitor";

pub struct FolderMonitor {
    reconciler: Arc<FolderReconciler>,
    notifier: Arc<dyn InstallNotifier>,
    subscription: Mutex<Option<Subscription>>,
    startup: Mutex<Option<CancellationToken>>,
    log: Arc<LogManager>,
}

impl FolderMonitor {
    pub fn new(reconciler: Arc<FolderReconciler>, notifier: Arc<dyn InstallNotifier>) -> Self {
        let log = Arc::clone(reconciler.log());
        Self {
            reconciler,
            notifier,
            subscription: Mutex::new(None),
            startup: Mutex::new(None),
            log,
        }
    }

    pub fn reconciler(&self) -> &Arc<FolderReconciler> {
        &self.reconciler
    }

    /// Runs one reconciliation, then starts listening for install changes.
    pub fn enable(&self) -> Result<ReconcileOutcome, MonitorError> {
        let outcome = self.reconciler.reconcile_now();
        self.start_monitoring()?;
        Ok(outcome)
    }

    /// Stops listening, drops any pending pass and clears the folder list.
    pub fn disable(&self) -> bool {
        self.stop_monitoring();
        self.reconciler.cancel_pending();
        self.reconciler.clear_all()
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), MonitorError> {
        if enabled {
            self.enable().map(|_| ())
        } else {
            self.disable();
            Ok(())
        }
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.subscription).is_some()
    }

    fn start_monitoring(&self) -> Result<(), MonitorError> {
        let mut subscription = lock(&self.subscription);
        if subscription.is_some() {
            return Ok(());
        }

        let reconciler = Arc::downgrade(&self.reconciler);
        let log = Arc::clone(&self.log);
        *subscription = Some(self.notifier.subscribe(Arc::new(move || {
            if let Some(reconciler) = reconciler.upgrade() {
                log.debug(COMPONENT, "Detected app installation/removal");
                reconciler.schedule_reconcile();
            }
        }))?);

        self.log
            .info(COMPONENT, "Started monitoring for app changes");
        Ok(())
    }

    fn stop_monitoring(&self) {
        if lock(&self.subscription).take().is_some() {
            self.log.info(COMPONENT, "Stopped monitoring");
        }
    }

    /// Enables after `delay` unless `shutdown` runs first.
    pub fn enable_after(self: &Arc<Self>, delay: Duration, runtime: &Handle) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.startup).replace(token.clone()) {
            previous.cancel();
        }

        self.log
            .info(COMPONENT, "Started initial app folder creation");
        let monitor: Weak<Self> = Arc::downgrade(self);
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(monitor) = monitor.upgrade() else {
                return;
            };
            lock(&monitor.startup).take();
            if monitor.is_monitoring() {
                return;
            }
            let log = Arc::clone(&monitor.log);
            match tokio::task::spawn_blocking(move || monitor.enable()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    log.error(COMPONENT, &format!("Error enabling folder monitor: {e}"));
                }
                Err(e) => log.error(COMPONENT, &format!("Error enabling folder monitor: {e}")),
            }
            log.info(COMPONENT, "End of initial app folder creation");
        });
    }

    /// Host shutdown: cancels the delayed enable, stops listening and tears
    /// the reconciler down. Folder settings are left as they are.
    pub fn shutdown(&self) {
        if let Some(token) = lock(&self.startup).take() {
            token.cancel();
        }
        self.stop_monitoring();
        self.reconciler.teardown();
    }
}

impl Drop for FolderMonitor {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.startup).take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folders::{DesiredState, FolderSpec};
    use crate::store::MemoryStore;
    use crate::watcher::ManualNotifier;

    fn setup() -> (MemoryStore, ManualNotifier, Arc<FolderMonitor>) {
        let store = MemoryStore::new();
        let notifier = ManualNotifier::new();
        let reconciler = FolderReconciler::builder(Arc::new(store.clone()), Handle::current())
            .desired(
                DesiredState::new(vec![FolderSpec::new("games", "Games", ["Game"])]).unwrap(),
            )
            .build();
        let monitor = Arc::new(FolderMonitor::new(
            Arc::new(reconciler),
            Arc::new(notifier.clone()),
        ));
        (store, notifier, monitor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_reconciles_and_subscribes_once() {
        let (store, notifier, monitor) = setup();

        let outcome = monitor.enable().unwrap();
        assert_eq!(outcome.writes(), 3);
        assert!(monitor.is_monitoring());
        assert_eq!(notifier.subscriber_count(), 1);

        assert_eq!(monitor.enable().unwrap(), ReconcileOutcome::Converged);
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(store.children(), vec!["games"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_unsubscribes_and_clears() {
        let (store, notifier, monitor) = setup();
        monitor.enable().unwrap();

        assert!(monitor.disable());
        assert!(!monitor.is_monitoring());
        assert_eq!(notifier.subscriber_count(), 0);
        assert!(store.children().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_cancels_pending_pass() {
        let (store, notifier, monitor) = setup();
        monitor.enable().unwrap();

        store.seed_folder("games", "Renamed", &["Game"]);
        notifier.notify();
        assert!(monitor.reconciler().has_pending());
        monitor.disable();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(store.children().is_empty());
        assert_eq!(store.folder_name("games").as_deref(), Some("Renamed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_event_triggers_debounced_pass() {
        let (store, notifier, monitor) = setup();
        monitor.enable().unwrap();
        let flushes = store.flush_count();

        store.seed_folder("games", "Renamed", &["Game"]);
        for _ in 0..4 {
            notifier.notify();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(store.folder_name("games").as_deref(), Some("Games"));
        assert_eq!(store.flush_count(), flushes + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_after_delay() {
        let (store, _notifier, monitor) = setup();

        monitor.enable_after(Duration::from_secs(1), &Handle::current());
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(store.children().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.children(), vec!["games"]);
        assert!(monitor.is_monitoring());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_delayed_enable() {
        let (store, notifier, monitor) = setup();

        monitor.enable_after(Duration::from_secs(1), &Handle::current());
        monitor.shutdown();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(store.children().is_empty());
        assert!(!monitor.is_monitoring());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_keeps_folder_settings() {
        let (store, notifier, monitor) = setup();
        monitor.enable().unwrap();

        monitor.shutdown();
        assert_eq!(store.children(), vec!["games"]);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
