//! Debounced, single-flight folder reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::DEFAULT_DEBOUNCE_MS;
use crate::folders::{DesiredState, ReconcileEngine, ReconcileOutcome, ReconcilePlan, RunGuard};
use crate::logging::LogManager;
use crate::refresh::{RefreshCallback, RefreshScheduler};
use crate::scheduler::Debouncer;
use crate::store::{SettingsStore, StoreError};

const COMPONENT: &str = "reconciler";

struct Inner {
    engine: ReconcileEngine,
    guard: RunGuard,
    refresh: RefreshScheduler,
    log: Arc<LogManager>,
    torn_down: AtomicBool,
}

impl Inner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Timer entry point. A timer that was already firing when `teardown`
    /// ran must not touch the store.
    fn run_scheduled(&self) {
        if self.is_torn_down() {
            self.log
                .debug(COMPONENT, "torn down before scheduled pass, skipping");
            return;
        }
        self.reconcile_now();
    }

    fn reconcile_now(&self) -> ReconcileOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            self.log
                .debug(COMPONENT, "reconciliation already running, skipping");
            return ReconcileOutcome::Busy;
        };

        match self.run_pass() {
            Ok(0) => {
                self.log.debug(COMPONENT, "folders already up to date");
                ReconcileOutcome::Converged
            }
            Ok(writes) => {
                self.refresh.request();
                self.log
                    .info(COMPONENT, &format!("applied {writes} folder setting change(s)"));
                ReconcileOutcome::Applied {
                    writes,
                    refresh_scheduled: true,
                }
            }
            Err(e) => {
                self.log
                    .error(COMPONENT, &format!("Error setting up folders: {e}"));
                ReconcileOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn run_pass(&self) -> Result<usize, StoreError> {
        let plan = self.engine.plan()?;
        self.engine.apply(&plan)
    }
}

pub struct ReconcilerBuilder {
    store: Arc<dyn SettingsStore>,
    runtime: Handle,
    desired: DesiredState,
    debounce: Duration,
    refresh: Option<RefreshCallback>,
    log: Option<Arc<LogManager>>,
}

impl ReconcilerBuilder {
    pub fn desired(mut self, desired: DesiredState) -> Self {
        self.desired = desired;
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    pub fn refresh(mut self, callback: RefreshCallback) -> Self {
        self.refresh = Some(callback);
        self
    }

    pub fn log(mut self, log: Arc<LogManager>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> FolderReconciler {
        let log = self.log.unwrap_or_default();
        let inner = Arc::new(Inner {
            engine: ReconcileEngine::new(self.store, self.desired),
            guard: RunGuard::new(),
            refresh: RefreshScheduler::new(self.runtime.clone(), self.refresh, Arc::clone(&log)),
            log,
            torn_down: AtomicBool::new(false),
        });

        FolderReconciler {
            inner,
            debouncer: Debouncer::new(self.runtime, self.debounce),
        }
    }
}

/// Converges the live store toward a [`DesiredState`].
///
/// `reconcile_now` runs a pass immediately unless one is in flight;
/// `schedule_reconcile` coalesces bursts of change events into one pass
/// after the debounce window.
pub struct FolderReconciler {
    inner: Arc<Inner>,
    debouncer: Debouncer,
}

impl FolderReconciler {
    pub fn builder(store: Arc<dyn SettingsStore>, runtime: Handle) -> ReconcilerBuilder {
        ReconcilerBuilder {
            store,
            runtime,
            desired: DesiredState::builtin(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            refresh: None,
            log: None,
        }
    }

    /// Requests a pass after the quiet window.
    ///
    /// A pending request is always cancelled first. If a pass is running the
    /// request is then dropped instead of re-armed.
    pub fn schedule_reconcile(&self) {
        if self.inner.is_torn_down() {
            self.inner
                .log
                .debug(COMPONENT, "ignoring reconcile request after teardown");
            return;
        }

        self.debouncer.cancel_pending();

        if self.inner.guard.is_running() {
            self.inner
                .log
                .debug(COMPONENT, "reconciliation in progress, dropping request");
            return;
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        self.debouncer.schedule(move || {
            if let Some(inner) = inner.upgrade() {
                inner.run_scheduled();
            }
        });
    }

    pub fn reconcile_now(&self) -> ReconcileOutcome {
        self.inner.reconcile_now()
    }

    /// Empties `folder-children` unconditionally. Returns whether it succeeded.
    pub fn clear_all(&self) -> bool {
        let log = &self.inner.log;
        log.info(COMPONENT, "Clearing folders...");
        match self.inner.engine.clear_all() {
            Ok(()) => {
                self.inner.refresh.request();
                log.info(COMPONENT, "Folders cleared");
                true
            }
            Err(e) => {
                log.error(COMPONENT, &format!("Error clearing folders: {e}"));
                false
            }
        }
    }

    /// Read-only diff against the live store.
    pub fn plan(&self) -> Result<ReconcilePlan, StoreError> {
        self.inner.engine.plan()
    }

    pub fn cancel_pending(&self) -> bool {
        self.debouncer.cancel_pending()
    }

    /// Cancels any pending pass and drops cached folder handles. Later
    /// `schedule_reconcile` calls are ignored.
    pub fn teardown(&self) {
        self.inner.torn_down.store(true, Ordering::Release);
        self.debouncer.cancel_pending();
        self.inner.engine.clear_cache();
        self.inner.log.debug(COMPONENT, "torn down");
    }

    pub fn is_running(&self) -> bool {
        self.inner.guard.is_running()
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.has_pending()
    }

    pub fn cached_schemas(&self) -> usize {
        self.inner.engine.cached_schemas()
    }

    pub fn desired(&self) -> &DesiredState {
        self.inner.engine.desired()
    }

    pub fn log(&self) -> &Arc<LogManager> {
        &self.inner.log
    }
}
