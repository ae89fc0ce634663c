pub mod config;
pub mod folders;
pub mod logging;
pub mod monitor;
pub mod reconciler;
pub mod refresh;
pub mod scheduler;
pub mod store;
pub mod validation;
pub mod watcher;

#[cfg(test)]
mod lib_tests;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use config::AppConfig;
pub use folders::{DesiredState, FolderSpec, FolderWrite, ReconcileOutcome, ReconcilePlan};
pub use monitor::FolderMonitor;
pub use reconciler::FolderReconciler;
pub use store::{SettingsStore, StoreError};

/// Locks `mutex`, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
