//! Install/removal notification sources.
//!
//! `AppDirWatcher` watches the XDG `applications` directories for `.desktop`
//! files appearing, changing or disappearing. `ManualNotifier` lets a host
//! that already has an "installed apps changed" signal forward it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::lock;
use crate::logging::LogManager;

const COMPONENT: &str = "watcher";

pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to create file watcher: {0}")]
    Watcher(#[from] notify::Error),
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("none of the application directories could be watched")]
    NoDirectories,
}

/// Active subscription. Dropping it unsubscribes.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// Source of payload-free "installed application set changed" events.
pub trait InstallNotifier: Send + Sync {
    fn subscribe(&self, on_change: ChangeCallback) -> Result<Subscription, MonitorError>;
}

/// Watches application directories for desktop entry changes.
pub struct AppDirWatcher {
    dirs: Vec<PathBuf>,
    log: Arc<LogManager>,
}

impl AppDirWatcher {
    pub fn new(dirs: Vec<PathBuf>, log: Arc<LogManager>) -> Self {
        Self { dirs, log }
    }
}

impl InstallNotifier for AppDirWatcher {
    fn subscribe(&self, on_change: ChangeCallback) -> Result<Subscription, MonitorError> {
        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if is_install_change(&event) {
                        on_change();
                    }
                }
            })?;

        let mut watched = 0;
        for dir in &self.dirs {
            if !dir.is_dir() {
                self.log.debug(
                    COMPONENT,
                    &format!("skipping missing directory {}", dir.display()),
                );
                continue;
            }
            match watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(()) => watched += 1,
                Err(source) => {
                    let err = MonitorError::Watch {
                        path: dir.clone(),
                        source,
                    };
                    self.log.warn(COMPONENT, &err.to_string());
                }
            }
        }

        if watched == 0 {
            return Err(MonitorError::NoDirectories);
        }

        self.log.info(
            COMPONENT,
            &format!("watching {watched} application director(ies)"),
        );
        Ok(Subscription::new(move || drop(watcher)))
    }
}

fn is_desktop_entry(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "desktop")
}

/// Creation, modification or removal of at least one `.desktop` file.
pub fn is_install_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_desktop_entry(p))
}

/// Notifier driven by the host calling [`ManualNotifier::notify`].
#[derive(Clone, Default)]
pub struct ManualNotifier {
    subscribers: Arc<Mutex<HashMap<u64, ChangeCallback>>>,
    next_id: Arc<AtomicU64>,
}

impl ManualNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one change event to every subscriber.
    pub fn notify(&self) {
        let callbacks: Vec<ChangeCallback> = lock(&self.subscribers).values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

impl InstallNotifier for ManualNotifier {
    fn subscribe(&self, on_change: ChangeCallback) -> Result<Subscription, MonitorError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).insert(id, on_change);

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(move || {
            lock(&subscribers).remove(&id);
        }))
    }
}
