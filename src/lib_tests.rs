#[cfg(test)]
mod integration_tests {
    use crate::config::{AppConfig, StoreBackend};
    use crate::folders::{DesiredState, FolderSpec, ReconcileOutcome};
    use crate::logging::LogManager;
    use crate::monitor::FolderMonitor;
    use crate::reconciler::FolderReconciler;
    use crate::refresh::RefreshError;
    use crate::store::{open_store, MemoryStore};
    use crate::watcher::{AppDirWatcher, ManualNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn build_reconciler(
        store: &MemoryStore,
        desired: DesiredState,
        refreshes: &Arc<AtomicUsize>,
    ) -> Arc<FolderReconciler> {
        let counter = refreshes.clone();
        Arc::new(
            FolderReconciler::builder(Arc::new(store.clone()), Handle::current())
                .desired(desired)
                .refresh(Arc::new(move || -> Result<(), RefreshError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .log(Arc::new(LogManager::new(100)))
                .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_from_arbitrary_live_state() {
        let store = MemoryStore::new();
        store.seed_children(&["stale", "games", "accessories"]);
        store.seed_folder("games", "Spiele", &["Game", "Emulator"]);
        store.seed_folder("office", "Office", &["Office"]);
        store.seed_folder("stale", "Old Folder", &["Old"]);
        let refreshes = Arc::new(AtomicUsize::new(0));
        let reconciler = build_reconciler(&store, DesiredState::builtin(), &refreshes);

        assert!(matches!(
            reconciler.reconcile_now(),
            ReconcileOutcome::Applied { .. }
        ));

        let desired = DesiredState::builtin();
        assert_eq!(store.children(), desired.folder_ids());
        for folder in desired.for_each_folder() {
            assert_eq!(store.folder_name(&folder.id).as_ref(), Some(&folder.name));
            assert_eq!(
                store.folder_categories(&folder.id).as_ref(),
                Some(&folder.categories)
            );
        }
        // Office already matched, so only its name/categories were skipped.
        assert!(!store.written_keys().contains(&"office/name".to_string()));
        assert!(reconciler.plan().unwrap().is_converged());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_drift_is_repaired_on_next_event() {
        let store = MemoryStore::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let desired =
            DesiredState::new(vec![FolderSpec::new("games", "Games", ["Game"])]).unwrap();
        let reconciler = build_reconciler(&store, desired, &refreshes);
        let notifier = ManualNotifier::new();
        let monitor = FolderMonitor::new(reconciler.clone(), Arc::new(notifier.clone()));

        monitor.enable().unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        // Another writer reorders categories behind our back.
        store.seed_folder("games", "Games", &["ArcadeGame", "Game"]);
        notifier.notify();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(store.folder_categories("games"), Some(vec!["Game".to_string()]));
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);

        // No drift: an event produces a pass with no writes and no refresh.
        let writes = store.write_count();
        notifier.notify();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), writes);
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_cycle() {
        let store = MemoryStore::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let reconciler = build_reconciler(&store, DesiredState::builtin(), &refreshes);
        let notifier = ManualNotifier::new();
        let monitor = FolderMonitor::new(reconciler, Arc::new(notifier.clone()));

        for _ in 0..3 {
            monitor.set_enabled(true).unwrap();
            assert_eq!(store.children().len(), 13);
            assert_eq!(notifier.subscriber_count(), 1);

            monitor.set_enabled(false).unwrap();
            assert!(store.children().is_empty());
            assert_eq!(notifier.subscriber_count(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_block_later_events() {
        let store = MemoryStore::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let desired =
            DesiredState::new(vec![FolderSpec::new("games", "Games", ["Game"])]).unwrap();
        let reconciler = build_reconciler(&store, desired, &refreshes);
        let notifier = ManualNotifier::new();
        let monitor = FolderMonitor::new(reconciler.clone(), Arc::new(notifier.clone()));

        store.fail_writes(true);
        assert!(matches!(
            monitor.enable().unwrap(),
            ReconcileOutcome::Failed { .. }
        ));
        assert!(monitor.is_monitoring());

        store.fail_writes(false);
        notifier.notify();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(store.children(), vec!["games"]);
        assert_eq!(reconciler.log().errors().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_backend_from_config() {
        let config = AppConfig::from_yaml(
            "backend: memory\nfolders:\n  - { id: games, name: Games, categories: [Game] }\n",
        )
        .unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);

        let reconciler = FolderReconciler::builder(open_store(&config), Handle::current())
            .desired(config.desired_state().unwrap())
            .debounce(config.debounce())
            .build();

        assert_eq!(reconciler.reconcile_now().writes(), 3);
        assert_eq!(reconciler.reconcile_now(), ReconcileOutcome::Converged);
    }

    #[tokio::test]
    async fn test_directory_watcher_drives_reconciliation() {
        let apps = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let desired =
            DesiredState::new(vec![FolderSpec::new("games", "Games", ["Game"])]).unwrap();
        let counter = refreshes.clone();
        let reconciler = Arc::new(
            FolderReconciler::builder(Arc::new(store.clone()), Handle::current())
                .desired(desired)
                .debounce(Duration::from_millis(50))
                .refresh(Arc::new(move || -> Result<(), RefreshError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .build(),
        );
        let watcher = AppDirWatcher::new(
            vec![apps.path().to_path_buf()],
            Arc::clone(reconciler.log()),
        );
        let monitor = FolderMonitor::new(reconciler, Arc::new(watcher));

        monitor.enable().unwrap();
        store.seed_children::<&str>(&[]);

        std::fs::write(
            apps.path().join("org.example.Chess.desktop"),
            "[Desktop Entry]\nName=Chess\nCategories=Game;\n",
        )
        .unwrap();

        let mut converged = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if store.children() == vec!["games".to_string()] {
                converged = true;
                break;
            }
        }
        assert!(converged, "install event should trigger a reconciliation");
        monitor.shutdown();
    }
}
