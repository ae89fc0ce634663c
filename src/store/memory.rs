//! In-memory settings store.
//!
//! Backs `--backend memory` and the test suites. Counts every write and
//! flush so callers can check write suppression, and can be told to fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{FolderSchema, SettingsStore, StoreError};
use crate::lock;

type ReadHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct FolderRecord {
    strings: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    root: HashMap<String, Vec<String>>,
    folders: HashMap<String, FolderRecord>,
    written_keys: Vec<String>,
    flushes: usize,
    folder_opens: usize,
    fail_reads: bool,
    fail_writes: bool,
    fail_flush: bool,
    writes_before_failure: Option<usize>,
}

impl MemoryState {
    fn check_read(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_reads {
            return Err(StoreError::Read {
                key: key.to_string(),
                detail: "injected read failure".to_string(),
            });
        }
        Ok(())
    }

    fn record_write(&mut self, key: String) -> Result<(), StoreError> {
        let budget_spent = self.writes_before_failure == Some(0);
        if self.fail_writes || budget_spent {
            return Err(StoreError::Write {
                key,
                detail: "injected write failure".to_string(),
            });
        }
        if let Some(remaining) = self.writes_before_failure.as_mut() {
            *remaining -= 1;
        }
        self.written_keys.push(key);
        Ok(())
    }
}

/// Settings store held entirely in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    read_hook: Arc<Mutex<Option<ReadHook>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the children list without counting it as a write.
    pub fn seed_children<S: AsRef<str>>(&self, children: &[S]) {
        lock(&self.state).root.insert(
            super::FOLDER_CHILDREN_KEY.to_string(),
            children.iter().map(|c| c.as_ref().to_string()).collect(),
        );
    }

    /// Seeds one folder record without counting writes.
    pub fn seed_folder<S: AsRef<str>>(&self, folder_id: &str, name: &str, categories: &[S]) {
        let mut state = lock(&self.state);
        let record = state.folders.entry(folder_id.to_string()).or_default();
        record
            .strings
            .insert(super::NAME_KEY.to_string(), name.to_string());
        record.lists.insert(
            super::CATEGORIES_KEY.to_string(),
            categories.iter().map(|c| c.as_ref().to_string()).collect(),
        );
    }

    pub fn children(&self) -> Vec<String> {
        lock(&self.state)
            .root
            .get(super::FOLDER_CHILDREN_KEY)
            .cloned()
            .unwrap_or_default()
    }

    pub fn folder_name(&self, folder_id: &str) -> Option<String> {
        lock(&self.state)
            .folders
            .get(folder_id)
            .and_then(|r| r.strings.get(super::NAME_KEY).cloned())
    }

    pub fn folder_categories(&self, folder_id: &str) -> Option<Vec<String>> {
        lock(&self.state)
            .folders
            .get(folder_id)
            .and_then(|r| r.lists.get(super::CATEGORIES_KEY).cloned())
    }

    pub fn write_count(&self) -> usize {
        lock(&self.state).written_keys.len()
    }

    /// Keys written so far, `<folder>/<key>` for folder records.
    pub fn written_keys(&self) -> Vec<String> {
        lock(&self.state).written_keys.clone()
    }

    pub fn flush_count(&self) -> usize {
        lock(&self.state).flushes
    }

    /// Number of folder handles opened through [`SettingsStore::folder`].
    pub fn folder_open_count(&self) -> usize {
        lock(&self.state).folder_opens
    }

    pub fn fail_reads(&self, fail: bool) {
        lock(&self.state).fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    pub fn fail_flush(&self, fail: bool) {
        lock(&self.state).fail_flush = fail;
    }

    /// Lets `count` more writes succeed, then fails every following one.
    pub fn fail_writes_after(&self, count: usize) {
        lock(&self.state).writes_before_failure = Some(count);
    }

    /// Runs `hook` at the start of every root-level list read.
    pub fn set_read_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *lock(&self.read_hook) = Some(Arc::new(hook));
    }

    fn run_read_hook(&self) {
        let hook = lock(&self.read_hook).clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl SettingsStore for MemoryStore {
    fn get_string_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.run_read_hook();
        let state = lock(&self.state);
        state.check_read(key)?;
        Ok(state.root.get(key).cloned().unwrap_or_default())
    }

    fn set_string_list(&self, key: &str, value: &[String]) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.record_write(key.to_string())?;
        state.root.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn folder(&self, folder_id: &str) -> Result<Arc<dyn FolderSchema>, StoreError> {
        let mut state = lock(&self.state);
        if state.fail_reads {
            return Err(StoreError::Folder {
                folder_id: folder_id.to_string(),
                detail: "injected read failure".to_string(),
            });
        }
        state.folder_opens += 1;
        Ok(Arc::new(MemoryFolder {
            folder_id: folder_id.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if state.fail_flush {
            return Err(StoreError::Flush("injected flush failure".to_string()));
        }
        state.flushes += 1;
        Ok(())
    }
}

struct MemoryFolder {
    folder_id: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFolder {
    fn qualified(&self, key: &str) -> String {
        format!("{}/{}", self.folder_id, key)
    }
}

impl FolderSchema for MemoryFolder {
    fn get_string(&self, key: &str) -> Result<String, StoreError> {
        let state = lock(&self.state);
        state.check_read(&self.qualified(key))?;
        Ok(state
            .folders
            .get(&self.folder_id)
            .and_then(|r| r.strings.get(key).cloned())
            .unwrap_or_default())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.record_write(self.qualified(key))?;
        state
            .folders
            .entry(self.folder_id.clone())
            .or_default()
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let state = lock(&self.state);
        state.check_read(&self.qualified(key))?;
        Ok(state
            .folders
            .get(&self.folder_id)
            .and_then(|r| r.lists.get(key).cloned())
            .unwrap_or_default())
    }

    fn set_string_list(&self, key: &str, value: &[String]) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.record_write(self.qualified(key))?;
        state
            .folders
            .entry(self.folder_id.clone())
            .or_default()
            .lists
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
