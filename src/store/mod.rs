//! Live settings store abstraction.
//!
//! The reconciler only needs string / string-list reads and writes on the
//! app-folders schema plus a per-folder record, and a flush. Everything else
//! about the backing store is the backend's business.

pub mod gsettings;
pub mod memory;

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};

pub use gsettings::GsettingsStore;
pub use memory::MemoryStore;

/// Key holding the ordered list of active folder ids.
pub const FOLDER_CHILDREN_KEY: &str = "folder-children";
/// Per-folder display name key.
pub const NAME_KEY: &str = "name";
/// Per-folder category list key.
pub const CATEGORIES_KEY: &str = "categories";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read '{key}': {detail}")]
    Read { key: String, detail: String },
    #[error("failed to write '{key}': {detail}")]
    Write { key: String, detail: String },
    #[error("failed to flush settings: {0}")]
    Flush(String),
    #[error("failed to open folder record '{folder_id}': {detail}")]
    Folder { folder_id: String, detail: String },
    #[error("settings command failed: {0}")]
    Command(String),
    #[error("unparseable value for '{key}': {value}")]
    Parse { key: String, value: String },
}

/// Handle on one folder's record in the store.
pub trait FolderSchema: Send + Sync {
    fn get_string(&self, key: &str) -> Result<String, StoreError>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get_string_list(&self, key: &str) -> Result<Vec<String>, StoreError>;
    fn set_string_list(&self, key: &str, value: &[String]) -> Result<(), StoreError>;
}

/// The app-folders settings root.
pub trait SettingsStore: Send + Sync {
    fn get_string_list(&self, key: &str) -> Result<Vec<String>, StoreError>;
    fn set_string_list(&self, key: &str, value: &[String]) -> Result<(), StoreError>;
    /// Opens the record for `folder_id`. Callers cache the handle.
    fn folder(&self, folder_id: &str) -> Result<Arc<dyn FolderSchema>, StoreError>;
    fn flush(&self) -> Result<(), StoreError>;
}

/// Builds the store selected by `config.backend`.
pub fn open_store(config: &AppConfig) -> Arc<dyn SettingsStore> {
    match config.backend {
        StoreBackend::Gsettings => Arc::new(GsettingsStore::new(config.gsettings_bin.clone())),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
