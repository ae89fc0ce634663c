use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::folders::types::{lists_equal, DesiredState, FolderWrite, ReconcilePlan};
use crate::lock;
use crate::store::{
    FolderSchema, SettingsStore, StoreError, CATEGORIES_KEY, FOLDER_CHILDREN_KEY, NAME_KEY,
};

/// Diffs the live store against the desired table and applies the difference.
///
/// Per-folder handles are opened lazily and cached until [`clear_cache`].
///
/// [`clear_cache`]: ReconcileEngine::clear_cache
pub struct ReconcileEngine {
    store: Arc<dyn SettingsStore>,
    desired: DesiredState,
    schemas: Mutex<HashMap<String, Arc<dyn FolderSchema>>>,
}

impl ReconcileEngine {
    pub fn new(store: Arc<dyn SettingsStore>, desired: DesiredState) -> Self {
        Self {
            store,
            desired,
            schemas: Mutex::new(HashMap::new()),
        }
    }

    pub fn desired(&self) -> &DesiredState {
        &self.desired
    }

    fn schema(&self, folder_id: &str) -> Result<Arc<dyn FolderSchema>, StoreError> {
        let mut schemas = lock(&self.schemas);
        if let Some(schema) = schemas.get(folder_id) {
            return Ok(Arc::clone(schema));
        }
        let schema = self.store.folder(folder_id)?;
        schemas.insert(folder_id.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Reads the live store and returns the writes needed to converge it.
    /// Never writes.
    pub fn plan(&self) -> Result<ReconcilePlan, StoreError> {
        let mut writes = Vec::new();

        let current_children = self.store.get_string_list(FOLDER_CHILDREN_KEY)?;
        let target_children = self.desired.folder_ids();
        if !lists_equal(&current_children, &target_children) {
            writes.push(FolderWrite::Children {
                current: current_children,
                desired: target_children,
            });
        }

        for folder in self.desired.for_each_folder() {
            let schema = self.schema(&folder.id)?;

            let current_name = schema.get_string(NAME_KEY)?;
            if current_name != folder.name {
                writes.push(FolderWrite::Name {
                    folder_id: folder.id.clone(),
                    current: current_name,
                    desired: folder.name.clone(),
                });
            }

            let current_categories = schema.get_string_list(CATEGORIES_KEY)?;
            if !lists_equal(&current_categories, &folder.categories) {
                writes.push(FolderWrite::Categories {
                    folder_id: folder.id.clone(),
                    current: current_categories,
                    desired: folder.categories.clone(),
                });
            }
        }

        Ok(ReconcilePlan { writes })
    }

    /// Applies `plan` in order and flushes once if anything was written.
    ///
    /// A failed write aborts the rest of the plan and skips the flush.
    pub fn apply(&self, plan: &ReconcilePlan) -> Result<usize, StoreError> {
        for write in &plan.writes {
            match write {
                FolderWrite::Children { desired, .. } => {
                    self.store.set_string_list(FOLDER_CHILDREN_KEY, desired)?;
                }
                FolderWrite::Name {
                    folder_id, desired, ..
                } => {
                    self.schema(folder_id)?.set_string(NAME_KEY, desired)?;
                }
                FolderWrite::Categories {
                    folder_id, desired, ..
                } => {
                    self.schema(folder_id)?
                        .set_string_list(CATEGORIES_KEY, desired)?;
                }
            }
        }

        if !plan.writes.is_empty() {
            self.store.flush()?;
        }

        Ok(plan.writes.len())
    }

    /// Empties `folder-children` and flushes, whatever the current value.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.store.set_string_list(FOLDER_CHILDREN_KEY, &[])?;
        self.store.flush()
    }

    pub fn cached_schemas(&self) -> usize {
        lock(&self.schemas).len()
    }

    pub fn clear_cache(&self) {
        lock(&self.schemas).clear();
    }
}
