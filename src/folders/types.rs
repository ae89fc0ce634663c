use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ConfigError;
use crate::validation;

/// One application folder as it should appear in the app grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderSpec {
    pub id: String,
    pub name: String,
    pub categories: Vec<String>,
}

impl FolderSpec {
    pub fn new<I, S>(id: &str, name: &str, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered folder table the store is converged toward.
///
/// Ids are unique and the order is the canonical `folder-children` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    folders: Vec<FolderSpec>,
}

impl DesiredState {
    pub fn new(folders: Vec<FolderSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for folder in &folders {
            validation::validate_folder(folder)?;
            if !seen.insert(folder.id.as_str()) {
                return Err(ConfigError::DuplicateFolder(folder.id.clone()));
            }
        }
        Ok(Self { folders })
    }

    pub(crate) fn from_trusted(folders: Vec<FolderSpec>) -> Self {
        Self { folders }
    }

    /// Folders in canonical order.
    pub fn for_each_folder(&self) -> impl Iterator<Item = &FolderSpec> {
        self.folders.iter()
    }

    pub fn folder_ids(&self) -> Vec<String> {
        self.folders.iter().map(|f| f.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&FolderSpec> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// A single field write needed to converge the live store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FolderWrite {
    Children {
        current: Vec<String>,
        desired: Vec<String>,
    },
    Name {
        folder_id: String,
        current: String,
        desired: String,
    },
    Categories {
        folder_id: String,
        current: Vec<String>,
        desired: Vec<String>,
    },
}

impl FolderWrite {
    /// Store key the write lands on, `<folder>/<key>` for folder records.
    pub fn key(&self) -> String {
        match self {
            Self::Children { .. } => crate::store::FOLDER_CHILDREN_KEY.to_string(),
            Self::Name { folder_id, .. } => format!("{folder_id}/{}", crate::store::NAME_KEY),
            Self::Categories { folder_id, .. } => {
                format!("{folder_id}/{}", crate::store::CATEGORIES_KEY)
            }
        }
    }
}

/// Writes a reconciliation pass would apply, children-list write first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub writes: Vec<FolderWrite>,
}

impl ReconcilePlan {
    pub fn is_converged(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

/// Result of one `reconcile_now` call. Store failures are reported here,
/// never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Another pass was in flight; nothing was read or written.
    Busy,
    /// The store already matched; zero writes, zero flushes.
    Converged,
    Applied { writes: usize, refresh_scheduled: bool },
    Failed { error: String },
}

impl ReconcileOutcome {
    pub fn writes(&self) -> usize {
        match self {
            Self::Applied { writes, .. } => *writes,
            _ => 0,
        }
    }
}

/// Order-sensitive list equality: same length, same element at every index.
pub fn lists_equal<A, B>(a: &[A], b: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.as_ref() == y.as_ref())
}
