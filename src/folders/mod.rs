pub mod engine;
pub mod guard;
pub mod table;
pub mod types;

pub use engine::ReconcileEngine;
pub use guard::{RunGuard, RunPermit};
pub use table::builtin_folders;
pub use types::{
    lists_equal, DesiredState, FolderSpec, FolderWrite, ReconcileOutcome, ReconcilePlan,
};
