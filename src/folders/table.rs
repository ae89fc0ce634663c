//! Built-in folder table.

use super::types::{DesiredState, FolderSpec};

const BUILTIN_FOLDERS: &[(&str, &str, &[&str])] = &[
    ("accessories", "Accessories", &["Utility"]),
    ("chrome-apps", "Chrome Apps", &["chrome-apps"]),
    ("games", "Games", &["Game"]),
    ("graphics", "Graphics", &["Graphics"]),
    ("internet", "Internet", &["Network", "WebBrowser", "Email"]),
    ("office", "Office", &["Office"]),
    ("programming", "Programming", &["Development"]),
    ("science", "Science", &["Science"]),
    ("sound---video", "Sound & Video", &["AudioVideo", "Audio", "Video"]),
    ("system-tools", "System Tools", &["System", "Settings"]),
    ("universal-access", "Universal Access", &["Accessibility"]),
    ("wine", "Wine", &["Wine", "X-Wine", "Wine-Programs-Accessories"]),
    ("waydroid", "Waydroid", &["Waydroid", "X-WayDroid-App"]),
];

pub fn builtin_folders() -> Vec<FolderSpec> {
    BUILTIN_FOLDERS
        .iter()
        .map(|(id, name, categories)| FolderSpec::new(id, name, categories.iter().copied()))
        .collect()
}

impl DesiredState {
    pub fn builtin() -> Self {
        // Checked by test_builtin_table_is_valid.
        Self::from_trusted(builtin_folders())
    }
}
