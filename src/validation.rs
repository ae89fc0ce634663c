//! Folder table validation
//!
//! Folder ids end up as dconf path components and category names end up in
//! `.desktop` matching, so both are checked before a table is accepted.

use crate::config::ConfigError;
use crate::folders::FolderSpec;

const MAX_FOLDER_ID_LENGTH: usize = 100;
const MAX_NAME_LENGTH: usize = 255;
const MAX_CATEGORIES: usize = 64;

/// Validate a folder id.
///
/// Only ASCII alphanumerics, hyphen and underscore are allowed.
pub fn validate_folder_id(folder_id: &str) -> Result<(), ConfigError> {
    if folder_id.is_empty() {
        return Err(ConfigError::Invalid("folder id cannot be empty".to_string()));
    }

    if folder_id.len() > MAX_FOLDER_ID_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "folder id too long: {} chars (max: {})",
            folder_id.len(),
            MAX_FOLDER_ID_LENGTH
        )));
    }

    if !folder_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Invalid(format!(
            "folder id contains invalid characters: '{folder_id}'"
        )));
    }

    Ok(())
}

pub fn validate_folder_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid("folder name cannot be empty".to_string()));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "folder name too long (max: {MAX_NAME_LENGTH} chars)"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(ConfigError::Invalid(format!(
            "folder name contains control characters: {name:?}"
        )));
    }

    Ok(())
}

/// Validate a category list. `;` is the desktop-entry list separator.
pub fn validate_categories(categories: &[String]) -> Result<(), ConfigError> {
    if categories.len() > MAX_CATEGORIES {
        return Err(ConfigError::Invalid(format!(
            "too many categories: {} (max: {})",
            categories.len(),
            MAX_CATEGORIES
        )));
    }

    for category in categories {
        if category.trim().is_empty() {
            return Err(ConfigError::Invalid("category cannot be empty".to_string()));
        }
        if category.contains(';') || category.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(format!(
                "category contains invalid characters: {category:?}"
            )));
        }
    }

    Ok(())
}

pub fn validate_folder(folder: &FolderSpec) -> Result<(), ConfigError> {
    validate_folder_id(&folder.id)?;
    validate_folder_name(&folder.name)?;
    validate_categories(&folder.categories)
}
