// consent-flow-client/src/templates.rs
// ============================================================================
// Module: Custom Template Store
// Description: Per-user custom agreement templates kept as local JSON.
// Purpose: Back the `custom_` document types with user-authored markup.
// Dependencies: consent-flow-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each user has one JSON file holding their templates in creation order.
//! New templates get a `custom_<millis>` id; ids never repeat within a file.
//! Writes go to a sibling temp file first and are renamed into place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use consent_flow_core::CustomTemplate;
use consent_flow_core::TemplateId;
use consent_flow_core::UserId;
use consent_flow_core::unix_millis;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Local store errors.
#[derive(Debug, Error)]
pub enum TemplateStoreError {
    /// File I/O failed.
    #[error("local store io error: {0}")]
    Io(String),
    /// Stored or supplied data is unusable.
    #[error("local store invalid data: {0}")]
    Invalid(String),
    /// Template was not found.
    #[error("template not found: {0}")]
    NotFound(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Custom templates for one user.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    /// Owning user.
    user: UserId,
    /// Backing JSON file.
    path: PathBuf,
}

impl TemplateStore {
    /// Creates the store for `user` under `dir`.
    #[must_use]
    pub fn new(dir: &Path, user: UserId) -> Self {
        let path = dir.join(format!("templates-{}.json", file_safe(user.as_str())));
        Self {
            user,
            path,
        }
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }

    /// Lists templates in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError`] when the file cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<CustomTemplate>, TemplateStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| TemplateStoreError::Invalid(err.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(TemplateStoreError::Io(err.to_string())),
        }
    }

    /// Looks up a template by id.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError`] when the file cannot be read.
    pub fn get(&self, id: &TemplateId) -> Result<Option<CustomTemplate>, TemplateStoreError> {
        Ok(self.list()?.into_iter().find(|template| &template.id == id))
    }

    /// Creates a template and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError::Invalid`] for a blank name and other
    /// variants when the file cannot be updated.
    pub fn create(&self, name: &str, content: &str) -> Result<CustomTemplate, TemplateStoreError> {
        let name = checked_name(name)?;
        let mut templates = self.list()?;
        let mut stamp = unix_millis();
        let mut template = CustomTemplate::new(stamp, name, content);
        while templates.iter().any(|existing| existing.id == template.id) {
            stamp += 1;
            template = CustomTemplate::new(stamp, name, content);
        }
        templates.push(template.clone());
        self.write(&templates)?;
        Ok(template)
    }

    /// Replaces the name and content of a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError::NotFound`] for an unknown id.
    pub fn update(&self, id: &TemplateId, name: &str, content: &str) -> Result<CustomTemplate, TemplateStoreError> {
        let name = checked_name(name)?;
        let mut templates = self.list()?;
        let template = templates
            .iter_mut()
            .find(|template| &template.id == id)
            .ok_or_else(|| TemplateStoreError::NotFound(id.to_string()))?;
        name.clone_into(&mut template.name);
        content.clone_into(&mut template.content);
        let updated = template.clone();
        self.write(&templates)?;
        Ok(updated)
    }

    /// Deletes a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError::NotFound`] for an unknown id.
    pub fn delete(&self, id: &TemplateId) -> Result<(), TemplateStoreError> {
        let mut templates = self.list()?;
        let before = templates.len();
        templates.retain(|template| &template.id != id);
        if templates.len() == before {
            return Err(TemplateStoreError::NotFound(id.to_string()));
        }
        self.write(&templates)
    }

    /// Removes every template of the user.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError::Io`] when the file cannot be removed.
    pub fn clear(&self) -> Result<(), TemplateStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(TemplateStoreError::Io(err.to_string())),
        }
    }

    /// Writes the full template list.
    fn write(&self, templates: &[CustomTemplate]) -> Result<(), TemplateStoreError> {
        let bytes = serde_json::to_vec_pretty(templates).map_err(|err| TemplateStoreError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &bytes)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes `bytes` to a temp sibling and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TemplateStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| TemplateStoreError::Io(err.to_string()))?;
    }
    let temp = path.with_extension("json.tmp");
    fs::write(&temp, bytes).map_err(|err| TemplateStoreError::Io(err.to_string()))?;
    fs::rename(&temp, path).map_err(|err| TemplateStoreError::Io(err.to_string()))
}

/// Rejects blank template names.
fn checked_name(name: &str) -> Result<&str, TemplateStoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TemplateStoreError::Invalid("template name is empty".to_string()));
    }
    Ok(trimmed)
}

/// Maps an identifier onto file-name-safe characters.
fn file_safe(id: &str) -> String {
    id.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' }).collect()
}
