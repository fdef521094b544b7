// consent-flow-client/src/session.rs
// ============================================================================
// Module: Auth Session Store
// Description: Signed-in account and its persisted bearer token.
// Purpose: Keep the login across CLI runs and tear it down on logout.
// Dependencies: consent-flow-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A login produces an [`AuthSession`]: the account and its bearer token.
//! [`SessionStore`] keeps it as a JSON file in the local data directory and
//! removes it, together with the user's custom templates, on logout. The
//! file is a local convenience, not a store of record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use consent_flow_core::UserId;
use serde::Deserialize;
use serde::Serialize;

use crate::templates::TemplateStore;
use crate::templates::TemplateStoreError;
use crate::templates::write_atomic;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the persisted session.
const SESSION_FILE: &str = "session.json";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Account returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    /// Account identifier.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Account email.
    #[serde(default)]
    pub email: String,
}

/// Signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Signed-in account.
    pub user: AccountUser,
    /// Bearer token for API calls.
    pub access_token: String,
}

/// File-backed session persistence under a data directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Data directory holding the session and template files.
    dir: PathBuf,
}

impl SessionStore {
    /// Creates a store rooted at `dir`. Nothing is read until first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Returns the data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the persisted session, if any.
    ///
    /// An unreadable session file is removed and treated as signed out.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError::Io`] when the file exists but cannot be
    /// read or removed.
    pub fn load(&self) -> Result<Option<AuthSession>, TemplateStoreError> {
        let path = self.session_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(TemplateStoreError::Io(err.to_string())),
        };
        if let Ok(session) = serde_json::from_slice::<AuthSession>(&bytes) {
            return Ok(Some(session));
        }
        fs::remove_file(&path).map_err(|err| TemplateStoreError::Io(err.to_string()))?;
        Ok(None)
    }

    /// Persists a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError`] when the file cannot be written.
    pub fn save(&self, session: &AuthSession) -> Result<(), TemplateStoreError> {
        let bytes = serde_json::to_vec_pretty(session).map_err(|err| TemplateStoreError::Invalid(err.to_string()))?;
        write_atomic(&self.session_path(), &bytes)
    }

    /// Signs out: removes the session and the user's custom templates.
    ///
    /// Returns the session that was removed.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateStoreError::Io`] when a file cannot be removed.
    pub fn logout(&self) -> Result<Option<AuthSession>, TemplateStoreError> {
        let session = self.load()?;
        if let Some(session) = &session {
            self.templates(&session.user.id).clear()?;
        }
        match fs::remove_file(self.session_path()) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(TemplateStoreError::Io(err.to_string())),
        }
        Ok(session)
    }

    /// Returns the template store for a user.
    #[must_use]
    pub fn templates(&self, user: &UserId) -> TemplateStore {
        TemplateStore::new(&self.dir, user.clone())
    }

    /// Path of the session file.
    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}
