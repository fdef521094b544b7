// consent-flow-core/src/runtime/store.rs
// ============================================================================
// Module: Consent Flow In-Memory Store
// Description: Simple in-memory document store for tests and offline runs.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`DocumentStore`] for
//! tests and local runs without an account. It is not intended for production
//! use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::DocumentId;
use crate::interfaces::DocumentStore;
use crate::interfaces::SavedDocument;
use crate::interfaces::StoreError;
use crate::interfaces::UploadRequest;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Stored record with its uploaded bytes.
#[derive(Debug, Clone)]
struct StoredDocument {
    /// Listing metadata and payload.
    record: SavedDocument,
    /// Uploaded bytes.
    bytes: Vec<u8>,
}

/// In-memory document store for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    /// Documents keyed by id, protected by a mutex.
    documents: Arc<Mutex<BTreeMap<String, StoredDocument>>>,
    /// Last issued document number.
    issued: Arc<AtomicU64>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the uploaded bytes for a document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document is unknown or the lock is
    /// poisoned.
    pub fn bytes(&self, id: &DocumentId) -> Result<Vec<u8>, StoreError> {
        let guard = self.documents.lock().map_err(|_| StoreError::Io("document store mutex poisoned".to_string()))?;
        guard.get(id.as_str()).map(|stored| stored.bytes.clone()).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list(&self) -> Result<Vec<SavedDocument>, StoreError> {
        let guard = self.documents.lock().map_err(|_| StoreError::Io("document store mutex poisoned".to_string()))?;
        Ok(guard.values().map(|stored| stored.record.clone()).collect())
    }

    fn upload(&self, request: &UploadRequest) -> Result<SavedDocument, StoreError> {
        let mut guard =
            self.documents.lock().map_err(|_| StoreError::Io("document store mutex poisoned".to_string()))?;
        let number = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let id = DocumentId::new(format!("doc-{number:06}"));
        let record = SavedDocument {
            id: id.clone(),
            title: request.title.clone(),
            created_at: None,
            payload: Some(request.payload.clone()),
        };
        guard.insert(
            id.to_string(),
            StoredDocument {
                record: record.clone(),
                bytes: request.bytes.clone(),
            },
        );
        Ok(record)
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let mut guard =
            self.documents.lock().map_err(|_| StoreError::Io("document store mutex poisoned".to_string()))?;
        guard.remove(id.as_str()).map(|_| ()).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
