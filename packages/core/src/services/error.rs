//! Service Layer Error Types
//!
//! This module defines error types for workspace-store operations. The
//! validation errors are synchronous and pre-validated: when one is
//! returned, no state change has occurred. `PersistenceFailure` is the one
//! asynchronous case; by the time it surfaces, the optimistic local mutation
//! has already been rolled back, so the caller may simply retry the intent.

use thiserror::Error;

/// Workspace store operation errors.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Item or saved query not found by id
    #[error("Not found: {id}")]
    NotFound { id: String },

    /// Referenced parent is missing or not a container
    #[error("Invalid parent container: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// Reparent would make a container its own ancestor
    #[error("Circular reference detected: {context}")]
    CircularReference { context: String },

    /// Durable apply failed; the optimistic local mutation was rolled back
    #[error("Persistence failed during {context}: {source}")]
    PersistenceFailure {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WorkspaceError {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an invalid parent error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(context: impl Into<String>) -> Self {
        Self::CircularReference {
            context: context.into(),
        }
    }

    /// Create a persistence failure error
    pub fn persistence_failure(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::PersistenceFailure {
            context: context.into(),
            source,
        }
    }

    /// Whether retrying the same intent can succeed without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure { .. })
    }
}
