//! Saved Query Model
//!
//! A saved query ("smart folder") is a standalone named query string
//! associated with the workspace. It is NOT part of the tree: it has no
//! `parent_id` or `order`, never cascades, and is created, edited, and
//! deleted independently of documents and containers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named query over the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuery {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Display name
    pub name: String,

    /// Query string, interpreted by the search layer
    pub query: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp (authoritative for conflict resolution)
    pub updated_at: DateTime<Utc>,
}

impl SavedQuery {
    /// Create a new saved query with an auto-generated UUID.
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            query: query.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a saved query. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQueryUpdate {
    pub name: Option<String>,
    pub query: Option<String>,
}
