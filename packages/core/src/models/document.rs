//! Document Model
//!
//! A `Document` is a markdown note placed in the workspace tree. Besides its
//! editable fields (`title`, `body`, `tags`) it carries the tree placement
//! shared by all items (`parent_id`, `order`) and a bounded [`VersionLedger`]
//! of prior states.
//!
//! # Examples
//!
//! ```rust
//! use notefold_core::models::Document;
//!
//! // A document at the workspace root, first sibling slot
//! let doc = Document::new("Reading list", "", None, 1.0);
//! assert!(doc.parent_id.is_none());
//! assert!(doc.history.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::history::VersionLedger;

/// A markdown note in the workspace tree.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4)
/// - `parent_id`: Containing folder; `None` means the workspace root
/// - `order`: Fractional sort key among siblings (ties broken by `id`)
/// - `title` / `body` / `tags`: Editable content fields
/// - `is_favorite`: Pinned flag, toggled without touching history
/// - `history`: Prior states of the editable fields, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Containing folder (`None` = workspace root)
    pub parent_id: Option<String>,

    /// Fractional sort key among siblings
    pub order: f64,

    /// Note title
    pub title: String,

    /// Markdown body
    pub body: String,

    /// Free-form tags
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Pinned/favorite flag
    #[serde(default)]
    pub is_favorite: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp (authoritative for conflict resolution)
    pub updated_at: DateTime<Utc>,

    /// Bounded history of prior states, newest first
    #[serde(default)]
    pub history: VersionLedger,
}

impl Document {
    /// Create a new document with an auto-generated UUID.
    ///
    /// `order` comes from the ordering engine; callers never pick sort keys
    /// by hand.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        parent_id: Option<String>,
        order: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id,
            order,
            title: title.into(),
            body: body.into(),
            tags: BTreeSet::new(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
            history: VersionLedger::default(),
        }
    }

    /// Capture the current editable fields as an immutable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            title: self.title.clone(),
            body: self.body.clone(),
            tags: self.tags.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Apply a partial update to the editable fields.
    ///
    /// Does NOT push a snapshot or bump `updated_at`; the workspace store
    /// owns that sequencing.
    pub fn apply_update(&mut self, update: DocumentUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(body) = update.body {
            self.body = body;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
    }
}

/// Immutable capture of a document's editable fields at a point in time.
///
/// Owned exclusively by the document's [`VersionLedger`]; never referenced
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub saved_at: DateTime<Utc>,
}

/// Partial update for a document's editable fields.
///
/// `None` fields are left untouched. An all-`None` update is legal and still
/// pushes a history snapshot when routed through the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

impl DocumentUpdate {
    /// Update that replaces only the title.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Update that replaces only the body.
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }
}
