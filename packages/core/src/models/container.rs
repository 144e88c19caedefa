//! Container Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A folder in the workspace tree.
///
/// Containers may hold any number of documents and containers as children.
/// Children reference their container through `parent_id`; the container
/// itself stores no child list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Containing folder (`None` = workspace root)
    pub parent_id: Option<String>,

    /// Fractional sort key among siblings
    pub order: f64,

    /// Folder name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp (authoritative for conflict resolution)
    pub updated_at: DateTime<Utc>,
}

impl Container {
    /// Create a new container with an auto-generated UUID.
    pub fn new(name: impl Into<String>, parent_id: Option<String>, order: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id,
            order,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
