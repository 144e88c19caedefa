//! Change Feed Events
//!
//! This module defines the event shapes delivered by the persistence
//! gateway's push feed. Every mutation durably applied by any client of the
//! workspace eventually surfaces here, including echoes of this client's own
//! writes.
//!
//! # Event Flow
//!
//! 1. A client durably applies a mutation through the gateway
//! 2. The backend broadcasts a `ChangeEvent` to every subscribed client
//! 3. The change reconciler folds the event into the local workspace store,
//!    subject to the last-write-wins policy

use serde::{Deserialize, Serialize};

use crate::models::{Container, Document, EntityKind, Item, SavedQuery};

/// A full entity as carried by gateway calls and feed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RemoteEntity {
    Document(Document),
    Container(Container),
    SavedQuery(SavedQuery),
}

impl RemoteEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            RemoteEntity::Document(_) => EntityKind::Document,
            RemoteEntity::Container(_) => EntityKind::Container,
            RemoteEntity::SavedQuery(_) => EntityKind::SavedQuery,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RemoteEntity::Document(doc) => &doc.id,
            RemoteEntity::Container(container) => &container.id,
            RemoteEntity::SavedQuery(query) => &query.id,
        }
    }

    pub fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            RemoteEntity::Document(doc) => doc.updated_at,
            RemoteEntity::Container(container) => container.updated_at,
            RemoteEntity::SavedQuery(query) => query.updated_at,
        }
    }
}

impl From<Item> for RemoteEntity {
    fn from(item: Item) -> Self {
        match item {
            Item::Document(doc) => RemoteEntity::Document(doc),
            Item::Container(container) => RemoteEntity::Container(container),
        }
    }
}

impl From<Document> for RemoteEntity {
    fn from(doc: Document) -> Self {
        RemoteEntity::Document(doc)
    }
}

impl From<Container> for RemoteEntity {
    fn from(container: Container) -> Self {
        RemoteEntity::Container(container)
    }
}

impl From<SavedQuery> for RemoteEntity {
    fn from(query: SavedQuery) -> Self {
        RemoteEntity::SavedQuery(query)
    }
}

/// Remote mutation operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ChangeOp {
    /// An entity was created elsewhere
    Insert { entity: RemoteEntity },

    /// An entity was updated elsewhere
    Update { entity: RemoteEntity },

    /// An entity was deleted elsewhere
    Delete { kind: EntityKind, id: String },
}

/// One event on the change feed.
///
/// The feed may be shared across tenants; `workspace` identifies the owning
/// workspace so clients can drop events that are not theirs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub workspace: String,
    #[serde(flatten)]
    pub op: ChangeOp,
}

impl ChangeEvent {
    pub fn insert(workspace: impl Into<String>, entity: impl Into<RemoteEntity>) -> Self {
        Self {
            workspace: workspace.into(),
            op: ChangeOp::Insert {
                entity: entity.into(),
            },
        }
    }

    pub fn update(workspace: impl Into<String>, entity: impl Into<RemoteEntity>) -> Self {
        Self {
            workspace: workspace.into(),
            op: ChangeOp::Update {
                entity: entity.into(),
            },
        }
    }

    pub fn delete(workspace: impl Into<String>, kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            op: ChangeOp::Delete {
                kind,
                id: id.into(),
            },
        }
    }
}
