//! PersistenceGateway Trait - Durable Storage Abstraction
//!
//! This module defines the `PersistenceGateway` trait that abstracts the
//! auth/data backend the workspace syncs against. The trait enables multiple
//! backend implementations (hosted API, local database, in-memory test
//! double) without changing business logic in the workspace store.
//!
//! # Architecture
//!
//! - **Abstraction Point**: Between the workspace store (business logic) and
//!   the backend transport
//! - **Async-First**: All methods are async; every durable operation is a
//!   suspension point, and the store applies mutations optimistically before
//!   awaiting the result
//! - **Ownership Semantics**: Methods take owned entity values to avoid
//!   unnecessary cloning (caller clones if it needs to retain the original)
//! - **Error Handling**: `anyhow::Result` for flexible error context; the
//!   store wraps failures into its own typed error and rolls back
//!
//! # Examples
//!
//! ```rust,no_run
//! use notefold_core::persist::{MemoryGateway, PersistenceGateway, RemoteEntity};
//! use notefold_core::models::Document;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway: Arc<dyn PersistenceGateway> = Arc::new(MemoryGateway::new());
//!
//!     let doc = Document::new("My note", "", None, 1.0);
//!     let ack = gateway.create(RemoteEntity::Document(doc)).await?;
//!     println!("persisted as {}", ack.id);
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::events::{ChangeEvent, RemoteEntity};
use crate::models::EntityKind;

/// Acknowledgement returned by [`PersistenceGateway::create`].
///
/// Server-assigned timestamps are advisory: the authoritative copy of the
/// entity round-trips through the change feed and is reconciled by the
/// last-write-wins rule, so callers do not patch these values back in.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistAck {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Abstraction layer for durable workspace persistence.
///
/// Implementations must be `Send + Sync` to allow usage in async contexts
/// where futures may be moved between threads.
///
/// # Method Categories
///
/// - **Durable mutations**: `create`, `update`, `delete`,
///   `cascade_delete_container`
/// - **Change feed**: `subscribe`
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Durably create an entity.
    ///
    /// The client assigns the id up front (optimistic UI keeps working while
    /// the request is in flight); the backend must preserve it.
    async fn create(&self, entity: RemoteEntity) -> Result<PersistAck>;

    /// Durably overwrite an entity's fields.
    async fn update(&self, entity: RemoteEntity) -> Result<()>;

    /// Durably delete a single entity.
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()>;

    /// Durably delete a container and its entire descendant closure.
    ///
    /// Returns the ids of every document removed by the server-side
    /// traversal. The closure semantics must match the client's: every
    /// container whose parent chain leads back to `id`, and every document
    /// parented anywhere in that closure.
    async fn cascade_delete_container(&self, id: &str) -> Result<Vec<String>>;

    /// Subscribe to the workspace's change feed.
    ///
    /// Events arrive in delivery order for as long as the receiver is held.
    async fn subscribe(&self, workspace_id: &str) -> Result<mpsc::Receiver<ChangeEvent>>;
}
