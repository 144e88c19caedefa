//! Notefold Core Workspace Layer
//!
//! This crate provides the data-ownership and ordering engine for the
//! Notefold knowledge base: the tree of documents and containers, sibling
//! ordering, bounded version history, and reconciliation of local optimistic
//! edits against a multi-client change feed.
//!
//! # Architecture
//!
//! - **Closed Item model**: Documents and containers are a compile-time
//!   checked sum type, not an open JSON map
//! - **Single write path**: `WorkspaceStore` is the sole mutable owner of the
//!   tree; no other component writes `parent_id` or `order`
//! - **Optimistic persistence**: mutations apply in memory first, then reach
//!   the gateway; failures roll back exactly, gated per-entity so a stale
//!   completion never clobbers newer state
//! - **Last-write-wins reconciliation**: remote events win only with a
//!   strictly newer timestamp, keeping unsaved local edits safe from feed
//!   echoes
//!
//! # Modules
//!
//! - [`models`] - Data structures (Item, Document, Container, SavedQuery, ...)
//! - [`services`] - WorkspaceStore, OrderingEngine, ChangeReconciler
//! - [`persist`] - PersistenceGateway trait, change-feed shapes, test gateway

pub mod models;
pub mod persist;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use persist::*;
pub use services::*;
