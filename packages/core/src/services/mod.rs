//! Business Services
//!
//! This module contains the core services of the workspace:
//!
//! - `WorkspaceStore` - tree ownership, CRUD, hierarchy management, and
//!   optimistic persistence with rollback
//! - `OrderingEngine` - fractional sibling order keys with integer
//!   renumbering on precision exhaustion
//! - `ChangeReconciler` - folds the remote change feed into the store under
//!   the last-write-wins policy
//!
//! Services coordinate between the in-memory state and the persistence
//! gateway, implementing the invariants the rest of the application leans on.

pub mod error;
pub mod ordering;
pub mod reconciler;
pub mod workspace_store;

pub use error::WorkspaceError;
pub use ordering::{DropIntent, OrderingEngine, PlacementPlan, SiblingSlot};
pub use reconciler::{ChangeReconciler, ReconcileOutcome};
pub use workspace_store::{StoreConfig, StoreEvent, WorkspaceStore};

mod workspace_store_tree_test;
