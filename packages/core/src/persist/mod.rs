//! Persistence Boundary
//!
//! The workspace store treats durable storage as an external collaborator
//! reachable through the [`PersistenceGateway`] trait. The core is
//! protocol-agnostic: any backend works as long as it provides the four
//! durable operations plus a push-based change feed with the shapes defined
//! in [`events`].
//!
//! - [`gateway`] - the `PersistenceGateway` trait and its ack types
//! - [`events`] - change-feed event shapes (`ChangeEvent`, `ChangeOp`, ...)
//! - [`memory`] - in-memory gateway with failure injection, for tests and benches

pub mod events;
pub mod gateway;
pub mod memory;

pub use events::{ChangeEvent, ChangeOp, RemoteEntity};
pub use gateway::{PersistAck, PersistenceGateway};
pub use memory::MemoryGateway;
