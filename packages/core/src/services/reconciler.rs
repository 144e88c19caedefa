//! Change Reconciler
//!
//! Folds remote change-feed events into the workspace store. This is the
//! single place the multi-client conflict policy lives; it is not duplicated
//! per entity kind.
//!
//! # Policy
//!
//! - Events for a different workspace are ignored (a shared feed must not
//!   leak entities across tenants)
//! - `Insert`: applied only if the id is unknown locally
//! - `Update`: remote wins only if its `updated_at` is strictly newer than
//!   the local copy's; otherwise the event is discarded. The common discard
//!   is a stale echo of this client's own write round-tripping through the
//!   feed while a newer unsaved local edit is in flight.
//! - `Delete`: removes the local copy if present; container deletions
//!   cascade through the local closure. Removed documents surface on the
//!   store's notification channel.
//!
//! Discards are expected steady-state behavior, not errors; they are logged
//! at debug and reported as [`ReconcileOutcome::Discarded`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_stream::{Stream, StreamExt};

use crate::persist::{ChangeEvent, ChangeOp};
use crate::services::workspace_store::WorkspaceStore;

/// What happened to one folded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event changed local state
    Applied,
    /// A stale `Update` lost the timestamp comparison
    Discarded,
    /// The event did not apply (wrong workspace, unknown id, duplicate insert)
    Ignored,
}

/// Folds the remote change feed into a [`WorkspaceStore`].
pub struct ChangeReconciler {
    store: Arc<WorkspaceStore>,
    /// Timestamp of the last applied event per entity id; the only state the
    /// reconciler keeps, used for the `Update` comparison fast path.
    last_applied: HashMap<String, DateTime<Utc>>,
}

impl ChangeReconciler {
    pub fn new(store: Arc<WorkspaceStore>) -> Self {
        Self {
            store,
            last_applied: HashMap::new(),
        }
    }

    /// Fold one event into the store.
    pub async fn apply(&mut self, event: ChangeEvent) -> ReconcileOutcome {
        if event.workspace != self.store.workspace_id() {
            tracing::debug!(
                "ignoring event for foreign workspace {} (this is {})",
                event.workspace,
                self.store.workspace_id()
            );
            return ReconcileOutcome::Ignored;
        }

        match event.op {
            ChangeOp::Insert { entity } => {
                let id = entity.id().to_string();
                let remote_ts = entity.updated_at();
                if self.store.remote_insert(entity).await {
                    self.last_applied.insert(id, remote_ts);
                    ReconcileOutcome::Applied
                } else {
                    tracing::debug!("insert for already-present {}; ignoring", id);
                    ReconcileOutcome::Ignored
                }
            }

            ChangeOp::Update { entity } => {
                let id = entity.id().to_string();
                let remote_ts = entity.updated_at();

                // Fast path: an event at or before the last applied one for
                // this id can never win; re-delivery is idempotent
                if let Some(&seen) = self.last_applied.get(&id) {
                    if remote_ts <= seen {
                        tracing::debug!("discarding replayed update for {}", id);
                        return ReconcileOutcome::Discarded;
                    }
                }

                let local_ts = match self.store.remote_updated_at(&id).await {
                    Some(ts) => ts,
                    None => {
                        tracing::debug!("update for never-seen {}; ignoring", id);
                        return ReconcileOutcome::Ignored;
                    }
                };
                if remote_ts <= local_ts {
                    // Stale echo of a prior local write; the local copy
                    // (possibly an unsaved newer edit) stands
                    tracing::debug!(
                        "discarding stale update for {} (remote {} <= local {})",
                        id,
                        remote_ts,
                        local_ts
                    );
                    return ReconcileOutcome::Discarded;
                }

                if self.store.remote_overwrite(entity).await {
                    self.last_applied.insert(id, remote_ts);
                    ReconcileOutcome::Applied
                } else {
                    ReconcileOutcome::Ignored
                }
            }

            ChangeOp::Delete { kind, id } => match self.store.remote_remove(kind, &id).await {
                Some(removed_documents) => {
                    self.last_applied.remove(&id);
                    for doc_id in &removed_documents {
                        self.last_applied.remove(doc_id);
                    }
                    ReconcileOutcome::Applied
                }
                None => {
                    tracing::debug!("delete for absent {}; ignoring", id);
                    ReconcileOutcome::Ignored
                }
            },
        }
    }

    /// Drain a change feed until it closes.
    pub async fn run<S>(mut self, mut feed: S)
    where
        S: Stream<Item = ChangeEvent> + Unpin,
    {
        while let Some(event) = feed.next().await {
            let outcome = self.apply(event).await;
            tracing::debug!("reconciled remote event: {:?}", outcome);
        }
        tracing::info!(
            "change feed for workspace {} closed",
            self.store.workspace_id()
        );
    }
}
