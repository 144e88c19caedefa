//! Workspace Store - Tree Ownership and Optimistic Mutation
//!
//! This module provides the authoritative in-memory structure for one
//! workspace: every document, container, and saved query, plus the
//! operations that mutate them.
//!
//! - CRUD operations (create, read, update, delete)
//! - Hierarchy management (move/reparent with cycle prevention, cascading
//!   container deletion)
//! - Bounded version history on document edits
//! - Optimistic persistence with exact rollback on failure
//!
//! # Mutation Protocol
//!
//! Every mutation validates synchronously, applies in memory under the write
//! lock, then awaits the persistence gateway. On success the optimistic
//! state stands; on failure the specific mutation is rolled back and a
//! retryable error returned. Completions are gated by a per-entity ticket:
//! a late outcome for a mutation that has been superseded by a newer one on
//! the same entity is not allowed to touch the newer state.
//!
//! # Ownership
//!
//! The store is the sole writer of `parent_id` and `order`. It assumes
//! cooperative, one-operation-at-a-time access from its owning session;
//! cross-client concurrency arrives only through the change feed and is
//! folded in by the reconciler.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};

use crate::models::{
    Container, Document, DocumentUpdate, EntityKind, Item, SavedQuery, SavedQueryUpdate, Snapshot,
    VersionLedger,
};
use crate::persist::{PersistenceGateway, RemoteEntity};
use crate::services::error::WorkspaceError;
use crate::services::ordering::{DropIntent, OrderingEngine, PlacementPlan, SiblingSlot};

/// Broadcast channel capacity for store events.
///
/// 128 provides sufficient headroom for burst removals (cascade deletes)
/// while limiting memory overhead. Observer lag is acceptable - subscribers
/// re-read current state, they do not replay events.
const STORE_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Tunables for a [`WorkspaceStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Retention bound of each document's version ledger
    pub history_limit: usize,
    /// Capacity of the store-event broadcast channel (must be non-zero)
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_limit: VersionLedger::DEFAULT_LIMIT,
            event_capacity: STORE_EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Events emitted by the store whenever documents disappear, locally or via
/// the change feed. The presentation layer listens to clear stale selection.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Documents were removed (single delete, local cascade, or remote delete)
    DocumentsRemoved { ids: Vec<String> },

    /// The removal set contained the registered active document
    ActiveDocumentRemoved { id: String },
}

/// Exact inverse of one optimistic mutation.
enum Rollback {
    RemoveItem(String),
    RemoveSavedQuery(String),
    PutItem(Box<Item>),
    PutSavedQuery(Box<SavedQuery>),
    PutMany(Vec<Item>),
}

/// Mutable interior of the store; only ever touched under the lock.
#[derive(Default)]
struct WorkspaceState {
    items: HashMap<String, Item>,
    saved_queries: HashMap<String, SavedQuery>,
    active_document: Option<String>,
    /// Latest outstanding persistence ticket per entity id
    pending: HashMap<String, u64>,
    next_ticket: u64,
}

impl WorkspaceState {
    /// Register a new in-flight persistence attempt for `id`, superseding
    /// any earlier one.
    fn issue_ticket(&mut self, id: &str) -> u64 {
        self.next_ticket += 1;
        self.pending.insert(id.to_string(), self.next_ticket);
        self.next_ticket
    }

    fn is_latest(&self, id: &str, ticket: u64) -> bool {
        self.pending.get(id) == Some(&ticket)
    }

    fn clear_ticket(&mut self, id: &str, ticket: u64) {
        if self.is_latest(id, ticket) {
            self.pending.remove(id);
        }
    }

    /// Make any outstanding completion for `id` stale without scheduling a
    /// new one. Used when remote state lands on top of a pending local write.
    fn invalidate_pending(&mut self, id: &str) {
        if self.pending.contains_key(id) {
            self.next_ticket += 1;
            self.pending.insert(id.to_string(), self.next_ticket);
        }
    }

    fn apply_rollback(&mut self, rollback: Rollback) {
        match rollback {
            Rollback::RemoveItem(id) => {
                self.items.remove(&id);
            }
            Rollback::RemoveSavedQuery(id) => {
                self.saved_queries.remove(&id);
            }
            Rollback::PutItem(item) => {
                self.items.insert(item.id().to_string(), *item);
            }
            Rollback::PutSavedQuery(query) => {
                self.saved_queries.insert(query.id.clone(), *query);
            }
            Rollback::PutMany(items) => {
                for item in items {
                    self.items.insert(item.id().to_string(), item);
                }
            }
        }
    }

    /// `Ok` iff `parent_id` is the root or an existing container.
    fn ensure_parent(&self, parent_id: Option<&str>) -> Result<(), WorkspaceError> {
        match parent_id {
            None => Ok(()),
            Some(pid) => match self.items.get(pid) {
                Some(item) if item.is_container() => Ok(()),
                _ => Err(WorkspaceError::parent_not_found(pid)),
            },
        }
    }

    /// Reject a reparent that would make `moved_id` its own ancestor.
    fn ensure_no_cycle(
        &self,
        moved_id: &str,
        new_parent: Option<&str>,
    ) -> Result<(), WorkspaceError> {
        let mut cursor = new_parent.map(str::to_string);
        while let Some(ancestor) = cursor {
            if ancestor == moved_id {
                return Err(WorkspaceError::circular_reference(format!(
                    "cannot move container {} under its own descendant",
                    moved_id
                )));
            }
            cursor = self
                .items
                .get(&ancestor)
                .and_then(|item| item.parent_id().map(str::to_string));
        }
        Ok(())
    }

    /// Children of `parent_id` as engine slots, sorted by `(order, id)`,
    /// excluding `exclude` (the item being placed).
    fn sibling_slots(&self, parent_id: Option<&str>, exclude: Option<&str>) -> Vec<SiblingSlot> {
        let mut slots: Vec<SiblingSlot> = self
            .items
            .values()
            .filter(|item| item.parent_id() == parent_id && Some(item.id()) != exclude)
            .map(|item| SiblingSlot {
                id: item.id().to_string(),
                order: item.order(),
            })
            .collect();
        slots.sort_by(|a, b| cmp_placement(a.order, &a.id, b.order, &b.id));
        slots
    }

    /// Ids of `root_id` and every item transitively parented under it.
    fn descendant_closure(&self, root_id: &str) -> Vec<String> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for item in self.items.values() {
            if let Some(parent) = item.parent_id() {
                children.entry(parent).or_default().push(item.id());
            }
        }

        let mut closure = vec![root_id.to_string()];
        let mut cursor = 0;
        while cursor < closure.len() {
            if let Some(kids) = children.get(closure[cursor].as_str()) {
                closure.extend(kids.iter().map(|id| id.to_string()));
            }
            cursor += 1;
        }
        closure
    }
}

/// Strict total order on sibling placement: by `order`, ties broken by id.
fn cmp_placement(a_order: f64, a_id: &str, b_order: f64, b_id: &str) -> CmpOrdering {
    a_order
        .partial_cmp(&b_order)
        .unwrap_or(CmpOrdering::Equal)
        .then_with(|| a_id.cmp(b_id))
}

/// Authoritative store for one workspace's documents, containers, and saved
/// queries.
pub struct WorkspaceStore {
    workspace_id: String,
    config: StoreConfig,
    gateway: Arc<dyn PersistenceGateway>,
    state: RwLock<WorkspaceState>,
    events: broadcast::Sender<StoreEvent>,
}

impl WorkspaceStore {
    /// Create an empty store for `workspace_id`, persisting through `gateway`.
    pub fn new(workspace_id: impl Into<String>, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_config(workspace_id, gateway, StoreConfig::default())
    }

    pub fn with_config(
        workspace_id: impl Into<String>,
        gateway: Arc<dyn PersistenceGateway>,
        config: StoreConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            workspace_id: workspace_id.into(),
            config,
            gateway,
            state: RwLock::new(WorkspaceState::default()),
            events,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Subscribe to store events.
    ///
    /// Subscribers joining later do not see earlier events; lagging
    /// subscribers may miss events and should re-read current state.
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    //
    // CREATE
    //

    /// Create a document under `parent_id` (`None` = workspace root) and
    /// return its id.
    ///
    /// The new document is appended after the existing children.
    pub async fn create_document(
        &self,
        parent_id: Option<&str>,
        title: Option<&str>,
        body: Option<&str>,
    ) -> Result<String, WorkspaceError> {
        let (entity, id, ticket) = {
            let mut state = self.state.write().await;
            state.ensure_parent(parent_id)?;

            let order = OrderingEngine::append_order(&state.sibling_slots(parent_id, None));
            let doc = Document::new(
                title.unwrap_or_default(),
                body.unwrap_or_default(),
                parent_id.map(str::to_string),
                order,
            );
            let id = doc.id.clone();
            state.items.insert(id.clone(), Item::Document(doc.clone()));
            let ticket = state.issue_ticket(&id);
            (RemoteEntity::Document(doc), id, ticket)
        };

        let result = self.persist_create(entity).await;
        self.complete("create document", &id, ticket, result, Rollback::RemoveItem(id.clone()))
            .await?;
        Ok(id)
    }

    /// Create a container under `parent_id` (`None` = workspace root) and
    /// return its id.
    pub async fn create_container(
        &self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<String, WorkspaceError> {
        let (entity, id, ticket) = {
            let mut state = self.state.write().await;
            state.ensure_parent(parent_id)?;

            let order = OrderingEngine::append_order(&state.sibling_slots(parent_id, None));
            let container = Container::new(name, parent_id.map(str::to_string), order);
            let id = container.id.clone();
            state
                .items
                .insert(id.clone(), Item::Container(container.clone()));
            let ticket = state.issue_ticket(&id);
            (RemoteEntity::Container(container), id, ticket)
        };

        let result = self.persist_create(entity).await;
        self.complete("create container", &id, ticket, result, Rollback::RemoveItem(id.clone()))
            .await?;
        Ok(id)
    }

    /// Create a saved query and return its id. Saved queries are not part of
    /// the tree and never cascade.
    pub async fn create_saved_query(
        &self,
        name: &str,
        query: &str,
    ) -> Result<String, WorkspaceError> {
        let (entity, id, ticket) = {
            let mut state = self.state.write().await;
            let saved = SavedQuery::new(name, query);
            let id = saved.id.clone();
            state.saved_queries.insert(id.clone(), saved.clone());
            let ticket = state.issue_ticket(&id);
            (RemoteEntity::SavedQuery(saved), id, ticket)
        };

        let result = self.persist_create(entity).await;
        self.complete(
            "create saved query",
            &id,
            ticket,
            result,
            Rollback::RemoveSavedQuery(id.clone()),
        )
        .await?;
        Ok(id)
    }

    //
    // MOVE
    //

    /// Move an item per the drop intent: before/after a sibling, or as the
    /// last child of a container (`Into(None)` = workspace root).
    ///
    /// Reparenting a container below itself is rejected with a circular
    /// reference error and the tree is left unchanged.
    pub async fn move_item(
        &self,
        item_id: &str,
        intent: DropIntent,
    ) -> Result<(), WorkspaceError> {
        let (moved_entity, renumbered_entities, ticket, rollback) = {
            let mut state = self.state.write().await;
            let moved = state
                .items
                .get(item_id)
                .ok_or_else(|| WorkspaceError::not_found(item_id))?;
            let is_container = moved.is_container();

            let (new_parent, plan) = match &intent {
                DropIntent::Into(parent) => {
                    let parent = parent.as_deref();
                    state.ensure_parent(parent)?;
                    if is_container {
                        state.ensure_no_cycle(item_id, parent)?;
                    }
                    let slots = state.sibling_slots(parent, Some(item_id));
                    let plan = PlacementPlan {
                        order: OrderingEngine::append_order(&slots),
                        renumbered: Vec::new(),
                    };
                    (parent.map(str::to_string), plan)
                }
                DropIntent::Before(target) | DropIntent::After(target) => {
                    if target == item_id {
                        // Dropping an item next to itself is a no-op
                        return Ok(());
                    }
                    let target_item = state
                        .items
                        .get(target)
                        .ok_or_else(|| WorkspaceError::not_found(target))?;
                    let new_parent = target_item.parent_id().map(str::to_string);
                    if is_container {
                        state.ensure_no_cycle(item_id, new_parent.as_deref())?;
                    }
                    let slots = state.sibling_slots(new_parent.as_deref(), Some(item_id));
                    let plan = match &intent {
                        DropIntent::Before(_) => OrderingEngine::insert_before(&slots, target),
                        _ => OrderingEngine::insert_after(&slots, target),
                    }
                    .ok_or_else(|| WorkspaceError::not_found(target))?;
                    (new_parent, plan)
                }
            };

            // Snapshot everything the move touches, for exact rollback
            let mut prior = vec![state.items[item_id].clone()];
            for slot in &plan.renumbered {
                prior.push(state.items[&slot.id].clone());
            }

            if !plan.renumbered.is_empty() {
                tracing::debug!(
                    "sibling keys exhausted under {:?}; renumbering {} items",
                    new_parent,
                    plan.renumbered.len()
                );
            }
            for slot in &plan.renumbered {
                if let Some(item) = state.items.get_mut(&slot.id) {
                    item.set_order(slot.order);
                }
            }
            if let Some(item) = state.items.get_mut(item_id) {
                item.set_placement(new_parent, plan.order);
            }

            let ticket = state.issue_ticket(item_id);
            let moved_entity: RemoteEntity = state.items[item_id].clone().into();
            let renumbered_entities: Vec<RemoteEntity> = plan
                .renumbered
                .iter()
                .map(|slot| state.items[&slot.id].clone().into())
                .collect();
            (moved_entity, renumbered_entities, ticket, Rollback::PutMany(prior))
        };

        let mut result = self.gateway.update(moved_entity).await;
        if result.is_ok() {
            for entity in renumbered_entities {
                if let Err(err) = self.gateway.update(entity).await {
                    result = Err(err);
                    break;
                }
            }
        }
        self.complete("move item", item_id, ticket, result, rollback)
            .await
    }

    //
    // DELETE
    //

    /// Delete a document and its version ledger.
    pub async fn delete_document(&self, id: &str) -> Result<(), WorkspaceError> {
        let (ticket, rollback) = {
            let mut state = self.state.write().await;
            let removed = match state.items.remove(id) {
                Some(item @ Item::Document(_)) => item,
                Some(item) => {
                    // Not a document; put it back untouched
                    state.items.insert(id.to_string(), item);
                    return Err(WorkspaceError::not_found(id));
                }
                None => return Err(WorkspaceError::not_found(id)),
            };
            let ticket = state.issue_ticket(id);
            self.note_removed_documents(&mut state, vec![id.to_string()]);
            (ticket, Rollback::PutItem(Box::new(removed)))
        };

        let result = self.gateway.delete(EntityKind::Document, id).await;
        self.complete("delete document", id, ticket, result, rollback)
            .await
    }

    /// Delete a container and its entire descendant closure, returning the
    /// set of removed document ids so callers can react (e.g. clear a
    /// currently-open document).
    pub async fn delete_container(&self, id: &str) -> Result<HashSet<String>, WorkspaceError> {
        let (removed_documents, ticket, rollback) = {
            let mut state = self.state.write().await;
            match state.items.get(id) {
                Some(Item::Container(_)) => {}
                _ => return Err(WorkspaceError::not_found(id)),
            }

            let closure = state.descendant_closure(id);
            let mut removed_items = Vec::with_capacity(closure.len());
            let mut removed_documents = HashSet::new();
            for doomed in &closure {
                if let Some(item) = state.items.remove(doomed) {
                    if item.kind() == EntityKind::Document {
                        removed_documents.insert(doomed.clone());
                    }
                    removed_items.push(item);
                }
                // A late completion for anything inside the closure must not
                // resurrect it
                state.invalidate_pending(doomed);
            }

            let ticket = state.issue_ticket(id);
            self.note_removed_documents(
                &mut state,
                removed_documents.iter().cloned().collect(),
            );
            (removed_documents, ticket, Rollback::PutMany(removed_items))
        };

        let result = self
            .gateway
            .cascade_delete_container(id)
            .await
            .map(|server_removed| {
                let server: HashSet<String> = server_removed.into_iter().collect();
                if server != removed_documents {
                    tracing::warn!(
                        "cascade delete of {} diverged: server removed {} documents, local closure {}",
                        id,
                        server.len(),
                        removed_documents.len()
                    );
                }
            });
        self.complete("delete container", id, ticket, result, rollback)
            .await?;
        Ok(removed_documents)
    }

    /// Delete a saved query.
    pub async fn delete_saved_query(&self, id: &str) -> Result<(), WorkspaceError> {
        let (ticket, rollback) = {
            let mut state = self.state.write().await;
            let removed = state
                .saved_queries
                .remove(id)
                .ok_or_else(|| WorkspaceError::not_found(id))?;
            let ticket = state.issue_ticket(id);
            (ticket, Rollback::PutSavedQuery(Box::new(removed)))
        };

        let result = self.gateway.delete(EntityKind::SavedQuery, id).await;
        self.complete("delete saved query", id, ticket, result, rollback)
            .await
    }

    //
    // UPDATE
    //

    /// Apply a partial update to a document's editable fields.
    ///
    /// The pre-mutation `{title, body, tags}` is pushed into the version
    /// ledger before the update lands, so every edit is recoverable.
    pub async fn update_document(
        &self,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<(), WorkspaceError> {
        self.mutate_document("update document", id, move |doc, history_limit| {
            let snapshot = doc.snapshot();
            doc.history.push(snapshot, history_limit);
            doc.apply_update(update);
            true
        })
        .await
    }

    /// Make a prior snapshot the current state.
    ///
    /// Pushes the present state into the ledger first, so a restoration is
    /// itself undoable.
    pub async fn restore_version(
        &self,
        id: &str,
        snapshot: Snapshot,
    ) -> Result<(), WorkspaceError> {
        self.mutate_document("restore version", id, move |doc, history_limit| {
            let current = doc.snapshot();
            doc.history.push(current, history_limit);
            doc.title = snapshot.title;
            doc.body = snapshot.body;
            doc.tags = snapshot.tags;
            true
        })
        .await
    }

    /// Toggle the favorite flag. Does not touch the version ledger.
    pub async fn toggle_favorite(&self, id: &str) -> Result<(), WorkspaceError> {
        self.mutate_document("toggle favorite", id, |doc, _| {
            doc.is_favorite = !doc.is_favorite;
            true
        })
        .await
    }

    /// Add a tag. Does not touch the version ledger; adding an existing tag
    /// is a no-op that skips persistence.
    pub async fn add_tag(&self, id: &str, tag: &str) -> Result<(), WorkspaceError> {
        let tag = tag.to_string();
        self.mutate_document("add tag", id, move |doc, _| doc.tags.insert(tag))
            .await
    }

    /// Remove a tag. Removing an absent tag is a no-op that skips
    /// persistence.
    pub async fn remove_tag(&self, id: &str, tag: &str) -> Result<(), WorkspaceError> {
        self.mutate_document("remove tag", id, move |doc, _| doc.tags.remove(tag))
            .await
    }

    /// Rename a container.
    pub async fn rename_container(&self, id: &str, name: &str) -> Result<(), WorkspaceError> {
        let (entity, ticket, rollback) = {
            let mut state = self.state.write().await;
            let item = state
                .items
                .get_mut(id)
                .ok_or_else(|| WorkspaceError::not_found(id))?;
            let container = match item {
                Item::Container(container) => container,
                Item::Document(_) => return Err(WorkspaceError::not_found(id)),
            };
            let rollback = Rollback::PutItem(Box::new(Item::Container(container.clone())));
            container.name = name.to_string();
            container.updated_at = Utc::now();
            let entity = RemoteEntity::Container(container.clone());
            let ticket = state.issue_ticket(id);
            (entity, ticket, rollback)
        };

        let result = self.gateway.update(entity).await;
        self.complete("rename container", id, ticket, result, rollback)
            .await
    }

    /// Apply a partial update to a saved query.
    pub async fn update_saved_query(
        &self,
        id: &str,
        update: SavedQueryUpdate,
    ) -> Result<(), WorkspaceError> {
        let (entity, ticket, rollback) = {
            let mut state = self.state.write().await;
            let saved = state
                .saved_queries
                .get_mut(id)
                .ok_or_else(|| WorkspaceError::not_found(id))?;
            let rollback = Rollback::PutSavedQuery(Box::new(saved.clone()));
            if let Some(name) = update.name {
                saved.name = name;
            }
            if let Some(query) = update.query {
                saved.query = query;
            }
            saved.updated_at = Utc::now();
            let entity = RemoteEntity::SavedQuery(saved.clone());
            let ticket = state.issue_ticket(id);
            (entity, ticket, rollback)
        };

        let result = self.gateway.update(entity).await;
        self.complete("update saved query", id, ticket, result, rollback)
            .await
    }

    //
    // QUERY SURFACE
    //

    /// Children of `parent_id` (`None` = workspace root), sorted by
    /// `(order, id)`.
    pub async fn list_children(&self, parent_id: Option<&str>) -> Vec<Item> {
        let state = self.state.read().await;
        let mut children: Vec<Item> = state
            .items
            .values()
            .filter(|item| item.parent_id() == parent_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| cmp_placement(a.order(), a.id(), b.order(), b.id()));
        children
    }

    pub async fn get_item(&self, id: &str) -> Option<Item> {
        self.state.read().await.items.get(id).cloned()
    }

    pub async fn get_document(&self, id: &str) -> Option<Document> {
        let state = self.state.read().await;
        state.items.get(id).and_then(|item| item.as_document().cloned())
    }

    pub async fn get_saved_query(&self, id: &str) -> Option<SavedQuery> {
        self.state.read().await.saved_queries.get(id).cloned()
    }

    /// All saved queries, sorted by name.
    pub async fn list_saved_queries(&self) -> Vec<SavedQuery> {
        let state = self.state.read().await;
        let mut queries: Vec<SavedQuery> = state.saved_queries.values().cloned().collect();
        queries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        queries
    }

    /// Ancestor container ids of `id`, nearest first, up to the root.
    pub async fn ancestor_path(&self, id: &str) -> Result<Vec<String>, WorkspaceError> {
        let state = self.state.read().await;
        let item = state
            .items
            .get(id)
            .ok_or_else(|| WorkspaceError::not_found(id))?;

        let mut path = Vec::new();
        let mut cursor = item.parent_id().map(str::to_string);
        while let Some(ancestor) = cursor {
            cursor = state
                .items
                .get(&ancestor)
                .and_then(|item| item.parent_id().map(str::to_string));
            path.push(ancestor);
        }
        Ok(path)
    }

    /// A document's prior states, newest first.
    pub async fn history(&self, id: &str) -> Result<Vec<Snapshot>, WorkspaceError> {
        let state = self.state.read().await;
        let doc = state
            .items
            .get(id)
            .and_then(|item| item.as_document())
            .ok_or_else(|| WorkspaceError::not_found(id))?;
        Ok(doc.history.list().cloned().collect())
    }

    /// Register which document the presentation layer currently shows; the
    /// store emits [`StoreEvent::ActiveDocumentRemoved`] if a removal hits it.
    pub async fn set_active_document(&self, id: Option<String>) {
        self.state.write().await.active_document = id;
    }

    pub async fn active_document(&self) -> Option<String> {
        self.state.read().await.active_document.clone()
    }

    /// Number of items (documents + containers) currently held.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }

    //
    // REMOTE FOLD PRIMITIVES
    //
    // Dumb single-entity mutators used by the change reconciler; the
    // conflict policy lives there, not here.
    //

    /// Insert a remote entity if its id is unknown. Returns whether it was
    /// inserted.
    pub(crate) async fn remote_insert(&self, entity: RemoteEntity) -> bool {
        let mut state = self.state.write().await;
        match entity {
            RemoteEntity::Document(doc) => {
                if state.items.contains_key(&doc.id) {
                    return false;
                }
                state.items.insert(doc.id.clone(), Item::Document(doc));
                true
            }
            RemoteEntity::Container(container) => {
                if state.items.contains_key(&container.id) {
                    return false;
                }
                state
                    .items
                    .insert(container.id.clone(), Item::Container(container));
                true
            }
            RemoteEntity::SavedQuery(query) => {
                if state.saved_queries.contains_key(&query.id) {
                    return false;
                }
                state.saved_queries.insert(query.id.clone(), query);
                true
            }
        }
    }

    /// Overwrite a present entity with its remote copy. Returns whether the
    /// id was present. Preserves the local version ledger - the ledger is
    /// owned by the local edit path and never travels the feed
    /// authoritatively.
    pub(crate) async fn remote_overwrite(&self, entity: RemoteEntity) -> bool {
        let mut state = self.state.write().await;
        let id = entity.id().to_string();
        match entity {
            RemoteEntity::Document(mut doc) => {
                let existing = match state.items.get(&id) {
                    Some(Item::Document(existing)) => existing,
                    _ => return false,
                };
                doc.history = existing.history.clone();
                state.items.insert(id.clone(), Item::Document(doc));
            }
            RemoteEntity::Container(container) => {
                if !matches!(state.items.get(&id), Some(Item::Container(_))) {
                    return false;
                }
                state.items.insert(id.clone(), Item::Container(container));
            }
            RemoteEntity::SavedQuery(query) => {
                if !state.saved_queries.contains_key(&id) {
                    return false;
                }
                state.saved_queries.insert(id.clone(), query);
            }
        }
        // Remote state superseded whatever was in flight locally
        state.invalidate_pending(&id);
        true
    }

    /// Remove a remotely-deleted entity. Container removals cascade through
    /// the local closure so no orphan survives, mirroring the server-side
    /// traversal. Returns the removed document ids, or `None` if the id was
    /// not present.
    pub(crate) async fn remote_remove(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Option<Vec<String>> {
        let mut state = self.state.write().await;
        match kind {
            EntityKind::SavedQuery => {
                state.saved_queries.remove(id)?;
                state.invalidate_pending(id);
                Some(Vec::new())
            }
            EntityKind::Document => {
                match state.items.get(id) {
                    Some(Item::Document(_)) => {}
                    _ => return None,
                }
                state.items.remove(id);
                state.invalidate_pending(id);
                self.note_removed_documents(&mut state, vec![id.to_string()]);
                Some(vec![id.to_string()])
            }
            EntityKind::Container => {
                match state.items.get(id) {
                    Some(Item::Container(_)) => {}
                    _ => return None,
                }
                let closure = state.descendant_closure(id);
                let mut removed_documents = Vec::new();
                for doomed in &closure {
                    if let Some(item) = state.items.remove(doomed) {
                        if item.kind() == EntityKind::Document {
                            removed_documents.push(doomed.clone());
                        }
                    }
                    state.invalidate_pending(doomed);
                }
                self.note_removed_documents(&mut state, removed_documents.clone());
                Some(removed_documents)
            }
        }
    }

    /// Local authoritative timestamp for `id`, if the entity is present.
    pub(crate) async fn remote_updated_at(&self, id: &str) -> Option<DateTime<Utc>> {
        let state = self.state.read().await;
        state
            .items
            .get(id)
            .map(|item| item.updated_at())
            .or_else(|| state.saved_queries.get(id).map(|query| query.updated_at))
    }

    //
    // INTERNAL
    //

    /// Shared optimistic-mutation path for single-document field edits.
    ///
    /// `mutate` returns `false` to signal a no-op (nothing changed, nothing
    /// to persist).
    async fn mutate_document<F>(
        &self,
        context: &'static str,
        id: &str,
        mutate: F,
    ) -> Result<(), WorkspaceError>
    where
        F: FnOnce(&mut Document, usize) -> bool,
    {
        let history_limit = self.config.history_limit;
        let (entity, ticket, rollback) = {
            let mut state = self.state.write().await;
            let item = state
                .items
                .get_mut(id)
                .ok_or_else(|| WorkspaceError::not_found(id))?;
            let doc = match item {
                Item::Document(doc) => doc,
                Item::Container(_) => return Err(WorkspaceError::not_found(id)),
            };
            let rollback = Rollback::PutItem(Box::new(Item::Document(doc.clone())));
            if !mutate(&mut *doc, history_limit) {
                return Ok(());
            }
            doc.updated_at = Utc::now();
            let entity = RemoteEntity::Document(doc.clone());
            let ticket = state.issue_ticket(id);
            (entity, ticket, rollback)
        };

        let result = self.gateway.update(entity).await;
        self.complete(context, id, ticket, result, rollback).await
    }

    /// Await-side half of the optimistic protocol: commit or roll back one
    /// mutation, gated on the ticket still being the latest for the entity.
    async fn complete(
        &self,
        context: &str,
        id: &str,
        ticket: u64,
        result: anyhow::Result<()>,
        rollback: Rollback,
    ) -> Result<(), WorkspaceError> {
        let mut state = self.state.write().await;
        match result {
            Ok(()) => {
                state.clear_ticket(id, ticket);
                Ok(())
            }
            Err(source) => {
                if state.is_latest(id, ticket) {
                    tracing::warn!(
                        "{} failed for {}; rolling back optimistic mutation: {}",
                        context,
                        id,
                        source
                    );
                    state.apply_rollback(rollback);
                    state.pending.remove(id);
                } else {
                    // A newer mutation owns this entity now; a stale failure
                    // must not clobber it
                    tracing::debug!("{} failed for {} but was superseded; leaving state", context, id);
                }
                Err(WorkspaceError::persistence_failure(context, source))
            }
        }
    }

    async fn persist_create(&self, entity: RemoteEntity) -> anyhow::Result<()> {
        let ack = self.gateway.create(entity).await?;
        tracing::debug!("persisted {} (server time {})", ack.id, ack.updated_at);
        Ok(())
    }

    /// Emit removal notifications and clear a hit active document.
    fn note_removed_documents(&self, state: &mut WorkspaceState, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let _ = self.events.send(StoreEvent::DocumentsRemoved { ids: ids.clone() });
        if let Some(active) = state.active_document.clone() {
            if ids.iter().any(|id| *id == active) {
                state.active_document = None;
                let _ = self
                    .events
                    .send(StoreEvent::ActiveDocumentRemoved { id: active });
            }
        }
    }
}
