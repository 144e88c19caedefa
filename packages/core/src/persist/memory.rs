//! In-Memory Gateway
//!
//! A `PersistenceGateway` backed by a process-local map, used by unit tests
//! and benchmarks. Supports scripted failure injection to exercise the
//! store's rollback path, and exposes a feed handle so tests can emit
//! synthetic remote events.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::events::{ChangeEvent, RemoteEntity};
use super::gateway::{PersistAck, PersistenceGateway};
use crate::models::EntityKind;

/// Feed channel capacity; tests emit small bursts only.
const FEED_CHANNEL_CAPACITY: usize = 64;

/// In-memory [`PersistenceGateway`] implementation.
#[derive(Default)]
pub struct MemoryGateway {
    entities: Mutex<HashMap<String, RemoteEntity>>,
    feed: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
    failures_remaining: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` durable operations fail.
    pub fn inject_failures(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Emit a synthetic event on the change feed, if anyone subscribed.
    pub async fn emit(&self, event: ChangeEvent) {
        let sender = self.feed.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// Entity currently stored under `id`, if any.
    pub fn stored(&self, id: &str) -> Option<RemoteEntity> {
        self.entities.lock().unwrap().get(id).cloned()
    }

    /// Number of stored entities across all kinds.
    pub fn len(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.lock().unwrap().is_empty()
    }

    fn check_failure(&self, op: &str) -> Result<()> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            bail!("injected {} failure", op);
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn create(&self, entity: RemoteEntity) -> Result<PersistAck> {
        self.check_failure("create")?;
        let ack = PersistAck {
            id: entity.id().to_string(),
            created_at: chrono::Utc::now(),
            updated_at: entity.updated_at(),
        };
        self.entities
            .lock()
            .unwrap()
            .insert(entity.id().to_string(), entity);
        Ok(ack)
    }

    async fn update(&self, entity: RemoteEntity) -> Result<()> {
        self.check_failure("update")?;
        let mut entities = self.entities.lock().unwrap();
        if !entities.contains_key(entity.id()) {
            bail!("unknown entity: {}", entity.id());
        }
        entities.insert(entity.id().to_string(), entity);
        Ok(())
    }

    async fn delete(&self, _kind: EntityKind, id: &str) -> Result<()> {
        self.check_failure("delete")?;
        self.entities.lock().unwrap().remove(id);
        Ok(())
    }

    async fn cascade_delete_container(&self, id: &str) -> Result<Vec<String>> {
        self.check_failure("cascade delete")?;
        let mut entities = self.entities.lock().unwrap();

        // Server-side closure traversal over the flat entity map
        let mut doomed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            for entity in entities.values() {
                let parent_id = match entity {
                    RemoteEntity::Document(doc) => doc.parent_id.as_deref(),
                    RemoteEntity::Container(container) => container.parent_id.as_deref(),
                    RemoteEntity::SavedQuery(_) => None,
                };
                if parent_id == Some(parent.as_str()) && !doomed.iter().any(|d| d == entity.id()) {
                    doomed.push(entity.id().to_string());
                }
            }
            cursor += 1;
        }

        let mut removed_documents = Vec::new();
        for id in &doomed {
            if let Some(RemoteEntity::Document(_)) = entities.remove(id) {
                removed_documents.push(id.clone());
            }
        }
        Ok(removed_documents)
    }

    async fn subscribe(&self, _workspace_id: &str) -> Result<mpsc::Receiver<ChangeEvent>> {
        let (sender, receiver) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        *self.feed.lock().unwrap() = Some(sender);
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Container, Document};

    #[tokio::test]
    async fn test_cascade_removes_nested_closure() {
        let gateway = MemoryGateway::new();

        let root = Container::new("root", None, 1.0);
        let child = Container::new("child", Some(root.id.clone()), 1.0);
        let doc = Document::new("nested", "", Some(child.id.clone()), 1.0);
        let doc_id = doc.id.clone();

        gateway.create(root.clone().into()).await.unwrap();
        gateway.create(child.into()).await.unwrap();
        gateway.create(doc.into()).await.unwrap();

        let removed = gateway.cascade_delete_container(&root.id).await.unwrap();
        assert_eq!(removed, vec![doc_id]);
        assert!(gateway.is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection_is_consumed() {
        let gateway = MemoryGateway::new();
        gateway.inject_failures(1);

        let doc = Document::new("a", "", None, 1.0);
        assert!(gateway.create(doc.clone().into()).await.is_err());
        assert!(gateway.create(doc.into()).await.is_ok());
    }
}
