//! Integration Tests for Tree Operations
//!
//! Validates hierarchy management on the workspace store: creation order,
//! move/reparent semantics, cycle prevention, cascading deletion, and the
//! removal notification surface.

#[cfg(test)]
mod tree_tests {
    use crate::models::Item;
    use crate::persist::MemoryGateway;
    use crate::services::ordering::DropIntent;
    use crate::services::workspace_store::{StoreEvent, WorkspaceStore};
    use crate::services::WorkspaceError;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Helper to create a test store backed by the in-memory gateway
    fn create_test_store() -> (Arc<WorkspaceStore>, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        let store = Arc::new(WorkspaceStore::new("ws-test", gateway.clone()));
        (store, gateway)
    }

    fn child_ids(children: &[Item]) -> Vec<&str> {
        children.iter().map(|item| item.id()).collect()
    }

    #[tokio::test]
    async fn test_create_appends_after_existing_children() {
        let (store, _gateway) = create_test_store();

        let folder = store.create_container(None, "Folder").await.unwrap();
        let d1 = store
            .create_document(Some(&folder), Some("first"), None)
            .await
            .unwrap();
        let d2 = store
            .create_document(Some(&folder), Some("second"), None)
            .await
            .unwrap();

        let children = store.list_children(Some(&folder)).await;
        assert_eq!(child_ids(&children), vec![d1.as_str(), d2.as_str()]);
        assert_eq!(children[0].order(), 1.0);
        assert_eq!(children[1].order(), 2.0);
    }

    #[tokio::test]
    async fn test_create_under_missing_parent_fails() {
        let (store, _gateway) = create_test_store();

        let err = store
            .create_document(Some("no-such-folder"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::ParentNotFound { .. }));
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_under_document_fails() {
        let (store, _gateway) = create_test_store();

        let doc = store.create_document(None, Some("note"), None).await.unwrap();
        let err = store
            .create_container(Some(&doc), "inside a note")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::ParentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_move_before_sibling() {
        let (store, _gateway) = create_test_store();

        let folder = store.create_container(None, "A").await.unwrap();
        let d1 = store
            .create_document(Some(&folder), Some("d1"), None)
            .await
            .unwrap();
        let d2 = store
            .create_document(Some(&folder), Some("d2"), None)
            .await
            .unwrap();

        store
            .move_item(&d2, DropIntent::Before(d1.clone()))
            .await
            .unwrap();

        let moved = store.get_item(&d2).await.unwrap();
        let target = store.get_item(&d1).await.unwrap();
        assert!(moved.order() < target.order());
        assert_eq!(moved.parent_id(), Some(folder.as_str()));
        assert_eq!(target.parent_id(), Some(folder.as_str()));

        let children = store.list_children(Some(&folder)).await;
        assert_eq!(child_ids(&children), vec![d2.as_str(), d1.as_str()]);
    }

    #[tokio::test]
    async fn test_move_before_leaves_other_siblings_in_place() {
        let (store, _gateway) = create_test_store();

        let folder = store.create_container(None, "A").await.unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(
                store
                    .create_document(Some(&folder), Some(&format!("d{}", i)), None)
                    .await
                    .unwrap(),
            );
        }

        // Move the last document before the second one
        store
            .move_item(&ids[4], DropIntent::Before(ids[1].clone()))
            .await
            .unwrap();

        let children = store.list_children(Some(&folder)).await;
        assert_eq!(
            child_ids(&children),
            vec![
                ids[0].as_str(),
                ids[4].as_str(),
                ids[1].as_str(),
                ids[2].as_str(),
                ids[3].as_str(),
            ]
        );
    }

    #[tokio::test]
    async fn test_move_after_sibling() {
        let (store, _gateway) = create_test_store();

        let d1 = store.create_document(None, Some("d1"), None).await.unwrap();
        let d2 = store.create_document(None, Some("d2"), None).await.unwrap();
        let d3 = store.create_document(None, Some("d3"), None).await.unwrap();

        store
            .move_item(&d1, DropIntent::After(d2.clone()))
            .await
            .unwrap();

        let children = store.list_children(None).await;
        assert_eq!(child_ids(&children), vec![d2.as_str(), d1.as_str(), d3.as_str()]);
    }

    #[tokio::test]
    async fn test_move_into_reparents_to_end() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let b = store.create_container(None, "B").await.unwrap();
        let d1 = store
            .create_document(Some(&a), Some("d1"), None)
            .await
            .unwrap();
        let d2 = store
            .create_document(Some(&b), Some("d2"), None)
            .await
            .unwrap();

        store
            .move_item(&d1, DropIntent::Into(Some(b.clone())))
            .await
            .unwrap();

        assert!(store.list_children(Some(&a)).await.is_empty());
        let children = store.list_children(Some(&b)).await;
        assert_eq!(child_ids(&children), vec![d2.as_str(), d1.as_str()]);
    }

    #[tokio::test]
    async fn test_move_to_root() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let d = store
            .create_document(Some(&a), Some("d"), None)
            .await
            .unwrap();

        store.move_item(&d, DropIntent::Into(None)).await.unwrap();

        let moved = store.get_item(&d).await.unwrap();
        assert_eq!(moved.parent_id(), None);
        // Appended after the root's existing child "A"
        let roots = store.list_children(None).await;
        assert_eq!(child_ids(&roots), vec![a.as_str(), d.as_str()]);
    }

    #[tokio::test]
    async fn test_move_into_own_descendant_fails() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let b = store.create_container(Some(&a), "B").await.unwrap();
        let d = store
            .create_document(Some(&b), Some("d"), None)
            .await
            .unwrap();

        let before: Vec<_> = [
            store.get_item(&a).await.unwrap(),
            store.get_item(&b).await.unwrap(),
            store.get_item(&d).await.unwrap(),
        ]
        .to_vec();

        let err = store
            .move_item(&a, DropIntent::Into(Some(b.clone())))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::CircularReference { .. }));

        // Tree unchanged, including placements and timestamps
        let after = [
            store.get_item(&a).await.unwrap(),
            store.get_item(&b).await.unwrap(),
            store.get_item(&d).await.unwrap(),
        ];
        assert_eq!(before, after.to_vec());
    }

    #[tokio::test]
    async fn test_move_into_itself_fails() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let err = store
            .move_item(&a, DropIntent::Into(Some(a.clone())))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::CircularReference { .. }));
    }

    #[tokio::test]
    async fn test_move_missing_item_or_target_fails() {
        let (store, _gateway) = create_test_store();

        let d = store.create_document(None, Some("d"), None).await.unwrap();

        let err = store
            .move_item("ghost", DropIntent::Into(None))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));

        let err = store
            .move_item(&d, DropIntent::Before("ghost".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_repeated_drop_at_same_point_keeps_strict_order() {
        let (store, _gateway) = create_test_store();

        let folder = store.create_container(None, "A").await.unwrap();
        let anchor = store
            .create_document(Some(&folder), Some("anchor"), None)
            .await
            .unwrap();

        // Keep dropping new documents just before the anchor; far past f64
        // midpoint precision, so the renumbering path must engage
        for i in 0..60 {
            let doc = store
                .create_document(Some(&folder), Some(&format!("n{}", i)), None)
                .await
                .unwrap();
            store
                .move_item(&doc, DropIntent::Before(anchor.clone()))
                .await
                .unwrap();
        }

        let children = store.list_children(Some(&folder)).await;
        assert_eq!(children.len(), 61);
        assert_eq!(children.last().unwrap().id(), anchor.as_str());
        for pair in children.windows(2) {
            assert!(
                pair[0].order() < pair[1].order()
                    || (pair[0].order() == pair[1].order() && pair[0].id() < pair[1].id())
            );
        }
        // The most recent drop sits directly before the anchor
        assert_eq!(children[59].as_document().unwrap().title, "n59");
    }

    #[tokio::test]
    async fn test_cascade_delete_returns_removed_documents() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let d1 = store
            .create_document(Some(&a), Some("d1"), None)
            .await
            .unwrap();
        let b = store.create_container(Some(&a), "B").await.unwrap();
        let d2 = store
            .create_document(Some(&b), Some("d2"), None)
            .await
            .unwrap();

        let removed = store.delete_container(&a).await.unwrap();
        let expected: HashSet<String> = [d1.clone(), d2.clone()].into_iter().collect();
        assert_eq!(removed, expected);

        assert!(store.get_item(&a).await.is_none());
        assert!(store.get_item(&b).await.is_none());
        assert!(store.get_item(&d1).await.is_none());
        assert!(store.get_item(&d2).await.is_none());
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_cascade_delete_depth_three() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let b = store.create_container(Some(&a), "B").await.unwrap();
        let c = store.create_container(Some(&b), "C").await.unwrap();
        let d1 = store
            .create_document(Some(&a), Some("top"), None)
            .await
            .unwrap();
        let d2 = store
            .create_document(Some(&b), Some("middle"), None)
            .await
            .unwrap();
        let d3 = store
            .create_document(Some(&c), Some("deep"), None)
            .await
            .unwrap();
        let outside = store
            .create_document(None, Some("outside"), None)
            .await
            .unwrap();

        let removed = store.delete_container(&a).await.unwrap();
        let expected: HashSet<String> = [d1, d2, d3].into_iter().collect();
        assert_eq!(removed, expected);

        // The unrelated document survives
        assert!(store.get_item(&outside).await.is_some());
        assert_eq!(store.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_container_rejects_document_id() {
        let (store, _gateway) = create_test_store();

        let d = store.create_document(None, Some("d"), None).await.unwrap();
        let err = store.delete_container(&d).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
        assert!(store.get_item(&d).await.is_some());
    }

    #[tokio::test]
    async fn test_ancestor_path_nearest_first() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let b = store.create_container(Some(&a), "B").await.unwrap();
        let c = store.create_container(Some(&b), "C").await.unwrap();
        let d = store
            .create_document(Some(&c), Some("d"), None)
            .await
            .unwrap();

        let path = store.ancestor_path(&d).await.unwrap();
        assert_eq!(path, vec![c.clone(), b.clone(), a.clone()]);

        assert!(store.ancestor_path(&a).await.unwrap().is_empty());
        assert!(matches!(
            store.ancestor_path("ghost").await.unwrap_err(),
            WorkspaceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_cascade_delete_clears_active_document() {
        let (store, _gateway) = create_test_store();

        let a = store.create_container(None, "A").await.unwrap();
        let d = store
            .create_document(Some(&a), Some("open note"), None)
            .await
            .unwrap();
        store.set_active_document(Some(d.clone())).await;

        let mut events = store.subscribe_to_events();
        store.delete_container(&a).await.unwrap();

        match events.recv().await.unwrap() {
            StoreEvent::DocumentsRemoved { ids } => assert_eq!(ids, vec![d.clone()]),
            other => panic!("expected DocumentsRemoved, got {:?}", other),
        }
        match events.recv().await.unwrap() {
            StoreEvent::ActiveDocumentRemoved { id } => assert_eq!(id, d),
            other => panic!("expected ActiveDocumentRemoved, got {:?}", other),
        }
        assert_eq!(store.active_document().await, None);
    }
}
