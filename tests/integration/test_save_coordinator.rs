//! Save coordinator integration tests.
//!
//! The reload-merge-save sequence runs under a per-diagram lock, so two
//! concurrent saves for the same diagram cannot base themselves on the same
//! revision and silently drop one another's changes.

use std::sync::Arc;

use serde_json::json;
use uml_collab_api::models::{DiagramContent, DiagramPatch};
use uml_collab_api::services::SaveCoordinator;
use uml_collab_api::storage::{DiagramStore, InMemoryDiagramStore, StorageError};

fn patch(value: serde_json::Value) -> DiagramPatch {
    DiagramPatch::from_value(&value).unwrap()
}

#[tokio::test]
async fn test_concurrent_patches_both_survive() {
    let store: Arc<dyn DiagramStore> = Arc::new(InMemoryDiagramStore::new());
    let coordinator = Arc::new(SaveCoordinator::new());
    let diagram = store
        .create_diagram("Ventas".to_string(), DiagramContent::default())
        .await
        .unwrap();

    let human = patch(json!({
        "classes": [{"id": "c-human", "name": "Invoice"}]
    }));
    let agent = patch(json!({
        "classes": [{"id": "c-agent", "name": "Customer"}],
        "relations": []
    }));

    let (a, b) = tokio::join!(
        {
            let store = store.clone();
            let coordinator = coordinator.clone();
            let id = diagram.id.clone();
            async move { coordinator.apply_patch(store.as_ref(), &id, &human).await }
        },
        {
            let store = store.clone();
            let coordinator = coordinator.clone();
            let id = diagram.id.clone();
            async move { coordinator.apply_patch(store.as_ref(), &id, &agent).await }
        }
    );
    a.unwrap();
    b.unwrap();

    let stored = store.get_diagram(&diagram.id).await.unwrap().unwrap();
    assert_eq!(stored.contenido.classes.len(), 2);
    assert!(stored.contenido.class("c-human").is_some());
    assert!(stored.contenido.class("c-agent").is_some());
}

#[tokio::test]
async fn test_apply_patch_reloads_latest_revision() {
    let store: Arc<dyn DiagramStore> = Arc::new(InMemoryDiagramStore::new());
    let coordinator = SaveCoordinator::new();
    let diagram = store
        .create_diagram("Ventas".to_string(), DiagramContent::default())
        .await
        .unwrap();

    // A direct save lands while the agent round trip is in flight.
    let interleaved: DiagramContent = serde_json::from_value(json!({
        "classes": [{"id": "c1", "name": "User"}]
    }))
    .unwrap();
    store
        .replace_content(&diagram.id, interleaved)
        .await
        .unwrap();

    let agent_patch = patch(json!({
        "classes": [{"id": "c2", "name": "Order"}]
    }));
    let saved = coordinator
        .apply_patch(store.as_ref(), &diagram.id, &agent_patch)
        .await
        .unwrap();

    // The patch merged against the latest revision, not the one the agent saw.
    assert_eq!(saved.contenido.classes.len(), 2);
    assert!(saved.contenido.class("c1").is_some());
    assert!(saved.contenido.class("c2").is_some());
}

#[tokio::test]
async fn test_apply_patch_twice_is_idempotent() {
    let store: Arc<dyn DiagramStore> = Arc::new(InMemoryDiagramStore::new());
    let coordinator = SaveCoordinator::new();
    let diagram = store
        .create_diagram("Ventas".to_string(), DiagramContent::default())
        .await
        .unwrap();

    let proposal = patch(json!({
        "classes": [{"id": "c1", "name": "User"}],
        "relations": [{"id": "r1", "type": "Asociación", "source": "c1", "target": "c1"}]
    }));

    let first = coordinator
        .apply_patch(store.as_ref(), &diagram.id, &proposal)
        .await
        .unwrap();
    let second = coordinator
        .apply_patch(store.as_ref(), &diagram.id, &proposal)
        .await
        .unwrap();

    assert_eq!(first.contenido, second.contenido);
    assert_eq!(second.contenido.classes.len(), 1);
}

#[tokio::test]
async fn test_apply_patch_to_unknown_diagram_fails() {
    let store: Arc<dyn DiagramStore> = Arc::new(InMemoryDiagramStore::new());
    let coordinator = SaveCoordinator::new();

    let result = coordinator
        .apply_patch(
            store.as_ref(),
            "missing",
            &patch(json!({"classes": [{"id": "c1"}]})),
        )
        .await;

    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}
