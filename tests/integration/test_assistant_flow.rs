//! Assistant flow integration tests.
//!
//! Uses the mock agent (always proposes the Customer/Order patch) to exercise
//! the full chat -> reload-merge-save -> broadcast sequence.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use uml_collab_api::models::DiagramContent;
use uml_collab_api::routes::collaboration::{RoomFrame, ServerEvent};
use uml_collab_api::routes::{self, AppState};
use uml_collab_api::services::{AgentService, JwtService};
use uml_collab_api::storage::{DiagramStore, InMemoryDiagramStore};

const TEST_SECRET: &str = "test-secret-key-at-least-32-chars";

fn test_state() -> AppState {
    AppState::with_components(
        Arc::new(InMemoryDiagramStore::new()),
        AgentService::mock(),
        JwtService::new(TEST_SECRET),
    )
}

fn test_server(state: &AppState) -> TestServer {
    TestServer::new(routes::create_api_router().with_state(state.clone())).unwrap()
}

fn sample_content() -> DiagramContent {
    serde_json::from_value(json!({
        "classes": [{"id": "c1", "name": "User", "attributes": ["id (PK)"]}],
        "relations": []
    }))
    .unwrap()
}

#[tokio::test]
async fn test_chat_on_unknown_diagram_is_404() {
    let state = test_state();
    let server = test_server(&state);
    let token = state.jwt.issue_token("user-1", "alice").unwrap();

    let response = server
        .post("/assistant/diagramas/missing/chat")
        .authorization_bearer(&token)
        .json(&json!({"user_message": "hola"}))
        .await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_chat_applies_patch_and_persists_merge() {
    let state = test_state();
    let diagram = state
        .store
        .create_diagram("Ventas".to_string(), sample_content())
        .await
        .unwrap();
    let server = test_server(&state);
    let token = state.jwt.issue_token("user-1", "alice").unwrap();

    let response = server
        .post(&format!("/assistant/diagramas/{}/chat", diagram.id))
        .authorization_bearer(&token)
        .json(&json!({"user_message": "convert this to an e-commerce model"}))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["applied"], true);
    assert_eq!(body["usedSavedDiagram"], true);
    assert_eq!(body["diagramId"], diagram.id);
    assert_eq!(
        body["proposal"]["patch"]["classes"].as_array().unwrap().len(),
        2
    );

    // merged against the stored revision: existing class kept, proposal appended
    let stored = state.store.get_diagram(&diagram.id).await.unwrap().unwrap();
    assert_eq!(stored.contenido.classes.len(), 3);
    assert!(stored.contenido.class("c1").is_some());
    let names: Vec<&str> = stored
        .contenido
        .classes
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert!(names.contains(&"Customer"));
    assert!(names.contains(&"Order"));
    assert_eq!(stored.contenido.relations.len(), 1);
    assert!(stored.updated_at >= diagram.updated_at);
}

#[tokio::test]
async fn test_chat_broadcasts_agent_update_to_the_room() {
    let state = test_state();
    let diagram = state
        .store
        .create_diagram("Ventas".to_string(), sample_content())
        .await
        .unwrap();

    // Stand in for a joined room: a live channel keyed by the diagram id.
    let (tx, mut rx) = broadcast::channel::<RoomFrame>(16);
    state
        .room_channels
        .lock()
        .await
        .insert(diagram.id.clone(), tx);

    let server = test_server(&state);
    let token = state.jwt.issue_token("user-1", "alice").unwrap();
    let response = server
        .post(&format!("/assistant/diagramas/{}/chat", diagram.id))
        .authorization_bearer(&token)
        .json(&json!({"user_message": "convert this"}))
        .await;
    assert_eq!(response.status_code(), 200);

    let frame = rx.try_recv().expect("agent update must be broadcast");
    // server-originated: no sender to exclude, every member receives it
    assert!(frame.origin.is_none());
    match frame.event {
        ServerEvent::AgentUpdate {
            kind,
            updated_diagram,
            patch,
            ..
        } => {
            assert_eq!(kind, "diagram_modified");
            assert_eq!(updated_diagram.classes.len(), 3);
            assert_eq!(patch.classes.len(), 2);
        }
        other => panic!("expected agent-update, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_with_client_diagram_skips_stored_context() {
    let state = test_state();
    let diagram = state
        .store
        .create_diagram("Ventas".to_string(), sample_content())
        .await
        .unwrap();
    let server = test_server(&state);
    let token = state.jwt.issue_token("user-1", "alice").unwrap();

    let response = server
        .post(&format!("/assistant/diagramas/{}/chat", diagram.id))
        .authorization_bearer(&token)
        .json(&json!({
            "user_message": "work on my local copy",
            "diagram": {"classes": [], "relations": []}
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["usedSavedDiagram"], false);
    // the merge still ran against the stored revision, not the client copy
    let stored = state.store.get_diagram(&diagram.id).await.unwrap().unwrap();
    assert!(stored.contenido.class("c1").is_some());
}
