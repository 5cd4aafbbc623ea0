//! Assistant routes.
//!
//! A chat request hands the diagram to the agent; when the agent proposes a
//! patch, the patch is merged against the latest persisted revision, saved,
//! and announced to the diagram's room as an authoritative update.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::collaboration;
use super::error::ApiError;
use crate::models::{DiagramContent, DiagramPatch};

/// Create the assistant router
pub fn assistant_router() -> Router<AppState> {
    Router::new().route("/diagramas/{diagram_id}/chat", post(chat_with_diagram))
}

/// Request to chat with the assistant about a diagram
#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub user_message: String,
    pub intent: Option<String>,
    /// Diagram the client is currently editing; when omitted the stored
    /// revision is sent to the agent instead.
    pub diagram: Option<DiagramContent>,
}

/// Patch proposal in the assistant response
#[derive(Serialize, ToSchema)]
pub struct ChatProposal {
    pub patch: DiagramPatch,
}

/// Assistant response
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[schema(value_type = Object)]
    pub analysis: Value,
    pub proposal: ChatProposal,
    pub diagram_id: String,
    /// Whether the proposal was merged and persisted.
    pub applied: bool,
    /// Whether the stored revision (rather than a client-supplied one) was
    /// the agent's context.
    pub used_saved_diagram: bool,
}

/// POST /assistant/diagramas/{diagram_id}/chat - Chat with the agent about a diagram
#[utoipa::path(
    post,
    path = "/assistant/diagramas/{diagram_id}/chat",
    tag = "Assistant",
    params(
        ("diagram_id" = String, Path, description = "Diagram id")
    ),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Agent reply, applied when it proposed changes", body = ChatResponse),
        (status = 404, description = "Diagram not found"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Agent unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn chat_with_diagram(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(diagram_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let stored = state
        .store
        .get_diagram(&diagram_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Diagram not found: {diagram_id}")))?;

    // The agent sees what the client sees; the stored revision is only the
    // fallback context. The merge below never trusts either copy - it always
    // re-reads before applying.
    let used_saved_diagram = request.diagram.is_none();
    let context = request.diagram.unwrap_or(stored.contenido);
    let intent = request.intent.as_deref().unwrap_or("chat");

    let reply = state
        .agent
        .call(&context, intent, &request.user_message)
        .await
        .map_err(|e| {
            tracing::warn!("Agent call failed for diagram {}: {}", diagram_id, e);
            ApiError::bad_gateway(format!("assistant_failed: {e}"))
        })?;

    let applied = !reply.patch.is_empty();
    if applied {
        // Reload-merge-save, serialized per diagram; the agent round trip may
        // have taken seconds and the stored revision may have moved on.
        let saved = state
            .save
            .apply_patch(state.store.as_ref(), &diagram_id, &reply.patch)
            .await?;

        info!(
            "Agent patch applied to diagram {} ({} classes, {} relations)",
            diagram_id,
            saved.contenido.classes.len(),
            saved.contenido.relations.len()
        );
        collaboration::broadcast_agent_update(
            &state,
            &diagram_id,
            reply.patch.clone(),
            saved.contenido,
            reply
                .message
                .clone()
                .unwrap_or_else(|| "Diagram updated by the assistant".to_string()),
        )
        .await;
    }

    Ok(Json(ChatResponse {
        analysis: reply.analysis,
        proposal: ChatProposal { patch: reply.patch },
        diagram_id,
        applied,
        used_saved_diagram,
    }))
}
