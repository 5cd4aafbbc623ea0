//! Diagram read/save routes.
//!
//! Only the slice of the diagram surface the realtime layer depends on lives
//! here: reading a diagram and the direct save path with its staleness guard.
//! The rest of the diagram CRUD (listing, creation, sharing) belongs to the
//! main application service.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use crate::models::{Diagram, DiagramContent};
use crate::services::save_service;

/// Create the diagrams router
pub fn diagrams_router() -> Router<AppState> {
    Router::new()
        .route("/{diagram_id}", get(get_diagram))
        .route("/{diagram_id}", put(update_diagram))
}

/// Request to save a diagram directly
#[derive(Deserialize, ToSchema)]
pub struct UpdateDiagramRequest {
    pub titulo: Option<String>,
    pub contenido: DiagramContent,
    /// `updatedAt` of the revision the client last read; updates based on a
    /// revision older than the grace window are rejected with a conflict.
    #[serde(rename = "lastUpdatedAt")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// GET /diagramas/{diagram_id} - Read a diagram
#[utoipa::path(
    get,
    path = "/diagramas/{diagram_id}",
    tag = "Diagrams",
    params(
        ("diagram_id" = String, Path, description = "Diagram id")
    ),
    responses(
        (status = 200, description = "Diagram retrieved successfully", body = Diagram),
        (status = 404, description = "Diagram not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_diagram(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(diagram_id): Path<String>,
) -> Result<Json<Diagram>, ApiError> {
    let diagram = state
        .store
        .get_diagram(&diagram_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Diagram not found: {diagram_id}")))?;

    Ok(Json(diagram))
}

/// PUT /diagramas/{diagram_id} - Save a diagram directly
///
/// Carries the coarse optimistic-concurrency check: a client saving from a
/// revision more than the grace window behind the stored one gets a 409 with
/// the current diagram and must reload, instead of silently overwriting a
/// newer save.
#[utoipa::path(
    put,
    path = "/diagramas/{diagram_id}",
    tag = "Diagrams",
    params(
        ("diagram_id" = String, Path, description = "Diagram id")
    ),
    request_body = UpdateDiagramRequest,
    responses(
        (status = 200, description = "Diagram saved successfully", body = Diagram),
        (status = 409, description = "Stale write rejected; reload the current diagram"),
        (status = 404, description = "Diagram not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_diagram(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(diagram_id): Path<String>,
    Json(request): Json<UpdateDiagramRequest>,
) -> Result<Response, ApiError> {
    // Same write discipline as the patch path: take the diagram's lock, read
    // the latest revision, then decide.
    let lock = state.save.lock_for(&diagram_id).await;
    let _guard = lock.lock().await;

    let current = state
        .store
        .get_diagram(&diagram_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Diagram not found: {diagram_id}")))?;

    if let Some(client_seen) = request.last_updated_at {
        if save_service::is_stale_write(client_seen, current.updated_at) {
            tracing::info!(
                "Rejecting stale save for diagram {}: client revision {} vs stored {}",
                diagram_id,
                client_seen,
                current.updated_at
            );
            return Ok((
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "stale_write",
                    "mensaje": "El diagrama ha sido actualizado recientemente. Por favor, recarga.",
                    "needsReload": true,
                    "currentDiagram": current,
                })),
            )
                .into_response());
        }
    }

    let saved = state
        .store
        .update_diagram(&diagram_id, request.titulo, request.contenido)
        .await?;

    Ok(Json(saved).into_response())
}
