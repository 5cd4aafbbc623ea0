//! OpenAPI specification definition.
//!
//! Aggregates the HTTP route handlers and schemas for documentation
//! generation. The WebSocket protocol is not representable here; see the
//! collaboration module for the event vocabulary.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::diagrams::get_diagram,
        crate::routes::diagrams::update_diagram,
        crate::routes::assistant::chat_with_diagram,
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::models::Diagram,
        crate::models::DiagramContent,
        crate::models::ClassNode,
        crate::models::RelationEdge,
        crate::models::RelationType,
        crate::models::DiagramPatch,
        crate::models::ClassPatch,
        crate::models::RelationPatch,
        crate::routes::diagrams::UpdateDiagramRequest,
        crate::routes::assistant::ChatRequest,
        crate::routes::assistant::ChatResponse,
        crate::routes::assistant::ChatProposal,
    )),
    tags(
        (name = "Diagrams", description = "Diagram read and direct-save endpoints"),
        (name = "Assistant", description = "Agent-assisted diagram editing"),
        (name = "OpenAPI", description = "API documentation")
    )
)]
pub struct ApiDoc;
