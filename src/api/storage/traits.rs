//! Storage trait definition for the diagram store backends.
//!
//! The realtime layer never caches diagram content across an await point;
//! every save path re-reads through this trait first (see the save service).

use super::StorageError;
use crate::models::{Diagram, DiagramContent};

/// Durable store of diagram records.
#[async_trait::async_trait]
pub trait DiagramStore: Send + Sync {
    /// Read a diagram by id.
    async fn get_diagram(&self, diagram_id: &str) -> Result<Option<Diagram>, StorageError>;

    /// Create a new diagram and return the stored record.
    async fn create_diagram(
        &self,
        titulo: String,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError>;

    /// Replace a diagram's content wholesale, bumping `updatedAt`.
    ///
    /// Used by the save coordinator after a merge; the title is untouched.
    async fn replace_content(
        &self,
        diagram_id: &str,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError>;

    /// Replace a diagram's title and content (direct save path).
    async fn update_diagram(
        &self,
        diagram_id: &str,
        titulo: Option<String>,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError>;

    /// Delete a diagram.
    async fn delete_diagram(&self, diagram_id: &str) -> Result<(), StorageError>;
}
