//! In-memory diagram store.
//!
//! Used by tests and by single-process deployments without DATABASE_URL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DiagramStore, StorageError};
use crate::models::{Diagram, DiagramContent};

/// Diagram store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryDiagramStore {
    diagrams: Arc<RwLock<HashMap<String, Diagram>>>,
}

impl InMemoryDiagramStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiagramStore for InMemoryDiagramStore {
    async fn get_diagram(&self, diagram_id: &str) -> Result<Option<Diagram>, StorageError> {
        let diagrams = self.diagrams.read().await;
        Ok(diagrams.get(diagram_id).cloned())
    }

    async fn create_diagram(
        &self,
        titulo: String,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError> {
        let diagram = Diagram {
            id: Uuid::new_v4().to_string(),
            titulo,
            contenido,
            updated_at: Utc::now(),
        };
        let mut diagrams = self.diagrams.write().await;
        diagrams.insert(diagram.id.clone(), diagram.clone());
        Ok(diagram)
    }

    async fn replace_content(
        &self,
        diagram_id: &str,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError> {
        let mut diagrams = self.diagrams.write().await;
        let diagram = diagrams
            .get_mut(diagram_id)
            .ok_or_else(|| StorageError::NotFound {
                diagram_id: diagram_id.to_string(),
            })?;
        diagram.contenido = contenido;
        diagram.updated_at = Utc::now();
        Ok(diagram.clone())
    }

    async fn update_diagram(
        &self,
        diagram_id: &str,
        titulo: Option<String>,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError> {
        let mut diagrams = self.diagrams.write().await;
        let diagram = diagrams
            .get_mut(diagram_id)
            .ok_or_else(|| StorageError::NotFound {
                diagram_id: diagram_id.to_string(),
            })?;
        if let Some(titulo) = titulo {
            diagram.titulo = titulo;
        }
        diagram.contenido = contenido;
        diagram.updated_at = Utc::now();
        Ok(diagram.clone())
    }

    async fn delete_diagram(&self, diagram_id: &str) -> Result<(), StorageError> {
        let mut diagrams = self.diagrams.write().await;
        diagrams
            .remove(diagram_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                diagram_id: diagram_id.to_string(),
            })
    }
}
