//! PostgreSQL diagram store.
//!
//! Schema is created on startup (`init_schema`); diagram content is stored as
//! a JSONB document and treated as opaque apart from (de)serialization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{DiagramStore, StorageError};
use crate::models::{Diagram, DiagramContent};

/// Diagram store backed by a PostgreSQL pool.
pub struct PostgresDiagramStore {
    pool: PgPool,
}

impl PostgresDiagramStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the diagrams table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS diagramas (
                id TEXT PRIMARY KEY,
                titulo TEXT NOT NULL,
                contenido JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_diagram(row: &PgRow) -> Result<Diagram, StorageError> {
        let contenido: serde_json::Value = row.try_get("contenido")?;
        let contenido: DiagramContent = serde_json::from_value(contenido)
            .map_err(|e| StorageError::Other(format!("invalid stored content: {e}")))?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        Ok(Diagram {
            id: row.try_get("id")?,
            titulo: row.try_get("titulo")?,
            contenido,
            updated_at,
        })
    }

    fn content_to_value(contenido: &DiagramContent) -> Result<serde_json::Value, StorageError> {
        serde_json::to_value(contenido)
            .map_err(|e| StorageError::Other(format!("failed to serialize content: {e}")))
    }
}

#[async_trait]
impl DiagramStore for PostgresDiagramStore {
    async fn get_diagram(&self, diagram_id: &str) -> Result<Option<Diagram>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, titulo, contenido, updated_at
            FROM diagramas
            WHERE id = $1
            "#,
        )
        .bind(diagram_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_diagram).transpose()
    }

    async fn create_diagram(
        &self,
        titulo: String,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO diagramas (id, titulo, contenido, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&id)
        .bind(&titulo)
        .bind(Self::content_to_value(&contenido)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Diagram {
            id,
            titulo,
            contenido,
            updated_at: now,
        })
    }

    async fn replace_content(
        &self,
        diagram_id: &str,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError> {
        let row = sqlx::query(
            r#"
            UPDATE diagramas
            SET contenido = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, titulo, contenido, updated_at
            "#,
        )
        .bind(Self::content_to_value(&contenido)?)
        .bind(diagram_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_diagram(&row),
            None => Err(StorageError::NotFound {
                diagram_id: diagram_id.to_string(),
            }),
        }
    }

    async fn update_diagram(
        &self,
        diagram_id: &str,
        titulo: Option<String>,
        contenido: DiagramContent,
    ) -> Result<Diagram, StorageError> {
        let row = sqlx::query(
            r#"
            UPDATE diagramas
            SET titulo = COALESCE($1, titulo), contenido = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, titulo, contenido, updated_at
            "#,
        )
        .bind(titulo)
        .bind(Self::content_to_value(&contenido)?)
        .bind(diagram_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_diagram(&row),
            None => Err(StorageError::NotFound {
                diagram_id: diagram_id.to_string(),
            }),
        }
    }

    async fn delete_diagram(&self, diagram_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM diagramas WHERE id = $1")
            .bind(diagram_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                diagram_id: diagram_id.to_string(),
            });
        }
        Ok(())
    }
}
