//! Core diagram document types.
//!
//! The wire field names (`titulo`, `multiplicidadOrigen`, `multiplicidadDestino`,
//! `type`) are a frontend contract and must not be renamed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Relation vocabulary used by the class-diagram editor.
///
/// The serialized spellings drive code generation downstream, so they are
/// preserved exactly as the editor emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RelationType {
    #[serde(rename = "Asociación")]
    Asociacion,
    #[serde(rename = "Composición")]
    Composicion,
    #[serde(rename = "Agregación")]
    Agregacion,
    #[serde(rename = "Generalización")]
    Generalizacion,
    #[serde(rename = "Uno a Muchos")]
    UnoAMuchos,
    #[serde(rename = "Muchos a Uno")]
    MuchosAUno,
    #[serde(rename = "Muchos a Muchos")]
    MuchosAMuchos,
}

/// A class node on the canvas.
///
/// `attributes` entries keep the `"id (PK)"` / `"customer_id (FK)"` tagging
/// convention as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// An edge between two class nodes, identified by its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelationEdge {
    pub id: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub source: String,
    pub target: String,
    #[serde(rename = "multiplicidadOrigen", skip_serializing_if = "Option::is_none")]
    pub multiplicidad_origen: Option<String>,
    #[serde(rename = "multiplicidadDestino", skip_serializing_if = "Option::is_none")]
    pub multiplicidad_destino: Option<String>,
}

/// The JSON document persisted for a diagram.
///
/// Absent arrays deserialize to empty so older documents load cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagramContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassNode>,
    #[serde(default)]
    pub relations: Vec<RelationEdge>,
}

impl DiagramContent {
    /// Look up a class by id.
    pub fn class(&self, id: &str) -> Option<&ClassNode> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Look up a relation by id.
    pub fn relation(&self, id: &str) -> Option<&RelationEdge> {
        self.relations.iter().find(|r| r.id == id)
    }
}

/// A stored diagram record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Diagram {
    pub id: String,
    pub titulo: String,
    pub contenido: DiagramContent,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
