//! Diagram patches: partial upserts proposed by the assistant or a save path.
//!
//! A patch never deletes. Entries are matched by id; fields left as `None`
//! keep whatever the base document already has.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use super::diagram::{ClassNode, RelationEdge, RelationType};

/// Error raised when a patch value is not in any recognized shape.
///
/// This signals a caller bug; missing optional fields never error.
#[derive(Error, Debug)]
pub enum PatchFormatError {
    #[error("patch must be an object with classes/relations or an operation array, got {0}")]
    UnrecognizedShape(String),
    #[error("patch entry is malformed: {0}")]
    MalformedEntry(#[from] serde_json::Error),
}

/// Partial update for a single class node.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}

impl ClassPatch {
    /// Overlay this patch onto an existing node. Patch fields win, omitted
    /// fields keep the base value.
    pub fn apply_to(&self, node: &mut ClassNode) {
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        if let Some(x) = self.x {
            node.x = x;
        }
        if let Some(y) = self.y {
            node.y = y;
        }
        if let Some(attributes) = &self.attributes {
            node.attributes = attributes.clone();
        }
        if let Some(methods) = &self.methods {
            node.methods = methods.clone();
        }
    }

    /// Materialize a node from this patch alone (insert path).
    pub fn into_node(self) -> ClassNode {
        ClassNode {
            id: self.id,
            name: self.name.unwrap_or_default(),
            x: self.x.unwrap_or_default(),
            y: self.y.unwrap_or_default(),
            attributes: self.attributes.unwrap_or_default(),
            methods: self.methods.unwrap_or_default(),
        }
    }
}

/// Partial update for a single relation edge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelationPatch {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<RelationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(
        rename = "multiplicidadOrigen",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub multiplicidad_origen: Option<String>,
    #[serde(
        rename = "multiplicidadDestino",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub multiplicidad_destino: Option<String>,
}

impl RelationPatch {
    /// Overlay this patch onto an existing edge.
    pub fn apply_to(&self, edge: &mut RelationEdge) {
        if let Some(relation_type) = self.relation_type {
            edge.relation_type = relation_type;
        }
        if let Some(source) = &self.source {
            edge.source = source.clone();
        }
        if let Some(target) = &self.target {
            edge.target = target.clone();
        }
        if let Some(origen) = &self.multiplicidad_origen {
            edge.multiplicidad_origen = Some(origen.clone());
        }
        if let Some(destino) = &self.multiplicidad_destino {
            edge.multiplicidad_destino = Some(destino.clone());
        }
    }

    /// Materialize an edge from this patch alone (insert path).
    ///
    /// An edge inserted without a declared type defaults to plain association.
    pub fn into_edge(self) -> RelationEdge {
        RelationEdge {
            id: self.id,
            relation_type: self.relation_type.unwrap_or(RelationType::Asociacion),
            source: self.source.unwrap_or_default(),
            target: self.target.unwrap_or_default(),
            multiplicidad_origen: self.multiplicidad_origen,
            multiplicidad_destino: self.multiplicidad_destino,
        }
    }
}

/// Canonical patch shape: class and relation upserts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DiagramPatch {
    #[serde(default)]
    pub classes: Vec<ClassPatch>,
    #[serde(default)]
    pub relations: Vec<RelationPatch>,
}

impl DiagramPatch {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.relations.is_empty()
    }

    /// Normalize a raw patch value into the canonical shape.
    ///
    /// Two forms are accepted:
    /// - the canonical object `{ "classes": [...], "relations": [...] }`
    /// - a legacy operation array
    ///   `[{ "type": "add_class", "data": {...} }, ...]`
    ///
    /// Legacy operations with unknown types are skipped; anything else is a
    /// caller error. Normalization happens here, once, so merge logic only
    /// ever sees the canonical form.
    pub fn from_value(value: &Value) -> Result<Self, PatchFormatError> {
        match value {
            Value::Object(_) => Ok(serde_json::from_value(value.clone())?),
            Value::Array(operations) => Self::from_legacy_operations(operations),
            other => Err(PatchFormatError::UnrecognizedShape(format!("{other}"))),
        }
    }

    fn from_legacy_operations(operations: &[Value]) -> Result<Self, PatchFormatError> {
        let mut patch = DiagramPatch::default();
        for operation in operations {
            let kind = operation.get("type").and_then(Value::as_str).unwrap_or("");
            let Some(data) = operation.get("data") else {
                continue;
            };
            match kind {
                "add_class" | "modify_class" => {
                    patch.classes.push(serde_json::from_value(data.clone())?);
                }
                "add_relation" | "modify_relation" => {
                    patch.relations.push(serde_json::from_value(data.clone())?);
                }
                _ => {}
            }
        }
        Ok(patch)
    }
}
