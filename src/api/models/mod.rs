// Models module - diagram documents and patch shapes

pub mod diagram;
pub mod patch;

pub use diagram::{ClassNode, Diagram, DiagramContent, RelationEdge, RelationType};
pub use patch::{ClassPatch, DiagramPatch, PatchFormatError, RelationPatch};
