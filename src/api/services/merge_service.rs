//! Patch reconciliation: merge a patch into a diagram content document.
//!
//! Merge is by id: an entry whose id already exists updates that entry in
//! place (patch fields win, omitted fields are preserved), a new id is
//! appended. A patch never deletes, so applying the same patch twice yields
//! the same result as applying it once.

use crate::models::{DiagramContent, DiagramPatch};

/// Merge `patch` into `base`, returning a new content document.
///
/// `base` is not mutated; the caller's copy stays valid for retry logic.
pub fn merge(base: &DiagramContent, patch: &DiagramPatch) -> DiagramContent {
    let mut merged = base.clone();

    for class_patch in &patch.classes {
        match merged.classes.iter_mut().find(|c| c.id == class_patch.id) {
            Some(existing) => class_patch.apply_to(existing),
            None => merged.classes.push(class_patch.clone().into_node()),
        }
    }

    for relation_patch in &patch.relations {
        match merged
            .relations
            .iter_mut()
            .find(|r| r.id == relation_patch.id)
        {
            Some(existing) => relation_patch.apply_to(existing),
            None => merged.relations.push(relation_patch.clone().into_edge()),
        }
    }

    merged
}
