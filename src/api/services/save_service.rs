//! Save coordination for diagram writes.
//!
//! Every write path reloads the latest persisted content before merging and
//! saving, and runs under a per-diagram lock so two in-flight saves for the
//! same diagram cannot interleave between reload and save. The lock map is
//! process-local; a multi-process deployment needs a database-level version
//! check instead.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::merge_service;
use crate::models::{Diagram, DiagramPatch};
use crate::storage::{DiagramStore, StorageError};

/// Grace window for the direct-update staleness check.
///
/// A client whose last-read timestamp trails the stored `updatedAt` by more
/// than this is told to reload instead of silently overwriting.
pub const STALE_WRITE_GRACE_SECS: i64 = 3;

/// Whether a direct update based on `client_seen` is too old to accept
/// against a record stored at `stored`.
pub fn is_stale_write(client_seen: DateTime<Utc>, stored: DateTime<Utc>) -> bool {
    stored.signed_duration_since(client_seen) > Duration::seconds(STALE_WRITE_GRACE_SECS)
}

/// Serializes reload-merge-save sequences per diagram id.
#[derive(Default)]
pub struct SaveCoordinator {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SaveCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the write lock for a diagram, creating it on first use.
    pub async fn lock_for(&self, diagram_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(diagram_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Apply a patch to a diagram: reload the latest persisted content, merge
    /// the patch into it, and persist the result, all under the diagram's
    /// write lock.
    ///
    /// The reload is deliberate: the patch may have been produced against a
    /// snapshot taken seconds ago (the agent round trip), and reconciling
    /// against anything but the latest durable state would drop concurrent
    /// edits.
    pub async fn apply_patch(
        &self,
        store: &dyn DiagramStore,
        diagram_id: &str,
        patch: &DiagramPatch,
    ) -> Result<Diagram, StorageError> {
        let lock = self.lock_for(diagram_id).await;
        let _guard = lock.lock().await;

        let diagram =
            store
                .get_diagram(diagram_id)
                .await?
                .ok_or_else(|| StorageError::NotFound {
                    diagram_id: diagram_id.to_string(),
                })?;

        let merged = merge_service::merge(&diagram.contenido, patch);
        store.replace_content(diagram_id, merged).await
    }
}
