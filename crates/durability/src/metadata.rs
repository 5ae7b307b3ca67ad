//! Snapshot metadata file

use crate::layout::SnapshotLayout;
use serde::{Deserialize, Serialize};
use snapshot_core::{SnapshotError, SnapshotResult};
use std::fs;

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Version of the manager the snapshot was taken from
    pub version: String,
}

impl SnapshotMetadata {
    /// Create metadata for a manager version
    pub fn new(version: impl Into<String>) -> Self {
        SnapshotMetadata {
            version: version.into(),
        }
    }

    /// Write `metadata.json` at the root of the working tree
    pub fn write(&self, layout: &SnapshotLayout) -> SnapshotResult<()> {
        let path = layout.metadata();
        let data = serde_json::to_vec(self)?;
        fs::write(&path, data).map_err(|e| {
            SnapshotError::archive_write(format!("write '{}': {}", path.display(), e))
        })
    }
}
