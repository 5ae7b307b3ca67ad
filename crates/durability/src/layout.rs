//! Snapshot directory structure
//!
//! The working tree packed into the final archive looks like:
//!
//! ```text
//! {work_dir}/
//! ├── metadata.json                     # {"version": ...}
//! ├── mgmt/{dump_type}/{n}.json         # management-scope shards
//! ├── tenants/{tenant}/
//! │   ├── {dump_type}/{n|source_id}.json
//! │   ├── {dump_type}_archives/         # blueprint/deployment/plugin blobs
//! │   ├── tasks_graphs/{execution_id}.json
//! │   ├── executions_events/{execution_id}.json
//! │   └── execution_groups_events/{group_id}.json
//! ├── composer/                         # composer exporter output
//! └── stage/{tenant}/                   # stage exporter output
//! ```
//!
//! Final archives live in the file server under
//! `{file_server_root}/snapshots/{snapshot_id}/{snapshot_id}.tar.zst`.

use snapshot_core::DumpType;
use std::io;
use std::path::{Path, PathBuf};

/// Metadata file at the root of the working tree
pub const METADATA_FILENAME: &str = "metadata.json";

/// File server folder holding snapshot archives
pub const SNAPSHOTS_FOLDER: &str = "snapshots";

/// File extension of the final snapshot archive
///
/// Snapshots are zstd-compressed tarballs, not zip files; restore tooling
/// must read `.tar.zst`. A failed job removes this file, never a `.zip`.
pub const SNAPSHOT_ARCHIVE_EXTENSION: &str = "tar.zst";

/// Paths inside a snapshot working tree
#[derive(Debug, Clone)]
pub struct SnapshotLayout {
    root: PathBuf,
}

impl SnapshotLayout {
    /// Create paths from the working tree root
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        SnapshotLayout {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the metadata file path
    pub fn metadata(&self) -> PathBuf {
        self.root.join(METADATA_FILENAME)
    }

    /// Get the management-scope directory
    pub fn mgmt_dir(&self) -> PathBuf {
        self.root.join("mgmt")
    }

    /// Get the directory holding all tenants
    pub fn tenants_dir(&self) -> PathBuf {
        self.root.join("tenants")
    }

    /// Get one tenant's directory
    pub fn tenant_dir(&self, tenant: &str) -> PathBuf {
        self.tenants_dir().join(tenant)
    }

    /// Get the composer exporter's directory
    pub fn composer_dir(&self) -> PathBuf {
        self.root.join("composer")
    }

    /// Get the stage exporter's directory
    pub fn stage_dir(&self) -> PathBuf {
        self.root.join("stage")
    }

    /// Get the stage exporter's per-tenant directory
    pub fn stage_tenant_dir(&self, tenant: &str) -> PathBuf {
        self.stage_dir().join(tenant)
    }

    /// Directory a dump type's shards are written to
    ///
    /// Events are routed into `{source_type}_events/` below the tenant
    /// directory, so their base is the tenant directory itself. Operations
    /// are stored as task graphs.
    pub fn dump_dir(&self, tenant: Option<&str>, dump_type: DumpType) -> PathBuf {
        match tenant {
            Some(tenant) => match dump_type {
                DumpType::Events => self.tenant_dir(tenant),
                DumpType::Operations => self.tenant_dir(tenant).join("tasks_graphs"),
                other => self.tenant_dir(tenant).join(other.name()),
            },
            None => self.mgmt_dir().join(dump_type.name()),
        }
    }

    /// Directory of a dump type's blob archives, beside its shard directory
    pub fn archive_dir(&self, tenant: Option<&str>, dump_type: DumpType) -> PathBuf {
        let base = match tenant {
            Some(tenant) => self.tenant_dir(tenant),
            None => self.mgmt_dir(),
        };
        base.join(format!("{}_archives", dump_type.name()))
    }

    /// Create the top-level directories of the working tree
    pub fn create_directories(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.mgmt_dir())?;
        std::fs::create_dir_all(self.tenants_dir())?;
        std::fs::create_dir_all(self.composer_dir())?;
        std::fs::create_dir_all(self.stage_dir())?;
        Ok(())
    }
}

/// Directory of one snapshot inside the file server
pub fn snapshot_dir(file_server_root: &Path, snapshot_id: &str) -> PathBuf {
    file_server_root.join(SNAPSHOTS_FOLDER).join(snapshot_id)
}

/// Final archive path of one snapshot
pub fn snapshot_archive_path(file_server_root: &Path, snapshot_id: &str) -> PathBuf {
    snapshot_dir(file_server_root, snapshot_id)
        .join(format!("{}.{}", snapshot_id, SNAPSHOT_ARCHIVE_EXTENSION))
}
