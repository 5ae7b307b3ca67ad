//! Blob archiver
//!
//! Blueprints, deployments and plugins carry a large payload each (a package
//! or an encoded working directory). Those payloads are stored one file per
//! entity in `{dump_type}_archives/`, beside the JSON shard tree, so shards
//! stay small and the payload keeps its native format.

use snapshot_core::{DumpType, SnapshotError, SnapshotResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Encoded working directory of a deployment that has none
pub const EMPTY_B64_ZIP: &str = "UEsFBgAAAAAAAAAAAAAAAAAAAAAAAA==";

/// Source of per-entity payloads
pub trait BlobSource {
    /// Download an entity's package to `dest`
    ///
    /// `full_archive` asks for the complete package (plugins with wagon and
    /// yaml) rather than the default artifact.
    fn download(
        &self,
        dump_type: DumpType,
        entity_id: &str,
        dest: &Path,
        full_archive: bool,
    ) -> SnapshotResult<()>;

    /// Fetch a deployment's base64-encoded working directory archive
    fn deployment_workdir(&self, deployment_id: &str) -> SnapshotResult<String>;
}

/// What the archiver did for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOutcome {
    /// Payload written to this path
    Written(PathBuf),
    /// Deployment had an empty working directory; nothing written
    SkippedEmpty,
}

/// Persist the payload of one entity into `archive_dir`
///
/// Only dump types with an archive suffix may reach this function.
pub fn archive_blob<S: BlobSource + ?Sized>(
    source: &S,
    dump_type: DumpType,
    entity_id: &str,
    archive_dir: &Path,
) -> SnapshotResult<BlobOutcome> {
    let suffix = dump_type.archive_suffix().ok_or_else(|| {
        SnapshotError::invariant(format!("{} has no blob archive", dump_type))
    })?;

    fs::create_dir_all(archive_dir).map_err(|e| {
        SnapshotError::archive_write(format!("create '{}': {}", archive_dir.display(), e))
    })?;
    let dest_dir = fs::canonicalize(archive_dir)?;
    let dest = dest_dir.join(format!("{}{}", entity_id, suffix));

    match dump_type {
        DumpType::Deployments => {
            let b64_zip = source.deployment_workdir(entity_id)?;
            if b64_zip == EMPTY_B64_ZIP {
                debug!(target: "snapshot::blob", deployment_id = %entity_id, "Empty working directory, skipping");
                return Ok(BlobOutcome::SkippedEmpty);
            }
            fs::write(&dest, b64_zip).map_err(|e| {
                SnapshotError::archive_write(format!("write '{}': {}", dest.display(), e))
            })?;
        }
        DumpType::Plugins => source.download(dump_type, entity_id, &dest, true)?,
        _ => source.download(dump_type, entity_id, &dest, false)?,
    }

    Ok(BlobOutcome::Written(dest))
}
