//! On-disk side of snapshot creation
//!
//! This crate handles everything that touches the working tree and the final
//! archive:
//!
//! - Layout: paths of the working tree and of the file server's snapshot store
//! - Metadata: `metadata.json` at the tree root
//! - Router: classification and sharding of record streams into JSON files
//! - Blob: per-entity payload archives for blueprints, deployments, plugins
//! - Archive: packing the working tree into one `.tar.zst` file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod blob;
pub mod layout;
pub mod metadata;
pub mod router;

pub use archive::{ArchiveInfo, SnapshotArchiveReader, SnapshotArchiveWriter, DEFAULT_COMPRESSION_LEVEL};
pub use blob::{archive_blob, BlobOutcome, BlobSource, EMPTY_B64_ZIP};
pub use layout::{
    snapshot_archive_path, snapshot_dir, SnapshotLayout, METADATA_FILENAME,
    SNAPSHOTS_FOLDER, SNAPSHOT_ARCHIVE_EXTENSION,
};
pub use metadata::SnapshotMetadata;
pub use router::{
    CaptureRegistry, EntityRouter, RoutedDump, Shard, DUMP_ENTITIES_PER_FILE, EVENT_STORAGE_ID,
};
