//! Manager snapshot - point-in-time backups of a multi-tenant orchestration manager
//!
//! A snapshot captures management-scope entities, UI configuration, and every
//! tenant's entities into a single `.tar.zst` archive in the file server.
//!
//! # Quick Start
//!
//! ```ignore
//! use manager_snapshot::{audit_channel, Collaborators, SnapshotConfig, SnapshotCreator, SnapshotJob};
//!
//! let (events_tx, audit_events) = audit_channel();
//! let listener = MyListener::new(events_tx);
//! let collaborators = Collaborators { clients, composer, stage, broker, listener, audit_events };
//!
//! let config = SnapshotConfig::from_file("snapshot.toml".as_ref())?;
//! let job = SnapshotJob::new("nightly").with_logs(false);
//! let report = SnapshotCreator::new(job, config, collaborators)?.create()?;
//! ```
//!
//! # Architecture
//!
//! All work goes through [`SnapshotCreator`]. The manager API, UI exporters
//! and the audit listener are injected as trait objects; this crate ships no
//! transport.

pub use snapshot_core::*;
pub use snapshot_durability::{
    snapshot_archive_path, ArchiveInfo, BlobSource, CaptureRegistry, SnapshotArchiveReader,
    SnapshotLayout, DUMP_ENTITIES_PER_FILE, EMPTY_B64_ZIP, METADATA_FILENAME,
};
pub use snapshot_engine::*;
