//! Entity router and chunker
//!
//! Takes the record stream of one (tenant, dump type) pair and turns it into
//! shard files:
//!
//! | Record | Shard file | Bound |
//! |--------|------------|-------|
//! | bare | `{n}.json` (zero-based) | 500 entities |
//! | wrapped event | `{source_type}_events/{source_id}.json` | none |
//! | other wrapped | `{source_id}.json` | none |
//!
//! Every shard is a `{"type": dump_type, "items": [...]}` document. Shards are
//! accumulated in memory and flushed once the stream is exhausted, so a
//! stream that fails midway leaves no shard of that dump type behind. A
//! numbered shard and a provenance shard resolving to the same file name
//! (`0.json` for source id `0`) abort the dump before anything is flushed.
//!
//! While routing, each captured id is reported to the audit listener so
//! changes to already-exported entities are not counted twice, and
//! blueprint/deployment/plugin payloads are handed to the blob archiver.

use crate::blob::{archive_blob, BlobOutcome, BlobSource};
use crate::layout::SnapshotLayout;
use serde::{Deserialize, Serialize};
use snapshot_core::{id_to_string, DumpType, Entity, IdLedger, Record, SnapshotError, SnapshotResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum number of entities in a numbered shard
pub const DUMP_ENTITIES_PER_FILE: usize = 500;

/// Storage-only id field carried by event entities
pub const EVENT_STORAGE_ID: &str = "_storage_id";

/// Receiver of "already captured" notifications
pub trait CaptureRegistry {
    /// Note that an entity has been written by a direct dump
    fn register_captured(&self, tenant: Option<&str>, dump_type: DumpType, entity_id: &str);
}

/// One shard file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    /// Dump type of every item
    #[serde(rename = "type")]
    pub dump_type: DumpType,
    /// Exported entities
    pub items: Vec<Entity>,
}

/// Where a record lands, relative to the dump type's directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum ShardKey {
    Numbered(usize),
    Parent(String),
    ParentEvents {
        source_type: String,
        source_id: String,
    },
}

impl ShardKey {
    fn relative_path(&self) -> PathBuf {
        match self {
            ShardKey::Numbered(n) => PathBuf::from(format!("{}.json", n)),
            ShardKey::Parent(source_id) => PathBuf::from(format!("{}.json", source_id)),
            ShardKey::ParentEvents {
                source_type,
                source_id,
            } => Path::new(&format!("{}_events", source_type)).join(format!("{}.json", source_id)),
        }
    }

    fn is_bounded(&self) -> bool {
        matches!(self, ShardKey::Numbered(_))
    }
}

/// Summary of one routed dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedDump {
    /// Captured ids, in stream order
    pub ids: Vec<String>,
    /// Number of entities written
    pub entity_count: usize,
    /// Shard files written
    pub shard_files: Vec<PathBuf>,
    /// Blob archives written
    pub blobs_written: usize,
}

/// Routes record streams into shard files of a working tree
pub struct EntityRouter<'a, B: ?Sized, C: ?Sized> {
    layout: &'a SnapshotLayout,
    blobs: &'a B,
    captured: &'a C,
}

impl<'a, B, C> EntityRouter<'a, B, C>
where
    B: BlobSource + ?Sized,
    C: CaptureRegistry + ?Sized,
{
    /// Create a router writing into `layout`
    pub fn new(layout: &'a SnapshotLayout, blobs: &'a B, captured: &'a C) -> Self {
        Self {
            layout,
            blobs,
            captured,
        }
    }

    /// Route every record of one dump type and flush the resulting shards
    ///
    /// `ledger` holds what was already dumped in the current tenant phase;
    /// it decides which event directories exist.
    pub fn route<I>(
        &self,
        tenant: Option<&str>,
        dump_type: DumpType,
        records: I,
        ledger: &IdLedger,
    ) -> SnapshotResult<RoutedDump>
    where
        I: IntoIterator<Item = SnapshotResult<Record>>,
    {
        let output_dir = self.prepare_output_dir(tenant, dump_type, ledger)?;
        let mut shards: BTreeMap<ShardKey, Vec<Entity>> = BTreeMap::new();
        let mut summary = RoutedDump::default();
        let mut file_number = 0;

        for record in records {
            let (entity_id, entity, key) = classify(dump_type, record?, file_number)?;
            let bucket = shards.entry(key.clone()).or_default();
            bucket.push(entity);
            let bucket_len = bucket.len();
            summary.entity_count += 1;

            if dump_type.has_archive() {
                let id = entity_id.as_deref().ok_or_else(|| {
                    SnapshotError::upstream(
                        format!("dump {}", dump_type),
                        "entity without an id cannot be archived",
                    )
                })?;
                let archive_dir = self.layout.archive_dir(tenant, dump_type);
                if let BlobOutcome::Written(_) = archive_blob(self.blobs, dump_type, id, &archive_dir)? {
                    summary.blobs_written += 1;
                }
            }

            if let Some(id) = entity_id {
                self.captured.register_captured(tenant, dump_type, &id);
                summary.ids.push(id);
            }

            if key.is_bounded() && bucket_len == DUMP_ENTITIES_PER_FILE {
                file_number += 1;
            }
        }

        let mut paths = BTreeSet::new();
        for key in shards.keys() {
            let relative = key.relative_path();
            if !paths.insert(relative.clone()) {
                return Err(SnapshotError::invariant(format!(
                    "dump {}: two shards map to '{}'",
                    dump_type,
                    relative.display()
                )));
            }
        }

        for (key, items) in shards {
            let path = output_dir.join(key.relative_path());
            write_shard(&path, Shard { dump_type, items })?;
            summary.shard_files.push(path);
        }

        debug!(
            target: "snapshot::router",
            tenant = tenant.unwrap_or("-"),
            dump_type = %dump_type,
            entities = summary.entity_count,
            shards = summary.shard_files.len(),
            blobs = summary.blobs_written,
            "Dump written"
        );
        Ok(summary)
    }

    fn prepare_output_dir(
        &self,
        tenant: Option<&str>,
        dump_type: DumpType,
        ledger: &IdLedger,
    ) -> SnapshotResult<PathBuf> {
        let output_dir = self.layout.dump_dir(tenant, dump_type);
        if tenant.is_some() && dump_type == DumpType::Events {
            for parent in [DumpType::Executions, DumpType::ExecutionGroups] {
                if ledger.has_dumped(parent) {
                    create_dir(&output_dir.join(format!("{}_events", parent.name())))?;
                }
            }
        } else {
            create_dir(&output_dir)?;
        }
        Ok(output_dir)
    }
}

/// Split a record into its id, the entity to persist and its shard
fn classify(
    dump_type: DumpType,
    record: Record,
    file_number: usize,
) -> SnapshotResult<(Option<String>, Entity, ShardKey)> {
    let (mut entity, provenance) = record.into_parts();

    if dump_type == DumpType::Events {
        let entity_id = entity
            .remove(EVENT_STORAGE_ID)
            .as_ref()
            .and_then(id_to_string)
            .ok_or_else(|| SnapshotError::upstream("dump events", "event without _storage_id"))?;
        let (source_type, source_id) = provenance.ok_or_else(|| {
            SnapshotError::upstream("dump events", "event without a source execution")
        })?;
        return Ok((
            Some(entity_id),
            entity,
            ShardKey::ParentEvents {
                source_type,
                source_id,
            },
        ));
    }

    let entity_id = entity.get("id").and_then(id_to_string);
    let key = match provenance {
        Some((_, source_id)) => ShardKey::Parent(source_id),
        None => ShardKey::Numbered(file_number),
    };
    Ok((entity_id, entity, key))
}

fn create_dir(path: &Path) -> SnapshotResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| SnapshotError::archive_write(format!("create '{}': {}", path.display(), e)))
}

fn write_shard(path: &Path, shard: Shard) -> SnapshotResult<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    let write_err =
        |e: std::io::Error| SnapshotError::archive_write(format!("write '{}': {}", path.display(), e));

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &shard)?;
    writer.flush().map_err(write_err)?;
    Ok(())
}
