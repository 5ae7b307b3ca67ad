//! Core types for manager snapshots
//!
//! This crate defines the vocabulary shared by the durability and engine
//! crates:
//! - DumpType: closed table of exported resource categories
//! - Record: bare or provenance-wrapped entity yielded by a dump call
//! - IdLedger: ids captured per dump type during one tenant phase
//! - Tenant, AuditEvent: tenants and change notifications
//! - SnapshotJob, JobState: job lifecycle
//! - SnapshotConfig: configuration loaded from `snapshot.toml`
//! - SnapshotError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dump_type;
pub mod error;
pub mod job;
pub mod ledger;
pub mod page;
pub mod record;
pub mod tenant;

pub use config::{SnapshotConfig, CONFIG_FILE_NAME};
pub use dump_type::{DumpScope, DumpType};
pub use error::{ErrorCategory, SnapshotError, SnapshotResult};
pub use job::{JobState, SnapshotJob};
pub use ledger::IdLedger;
pub use page::{ListParams, Page};
pub use record::{id_to_string, Entity, Record};
pub use tenant::{AuditEvent, Tenant};
