//! Snapshot creation engine
//!
//! This crate orchestrates the lower layers:
//! - Client: traits for the manager API, UI exporters and broker lookup
//! - Dump args: prerequisite ids each dump type is filtered by
//! - Pagination: offset listing of tenants
//! - Audit: listener lifecycle and draining of late change events
//! - Orchestrator: the phase sequence of one snapshot job
//!
//! The engine is the only component that knows about:
//! - Phase ordering and per-tenant dependency order
//! - Status persistence and failure cleanup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod client;
pub mod dump_args;
pub mod orchestrator;
pub mod pagination;

pub use audit::{audit_channel, AuditDrain, AuditListener, AuditReconciler, DrainStats, NoopReconciler};
pub use client::{
    BrokerConfigResolver, ClientProvider, ManagerClient, RecordStream, TenantClients, UiExporter,
    COMPOSER_RESOURCES, STAGE_RESOURCES, STAGE_TENANT_RESOURCE,
};
pub use dump_args::DumpArgs;
pub use orchestrator::{Collaborators, SnapshotCreator, SnapshotReport, WORK_DIR_SUFFIX};
pub use pagination::fetch_all;
