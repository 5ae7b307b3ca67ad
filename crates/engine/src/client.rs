//! Collaborator interfaces
//!
//! The engine talks to the outside world only through these traits. A REST
//! implementation lives with the transport; tests use in-memory fakes.

use crate::dump_args::DumpArgs;
use snapshot_core::{DumpType, Entity, ListParams, Page, Record, SnapshotResult, Tenant};
use snapshot_durability::BlobSource;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Lazy stream of records yielded by a dump call
pub type RecordStream<'a> = Box<dyn Iterator<Item = SnapshotResult<Record>> + 'a>;

/// Tenant name → client scoped to that tenant
pub type TenantClients = BTreeMap<String, Arc<dyn ManagerClient>>;

/// Composer resources, all written into `composer/`
pub const COMPOSER_RESOURCES: [&str; 3] = ["blueprints", "configuration", "favorites"];

/// Stage resources, written into `stage/` (or `stage/{tenant}/` for `ua`)
pub const STAGE_RESOURCES: [&str; 7] = [
    "blueprint_layouts",
    "configuration",
    "page_groups",
    "pages",
    "templates",
    "ua",
    "widgets",
];

/// The stage resource exported once per tenant
pub const STAGE_TENANT_RESOURCE: &str = "ua";

/// Client of the manager's API, scoped to the management plane or a tenant
pub trait ManagerClient: BlobSource + Send + Sync {
    /// Stream every entity of a dump type
    fn dump(&self, dump_type: DumpType, args: DumpArgs<'_>) -> SnapshotResult<RecordStream<'_>>;

    /// One page of the tenant list
    fn list_tenants(&self, params: &ListParams) -> SnapshotResult<Page<Tenant>>;

    /// Version of the manager, stored in `metadata.json`
    fn manager_version(&self) -> SnapshotResult<String>;

    /// Persist the snapshot's status, with an error description on failure
    fn update_status(&self, snapshot_id: &str, status: &str, error: Option<&str>)
        -> SnapshotResult<()>;
}

/// Builds manager clients
pub trait ClientProvider: Send + Sync {
    /// Client for management-scope calls
    fn management(&self) -> Arc<dyn ManagerClient>;

    /// Client whose calls are scoped to `tenant`
    fn for_tenant(&self, tenant: &Tenant) -> SnapshotResult<Arc<dyn ManagerClient>>;
}

/// Exporter of UI configuration (composer, stage)
pub trait UiExporter: Send + Sync {
    /// Export one resource into `output_dir`, optionally for a single tenant
    fn dump(&self, resource: &str, output_dir: &Path, tenant: Option<&str>) -> SnapshotResult<()>;
}

/// Resolves the broker configuration of a node instance's agent
pub trait BrokerConfigResolver: Send + Sync {
    /// Broker configuration for the agent running on `node_instance`
    fn broker_config(&self, node_instance: &Entity) -> SnapshotResult<serde_json::Value>;
}
