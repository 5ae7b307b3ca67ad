//! Snapshot creation
//!
//! [`SnapshotCreator::create`] drives one snapshot job through its phases:
//!
//! 1. Resolve tenants and build one client per tenant
//! 2. Prepare the snapshot store directory and a temporary working tree
//! 3. Start the audit listener
//! 4. Write `metadata.json`
//! 5. Dump management-scope types
//! 6. Export composer and stage configuration
//! 7. Dump every tenant's types in dependency order
//! 8. Drain the audit log and stop the listener
//! 9. Pack the working tree into the final archive
//! 10. Persist the success status
//!
//! Any failure, including a panic inside a collaborator, is caught once: the
//! failure status is persisted, a partial final archive is removed, and the
//! error is returned. The working tree is removed on both paths.

use crate::audit::{AuditDrain, AuditListener, AuditReconciler, DrainStats, NoopReconciler};
use crate::client::{
    BrokerConfigResolver, ClientProvider, ManagerClient, TenantClients, UiExporter,
    COMPOSER_RESOURCES, STAGE_RESOURCES, STAGE_TENANT_RESOURCE,
};
use crate::dump_args::DumpArgs;
use crate::pagination::fetch_all;
use snapshot_core::{
    AuditEvent, DumpType, IdLedger, JobState, ListParams, SnapshotConfig, SnapshotError,
    SnapshotJob, SnapshotResult, Tenant,
};
use snapshot_durability::{
    snapshot_archive_path, snapshot_dir, ArchiveInfo, EntityRouter, SnapshotArchiveWriter,
    SnapshotLayout, SnapshotMetadata,
};
use std::any::Any;
use std::collections::BTreeMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Suffix of the temporary working tree directory
pub const WORK_DIR_SUFFIX: &str = "-snapshot-data";

/// Fields requested when listing tenants
const TENANT_FIELDS: [&str; 2] = ["name", "rabbitmq_password"];

/// External services a creator works with
pub struct Collaborators {
    /// Builds management and tenant-scoped manager clients
    pub clients: Arc<dyn ClientProvider>,
    /// Composer configuration exporter
    pub composer: Arc<dyn UiExporter>,
    /// Stage configuration exporter
    pub stage: Arc<dyn UiExporter>,
    /// Agent broker configuration lookup for node instances
    pub broker: Arc<dyn BrokerConfigResolver>,
    /// Audit-log listener
    pub listener: Arc<dyn AuditListener>,
    /// Receiving end of the listener's event channel
    pub audit_events: Receiver<AuditEvent>,
}

/// Summary of a successful snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Snapshot id
    pub snapshot_id: String,
    /// Final archive written to the snapshot store
    pub archive: ArchiveInfo,
    /// Tenants included in the snapshot, in processing order
    pub tenants: Vec<String>,
    /// Outcome of the audit drain
    pub audit: DrainStats,
}

/// Creates one snapshot
pub struct SnapshotCreator {
    job: SnapshotJob,
    config: SnapshotConfig,
    client: Arc<dyn ManagerClient>,
    clients: Arc<dyn ClientProvider>,
    composer: Arc<dyn UiExporter>,
    stage: Arc<dyn UiExporter>,
    broker: Arc<dyn BrokerConfigResolver>,
    listener: Arc<dyn AuditListener>,
    audit_events: Receiver<AuditEvent>,
    reconciler: Box<dyn AuditReconciler>,
    archive_path: PathBuf,
    started: bool,
}

impl SnapshotCreator {
    /// Create a creator for `job`
    ///
    /// Fails with a configuration error before anything is touched if
    /// `config` is invalid.
    pub fn new(
        job: SnapshotJob,
        config: SnapshotConfig,
        collaborators: Collaborators,
    ) -> SnapshotResult<Self> {
        config.validate()?;
        if job.id().is_empty() {
            return Err(SnapshotError::config("snapshot id must not be empty"));
        }

        let archive_path = snapshot_archive_path(&config.file_server_root, job.id());
        let client = collaborators.clients.management();

        Ok(SnapshotCreator {
            job,
            config,
            client,
            clients: collaborators.clients,
            composer: collaborators.composer,
            stage: collaborators.stage,
            broker: collaborators.broker,
            listener: collaborators.listener,
            audit_events: collaborators.audit_events,
            reconciler: Box::new(NoopReconciler),
            archive_path,
            started: false,
        })
    }

    /// Replace the reconciler applied to drained audit events
    pub fn with_reconciler(mut self, reconciler: Box<dyn AuditReconciler>) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// The job being run
    pub fn job(&self) -> &SnapshotJob {
        &self.job
    }

    /// Where the final archive is written
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Run the snapshot job
    ///
    /// May be called once per creator.
    pub fn create(&mut self) -> SnapshotResult<SnapshotReport> {
        if self.started {
            return Err(SnapshotError::invariant(format!(
                "snapshot {} was already created (state {})",
                self.job.id(),
                self.job.state()
            )));
        }
        self.started = true;

        info!(target: "snapshot::create", snapshot_id = %self.job.id(), "Creating snapshot");

        let mut work_dir: Option<TempDir> = None;
        let mut listener_running = false;
        // A panicking collaborator takes the same failure path as an error
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(&mut work_dir, &mut listener_running)
        }))
        .unwrap_or_else(|payload| {
            Err(SnapshotError::invariant(format!(
                "snapshot creation panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        match &result {
            Ok(report) => info!(
                target: "snapshot::create",
                snapshot_id = %report.snapshot_id,
                tenants = report.tenants.len(),
                files = report.archive.file_count,
                bytes = report.archive.size_bytes,
                checksum = %report.archive.checksum,
                "Snapshot created"
            ),
            Err(e) => self.handle_failure(e, listener_running),
        }

        remove_work_dir(work_dir);
        result
    }

    fn run(
        &mut self,
        work_dir: &mut Option<TempDir>,
        listener_running: &mut bool,
    ) -> SnapshotResult<SnapshotReport> {
        let tenants = self.resolve_tenants()?;
        let tenant_clients = self.tenant_clients(&tenants)?;

        let store_dir = snapshot_dir(&self.config.file_server_root, self.job.id());
        fs::create_dir_all(&store_dir).map_err(|e| {
            SnapshotError::archive_write(format!("create '{}': {}", store_dir.display(), e))
        })?;

        let dir = self.prepare_work_dir()?;
        let layout = SnapshotLayout::from_root(dir.path());
        *work_dir = Some(dir);
        layout.create_directories().map_err(|e| {
            SnapshotError::archive_write(format!(
                "create working tree '{}': {}",
                layout.root().display(),
                e
            ))
        })?;

        self.listener.start(&tenant_clients)?;
        *listener_running = true;

        self.dump_metadata(&layout)?;
        self.dump_management(&layout)?;
        self.dump_ui(&layout, &tenants)?;
        for (name, client) in &tenant_clients {
            self.dump_tenant(&layout, name, client.as_ref(), IdLedger::new())?;
        }

        let audit = AuditDrain::new(self.config.audit_timeout()).run(
            &self.audit_events,
            self.listener.as_ref(),
            self.reconciler.as_mut(),
        )?;
        *listener_running = false;

        self.job.advance(JobState::Archiving)?;
        let archive = SnapshotArchiveWriter::new(self.config.compression_level)
            .write(layout.root(), &self.archive_path)?;

        self.client
            .update_status(self.job.id(), &self.config.created_status, None)?;
        self.job.advance(JobState::Succeeded)?;

        Ok(SnapshotReport {
            snapshot_id: self.job.id().to_string(),
            archive,
            tenants: tenants.into_keys().collect(),
            audit,
        })
    }

    fn resolve_tenants(&self) -> SnapshotResult<BTreeMap<String, Tenant>> {
        let tenants = fetch_all(
            |params| self.client.list_tenants(params),
            ListParams::including(TENANT_FIELDS),
        )?;
        debug!(target: "snapshot::create", count = tenants.len(), "Tenants resolved");
        Ok(tenants
            .into_iter()
            .map(|tenant| (tenant.name.clone(), tenant))
            .collect())
    }

    fn tenant_clients(&self, tenants: &BTreeMap<String, Tenant>) -> SnapshotResult<TenantClients> {
        let mut clients = TenantClients::new();
        for (name, tenant) in tenants {
            clients.insert(name.clone(), self.clients.for_tenant(tenant)?);
        }
        Ok(clients)
    }

    fn prepare_work_dir(&self) -> SnapshotResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.suffix(WORK_DIR_SUFFIX);
        let dir = match &self.config.work_dir_parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| SnapshotError::archive_write(format!("create working directory: {}", e)))?;
        debug!(target: "snapshot::create", path = %dir.path().display(), "Working directory created");
        Ok(dir)
    }

    fn dump_metadata(&self, layout: &SnapshotLayout) -> SnapshotResult<()> {
        let version = self.client.manager_version()?;
        SnapshotMetadata::new(version).write(layout)
    }

    fn dump_management(&self, layout: &SnapshotLayout) -> SnapshotResult<()> {
        let ledger = IdLedger::new();
        for dump_type in DumpType::MANAGEMENT_ORDER {
            self.dump_one(layout, None, self.client.as_ref(), dump_type, &ledger)?;
        }
        Ok(())
    }

    fn dump_ui(&self, layout: &SnapshotLayout, tenants: &BTreeMap<String, Tenant>) -> SnapshotResult<()> {
        let composer_dir = layout.composer_dir();
        for resource in COMPOSER_RESOURCES {
            debug!(target: "snapshot::ui", resource, "Exporting composer resource");
            self.composer.dump(resource, &composer_dir, None)?;
        }

        let stage_dir = layout.stage_dir();
        for resource in STAGE_RESOURCES {
            if resource == STAGE_TENANT_RESOURCE {
                for tenant in tenants.keys() {
                    let tenant_dir = layout.stage_tenant_dir(tenant);
                    fs::create_dir_all(&tenant_dir)?;
                    debug!(target: "snapshot::ui", resource, tenant = %tenant, "Exporting stage resource");
                    self.stage.dump(resource, &tenant_dir, Some(tenant))?;
                }
            } else {
                debug!(target: "snapshot::ui", resource, "Exporting stage resource");
                self.stage.dump(resource, &stage_dir, None)?;
            }
        }
        Ok(())
    }

    /// Dump one tenant's types in order, returning the ids captured per type
    fn dump_tenant(
        &self,
        layout: &SnapshotLayout,
        tenant: &str,
        client: &dyn ManagerClient,
        mut ledger: IdLedger,
    ) -> SnapshotResult<IdLedger> {
        info!(target: "snapshot::create", tenant = %tenant, "Dumping tenant");
        for dump_type in DumpType::TENANT_ORDER {
            if dump_type == DumpType::Events && !self.job.include_events() {
                debug!(target: "snapshot::create", tenant = %tenant, "Skipping events");
                continue;
            }
            let ids = self.dump_one(layout, Some(tenant), client, dump_type, &ledger)?;
            ledger.record(dump_type, ids);
        }
        Ok(ledger)
    }

    fn dump_one(
        &self,
        layout: &SnapshotLayout,
        tenant: Option<&str>,
        client: &dyn ManagerClient,
        dump_type: DumpType,
        ledger: &IdLedger,
    ) -> SnapshotResult<Vec<String>> {
        debug!(
            target: "snapshot::create",
            tenant = tenant.unwrap_or("-"),
            dump_type = %dump_type,
            "Dumping"
        );
        let args = DumpArgs::build(dump_type, ledger, self.job.include_logs(), self.broker.as_ref())?;
        let records = client.dump(dump_type, args)?;
        let routed = EntityRouter::new(layout, client, self.listener.as_ref())
            .route(tenant, dump_type, records, ledger)?;
        Ok(routed.ids)
    }

    fn handle_failure(&mut self, err: &SnapshotError, listener_running: bool) {
        error!(
            target: "snapshot::create",
            snapshot_id = %self.job.id(),
            category = ?err.category(),
            error = %err,
            "Snapshot creation failed"
        );

        if let Err(e) = self.job.advance(JobState::Failed) {
            warn!(target: "snapshot::create", error = %e, "Could not mark job failed");
        }

        if listener_running {
            self.listener.stop();
            if !self.listener.join(self.config.audit_timeout()) {
                warn!(target: "snapshot::audit", "Audit listener did not finish in time");
            }
        }

        let message = err.to_string();
        if let Err(e) = self
            .client
            .update_status(self.job.id(), &self.config.failed_status, Some(&message))
        {
            warn!(
                target: "snapshot::create",
                snapshot_id = %self.job.id(),
                error = %e,
                "Failed to persist failure status"
            );
        }

        if self.archive_path.exists() {
            match fs::remove_file(&self.archive_path) {
                Ok(()) => debug!(
                    target: "snapshot::create",
                    path = %self.archive_path.display(),
                    "Removed partial archive"
                ),
                Err(e) => warn!(
                    target: "snapshot::create",
                    path = %self.archive_path.display(),
                    error = %e,
                    "Failed to remove partial archive"
                ),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}

fn remove_work_dir(work_dir: Option<TempDir>) {
    if let Some(dir) = work_dir {
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(target: "snapshot::create", path = %path.display(), "Working directory removed"),
            Err(e) => warn!(
                target: "snapshot::create",
                path = %path.display(),
                error = %e,
                "Failed to remove working directory"
            ),
        }
    }
}
