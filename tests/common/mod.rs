//! Shared test utilities for integration test suites.
//!
//! In-memory fakes of every collaborator a [`SnapshotCreator`] needs, plus a
//! [`Harness`] wiring them to temporary file-server and working directories.
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use manager_snapshot::{
    audit_channel, AuditEvent, AuditListener, BlobSource, BrokerConfigResolver, CaptureRegistry,
    ClientProvider, Collaborators, DumpArgs, DumpType, Entity, ListParams, ManagerClient, Page,
    Record, RecordStream, SnapshotConfig, SnapshotCreator, SnapshotError, SnapshotJob,
    SnapshotResult, TenantClients, UiExporter, EMPTY_B64_ZIP,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Manager client
// ============================================================================

/// One recorded `dump` call with its dependency arguments copied out
#[derive(Debug, Clone, PartialEq)]
pub struct DumpCall {
    pub dump_type: DumpType,
    pub deployment_ids: Option<Vec<String>>,
    pub execution_ids: Option<Vec<String>>,
    pub execution_group_ids: Option<Vec<String>>,
    pub include_logs: Option<bool>,
}

impl DumpCall {
    fn from_args(dump_type: DumpType, args: &DumpArgs<'_>) -> Self {
        let (execution_group_ids, include_logs) = match *args {
            DumpArgs::Events {
                execution_group_ids,
                include_logs,
                ..
            } => (Some(execution_group_ids.to_vec()), Some(include_logs)),
            _ => (None, None),
        };
        DumpCall {
            dump_type,
            deployment_ids: args.deployment_ids().map(<[String]>::to_vec),
            execution_ids: args.execution_ids().map(<[String]>::to_vec),
            execution_group_ids,
            include_logs,
        }
    }
}

/// A status update persisted through the management client
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub snapshot_id: String,
    pub status: String,
    pub error: Option<String>,
}

/// In-memory manager scoped to the management plane or one tenant
#[derive(Default)]
pub struct MockManager {
    data: BTreeMap<DumpType, Vec<Value>>,
    fail_after: Option<(DumpType, usize, String)>,
    workdirs: BTreeMap<String, String>,
    tenants: Mutex<Vec<manager_snapshot::Tenant>>,
    tenant_page_size: usize,
    failing_status: Option<String>,
    pub calls: Mutex<Vec<DumpCall>>,
    pub downloads: Mutex<Vec<(DumpType, String, bool)>>,
    pub statuses: Mutex<Vec<StatusUpdate>>,
}

impl MockManager {
    pub fn new() -> Self {
        MockManager {
            tenant_page_size: 2,
            ..Default::default()
        }
    }

    /// Serve `items` (raw wire objects) for `dump_type`
    pub fn with(mut self, dump_type: DumpType, items: Vec<Value>) -> Self {
        self.data.insert(dump_type, items);
        self
    }

    /// Serve `ids` as bare entities for `dump_type`
    pub fn with_ids(self, dump_type: DumpType, ids: &[&str]) -> Self {
        let items = ids.iter().map(|id| json!({ "id": id })).collect();
        self.with(dump_type, items)
    }

    /// Yield an upstream error after `after` items of `dump_type`
    pub fn failing(mut self, dump_type: DumpType, after: usize, message: &str) -> Self {
        self.fail_after = Some((dump_type, after, message.to_string()));
        self
    }

    /// Encoded working directory of a deployment (defaults to the empty sentinel)
    pub fn with_workdir(mut self, deployment_id: &str, content: &str) -> Self {
        self.workdirs
            .insert(deployment_id.to_string(), content.to_string());
        self
    }

    /// Reject status updates to `status`
    pub fn rejecting_status(mut self, status: &str) -> Self {
        self.failing_status = Some(status.to_string());
        self
    }

    pub fn set_tenants(&self, tenants: Vec<manager_snapshot::Tenant>) {
        *self.tenants.lock() = tenants;
    }

    pub fn dumped_types(&self) -> Vec<DumpType> {
        self.calls.lock().iter().map(|c| c.dump_type).collect()
    }

    pub fn call(&self, dump_type: DumpType) -> Option<DumpCall> {
        self.calls
            .lock()
            .iter()
            .find(|c| c.dump_type == dump_type)
            .cloned()
    }

    pub fn last_status(&self) -> Option<StatusUpdate> {
        self.statuses.lock().last().cloned()
    }
}

impl BlobSource for MockManager {
    fn download(
        &self,
        dump_type: DumpType,
        entity_id: &str,
        dest: &Path,
        full_archive: bool,
    ) -> SnapshotResult<()> {
        self.downloads
            .lock()
            .push((dump_type, entity_id.to_string(), full_archive));
        fs::write(dest, format!("{}:{}", dump_type, entity_id))?;
        Ok(())
    }

    fn deployment_workdir(&self, deployment_id: &str) -> SnapshotResult<String> {
        Ok(self
            .workdirs
            .get(deployment_id)
            .cloned()
            .unwrap_or_else(|| EMPTY_B64_ZIP.to_string()))
    }
}

impl ManagerClient for MockManager {
    fn dump(&self, dump_type: DumpType, args: DumpArgs<'_>) -> SnapshotResult<RecordStream<'_>> {
        self.calls.lock().push(DumpCall::from_args(dump_type, &args));

        let items = self.data.get(&dump_type).cloned().unwrap_or_default();
        let records = items.into_iter().map(Record::from_json);

        match &self.fail_after {
            Some((failing_type, after, message)) if *failing_type == dump_type => {
                let message = message.clone();
                let context = format!("dump {}", dump_type);
                Ok(Box::new(records.take(*after).chain(std::iter::once(Err(
                    SnapshotError::upstream(context, message),
                )))))
            }
            _ => Ok(Box::new(records)),
        }
    }

    fn list_tenants(&self, params: &ListParams) -> SnapshotResult<Page<manager_snapshot::Tenant>> {
        let tenants = self.tenants.lock();
        let page = tenants
            .iter()
            .skip(params.offset)
            .take(self.tenant_page_size)
            .cloned()
            .collect();
        Ok(Page::new(page, tenants.len()))
    }

    fn manager_version(&self) -> SnapshotResult<String> {
        Ok("7.1.0".to_string())
    }

    fn update_status(
        &self,
        snapshot_id: &str,
        status: &str,
        error: Option<&str>,
    ) -> SnapshotResult<()> {
        self.statuses.lock().push(StatusUpdate {
            snapshot_id: snapshot_id.to_string(),
            status: status.to_string(),
            error: error.map(str::to_string),
        });
        if self.failing_status.as_deref() == Some(status) {
            return Err(SnapshotError::upstream("update status", "500 Internal Server Error"));
        }
        Ok(())
    }
}

/// Hands out the management mock and per-tenant mocks
pub struct MockProvider {
    management: Arc<MockManager>,
    tenants: BTreeMap<String, Arc<MockManager>>,
}

impl ClientProvider for MockProvider {
    fn management(&self) -> Arc<dyn ManagerClient> {
        self.management.clone()
    }

    fn for_tenant(
        &self,
        tenant: &manager_snapshot::Tenant,
    ) -> SnapshotResult<Arc<dyn ManagerClient>> {
        match self.tenants.get(&tenant.name) {
            Some(client) => Ok(client.clone() as Arc<dyn ManagerClient>),
            None => Err(SnapshotError::upstream(
                "tenant client",
                format!("unknown tenant {}", tenant.name),
            )),
        }
    }
}

// ============================================================================
// UI exporters, broker lookup
// ============================================================================

/// Writes `{resource}.json` into the output directory and records each call
#[derive(Default)]
pub struct MockUiExporter {
    pub calls: Mutex<Vec<(String, PathBuf, Option<String>)>>,
    panic_on: Option<String>,
    dangling_on: Option<String>,
}

impl MockUiExporter {
    /// Exporter that panics when asked for `resource`
    pub fn panicking_on(resource: &str) -> Self {
        MockUiExporter {
            panic_on: Some(resource.to_string()),
            ..Default::default()
        }
    }

    /// Exporter that leaves `{resource}.json` as a dangling symlink
    pub fn dangling_on(resource: &str) -> Self {
        MockUiExporter {
            dangling_on: Some(resource.to_string()),
            ..Default::default()
        }
    }
}

impl UiExporter for MockUiExporter {
    fn dump(&self, resource: &str, output_dir: &Path, tenant: Option<&str>) -> SnapshotResult<()> {
        self.calls.lock().push((
            resource.to_string(),
            output_dir.to_path_buf(),
            tenant.map(str::to_string),
        ));
        if self.panic_on.as_deref() == Some(resource) {
            panic!("exporter crashed on {}", resource);
        }

        let path = output_dir.join(format!("{}.json", resource));
        if self.dangling_on.as_deref() == Some(resource) {
            dangling_link(&output_dir.join("missing-target"), &path)?;
            return Ok(());
        }
        fs::write(path, json!({ "resource": resource }).to_string())?;
        Ok(())
    }
}

#[cfg(unix)]
fn dangling_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn dangling_link(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks need a unix host",
    ))
}

pub struct StaticBroker;

impl BrokerConfigResolver for StaticBroker {
    fn broker_config(&self, _node_instance: &Entity) -> SnapshotResult<Value> {
        Ok(json!({ "broker_ip": "127.0.0.1" }))
    }
}

// ============================================================================
// Audit listener
// ============================================================================

/// Listener that echoes every captured id back as an audit event
pub struct MockListener {
    sender: Mutex<Option<Sender<AuditEvent>>>,
    pub captured: Mutex<Vec<(Option<String>, DumpType, String)>>,
    pub started_with: Mutex<Vec<String>>,
    pub stopped: AtomicBool,
}

impl MockListener {
    pub fn new(sender: Sender<AuditEvent>) -> Self {
        MockListener {
            sender: Mutex::new(Some(sender)),
            captured: Mutex::new(Vec::new()),
            started_with: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn captured_ids(&self, dump_type: DumpType) -> Vec<String> {
        self.captured
            .lock()
            .iter()
            .filter(|(_, t, _)| *t == dump_type)
            .map(|(_, _, id)| id.clone())
            .collect()
    }
}

impl CaptureRegistry for MockListener {
    fn register_captured(&self, tenant: Option<&str>, dump_type: DumpType, entity_id: &str) {
        self.captured
            .lock()
            .push((tenant.map(str::to_string), dump_type, entity_id.to_string()));
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(AuditEvent::new(tenant, dump_type, entity_id));
        }
    }
}

impl AuditListener for MockListener {
    fn start(&self, tenant_clients: &TenantClients) -> SnapshotResult<()> {
        *self.started_with.lock() = tenant_clients.keys().cloned().collect();
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.sender.lock().take();
    }

    fn join(&self, _timeout: Duration) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Temporary file server plus fakes for one snapshot run
pub struct Harness {
    pub file_server: TempDir,
    pub work_parent: TempDir,
    pub management: Arc<MockManager>,
    pub tenants: BTreeMap<String, Arc<MockManager>>,
    pub composer: Arc<MockUiExporter>,
    pub stage: Arc<MockUiExporter>,
    pub listener: Option<Arc<MockListener>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_management(MockManager::new())
    }

    pub fn with_management(management: MockManager) -> Self {
        Harness {
            file_server: tempfile::tempdir().expect("Failed to create file server dir"),
            work_parent: tempfile::tempdir().expect("Failed to create work parent dir"),
            management: Arc::new(management),
            tenants: BTreeMap::new(),
            composer: Arc::new(MockUiExporter::default()),
            stage: Arc::new(MockUiExporter::default()),
            listener: None,
        }
    }

    pub fn with_tenant(mut self, name: &str, manager: MockManager) -> Self {
        self.tenants.insert(name.to_string(), Arc::new(manager));
        self.management.set_tenants(
            self.tenants
                .keys()
                .map(|n| manager_snapshot::Tenant::new(n.clone()).with_credentials("secret"))
                .collect(),
        );
        self
    }

    pub fn tenant(&self, name: &str) -> &MockManager {
        &self.tenants[name]
    }

    pub fn listener(&self) -> &MockListener {
        self.listener.as_deref().expect("creator not built yet")
    }

    pub fn config(&self) -> SnapshotConfig {
        SnapshotConfig::new(self.file_server.path())
            .with_audit_timeout(Duration::from_millis(50))
            .with_work_dir_parent(self.work_parent.path())
    }

    pub fn creator(&mut self, job: SnapshotJob) -> SnapshotResult<SnapshotCreator> {
        let config = self.config();
        self.creator_with_config(job, config)
    }

    pub fn creator_with_config(
        &mut self,
        job: SnapshotJob,
        config: SnapshotConfig,
    ) -> SnapshotResult<SnapshotCreator> {
        let (sender, audit_events) = audit_channel();
        let listener = Arc::new(MockListener::new(sender));
        self.listener = Some(listener.clone());

        let collaborators = Collaborators {
            clients: Arc::new(MockProvider {
                management: self.management.clone(),
                tenants: self.tenants.clone(),
            }),
            composer: self.composer.clone(),
            stage: self.stage.clone(),
            broker: Arc::new(StaticBroker),
            listener,
            audit_events,
        };
        SnapshotCreator::new(job, config, collaborators)
    }

    pub fn archive_path(&self, snapshot_id: &str) -> PathBuf {
        manager_snapshot::snapshot_archive_path(self.file_server.path(), snapshot_id)
    }

    /// Entries left in the working directory parent
    pub fn leftover_work_dirs(&self) -> Vec<PathBuf> {
        fs::read_dir(self.work_parent.path())
            .expect("read work parent")
            .map(|e| e.expect("dir entry").path())
            .collect()
    }
}

/// Sorted file names stored in an archive
pub fn archive_files(path: &Path) -> Vec<String> {
    let mut names =
        manager_snapshot::SnapshotArchiveReader::file_names(path).expect("read archive");
    names.sort();
    names
}

/// Parse one JSON file stored in an archive
pub fn archive_json(path: &Path, name: &str) -> Value {
    let data = manager_snapshot::SnapshotArchiveReader::read_file(path, name).expect("read entry");
    serde_json::from_slice(&data).expect("parse entry")
}
