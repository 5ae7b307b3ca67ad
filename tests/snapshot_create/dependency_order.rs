//! Tenant phase ordering and dependency arguments

use crate::common::*;
use manager_snapshot::{DumpType, SnapshotJob};
use serde_json::json;

fn ids(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|s| s.to_string()).collect())
}

fn populated_tenant() -> MockManager {
    MockManager::new()
        .with_ids(DumpType::Deployments, &["d1", "d2"])
        .with_ids(DumpType::Executions, &["e1", "e2"])
        .with_ids(DumpType::ExecutionGroups, &["g1"])
}

#[test]
fn tenant_types_dump_in_fixed_order() {
    let mut h = Harness::new().with_tenant("t1", populated_tenant());
    h.creator(SnapshotJob::new("order")).unwrap().create().unwrap();

    assert_eq!(h.tenant("t1").dumped_types(), DumpType::TENANT_ORDER.to_vec());
    assert_eq!(h.management.dumped_types(), DumpType::MANAGEMENT_ORDER.to_vec());
}

#[test]
fn dependents_receive_exact_prerequisite_ids() {
    let mut h = Harness::new().with_tenant("t1", populated_tenant());
    h.creator(SnapshotJob::new("deps").with_logs(false))
        .unwrap()
        .create()
        .unwrap();

    let tenant = h.tenant("t1");
    for dump_type in [DumpType::Nodes, DumpType::NodeInstances, DumpType::Agents] {
        assert_eq!(
            tenant.call(dump_type).unwrap().deployment_ids,
            ids(&["d1", "d2"]),
            "{}",
            dump_type
        );
    }

    let events = tenant.call(DumpType::Events).unwrap();
    assert_eq!(events.execution_ids, ids(&["e1", "e2"]));
    assert_eq!(events.execution_group_ids, ids(&["g1"]));
    assert_eq!(events.include_logs, Some(false));

    let operations = tenant.call(DumpType::Operations).unwrap();
    assert_eq!(operations.execution_ids, ids(&["e1", "e2"]));

    let sites = tenant.call(DumpType::Sites).unwrap();
    assert_eq!(sites.deployment_ids, None);
    assert_eq!(sites.execution_ids, None);
}

#[test]
fn ledgers_are_not_shared_between_tenants() {
    let mut h = Harness::new()
        .with_tenant("alpha", MockManager::new().with_ids(DumpType::Deployments, &["a1"]))
        .with_tenant("beta", MockManager::new());
    h.creator(SnapshotJob::new("isolated"))
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(
        h.tenant("alpha").call(DumpType::Nodes).unwrap().deployment_ids,
        ids(&["a1"])
    );
    assert_eq!(
        h.tenant("beta").call(DumpType::Nodes).unwrap().deployment_ids,
        Some(Vec::new())
    );
}

#[test]
fn numeric_ids_are_captured_as_strings() {
    let tenant = MockManager::new().with(
        DumpType::Deployments,
        vec![json!({ "id": 17 }), json!({ "id": "" }), json!({ "name": "no id" })],
    );
    let mut h = Harness::new().with_tenant("t1", tenant);
    h.creator(SnapshotJob::new("numeric"))
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(
        h.tenant("t1").call(DumpType::Nodes).unwrap().deployment_ids,
        ids(&["17"])
    );
}

#[test]
fn captured_ids_reach_listener_and_drain() {
    let mut h = Harness::new().with_tenant("t1", populated_tenant());
    let report = h
        .creator(SnapshotJob::new("audit"))
        .unwrap()
        .create()
        .unwrap();

    let listener = h.listener();
    assert_eq!(listener.captured_ids(DumpType::Deployments), vec!["d1", "d2"]);
    assert_eq!(listener.captured_ids(DumpType::Executions), vec!["e1", "e2"]);
    assert_eq!(*listener.started_with.lock(), vec!["t1".to_string()]);

    let captured = listener.captured.lock().len();
    assert_eq!(report.audit.events_received, captured);
    assert!(report.audit.listener_joined);
}

#[test]
fn tenants_are_listed_across_pages() {
    let mut h = Harness::new()
        .with_tenant("c", MockManager::new())
        .with_tenant("a", MockManager::new())
        .with_tenant("b", MockManager::new());
    let report = h
        .creator(SnapshotJob::new("paged"))
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(report.tenants, vec!["a", "b", "c"]);
    for name in ["a", "b", "c"] {
        assert_eq!(h.tenant(name).dumped_types().len(), DumpType::TENANT_ORDER.len());
    }
}
