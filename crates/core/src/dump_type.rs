//! Dump type enumeration
//!
//! Every resource category exported into a snapshot is a [`DumpType`].
//! The enum is a closed table: each tag knows its wire name, whether it is
//! dumped once for the whole manager or once per tenant, which earlier dump
//! types it takes ids from, and (for three types) the suffix of the blob
//! archive stored beside its shards.
//!
//! | Dump type | Scope | Needs ids of | Blob suffix |
//! |-----------|-------|--------------|-------------|
//! | `plugins` | tenant | | `.zip` |
//! | `blueprints` | tenant | | `.tar.gz` |
//! | `deployments` | tenant | | `.b64zip` |
//! | `nodes`, `agents`, `node_instances` | tenant | `deployments` | |
//! | `events` | tenant | `executions`, `execution_groups` | |
//! | `operations` | tenant | `executions` | |

use serde::{Deserialize, Serialize};

/// Whether a dump type is exported once per manager or once per tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpScope {
    /// Dumped once, written under `mgmt/`
    Management,
    /// Dumped for every tenant, written under `tenants/{tenant}/`
    Tenant,
}

/// Resource categories exported into a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpType {
    // Management scope
    /// User groups
    UserGroups,
    /// Tenants
    Tenants,
    /// Users
    Users,
    /// Role permissions
    Permissions,

    // Tenant scope
    /// Sites
    Sites,
    /// Plugins (blob: plugin package)
    Plugins,
    /// Secrets providers
    SecretsProviders,
    /// Secrets
    Secrets,
    /// Blueprints (blob: blueprint package)
    Blueprints,
    /// Deployments (blob: encoded working directory)
    Deployments,
    /// Deployment groups
    DeploymentGroups,
    /// Nodes of the dumped deployments
    Nodes,
    /// Node instances of the dumped deployments
    NodeInstances,
    /// Agents of the dumped deployments
    Agents,
    /// Inter-deployment dependencies
    InterDeploymentDependencies,
    /// Executions
    Executions,
    /// Execution groups
    ExecutionGroups,
    /// Events and logs of the dumped executions and execution groups
    Events,
    /// Task-graph operations of the dumped executions
    Operations,
    /// Deployment updates
    DeploymentUpdates,
    /// Plugin updates
    PluginsUpdate,
    /// Deployment filters
    DeploymentsFilters,
    /// Blueprint filters
    BlueprintsFilters,
    /// Execution schedules
    ExecutionSchedules,
}

impl DumpType {
    /// Management-scope dump types, in dump order
    pub const MANAGEMENT_ORDER: [DumpType; 4] = [
        DumpType::UserGroups,
        DumpType::Tenants,
        DumpType::Users,
        DumpType::Permissions,
    ];

    /// Tenant-scope dump types, in dump order
    ///
    /// Every type appears after all of its prerequisites.
    pub const TENANT_ORDER: [DumpType; 20] = [
        DumpType::Sites,
        DumpType::Plugins,
        DumpType::SecretsProviders,
        DumpType::Secrets,
        DumpType::Blueprints,
        DumpType::Deployments,
        DumpType::DeploymentGroups,
        DumpType::Nodes,
        DumpType::NodeInstances,
        DumpType::Agents,
        DumpType::InterDeploymentDependencies,
        DumpType::Executions,
        DumpType::ExecutionGroups,
        DumpType::Events,
        DumpType::Operations,
        DumpType::DeploymentUpdates,
        DumpType::PluginsUpdate,
        DumpType::DeploymentsFilters,
        DumpType::BlueprintsFilters,
        DumpType::ExecutionSchedules,
    ];

    /// Wire name, also used for directory and shard `type` fields
    pub const fn name(&self) -> &'static str {
        match self {
            DumpType::UserGroups => "user_groups",
            DumpType::Tenants => "tenants",
            DumpType::Users => "users",
            DumpType::Permissions => "permissions",
            DumpType::Sites => "sites",
            DumpType::Plugins => "plugins",
            DumpType::SecretsProviders => "secrets_providers",
            DumpType::Secrets => "secrets",
            DumpType::Blueprints => "blueprints",
            DumpType::Deployments => "deployments",
            DumpType::DeploymentGroups => "deployment_groups",
            DumpType::Nodes => "nodes",
            DumpType::NodeInstances => "node_instances",
            DumpType::Agents => "agents",
            DumpType::InterDeploymentDependencies => "inter_deployment_dependencies",
            DumpType::Executions => "executions",
            DumpType::ExecutionGroups => "execution_groups",
            DumpType::Events => "events",
            DumpType::Operations => "operations",
            DumpType::DeploymentUpdates => "deployment_updates",
            DumpType::PluginsUpdate => "plugins_update",
            DumpType::DeploymentsFilters => "deployments_filters",
            DumpType::BlueprintsFilters => "blueprints_filters",
            DumpType::ExecutionSchedules => "execution_schedules",
        }
    }

    /// Parse from wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::MANAGEMENT_ORDER
            .iter()
            .chain(Self::TENANT_ORDER.iter())
            .copied()
            .find(|t| t.name() == name)
    }

    /// Scope the dump type is exported in
    pub const fn scope(&self) -> DumpScope {
        match self {
            DumpType::UserGroups | DumpType::Tenants | DumpType::Users | DumpType::Permissions => {
                DumpScope::Management
            }
            _ => DumpScope::Tenant,
        }
    }

    /// Dump types whose captured ids this type needs, in the same tenant phase
    pub const fn prerequisites(&self) -> &'static [DumpType] {
        match self {
            DumpType::Nodes | DumpType::NodeInstances | DumpType::Agents => {
                &[DumpType::Deployments]
            }
            DumpType::Events => &[DumpType::Executions, DumpType::ExecutionGroups],
            DumpType::Operations => &[DumpType::Executions],
            _ => &[],
        }
    }

    /// Suffix of the per-entity blob archive, for the types that have one
    pub const fn archive_suffix(&self) -> Option<&'static str> {
        match self {
            DumpType::Plugins => Some(".zip"),
            DumpType::Blueprints => Some(".tar.gz"),
            DumpType::Deployments => Some(".b64zip"),
            _ => None,
        }
    }

    /// Check if each entity of this type has a blob archive
    pub const fn has_archive(&self) -> bool {
        self.archive_suffix().is_some()
    }
}

impl std::fmt::Display for DumpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tests
// ============================================================================
