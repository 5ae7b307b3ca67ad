//! Dependency arguments of dump calls
//!
//! Some dump types are filtered by ids captured earlier in the same tenant
//! phase. [`DumpArgs::build`] is the single table mapping a dump type to the
//! arguments it needs:
//!
//! | Dump type | Arguments |
//! |-----------|-----------|
//! | `nodes`, `agents` | deployment ids |
//! | `node_instances` | deployment ids, broker config resolver |
//! | `events` | execution ids, execution group ids, include logs |
//! | `operations` | execution ids |
//! | everything else | none |

use crate::client::BrokerConfigResolver;
use snapshot_core::{DumpType, IdLedger, SnapshotResult};

/// Arguments passed to [`ManagerClient::dump`](crate::client::ManagerClient::dump)
#[derive(Clone, Copy)]
pub enum DumpArgs<'a> {
    /// Unfiltered dump
    Plain,
    /// Restrict to the given deployments (`nodes`, `agents`)
    Deployments {
        /// Deployment ids captured in this tenant phase
        deployment_ids: &'a [String],
    },
    /// Node instances of the given deployments
    NodeInstances {
        /// Deployment ids captured in this tenant phase
        deployment_ids: &'a [String],
        /// Resolver for agent broker configuration
        broker: &'a dyn BrokerConfigResolver,
    },
    /// Events of the given executions and execution groups
    Events {
        /// Execution ids captured in this tenant phase
        execution_ids: &'a [String],
        /// Execution group ids captured in this tenant phase
        execution_group_ids: &'a [String],
        /// Whether log entries are included along with events
        include_logs: bool,
    },
    /// Operations of the given executions
    Operations {
        /// Execution ids captured in this tenant phase
        execution_ids: &'a [String],
    },
}

impl<'a> DumpArgs<'a> {
    /// Arguments for `dump_type`, taking prerequisite ids from `ledger`
    ///
    /// Fails with an invariant violation if a prerequisite has not run.
    pub fn build(
        dump_type: DumpType,
        ledger: &'a IdLedger,
        include_logs: bool,
        broker: &'a dyn BrokerConfigResolver,
    ) -> SnapshotResult<Self> {
        Ok(match dump_type {
            DumpType::Agents | DumpType::Nodes => DumpArgs::Deployments {
                deployment_ids: ledger.require(dump_type, DumpType::Deployments)?,
            },
            DumpType::NodeInstances => DumpArgs::NodeInstances {
                deployment_ids: ledger.require(dump_type, DumpType::Deployments)?,
                broker,
            },
            DumpType::Events => DumpArgs::Events {
                execution_ids: ledger.require(dump_type, DumpType::Executions)?,
                execution_group_ids: ledger.require(dump_type, DumpType::ExecutionGroups)?,
                include_logs,
            },
            DumpType::Operations => DumpArgs::Operations {
                execution_ids: ledger.require(dump_type, DumpType::Executions)?,
            },
            _ => DumpArgs::Plain,
        })
    }

    /// Deployment ids the dump is restricted to, if any
    pub fn deployment_ids(&self) -> Option<&'a [String]> {
        match *self {
            DumpArgs::Deployments { deployment_ids }
            | DumpArgs::NodeInstances { deployment_ids, .. } => Some(deployment_ids),
            _ => None,
        }
    }

    /// Execution ids the dump is restricted to, if any
    pub fn execution_ids(&self) -> Option<&'a [String]> {
        match *self {
            DumpArgs::Events { execution_ids, .. } | DumpArgs::Operations { execution_ids } => {
                Some(execution_ids)
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for DumpArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DumpArgs::Plain => f.write_str("Plain"),
            DumpArgs::Deployments { deployment_ids } => f
                .debug_struct("Deployments")
                .field("deployment_ids", deployment_ids)
                .finish(),
            DumpArgs::NodeInstances { deployment_ids, .. } => f
                .debug_struct("NodeInstances")
                .field("deployment_ids", deployment_ids)
                .finish_non_exhaustive(),
            DumpArgs::Events {
                execution_ids,
                execution_group_ids,
                include_logs,
            } => f
                .debug_struct("Events")
                .field("execution_ids", execution_ids)
                .field("execution_group_ids", execution_group_ids)
                .field("include_logs", include_logs)
                .finish(),
            DumpArgs::Operations { execution_ids } => f
                .debug_struct("Operations")
                .field("execution_ids", execution_ids)
                .finish(),
        }
    }
}
