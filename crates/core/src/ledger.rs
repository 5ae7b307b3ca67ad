//! Captured-id accumulator for one tenant phase
//!
//! Later dump types are filtered by the ids an earlier dump type captured in
//! the same tenant phase (nodes by deployment ids, events by execution ids).
//! The ledger is a plain value: the orchestrator creates one per tenant,
//! threads it through every dump call and drops it when the tenant is done.

use crate::dump_type::DumpType;
use crate::error::{SnapshotError, SnapshotResult};
use std::collections::BTreeMap;

/// Ordered ids captured per dump type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdLedger {
    ids: BTreeMap<DumpType, Vec<String>>,
}

impl IdLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the ids captured by a dump type, replacing any earlier list
    pub fn record(&mut self, dump_type: DumpType, ids: Vec<String>) {
        self.ids.insert(dump_type, ids);
    }

    /// Check if a dump type has run in this phase (even if it captured nothing)
    pub fn has_dumped(&self, dump_type: DumpType) -> bool {
        self.ids.contains_key(&dump_type)
    }

    /// Ids captured by a dump type, if it ran
    pub fn ids(&self, dump_type: DumpType) -> Option<&[String]> {
        self.ids.get(&dump_type).map(Vec::as_slice)
    }

    /// Ids a dependent dump type needs from `prerequisite`
    ///
    /// Asking before the prerequisite has run is a programming error.
    pub fn require(&self, dependent: DumpType, prerequisite: DumpType) -> SnapshotResult<&[String]> {
        self.ids(prerequisite).ok_or_else(|| {
            SnapshotError::invariant(format!(
                "{} dumped before its prerequisite {}",
                dependent, prerequisite
            ))
        })
    }

    /// Number of dump types recorded
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
