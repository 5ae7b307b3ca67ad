//! Audit-log capture during snapshot creation
//!
//! While entities are dumped, a listener watches the manager's audit log and
//! forwards change events over a channel. Once all dumps are done the events
//! are drained until the channel stays quiet for the configured timeout, then
//! the listener is stopped and joined with the same timeout.
//!
//! The listener learns which entities made it into the snapshot through
//! [`CaptureRegistry`], so it can tell which changes raced with the dump.

use crate::client::TenantClients;
use snapshot_core::{AuditEvent, SnapshotResult};
use snapshot_durability::CaptureRegistry;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Background watcher of the manager's audit log
pub trait AuditListener: CaptureRegistry + Send + Sync {
    /// Start watching on behalf of every tenant
    fn start(&self, tenant_clients: &TenantClients) -> SnapshotResult<()>;

    /// Ask the listener to stop; returns without waiting
    fn stop(&self);

    /// Wait up to `timeout` for the listener to finish; `true` if it did
    fn join(&self, timeout: Duration) -> bool;
}

/// Applies drained audit events to the snapshot
pub trait AuditReconciler: Send {
    /// Handle one drained event
    fn reconcile(&mut self, event: &AuditEvent) -> SnapshotResult<()>;
}

/// Reconciler that accepts every event without acting on it
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReconciler;

impl AuditReconciler for NoopReconciler {
    fn reconcile(&mut self, event: &AuditEvent) -> SnapshotResult<()> {
        debug!(
            target: "snapshot::audit",
            tenant = event.tenant.as_deref().unwrap_or("-"),
            dump_type = %event.dump_type,
            entity_id = %event.entity_id,
            "Audit event drained"
        );
        Ok(())
    }
}

/// Channel carrying audit events from the listener to the drain
pub fn audit_channel() -> (Sender<AuditEvent>, Receiver<AuditEvent>) {
    mpsc::channel()
}

/// Outcome of a drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Events received before the channel went quiet
    pub events_received: usize,
    /// Whether the listener finished within the timeout
    pub listener_joined: bool,
}

/// Drains the audit channel and shuts the listener down
#[derive(Debug, Clone, Copy)]
pub struct AuditDrain {
    timeout: Duration,
}

impl AuditDrain {
    /// Create a drain using `timeout` both as quiet period and join deadline
    pub fn new(timeout: Duration) -> Self {
        AuditDrain { timeout }
    }

    /// Receive until no event arrives within the timeout, then stop the listener
    ///
    /// A disconnected channel also ends the drain. A listener that does not
    /// finish in time is logged and reported, not treated as an error.
    pub fn run<L>(
        &self,
        events: &Receiver<AuditEvent>,
        listener: &L,
        reconciler: &mut dyn AuditReconciler,
    ) -> SnapshotResult<DrainStats>
    where
        L: AuditListener + ?Sized,
    {
        let mut stats = DrainStats::default();

        loop {
            match events.recv_timeout(self.timeout) {
                Ok(event) => {
                    stats.events_received += 1;
                    reconciler.reconcile(&event)?;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!(target: "snapshot::audit", "Audit channel closed by listener");
                    break;
                }
            }
        }

        listener.stop();
        stats.listener_joined = listener.join(self.timeout);
        if !stats.listener_joined {
            warn!(
                target: "snapshot::audit",
                timeout_ms = self.timeout.as_millis() as u64,
                "Audit listener did not finish in time"
            );
        }

        info!(
            target: "snapshot::audit",
            events = stats.events_received,
            joined = stats.listener_joined,
            "Audit log drained"
        );
        Ok(stats)
    }
}
