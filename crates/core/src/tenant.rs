//! Tenant records and audit events

use crate::dump_type::DumpType;
use serde::{Deserialize, Serialize};

/// A tenant as listed by the manager
///
/// Only the name and the broker password are requested; the password is
/// opaque to the snapshot and only handed to the client factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant name, unique across the manager
    pub name: String,

    /// Credentials used to build the tenant's client context
    #[serde(
        rename = "rabbitmq_password",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub credentials: Option<String>,
}

impl Tenant {
    /// Create a tenant with no credentials
    pub fn new(name: impl Into<String>) -> Self {
        Tenant {
            name: name.into(),
            credentials: None,
        }
    }

    /// Attach credentials
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }
}

/// A change notification observed while the snapshot was being taken
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Owning tenant, `None` for management-scope entities
    pub tenant: Option<String>,
    /// Dump type of the changed entity
    pub dump_type: DumpType,
    /// Id of the changed entity
    pub entity_id: String,
}

impl AuditEvent {
    /// Create an audit event
    pub fn new(tenant: Option<&str>, dump_type: DumpType, entity_id: impl Into<String>) -> Self {
        AuditEvent {
            tenant: tenant.map(str::to_string),
            dump_type,
            entity_id: entity_id.into(),
        }
    }
}
