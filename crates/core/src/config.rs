//! Snapshot configuration via `snapshot.toml`
//!
//! The engine only needs to know where the file server keeps its data and
//! which status labels the manager expects. Everything else has a default.

use crate::error::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name conventionally used for snapshot settings.
pub const CONFIG_FILE_NAME: &str = "snapshot.toml";

fn default_created_status() -> String {
    "created".to_string()
}

fn default_failed_status() -> String {
    "failed".to_string()
}

fn default_audit_timeout_ms() -> u64 {
    10_000
}

fn default_compression_level() -> i32 {
    3
}

/// Snapshot configuration loaded from `snapshot.toml`.
///
/// # Example
///
/// ```toml
/// file_server_root = "/opt/manager/resources"
/// created_status = "created"
/// failed_status = "failed"
/// # audit_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Root of the file server; archives go to `{root}/snapshots/{id}/`
    #[serde(default)]
    pub file_server_root: PathBuf,
    /// Status label persisted on success
    #[serde(default = "default_created_status")]
    pub created_status: String,
    /// Status label persisted on failure
    #[serde(default = "default_failed_status")]
    pub failed_status: String,
    /// How long the audit drain waits for the change stream to go quiet
    #[serde(default = "default_audit_timeout_ms")]
    pub audit_timeout_ms: u64,
    /// zstd level for the final archive (1..=22)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Parent directory for the working tree (system temp dir when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir_parent: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            file_server_root: PathBuf::new(),
            created_status: default_created_status(),
            failed_status: default_failed_status(),
            audit_timeout_ms: default_audit_timeout_ms(),
            compression_level: default_compression_level(),
            work_dir_parent: None,
        }
    }
}

impl SnapshotConfig {
    /// Create a config rooted at `file_server_root` with default labels
    pub fn new(file_server_root: impl Into<PathBuf>) -> Self {
        Self {
            file_server_root: file_server_root.into(),
            ..Default::default()
        }
    }

    /// Set the status labels
    pub fn with_status_labels(
        mut self,
        created: impl Into<String>,
        failed: impl Into<String>,
    ) -> Self {
        self.created_status = created.into();
        self.failed_status = failed.into();
        self
    }

    /// Set the audit drain timeout
    pub fn with_audit_timeout(mut self, timeout: Duration) -> Self {
        self.audit_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the archive compression level
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Place the working tree under `parent`
    pub fn with_work_dir_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.work_dir_parent = Some(parent.into());
        self
    }

    /// Audit drain timeout as a `Duration`
    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> SnapshotResult<()> {
        if self.file_server_root.as_os_str().is_empty() {
            return Err(SnapshotError::config("file_server_root is not set"));
        }
        if self.created_status.is_empty() {
            return Err(SnapshotError::config("created_status is empty"));
        }
        if self.failed_status.is_empty() {
            return Err(SnapshotError::config("failed_status is empty"));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(SnapshotError::config(format!(
                "compression_level {} is outside 1..=22",
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Snapshot configuration
#
# Root of the manager's file server (required).
# Archives are written to {file_server_root}/snapshots/{snapshot_id}/.
file_server_root = "/opt/manager/resources"

# Status labels persisted when a snapshot job ends.
created_status = "created"
failed_status = "failed"

# How long to wait for the audit log to go quiet, in milliseconds.
audit_timeout_ms = 10000

# zstd compression level for the final archive (1-22).
compression_level = 3

# Parent directory of the temporary working tree (default: system temp dir).
# work_dir_parent = "/var/tmp"
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> SnapshotResult<Self> {
        let config: SnapshotConfig = toml::from_str(content)
            .map_err(|e| SnapshotError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> SnapshotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SnapshotError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}
