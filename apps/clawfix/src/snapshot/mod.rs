//! Diagnostic snapshot data contract.
//!
//! A snapshot is produced by the collector script on the user's machine and
//! posted as JSON. The schema is tolerant: every branch may be missing, and
//! a value of the wrong JSON type is read as missing instead of failing the
//! whole request. Absence is always `None`, never `false` or `0`.

mod service_state;

pub use service_state::{classify, ServiceManager, ServiceState};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ClawfixError, Result};

/// Deserialize an optional field, mapping type mismatches to `None`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// One point-in-time description of a remote installation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    /// Collector schema version (semver).
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    /// Opaque short hash of the host; never a real hostname.
    #[serde(default, deserialize_with = "lenient")]
    pub host_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub system: Option<SystemInfo>,
    #[serde(default, deserialize_with = "lenient")]
    pub openclaw: Option<OpenclawInfo>,
    #[serde(default, deserialize_with = "lenient")]
    pub service: Option<ServiceFacts>,
    /// Redacted configuration tree (`openclaw.json`).
    #[serde(default, deserialize_with = "lenient")]
    pub config: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub logs: Option<LogExcerpts>,
    #[serde(default, deserialize_with = "lenient")]
    pub workspace: Option<WorkspaceFacts>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub kernel: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub arch: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub node_version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub npm_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenclawInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub binary_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub config_dir: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub process_exists: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub port_listening: Option<bool>,
    /// Short gateway status line, e.g. "running (pid 4121)".
    #[serde(default, deserialize_with = "lenient")]
    pub gateway_status: Option<String>,
    /// Raw `openclaw status` output, redacted by the collector.
    #[serde(default, deserialize_with = "lenient")]
    pub status_output: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFacts {
    #[serde(default, deserialize_with = "lenient")]
    pub manager: Option<String>,
    /// Collector-classified state, when the collector already did the work.
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub pid: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_exit_code: Option<i64>,
    /// systemd `ActiveState`.
    #[serde(default, deserialize_with = "lenient")]
    pub active_state: Option<String>,
    /// Whether the manager lists the service at all.
    #[serde(default, deserialize_with = "lenient")]
    pub listed: Option<bool>,
    // Not populated by the current collector.
    #[serde(default, deserialize_with = "lenient")]
    pub runs: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub uptime_seconds: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub n_restarts: Option<u64>,
}

impl ServiceFacts {
    /// The collector's state if given, otherwise a classification of the raw facts.
    pub fn effective_state(&self) -> ServiceState {
        if let Some(state) = self.state.as_deref() {
            return ServiceState::parse(state);
        }
        let manager = self
            .manager
            .as_deref()
            .map(ServiceManager::parse)
            .unwrap_or(ServiceManager::Unknown);
        classify(
            manager,
            self.listed,
            self.pid,
            self.last_exit_code,
            self.active_state.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExcerpts {
    /// Recent error lines, already truncated by the collector.
    #[serde(default, deserialize_with = "lenient")]
    pub recent_errors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub handshake_failures: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub sigterm_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub log_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFacts {
    #[serde(default, deserialize_with = "lenient")]
    pub file_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub memory_file_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_agents_md: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_soul_md: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_memory_md: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_lock_file: Option<bool>,
}

impl DiagnosticSnapshot {
    /// Validate a raw request body and read it as a snapshot.
    ///
    /// The only hard requirement is a `system` object; everything else is
    /// optional.
    pub fn from_request(body: &Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| ClawfixError::validation("request body must be a JSON object"))?;

        match object.get("system") {
            Some(Value::Object(_)) => {}
            _ => {
                return Err(ClawfixError::validation(
                    "missing 'system' object in diagnostic snapshot",
                ))
            }
        }

        Ok(serde_json::from_value(body.clone())?)
    }

    /// Walk the configuration tree. `None` if any segment is missing.
    pub fn config_path(&self, path: &[&str]) -> Option<&Value> {
        let mut node = self.config.as_ref()?;
        for segment in path {
            node = node.get(*segment)?;
        }
        Some(node)
    }

    pub fn process_exists(&self) -> Option<bool> {
        self.openclaw.as_ref()?.process_exists
    }

    pub fn port_listening(&self) -> Option<bool> {
        self.openclaw.as_ref()?.port_listening
    }

    pub fn gateway_status(&self) -> Option<&str> {
        self.openclaw.as_ref()?.gateway_status.as_deref()
    }

    pub fn status_output(&self) -> Option<&str> {
        self.openclaw.as_ref()?.status_output.as_deref()
    }

    /// Effective service state, `None` when the snapshot has no service branch.
    pub fn service_state(&self) -> Option<ServiceState> {
        self.service.as_ref().map(ServiceFacts::effective_state)
    }

    pub fn recent_errors(&self) -> &[String] {
        self.logs
            .as_ref()
            .and_then(|l| l.recent_errors.as_deref())
            .unwrap_or(&[])
    }

    pub fn logs(&self) -> Option<&LogExcerpts> {
        self.logs.as_ref()
    }

    pub fn workspace(&self) -> Option<&WorkspaceFacts> {
        self.workspace.as_ref()
    }

    /// Internal-only provenance carried on a stored diagnosis.
    pub fn provenance(&self) -> Provenance {
        let system = self.system.as_ref();
        Provenance {
            host_hash: self.host_hash.clone(),
            os: system.and_then(|s| s.os.clone()),
            arch: system.and_then(|s| s.arch.clone()),
            node_version: system.and_then(|s| s.node_version.clone()),
            openclaw_version: self.openclaw.as_ref().and_then(|o| o.version.clone()),
        }
    }
}

/// Where a diagnosis came from. Never serialized to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub host_hash: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub node_version: Option<String>,
    pub openclaw_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_system_is_rejected() {
        let err = DiagnosticSnapshot::from_request(&json!({ "openclaw": {} })).unwrap_err();
        assert!(matches!(err, ClawfixError::Validation(_)));

        let err = DiagnosticSnapshot::from_request(&json!({ "system": "linux" })).unwrap_err();
        assert!(matches!(err, ClawfixError::Validation(_)));

        let err = DiagnosticSnapshot::from_request(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ClawfixError::Validation(_)));
    }

    #[test]
    fn test_minimal_snapshot_has_everything_absent() {
        let snapshot = DiagnosticSnapshot::from_request(&json!({ "system": {} })).unwrap();
        assert!(snapshot.process_exists().is_none());
        assert!(snapshot.port_listening().is_none());
        assert!(snapshot.service_state().is_none());
        assert!(snapshot.recent_errors().is_empty());
        assert!(snapshot.config_path(&["gateway"]).is_none());
    }

    #[test]
    fn test_wrong_types_read_as_absent() {
        let snapshot = DiagnosticSnapshot::from_request(&json!({
            "system": { "os": 42, "arch": "arm64" },
            "openclaw": { "processExists": "yes", "portListening": false },
            "logs": { "logSizeBytes": "huge" },
            "workspace": "not an object"
        }))
        .unwrap();

        let system = snapshot.system.as_ref().unwrap();
        assert!(system.os.is_none());
        assert_eq!(system.arch.as_deref(), Some("arm64"));
        assert_eq!(snapshot.process_exists(), None);
        assert_eq!(snapshot.port_listening(), Some(false));
        assert!(snapshot.logs().unwrap().log_size_bytes.is_none());
        assert!(snapshot.workspace().is_none());
    }

    #[test]
    fn test_config_path_walks_nested_objects() {
        let snapshot = DiagnosticSnapshot::from_request(&json!({
            "system": {},
            "config": { "gateway": { "auth": { "mode": "token" } } }
        }))
        .unwrap();

        assert_eq!(
            snapshot.config_path(&["gateway", "auth", "mode"]),
            Some(&json!("token"))
        );
        assert!(snapshot.config_path(&["gateway", "bind"]).is_none());
    }

    #[test]
    fn test_provenance_extraction() {
        let snapshot = DiagnosticSnapshot::from_request(&json!({
            "hostHash": "a1b2c3",
            "system": { "os": "darwin", "arch": "arm64", "nodeVersion": "v22.3.0" },
            "openclaw": { "version": "2026.2.1" }
        }))
        .unwrap();

        let provenance = snapshot.provenance();
        assert_eq!(provenance.host_hash.as_deref(), Some("a1b2c3"));
        assert_eq!(provenance.os.as_deref(), Some("darwin"));
        assert_eq!(provenance.openclaw_version.as_deref(), Some("2026.2.1"));
    }
}
