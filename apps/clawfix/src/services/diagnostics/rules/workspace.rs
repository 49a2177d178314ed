//! Workspace rules.

use super::thresholds::MEMORY_BLOAT_FILES;
use crate::snapshot::DiagnosticSnapshot;

pub fn stale_lock_file(s: &DiagnosticSnapshot) -> bool {
    s.workspace().and_then(|w| w.has_lock_file) == Some(true) && s.process_exists() == Some(false)
}

pub fn memory_bloat(s: &DiagnosticSnapshot) -> bool {
    s.workspace()
        .and_then(|w| w.memory_file_count)
        .is_some_and(|n| n >= MEMORY_BLOAT_FILES)
}

pub fn workspace_missing_agents_md(s: &DiagnosticSnapshot) -> bool {
    s.workspace().and_then(|w| w.has_agents_md) == Some(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> DiagnosticSnapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_stale_lock_only_when_process_known_absent() {
        assert!(stale_lock_file(&snapshot(json!({
            "openclaw": { "processExists": false },
            "workspace": { "hasLockFile": true }
        }))));
        assert!(!stale_lock_file(&snapshot(json!({
            "workspace": { "hasLockFile": true }
        }))));
    }

    #[test]
    fn test_missing_agents_md_needs_explicit_false() {
        assert!(workspace_missing_agents_md(&snapshot(json!({
            "workspace": { "hasAgentsMd": false }
        }))));
        assert!(!workspace_missing_agents_md(&snapshot(json!({ "workspace": {} }))));
    }

    #[test]
    fn test_memory_bloat() {
        assert!(memory_bloat(&snapshot(json!({ "workspace": { "memoryFileCount": 812 } }))));
        assert!(!memory_bloat(&snapshot(json!({ "workspace": { "memoryFileCount": 40 } }))));
    }
}
