//! Host runtime rules.

use super::thresholds::MIN_NODE_MAJOR;
use crate::snapshot::DiagnosticSnapshot;

/// Major version from strings like "v22.3.0", "20.11.1" or "v18".
fn node_major(version: &str) -> Option<u64> {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .next()?
        .parse()
        .ok()
}

pub fn node_version_outdated(s: &DiagnosticSnapshot) -> bool {
    s.system
        .as_ref()
        .and_then(|sys| sys.node_version.as_deref())
        .and_then(node_major)
        .is_some_and(|major| major < MIN_NODE_MAJOR)
}
