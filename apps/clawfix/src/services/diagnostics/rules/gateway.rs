//! Gateway process and port rules.
//!
//! The zombie rule and the not-running rule prescribe different fixes
//! (kill a hung process vs. a plain start), so `gateway_not_running` is
//! defined in terms of `!gateway_zombie` and the two can never both fire.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::snapshot::DiagnosticSnapshot;

static RUNNING_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(running|listening|active)\b").expect("Invalid RUNNING_WORD pattern")
});

static NEGATION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(not|isn't|no longer)\s*$").expect("Invalid NEGATION_SUFFIX pattern")
});

static PORT_IN_USE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)EADDRINUSE|address already in use").expect("Invalid PORT_IN_USE pattern")
});

/// Whether a status string explicitly says the gateway is up.
///
/// "not running" and "inactive" do not count.
pub fn says_running(status: &str) -> bool {
    RUNNING_WORD
        .find_iter(status)
        .any(|m| !NEGATION_SUFFIX.is_match(&status[..m.start()]))
}

fn has_authoritative_running_status(s: &DiagnosticSnapshot) -> bool {
    let service_state = s.service.as_ref().and_then(|svc| svc.state.as_deref());
    [s.gateway_status(), service_state]
        .into_iter()
        .flatten()
        .any(says_running)
}

/// Process entry exists but nothing is bound to the gateway port.
pub fn gateway_zombie(s: &DiagnosticSnapshot) -> bool {
    s.process_exists() == Some(true) && s.port_listening() == Some(false)
}

/// Port closed, not a zombie, and nothing explicitly says the gateway is up.
pub fn gateway_not_running(s: &DiagnosticSnapshot) -> bool {
    s.port_listening() == Some(false)
        && !gateway_zombie(s)
        && !has_authoritative_running_status(s)
}

pub fn port_conflict(s: &DiagnosticSnapshot) -> bool {
    s.recent_errors().iter().any(|line| PORT_IN_USE.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> DiagnosticSnapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_says_running() {
        assert!(says_running("running (pid 4121)"));
        assert!(says_running("Gateway: listening on ws://127.0.0.1:18789"));
        assert!(says_running("active"));
        assert!(!says_running("not running"));
        assert!(!says_running("inactive (dead)"));
        assert!(!says_running("Gateway isn't running"));
        assert!(!says_running("stopped"));
    }

    #[test]
    fn test_zombie_and_not_running_are_exclusive() {
        for process_exists in [Some(true), Some(false), None] {
            for port_listening in [Some(true), Some(false), None] {
                let s = snapshot(json!({
                    "openclaw": { "processExists": process_exists, "portListening": port_listening }
                }));
                assert!(
                    !(gateway_zombie(&s) && gateway_not_running(&s)),
                    "{:?} {:?}",
                    process_exists,
                    port_listening
                );
            }
        }
    }

    #[test]
    fn test_zombie_detection() {
        let s = snapshot(json!({ "openclaw": { "processExists": true, "portListening": false } }));
        assert!(gateway_zombie(&s));
        assert!(!gateway_not_running(&s));
    }

    #[test]
    fn test_clean_down_detection() {
        let s = snapshot(json!({ "openclaw": { "processExists": false, "portListening": false } }));
        assert!(!gateway_zombie(&s));
        assert!(gateway_not_running(&s));
    }

    #[test]
    fn test_running_status_suppresses_not_running() {
        let s = snapshot(json!({
            "openclaw": {
                "processExists": false,
                "portListening": false,
                "gatewayStatus": "Runtime: running (pid 9911)"
            }
        }));
        assert!(!gateway_not_running(&s));

        let s = snapshot(json!({
            "openclaw": { "portListening": false },
            "service": { "state": "running" }
        }));
        assert!(!gateway_not_running(&s));
    }

    #[test]
    fn test_absent_port_data_does_not_flag() {
        let s = snapshot(json!({ "openclaw": {} }));
        assert!(!gateway_zombie(&s));
        assert!(!gateway_not_running(&s));
    }

    #[test]
    fn test_port_conflict() {
        let s = snapshot(json!({
            "logs": { "recentErrors": ["Error: listen EADDRINUSE: address already in use :::18789"] }
        }));
        assert!(port_conflict(&s));
        assert!(!port_conflict(&DiagnosticSnapshot::default()));
    }
}
