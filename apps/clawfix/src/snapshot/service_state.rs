//! Momentary service-state classification.
//!
//! Nothing here models transitions; a snapshot is mapped to exactly one
//! state using the heuristics each service manager allows.

use serde::{Deserialize, Serialize};

/// Exit codes meaning the process was stopped with SIGTERM
/// (raw signal number, negative launchd form, and 128 + 15 shell form).
const SIGTERM_EXIT_CODES: [i64; 3] = [15, -15, 143];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Running,
    Sigterm,
    Crashed,
    Inactive,
    NotRegistered,
    Unknown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "running",
            ServiceState::Sigterm => "sigterm",
            ServiceState::Crashed => "crashed",
            ServiceState::Inactive => "inactive",
            ServiceState::NotRegistered => "not_registered",
            ServiceState::Unknown => "unknown",
        }
    }

    /// Parse a collector-supplied state. Unrecognized values are `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" | "active" => ServiceState::Running,
            "sigterm" => ServiceState::Sigterm,
            "crashed" | "failed" => ServiceState::Crashed,
            "inactive" | "stopped" => ServiceState::Inactive,
            "not_registered" | "not-registered" | "not_installed" => ServiceState::NotRegistered,
            _ => ServiceState::Unknown,
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceManager {
    Launchd,
    Systemd,
    Unknown,
}

impl ServiceManager {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "launchd" | "launchctl" => ServiceManager::Launchd,
            "systemd" | "systemctl" => ServiceManager::Systemd,
            _ => ServiceManager::Unknown,
        }
    }
}

/// Classify raw service-manager facts into a [`ServiceState`].
///
/// * `listed` - whether the manager knows the service at all
/// * `pid` - present when the listing shows a live process
/// * `exit_code` - last exit status reported by the manager
/// * `active_state` - systemd `ActiveState` (ignored for launchd)
pub fn classify(
    manager: ServiceManager,
    listed: Option<bool>,
    pid: Option<i64>,
    exit_code: Option<i64>,
    active_state: Option<&str>,
) -> ServiceState {
    if exit_code.is_some_and(|code| SIGTERM_EXIT_CODES.contains(&code)) {
        return ServiceState::Sigterm;
    }

    match manager {
        ServiceManager::Launchd => {
            if listed == Some(false) {
                return ServiceState::NotRegistered;
            }
            let has_pid = pid.is_some_and(|p| p > 0);
            match (has_pid, exit_code) {
                (true, None) | (true, Some(0)) => ServiceState::Running,
                (false, Some(code)) if code != 0 => ServiceState::Crashed,
                (false, Some(_)) => ServiceState::Inactive,
                // A live pid with a stale non-zero status: launchd restarted it
                (true, Some(_)) => ServiceState::Running,
                (false, None) if listed == Some(true) => ServiceState::Inactive,
                (false, None) => ServiceState::Unknown,
            }
        }
        ServiceManager::Systemd => {
            match active_state.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
                Some("active") | Some("activating") | Some("reloading") => ServiceState::Running,
                Some("failed") => ServiceState::Crashed,
                Some("inactive") | Some("deactivating") => match exit_code {
                    Some(code) if code != 0 => ServiceState::Crashed,
                    _ => ServiceState::Inactive,
                },
                Some("not-found") => ServiceState::NotRegistered,
                _ if listed == Some(false) => ServiceState::NotRegistered,
                _ => ServiceState::Unknown,
            }
        }
        ServiceManager::Unknown => ServiceState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigterm_exit_codes_win_for_every_manager() {
        for manager in [
            ServiceManager::Launchd,
            ServiceManager::Systemd,
            ServiceManager::Unknown,
        ] {
            for code in SIGTERM_EXIT_CODES {
                assert_eq!(
                    classify(manager, Some(true), None, Some(code), Some("active")),
                    ServiceState::Sigterm
                );
            }
        }
    }

    #[test]
    fn test_launchd_classification() {
        use ServiceManager::Launchd;
        assert_eq!(classify(Launchd, Some(true), Some(812), Some(0), None), ServiceState::Running);
        assert_eq!(classify(Launchd, Some(true), None, Some(1), None), ServiceState::Crashed);
        assert_eq!(classify(Launchd, Some(true), None, Some(0), None), ServiceState::Inactive);
        assert_eq!(classify(Launchd, Some(false), None, None, None), ServiceState::NotRegistered);
        assert_eq!(classify(Launchd, None, None, None, None), ServiceState::Unknown);
    }

    #[test]
    fn test_systemd_classification() {
        use ServiceManager::Systemd;
        assert_eq!(classify(Systemd, None, None, None, Some("active")), ServiceState::Running);
        assert_eq!(classify(Systemd, None, None, Some(1), Some("failed")), ServiceState::Crashed);
        assert_eq!(classify(Systemd, None, None, Some(0), Some("inactive")), ServiceState::Inactive);
        assert_eq!(classify(Systemd, None, None, Some(2), Some("inactive")), ServiceState::Crashed);
        assert_eq!(
            classify(Systemd, None, None, None, Some("not-found")),
            ServiceState::NotRegistered
        );
    }

    #[test]
    fn test_parse_accepts_failed_alias() {
        assert_eq!(ServiceState::parse("failed"), ServiceState::Crashed);
        assert_eq!(ServiceState::parse("NOT_REGISTERED"), ServiceState::NotRegistered);
        assert_eq!(ServiceState::parse("weird"), ServiceState::Unknown);
    }
}
