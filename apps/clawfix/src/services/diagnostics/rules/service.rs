//! Service-manager rules.

use super::thresholds::{
    EXTENDED_DOWNTIME_MIN_UPTIME_SECS, EXTENDED_DOWNTIME_RESTARTS, SIGTERM_LOOP_COUNT,
};
use crate::snapshot::{DiagnosticSnapshot, ServiceState};

pub fn service_crashed(s: &DiagnosticSnapshot) -> bool {
    s.service_state() == Some(ServiceState::Crashed)
}

pub fn sigterm_restart_loop(s: &DiagnosticSnapshot) -> bool {
    let Some(count) = s.logs().and_then(|l| l.sigterm_count) else {
        return false;
    };
    count >= SIGTERM_LOOP_COUNT || (count >= 1 && s.service_state() == Some(ServiceState::Sigterm))
}

pub fn service_not_registered(s: &DiagnosticSnapshot) -> bool {
    s.service_state() == Some(ServiceState::NotRegistered)
}

/// Dormant: the current collector does not send `runs`, `uptimeSeconds`
/// or `nRestarts`, so this only fires for newer collectors.
pub fn extended_downtime(s: &DiagnosticSnapshot) -> bool {
    let Some(service) = s.service.as_ref() else {
        return false;
    };
    let Some(restarts) = service.n_restarts else {
        return false;
    };
    if restarts < EXTENDED_DOWNTIME_RESTARTS {
        return false;
    }
    match (service.runs, service.uptime_seconds) {
        (Some(false), _) => true,
        (Some(true), Some(uptime)) => uptime < EXTENDED_DOWNTIME_MIN_UPTIME_SECS,
        _ => false,
    }
}
