//! Log excerpt rules.

use once_cell::sync::Lazy;
use regex::Regex;

use super::thresholds::{large_log_bytes, ERROR_BURST_COUNT, HANDSHAKE_SPAM_COUNT};
use crate::snapshot::DiagnosticSnapshot;

static RATE_LIMITED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b429\b|rate[ _-]?limit").expect("Invalid RATE_LIMITED pattern")
});

pub fn api_rate_limited(s: &DiagnosticSnapshot) -> bool {
    s.recent_errors().iter().any(|line| RATE_LIMITED.is_match(line))
}

pub fn handshake_spam(s: &DiagnosticSnapshot) -> bool {
    s.logs()
        .and_then(|l| l.handshake_failures)
        .is_some_and(|n| n >= HANDSHAKE_SPAM_COUNT)
}

pub fn error_burst(s: &DiagnosticSnapshot) -> bool {
    s.logs()
        .and_then(|l| l.error_count)
        .is_some_and(|n| n >= ERROR_BURST_COUNT)
}

pub fn large_log_file(s: &DiagnosticSnapshot) -> bool {
    s.logs()
        .and_then(|l| l.log_size_bytes)
        .is_some_and(|bytes| bytes >= large_log_bytes())
}
