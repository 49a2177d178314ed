use crate::snapshot::DiagnosticSnapshot;

/// Upper bound on snapshot text sent to the model.
const MAX_SNAPSHOT_CHARS: usize = 12_000;

pub const SYSTEM_PROMPT: &str = "You are ClawFix, a diagnostics assistant for OpenClaw installations. \
You receive a redacted diagnostic snapshot and the ids of issues a rule engine already found. \
Report only ADDITIONAL problems the rule engine missed. Do not repeat or re-derive the listed issues. \
Respond with a single JSON object and nothing else: \
{\"summary\": string, \"insights\": string, \"extraFix\": string or null}. \
extraFix must be idempotent bash that is safe to run twice; it may use $OPENCLAW_DIR, $CONFIG_FILE, \
$LOG_DIR, $WORKSPACE_DIR, $GATEWAY_PORT and config_set FILE PATH JSON. Never print secrets.";

/// User message: the already-detected rule ids followed by the snapshot.
pub fn build_prompt(snapshot: &DiagnosticSnapshot, detected_ids: &[&str]) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str("ALREADY DETECTED (do not report these again):\n");
    if detected_ids.is_empty() {
        out.push_str("- none\n");
    }
    for id in detected_ids {
        out.push_str("- ");
        out.push_str(id);
        out.push('\n');
    }

    out.push_str("\nSNAPSHOT:\n");
    let json = serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string());
    out.push_str(truncate(&json, MAX_SNAPSHOT_CHARS));
    if json.len() > MAX_SNAPSHOT_CHARS {
        out.push_str("\n... (truncated)");
    }
    out.push('\n');

    out
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
