//! Script composer.
//!
//! Turns detected issues (plus any augmenter extra-fix text) into one bash
//! script. Output is a pure function of the inputs: no clock reads, no
//! randomness, so the same inputs always give byte-identical text.
//!
//! Layout, in order: header, strict mode, shared variables and helpers,
//! config backup, one block per issue, extra fixes, an optional gateway
//! restart, and an optional feedback call.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ClawfixError, Result};

use super::augmenter::Augmentation;
use super::models::Issue;

pub const STRICT_MODE: &str = "set -euo pipefail";
pub const BACKUP_HEADER: &str = "# ==== Backup ====";
pub const EXTRA_FIX_HEADER: &str = "# ==== Additional fixes from AI analysis (review carefully) ====";
pub const RESTART_HEADER: &str = "# ==== Restart gateway ====";
pub const FEEDBACK_HEADER: &str = "# ==== Feedback (optional) ====";

/// Variable names that count as a reference to the primary config file.
const CONFIG_FILE_REFS: [&str; 2] = ["$CONFIG_FILE", "${CONFIG_FILE}"];

const RULE: &str = "# ---------------------------------------------------------------------------";

const PREAMBLE: &str = r##"OPENCLAW_DIR="${OPENCLAW_STATE_DIR:-$HOME/.openclaw}"
CONFIG_FILE="${OPENCLAW_CONFIG_PATH:-$OPENCLAW_DIR/openclaw.json}"
LOG_DIR="$OPENCLAW_DIR/logs"
WORKSPACE_DIR="$OPENCLAW_DIR/workspace"
GATEWAY_PORT="${OPENCLAW_GATEWAY_PORT:-18789}"

# config_set FILE DOTTED.PATH JSON_VALUE
config_set() {
  node -e '
const fs = require("fs");
const [file, path, raw] = process.argv.slice(1);
const cfg = fs.existsSync(file) ? JSON.parse(fs.readFileSync(file, "utf8")) : {};
const keys = path.split(".");
let node = cfg;
for (const key of keys.slice(0, -1)) {
  if (typeof node[key] !== "object" || node[key] === null) node[key] = {};
  node = node[key];
}
node[keys[keys.length - 1]] = JSON.parse(raw);
fs.writeFileSync(file, JSON.stringify(cfg, null, 2) + "\n");
' "$1" "$2" "$3"
}

# config_has FILE DOTTED.PATH (succeeds when the value is set and non-empty)
config_has() {
  node -e '
const fs = require("fs");
const [file, path] = process.argv.slice(1);
let node = fs.existsSync(file) ? JSON.parse(fs.readFileSync(file, "utf8")) : {};
for (const key of path.split(".")) {
  if (typeof node !== "object" || node === null) process.exit(1);
  node = node[key];
}
process.exit(node === undefined || node === null || node === "" ? 1 : 0);
' "$1" "$2"
}"##;

const RESTART_BLOCK: &str = r##"if command -v openclaw >/dev/null 2>&1; then
  echo "==> Restarting gateway to apply configuration changes"
  openclaw gateway restart || echo "Gateway restart failed; run 'openclaw gateway restart' manually"
fi"##;

/// Model-written text is held in `$EXTRA_FIX` and only evaluated after
/// `bash -n` accepts it, so a malformed suggestion cannot break the script.
const EXTRA_FIX_RUNNER: &str = r##"if bash -n -c "$EXTRA_FIX" 2>/dev/null; then
  eval "$EXTRA_FIX" || echo "Additional fix failed; continuing"
else
  echo "Skipping additional fix: not valid bash"
fi"##;

/// Inputs that are not part of the diagnosis itself.
#[derive(Debug, Clone)]
pub struct ComposeContext {
    /// Timestamp written into the header
    pub generated_at: DateTime<Utc>,
    /// Endpoint for the trailing feedback call. `None` omits the block.
    pub feedback_url: Option<String>,
}

/// Compose the remediation script.
///
/// Fails instead of returning a partial script when any input could make
/// the output malformed.
pub fn compose(
    issues: &[Issue],
    augmentation: &Augmentation,
    fix_id: &str,
    ctx: &ComposeContext,
) -> Result<String> {
    validate_fix_id(fix_id)?;
    for issue in issues {
        reject_nul(&issue.remediation, &issue.id)?;
    }
    let extra_fix = augmentation
        .extra_fix
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());
    if let Some(text) = extra_fix {
        reject_nul(text, "extra fix")?;
    }

    let mut script = Script::default();

    script.line("#!/usr/bin/env bash");
    script.line("# ClawFix remediation script");
    script.line(format!("# Fix ID: {}", fix_id));
    script.line(format!(
        "# Generated: {}",
        ctx.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    script.line(format!("# Issues: {}", issues.len()));
    script.line("#");
    script.line("# Review before running. Every step is safe to run more than once.");
    script.line(STRICT_MODE);
    script.blank();
    script.line(PREAMBLE);
    script.blank();

    script.line(BACKUP_HEADER);
    script.line(format!(
        "BACKUP_FILE=\"$CONFIG_FILE.clawfix-{}.bak\"",
        fix_id
    ));
    script.line("if [ -f \"$CONFIG_FILE\" ] && [ ! -f \"$BACKUP_FILE\" ]; then");
    script.line("  cp \"$CONFIG_FILE\" \"$BACKUP_FILE\"");
    script.line("  echo \"Backed up $CONFIG_FILE to $BACKUP_FILE\"");
    script.line("fi");
    script.blank();

    if issues.is_empty() && extra_fix.is_none() {
        script.line("echo \"No known issues detected; nothing to fix.\"");
        script.blank();
    }

    let mut touches_config = false;

    for (index, issue) in issues.iter().enumerate() {
        script.line(RULE);
        script.line(format!(
            "# [{}/{}] {} ({})",
            index + 1,
            issues.len(),
            one_line(&issue.title),
            issue.severity
        ));
        script.line(format!("# {}", one_line(&issue.description)));
        script.line(format!("# Rule: {}", issue.id));
        script.line(RULE);
        script.line(format!(
            "echo {}",
            shell_quote(&format!("==> Fixing: {}", one_line(&issue.title)))
        ));
        script.line(issue.remediation.trim_end());
        script.blank();
        touches_config |= references_config_file(&issue.remediation);
    }

    if let Some(text) = extra_fix {
        script.line(EXTRA_FIX_HEADER);
        script.line(format!("EXTRA_FIX={}", shell_quote(text)));
        script.line(EXTRA_FIX_RUNNER);
        script.blank();
        touches_config |= references_config_file(text);
    }

    if touches_config {
        script.line(RESTART_HEADER);
        script.line(RESTART_BLOCK);
        script.blank();
    }

    if let Some(url) = ctx.feedback_url.as_deref() {
        script.line(FEEDBACK_HEADER);
        script.line("# Tells ClawFix this fix worked. Remove these lines to opt out;");
        script.line("# any failure here is ignored.");
        script.line(format!(
            "curl -fsS -m 10 -X POST -H 'Content-Type: application/json' -d '{{\"success\":true}}' {} >/dev/null 2>&1 || true",
            shell_quote(url)
        ));
        script.blank();
    }

    script.line("echo \"ClawFix finished.\"");

    Ok(script.finish())
}

/// Whether a block mentions the primary configuration file.
pub fn references_config_file(block: &str) -> bool {
    CONFIG_FILE_REFS.iter().any(|name| block.contains(name))
}

fn validate_fix_id(fix_id: &str) -> Result<()> {
    let valid = !fix_id.is_empty()
        && fix_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ClawfixError::compose(format!("invalid fix id '{}'", fix_id)))
    }
}

fn reject_nul(text: &str, what: &str) -> Result<()> {
    if text.contains('\0') {
        return Err(ClawfixError::compose(format!("{} contains a NUL byte", what)));
    }
    Ok(())
}

/// Collapse text onto a single line so it cannot escape a `#` comment.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-quote a string for bash.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

#[derive(Default)]
struct Script {
    text: String,
}

impl Script {
    fn line(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    fn blank(&mut self) {
        self.text.push('\n');
    }

    fn finish(self) -> String {
        self.text
    }
}
