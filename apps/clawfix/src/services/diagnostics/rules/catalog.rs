//! Static rule catalog.
//!
//! Pure data: ids, severities, texts and remediation templates. Detection
//! logic lives in the group modules and is joined to this table by
//! [`super::RuleRegistry`]. The order here is the order issues are reported
//! and remediated in.
//!
//! Remediation templates run under `set -euo pipefail` and may rely on the
//! variables and the `config_set` helper declared in the composed script's
//! preamble. Every template must be safe to run more than once.

use crate::services::diagnostics::models::{RuleGroup, RuleId, RuleMetadata, Severity};

pub static CATALOG: &[RuleMetadata] = &[
    // ---------------------------------------------------------------------
    // Critical
    // ---------------------------------------------------------------------
    RuleMetadata {
        id: RuleId::Mem0GraphFree,
        group: RuleGroup::Config,
        severity: Severity::Critical,
        title: "mem0 graph memory enabled on a free plan",
        description: "A memory plugin has enableGraph turned on. Graph memory needs a paid mem0 plan; on the free tier every memory call fails and the agent stops responding.",
        remediation: r##"if [ -f "$CONFIG_FILE" ]; then
  node -e '
    const fs = require("fs");
    const file = process.argv[1];
    const cfg = JSON.parse(fs.readFileSync(file, "utf8"));
    const entries = (cfg.plugins && cfg.plugins.entries) || {};
    let changed = false;
    for (const entry of Object.values(entries)) {
      if (entry && entry.config && entry.config.enableGraph === true) {
        entry.config.enableGraph = false;
        changed = true;
      }
    }
    if (changed) fs.writeFileSync(file, JSON.stringify(cfg, null, 2) + "\n");
  ' "$CONFIG_FILE"
  echo "Disabled graph memory in plugin config"
fi"##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::GatewayZombie,
        group: RuleGroup::Gateway,
        severity: Severity::Critical,
        title: "Gateway process is a zombie",
        description: "A gateway process exists but nothing is listening on the gateway port. The process is hung and has to be killed before the gateway can start again.",
        remediation: r##"echo "Stopping hung gateway processes..."
pkill -TERM -f "openclaw.*gateway" 2>/dev/null || true
sleep 2
pkill -KILL -f "openclaw.*gateway" 2>/dev/null || true
openclaw gateway start || echo "Gateway did not start; run 'openclaw gateway status' for details""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::GatewayNotRunning,
        group: RuleGroup::Gateway,
        severity: Severity::Critical,
        title: "Gateway is not running",
        description: "No gateway process is running and the gateway port is closed, so no channel can reach your agent.",
        remediation: r##"if (exec 3<>"/dev/tcp/127.0.0.1/$GATEWAY_PORT") 2>/dev/null; then
  echo "Gateway is already listening on port $GATEWAY_PORT"
else
  openclaw gateway start || echo "Gateway did not start; run 'openclaw gateway status' for details"
fi"##,
        fails_open: false,
    },
    // ---------------------------------------------------------------------
    // High
    // ---------------------------------------------------------------------
    RuleMetadata {
        id: RuleId::PortConflict,
        group: RuleGroup::Gateway,
        severity: Severity::High,
        title: "Gateway port already in use",
        description: "The gateway failed to bind because another process holds its port.",
        remediation: r##"echo "Processes listening on port $GATEWAY_PORT:"
if command -v lsof >/dev/null 2>&1; then
  lsof -nP -iTCP:"$GATEWAY_PORT" -sTCP:LISTEN || true
fi
echo "Stop the listed process, or set OPENCLAW_GATEWAY_PORT to a free port.""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::ServiceCrashed,
        group: RuleGroup::Service,
        severity: Severity::High,
        title: "Gateway service crashed",
        description: "The service manager reports the gateway exited with an error and did not come back.",
        remediation: r##"echo "Restarting crashed gateway service..."
openclaw gateway restart || openclaw gateway start || echo "Restart failed; recent log lines are in $LOG_DIR""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::SigtermRestartLoop,
        group: RuleGroup::Service,
        severity: Severity::High,
        title: "Gateway keeps getting terminated",
        description: "The gateway repeatedly receives SIGTERM, usually because two service definitions fight over the same process.",
        remediation: r##"echo "Reinstalling the gateway service definition..."
openclaw gateway stop >/dev/null 2>&1 || true
openclaw gateway install --force || openclaw gateway install || true
openclaw gateway start || echo "Gateway did not start; run 'openclaw gateway status' for details""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::GatewayAuthMissing,
        group: RuleGroup::Config,
        severity: Severity::High,
        title: "Gateway authentication not configured",
        description: "The gateway has no auth token or password, so any local process (or anyone on the network, if exposed) can drive your agent.",
        remediation: r##"if [ -f "$CONFIG_FILE" ] \
  && ! config_has "$CONFIG_FILE" gateway.auth.token \
  && ! config_has "$CONFIG_FILE" gateway.auth.password; then
  token=$(node -e 'console.log(require("crypto").randomBytes(24).toString("hex"))')
  config_set "$CONFIG_FILE" gateway.auth.mode '"token"'
  config_set "$CONFIG_FILE" gateway.auth.token "\"$token\""
  echo "Generated a gateway auth token in $CONFIG_FILE"
fi"##,
        fails_open: true,
    },
    RuleMetadata {
        id: RuleId::GatewayBindExposed,
        group: RuleGroup::Config,
        severity: Severity::High,
        title: "Unauthenticated gateway exposed to the network",
        description: "The gateway binds to a non-loopback address without authentication.",
        remediation: r##"config_set "$CONFIG_FILE" gateway.bind '"loopback"'
echo "Gateway now binds to loopback only; use a tunnel for remote access""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::NodeVersionOutdated,
        group: RuleGroup::System,
        severity: Severity::High,
        title: "Node.js is too old",
        description: "OpenClaw requires Node.js 22 or newer. Older runtimes crash on startup or silently drop features.",
        remediation: r##"echo "Found Node.js $(node --version 2>/dev/null || echo 'not installed'); OpenClaw needs v22 or newer."
echo "Upgrade with your version manager (e.g. 'nvm install 22 && nvm alias default 22') and reinstall: npm install -g openclaw@latest""##,
        fails_open: false,
    },
    // ---------------------------------------------------------------------
    // Medium
    // ---------------------------------------------------------------------
    RuleMetadata {
        id: RuleId::ApiRateLimited,
        group: RuleGroup::Logs,
        severity: Severity::Medium,
        title: "Model provider is rate limiting requests",
        description: "Recent log lines show HTTP 429 / rate limit responses from the model provider.",
        remediation: r##"echo "Your model provider is rate limiting this installation."
echo "Configure a fallback model or reduce heartbeat frequency: openclaw config get agents.defaults""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::HandshakeSpam,
        group: RuleGroup::Logs,
        severity: Severity::Medium,
        title: "Repeated WebSocket handshake failures",
        description: "A client keeps reconnecting with stale credentials, flooding the log with handshake failures.",
        remediation: r##"echo "A paired client keeps retrying with an old token. Connected devices:"
openclaw devices list 2>/dev/null || true
echo "Re-pair or restart the client that is still using the previous token.""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::ErrorBurst,
        group: RuleGroup::Logs,
        severity: Severity::Medium,
        title: "High volume of recent errors",
        description: "The gateway log shows an unusually high number of recent error lines.",
        remediation: r##"echo "Most recent gateway errors:"
for f in "$LOG_DIR"/*.log; do
  [ -f "$f" ] || continue
  grep -i 'error' "$f" | tail -n 10 || true
done"##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::DuplicatePlugin,
        group: RuleGroup::Config,
        severity: Severity::Medium,
        title: "Duplicate plugin installed",
        description: "The same plugin id is installed twice; OpenClaw loads only one copy, which may be the stale one.",
        remediation: r##"echo "Installed plugins:"
openclaw plugins list 2>/dev/null || true
echo "Remove the older copy under $OPENCLAW_DIR/extensions, then restart the gateway.""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::StateDirMigration,
        group: RuleGroup::Config,
        severity: Severity::Medium,
        title: "Legacy state directory needs migration",
        description: "OpenClaw found state from an older install name and has not migrated it.",
        remediation: r##"openclaw doctor --fix || echo "Automatic migration failed; run 'openclaw doctor' to see what is left""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::ServiceNotRegistered,
        group: RuleGroup::Service,
        severity: Severity::Medium,
        title: "Gateway service not installed",
        description: "The gateway is not registered with the service manager, so it will not survive a reboot or a crash.",
        remediation: r##"openclaw gateway install || echo "Service install failed; run 'openclaw gateway install' manually""##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::CompactionUnset,
        group: RuleGroup::Config,
        severity: Severity::Medium,
        title: "Context compaction mode not set",
        description: "Without an explicit compaction mode long sessions can overflow the model context and lose memory.",
        remediation: r##"config_set "$CONFIG_FILE" agents.defaults.compaction.mode '"safeguard"'
echo "Set compaction mode to safeguard""##,
        fails_open: true,
    },
    RuleMetadata {
        id: RuleId::ExtendedDowntime,
        group: RuleGroup::Service,
        severity: Severity::Medium,
        title: "Gateway restarting repeatedly",
        description: "The service manager keeps restarting the gateway and it never stays up for long.",
        remediation: r##"openclaw gateway restart || openclaw gateway start || echo "Gateway did not start; run 'openclaw gateway status' for details""##,
        fails_open: false,
    },
    // ---------------------------------------------------------------------
    // Low
    // ---------------------------------------------------------------------
    RuleMetadata {
        id: RuleId::LargeLogFile,
        group: RuleGroup::Logs,
        severity: Severity::Low,
        title: "Gateway log file is very large",
        description: "The gateway log has grown past 100 MiB, slowing log reads and wasting disk.",
        remediation: r##"for f in "$LOG_DIR"/*.log; do
  [ -f "$f" ] || continue
  if [ "$(wc -c < "$f")" -ge 104857600 ]; then
    tail -c 10485760 "$f" > "$f.tmp" && mv "$f.tmp" "$f"
    echo "Trimmed $f to its last 10 MiB"
  fi
done"##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::StaleLockFile,
        group: RuleGroup::Workspace,
        severity: Severity::Low,
        title: "Stale lock file",
        description: "A lock file is left behind while no gateway process is running; it can block the next start.",
        remediation: r##"if ! pgrep -f "openclaw.*gateway" >/dev/null 2>&1; then
  find "$OPENCLAW_DIR" -maxdepth 2 -type f -name '*.lock' -print -delete 2>/dev/null || true
fi"##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::MemoryBloat,
        group: RuleGroup::Workspace,
        severity: Severity::Low,
        title: "Too many memory files",
        description: "The workspace memory folder holds hundreds of files, which slows memory search and inflates prompts.",
        remediation: r##"if [ -d "$WORKSPACE_DIR/memory" ]; then
  mkdir -p "$WORKSPACE_DIR/memory/archive"
  find "$WORKSPACE_DIR/memory" -maxdepth 1 -type f -name '*.md' -mtime +30 -exec mv {} "$WORKSPACE_DIR/memory/archive/" \;
  echo "Archived memory files older than 30 days"
fi"##,
        fails_open: false,
    },
    RuleMetadata {
        id: RuleId::WorkspaceMissingAgentsMd,
        group: RuleGroup::Workspace,
        severity: Severity::Low,
        title: "Workspace has no AGENTS.md",
        description: "The agent workspace is missing AGENTS.md, so the agent starts every session without its operating instructions.",
        remediation: r##"if [ -d "$WORKSPACE_DIR" ] && [ ! -f "$WORKSPACE_DIR/AGENTS.md" ]; then
  openclaw setup >/dev/null 2>&1 || printf '# AGENTS.md\n\nOperating instructions for this workspace.\n' > "$WORKSPACE_DIR/AGENTS.md"
fi"##,
        fails_open: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_covers_every_rule_id_once() {
        let ids: HashSet<RuleId> = CATALOG.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), CATALOG.len());
        assert_eq!(ids.len(), RuleId::ALL.len());
        for id in RuleId::ALL {
            assert!(ids.contains(&id), "{} missing from catalog", id);
        }
    }

    #[test]
    fn test_catalog_is_grouped_by_severity() {
        let severities: Vec<Severity> = CATALOG.iter().map(|m| m.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
    }

    #[test]
    fn test_templates_are_non_empty_and_never_reset_shell_options() {
        for metadata in CATALOG {
            assert!(!metadata.remediation.trim().is_empty(), "{}", metadata.id);
            assert!(!metadata.remediation.contains("set +e"), "{}", metadata.id);
            assert!(!metadata.remediation.contains("#!/"), "{}", metadata.id);
        }
    }

    #[test]
    fn test_only_config_rules_fail_open() {
        for metadata in CATALOG.iter().filter(|m| m.fails_open) {
            assert_eq!(metadata.group, RuleGroup::Config, "{}", metadata.id);
            assert_ne!(metadata.severity, Severity::Critical, "{}", metadata.id);
        }
    }

    #[test]
    fn test_auth_guard_checks_the_gateway_auth_path() {
        let metadata = CATALOG
            .iter()
            .find(|m| m.id == RuleId::GatewayAuthMissing)
            .unwrap();
        assert!(metadata
            .remediation
            .contains(r#"config_has "$CONFIG_FILE" gateway.auth.token"#));
        assert!(metadata
            .remediation
            .contains(r#"config_has "$CONFIG_FILE" gateway.auth.password"#));
        assert!(!metadata.remediation.contains("grep"));
    }
}
