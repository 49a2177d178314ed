//! Configuration-tree rules.
//!
//! Rules that read a nested path fail open: a wholly absent path counts as
//! the issue being present. Rules keyed on a toggle (`enableGraph`, an
//! explicit `bind`) only fire when the toggle is actually set.
//!
//! `duplicate_plugin` and `state_dir_migration` match literal phrases in the
//! free-form `openclaw status` output. That output is not a stable
//! interface; these rules break silently if its wording changes.

use serde_json::Value;

use crate::snapshot::DiagnosticSnapshot;

const LOOPBACK_BINDS: [&str; 5] = ["loopback", "localhost", "127.0.0.1", "::1", "auto"];

/// Any plugin entry with `config.enableGraph == true`.
pub fn mem0_graph_free(s: &DiagnosticSnapshot) -> bool {
    let Some(Value::Object(entries)) = s.config_path(&["plugins", "entries"]) else {
        return false;
    };
    entries.values().any(|entry| {
        entry
            .get("config")
            .and_then(|c| c.get("enableGraph"))
            .and_then(Value::as_bool)
            == Some(true)
    })
}

fn has_auth_secret(auth: &Value) -> bool {
    ["token", "password"].iter().any(|key| match auth.get(*key) {
        Some(Value::String(secret)) => !secret.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    })
}

fn auth_mode(s: &DiagnosticSnapshot) -> Option<&str> {
    s.config_path(&["gateway", "auth", "mode"])
        .and_then(Value::as_str)
}

/// Fails open: flags when `gateway.auth` is absent or carries no secret,
/// unless auth was explicitly switched off (covered by the bind rule).
pub fn gateway_auth_missing(s: &DiagnosticSnapshot) -> bool {
    match s.config_path(&["gateway", "auth"]) {
        None => true,
        Some(auth) => auth_mode(s) != Some("none") && !has_auth_secret(auth),
    }
}

pub fn gateway_bind_exposed(s: &DiagnosticSnapshot) -> bool {
    let Some(bind) = s.config_path(&["gateway", "bind"]).and_then(Value::as_str) else {
        return false;
    };
    if LOOPBACK_BINDS.contains(&bind.trim().to_ascii_lowercase().as_str()) {
        return false;
    }
    let authenticated = s
        .config_path(&["gateway", "auth"])
        .is_some_and(has_auth_secret);
    auth_mode(s) == Some("none") || !authenticated
}

/// Fails open on an absent `agents.defaults.compaction.mode`.
pub fn compaction_unset(s: &DiagnosticSnapshot) -> bool {
    match s.config_path(&["agents", "defaults", "compaction", "mode"]) {
        None | Some(Value::Null) => true,
        Some(Value::String(mode)) => mode.trim().is_empty(),
        Some(_) => false,
    }
}

pub fn duplicate_plugin(s: &DiagnosticSnapshot) -> bool {
    s.status_output()
        .map(|out| out.to_ascii_lowercase().contains("duplicate plugin"))
        .unwrap_or(false)
}

pub fn state_dir_migration(s: &DiagnosticSnapshot) -> bool {
    s.status_output()
        .map(|out| {
            let out = out.to_ascii_lowercase();
            out.contains("state dir migration") || out.contains("legacy state dir")
        })
        .unwrap_or(false)
}
