//! ClawFix - diagnosis pipeline for OpenClaw installations
//!
//! Takes a diagnostic snapshot collected on a user's machine, matches it
//! against a catalog of known failure patterns, and produces a reviewable,
//! idempotent bash script that fixes what was found.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod logging;
pub mod services;
pub mod snapshot;

pub use app::App;
pub use config::AppConfig;
pub use error::{ClawfixError, Result};
pub use snapshot::DiagnosticSnapshot;
