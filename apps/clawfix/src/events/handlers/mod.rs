//! Event handlers.
//!
//! Each handler subscribes to the event bus and runs in its own task.

pub mod stats;
