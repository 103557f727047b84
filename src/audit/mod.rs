//! Append-only decision audit trail with manual-override support.

pub mod recorder;
