//! Foundational types: partners, records, configs, decisions, batches.

pub mod batch;
pub mod config;
pub mod decision;
pub mod partner;
pub mod record;
