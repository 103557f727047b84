//! Field-mapping resolver: raw upload rows to canonical records.

pub mod profile;
pub mod resolver;
