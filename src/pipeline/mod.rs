//! Batch import orchestration: row fan-out, counter merging, and
//! synthetic population generation.

pub mod orchestrator;
pub mod synth;
