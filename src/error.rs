use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal configuration problems.
///
/// A configuration error aborts a batch before any row is processed:
/// rows judged under a broken config would be meaningless, so the engine
/// fails closed rather than silently defaulting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no scoring factor weights configured")]
    NoWeights,
    #[error("scoring factor weights sum to zero")]
    ZeroWeightSum,
    #[error("no pillar weights configured for the capacity/character model")]
    NoPillars,
    #[error("pillar '{pillar}' has no signal weights")]
    EmptyPillar { pillar: String },
    #[error("score bounds inverted: min {min} must be below max {max}")]
    InvertedScoreBounds { min: String, max: String },
    #[error("tier bands must be strictly ascending within the score range")]
    UnorderedTierBands,
    #[error("risk cut points must satisfy high < moderate < low")]
    UnorderedCutPoints,
    #[error("lending policy has no term options")]
    NoTermOptions,
    #[error("base rate {base} exceeds max rate {max}")]
    RateBoundsInverted { base: String, max: String },
    #[error("soft DTI threshold {soft} exceeds auto-reject threshold {hard}")]
    DtiThresholdsInverted { soft: String, hard: String },
    #[error("recession amount haircut {0} must be between 0 and 1")]
    HaircutOutOfRange(String),
}

/// A row-scoped problem with one field of one record.
///
/// Field errors never abort sibling rows. The resolver and validator
/// emit them without a row index; the orchestrator stamps the index on
/// before recording them on the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Zero-based row index within the upload, once known.
    pub row: Option<usize>,
    pub field: String,
    pub message: String,
    /// The offending input value, when there was one.
    pub value: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row: None,
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: field '{}': {}", row, self.field, self.message)?,
            None => write!(f, "field '{}': {}", self.field, self.message)?,
        }
        if let Some(value) = &self.value {
            write!(f, " (got '{}')", value)?;
        }
        Ok(())
    }
}

/// Top-level pipeline failures surfaced to callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("persisting outcome of row {row} failed: {message}")]
    Persistence { row: usize, message: String },
}
