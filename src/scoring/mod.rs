//! The two per-partner scoring engines.
//!
//! Both are pure functions of (record, config): no clocks, no I/O,
//! no hidden state. Re-scoring the same pair always yields an
//! identical score and breakdown.

pub mod pillar;
pub mod weighted;

use crate::core::decision::{DecisionReason, Outcome, RiskTier, ScoreBreakdown};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An outcome forced by a rejection rule, independent of the numeric
/// score. The score is still computed and surfaced for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedOutcome {
    pub outcome: Outcome,
    pub reasons: Vec<DecisionReason>,
}

/// Output of a scoring engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: Decimal,
    /// Set by the capacity/character model only.
    pub risk_tier: Option<RiskTier>,
    /// Factor-by-factor contributions, stored verbatim on the decision.
    pub breakdown: ScoreBreakdown,
    /// Names of penalty/bonus/behavioral rules that fired, in order.
    pub applied_rules: Vec<String>,
    pub forced: Option<ForcedOutcome>,
}
