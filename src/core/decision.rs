use crate::core::partner::ApplicantId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Ordered credit-quality bucket derived from a numeric score range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Poor,
        Tier::Fair,
        Tier::Good,
        Tier::VeryGood,
        Tier::Excellent,
    ];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Poor => "POOR",
            Tier::Fair => "FAIR",
            Tier::Good => "GOOD",
            Tier::VeryGood => "VERY_GOOD",
            Tier::Excellent => "EXCELLENT",
        };
        write!(f, "{}", label)
    }
}

/// Risk label produced by the capacity/character model.
///
/// Ordered so that `Low < Moderate < High` risk-wise; comparisons in the
/// policy evaluator rely on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::Low => "low_risk",
            RiskTier::Moderate => "moderate_risk",
            RiskTier::High => "high_risk",
        };
        write!(f, "{}", label)
    }
}

/// Terminal outcome of a lending decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Rejected,
    ManualReview,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Approved => "approved",
            Outcome::Rejected => "rejected",
            Outcome::ManualReview => "manual_review",
        };
        write!(f, "{}", label)
    }
}

/// Machine-readable reason attached to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// DTI above the hard auto-reject threshold.
    DtiExceeded,
    /// DTI above the soft intake threshold (rate adjusted, not rejected).
    HighDti,
    ScoreBelowMinimum,
    CollateralRequired,
    RecentDefault,
    UnstableEmployment,
    /// A configured rejection rule fired; carries the rule name.
    RejectionRule(String),
    BehavioralThreshold(String),
    ManualOverride,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::DtiExceeded => write!(f, "DTI_EXCEEDED"),
            DecisionReason::HighDti => write!(f, "HIGH_DTI"),
            DecisionReason::ScoreBelowMinimum => write!(f, "SCORE_BELOW_MINIMUM"),
            DecisionReason::CollateralRequired => write!(f, "COLLATERAL_REQUIRED"),
            DecisionReason::RecentDefault => write!(f, "RECENT_DEFAULT"),
            DecisionReason::UnstableEmployment => write!(f, "UNSTABLE_EMPLOYMENT"),
            DecisionReason::RejectionRule(name) => write!(f, "REJECTION_RULE:{}", name),
            DecisionReason::BehavioralThreshold(name) => {
                write!(f, "BEHAVIORAL_THRESHOLD:{}", name)
            }
            DecisionReason::ManualOverride => write!(f, "MANUAL_OVERRIDE"),
        }
    }
}

/// Loan terms attached to an approved decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub amount: Decimal,
    /// Annual interest rate in percent.
    pub rate: Decimal,
    pub term_months: u32,
}

/// One labeled contribution to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub contribution: Decimal,
}

/// Full factor-by-factor account of how a score came to be.
///
/// Stored verbatim on the decision and never recomputed: the audit
/// trail must reflect what the engine actually did at evaluation time,
/// under the config version in force then.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    entries: Vec<BreakdownEntry>,
}

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, contribution: Decimal) {
        self.entries.push(BreakdownEntry {
            label: label.into(),
            contribution,
        });
    }

    pub fn entries(&self) -> &[BreakdownEntry] {
        &self.entries
    }

    pub fn contribution(&self, label: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.contribution)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors raised by illegal decision transitions.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("decision {0} is {1}; only manual_review or rejected decisions can be overridden")]
    NotOverridable(Uuid, Outcome),
    #[error("override target must be approved or rejected, got {0}")]
    InvalidTarget(Outcome),
    #[error("override requires a non-empty justification")]
    MissingJustification,
    #[error("override requires an actor identity")]
    MissingActor,
    #[error("no recorded decision entry {0}")]
    UnknownEntry(Uuid),
}

/// An immutable lending decision for one applicant.
///
/// Decisions are append-only: a correction or manual override produces a
/// new `Decision` carrying a `supersedes` back-reference, never an edit.
/// The score breakdown is captured at creation and retained for audit
/// even if the source record is later purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    id: Uuid,
    applicant: ApplicantId,
    batch_id: Option<Uuid>,
    /// Partner config version the evaluation ran under.
    config_version: u32,
    score: Decimal,
    risk_tier: Option<RiskTier>,
    breakdown: ScoreBreakdown,
    outcome: Outcome,
    offer: Option<OfferTerms>,
    reasons: Vec<DecisionReason>,
    is_manual: bool,
    override_note: Option<String>,
    overriding_actor: Option<String>,
    supersedes: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl Decision {
    /// Create an automated decision as produced by the policy evaluator.
    #[allow(clippy::too_many_arguments)]
    pub fn automated(
        applicant: ApplicantId,
        batch_id: Option<Uuid>,
        config_version: u32,
        score: Decimal,
        risk_tier: Option<RiskTier>,
        breakdown: ScoreBreakdown,
        outcome: Outcome,
        offer: Option<OfferTerms>,
        reasons: Vec<DecisionReason>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            applicant,
            batch_id,
            config_version,
            score,
            risk_tier,
            breakdown,
            outcome,
            offer,
            reasons,
            is_manual: false,
            override_note: None,
            overriding_actor: None,
            supersedes: None,
            created_at: Utc::now(),
        }
    }

    /// Produce the manual-override successor of this decision.
    ///
    /// Allowed transitions: `manual_review -> {approved, rejected}` and
    /// the reversal of an automated rejection. The original decision is
    /// untouched; the returned decision references it via `supersedes`.
    pub fn override_to(
        &self,
        outcome: Outcome,
        actor: impl Into<String>,
        justification: impl Into<String>,
        offer: Option<OfferTerms>,
    ) -> Result<Decision, OverrideError> {
        let actor = actor.into();
        let justification = justification.into();
        if actor.trim().is_empty() {
            return Err(OverrideError::MissingActor);
        }
        if justification.trim().is_empty() {
            return Err(OverrideError::MissingJustification);
        }
        match self.outcome {
            Outcome::ManualReview => {}
            Outcome::Rejected if !self.is_manual => {}
            other => return Err(OverrideError::NotOverridable(self.id, other)),
        }
        if outcome == Outcome::ManualReview {
            return Err(OverrideError::InvalidTarget(outcome));
        }

        let mut reasons = vec![DecisionReason::ManualOverride];
        // Carry forward the reasons the override is answering.
        reasons.extend(self.reasons.iter().cloned());

        Ok(Decision {
            id: Uuid::new_v4(),
            applicant: self.applicant.clone(),
            batch_id: self.batch_id,
            config_version: self.config_version,
            score: self.score,
            risk_tier: self.risk_tier,
            breakdown: self.breakdown.clone(),
            outcome,
            offer,
            reasons,
            is_manual: true,
            override_note: Some(justification),
            overriding_actor: Some(actor),
            supersedes: Some(self.id),
            created_at: Utc::now(),
        })
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn applicant(&self) -> &ApplicantId {
        &self.applicant
    }

    pub fn batch_id(&self) -> Option<Uuid> {
        self.batch_id
    }

    pub fn config_version(&self) -> u32 {
        self.config_version
    }

    pub fn score(&self) -> Decimal {
        self.score
    }

    pub fn risk_tier(&self) -> Option<RiskTier> {
        self.risk_tier
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn offer(&self) -> Option<&OfferTerms> {
        self.offer.as_ref()
    }

    pub fn reasons(&self) -> &[DecisionReason] {
        &self.reasons
    }

    pub fn is_manual(&self) -> bool {
        self.is_manual
    }

    pub fn override_note(&self) -> Option<&str> {
        self.override_note.as_deref()
    }

    pub fn overriding_actor(&self) -> Option<&str> {
        self.overriding_actor.as_deref()
    }

    pub fn supersedes(&self) -> Option<Uuid> {
        self.supersedes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] score {}",
            self.applicant, self.outcome, self.score
        )?;
        if let Some(offer) = &self.offer {
            write!(
                f,
                " → {} at {}% over {} months",
                offer.amount, offer.rate, offer.term_months
            )?;
        }
        if !self.reasons.is_empty() {
            let reasons: Vec<String> = self.reasons.iter().map(|r| r.to_string()).collect();
            write!(f, " ({})", reasons.join(", "))?;
        }
        Ok(())
    }
}
