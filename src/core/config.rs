use crate::core::decision::{RiskTier, Tier};
use crate::core::partner::PartnerId;
use crate::core::record::CreditRecord;
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five canonical scoring factors of the weighted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringFactor {
    PaymentHistory,
    CreditUtilization,
    CreditAge,
    CreditMix,
    Inquiries,
}

impl ScoringFactor {
    /// Read this factor's normalized [0, 1] value off a record.
    pub fn value(&self, record: &CreditRecord) -> Decimal {
        match self {
            ScoringFactor::PaymentHistory => record.payment_history,
            ScoringFactor::CreditUtilization => record.credit_utilization,
            ScoringFactor::CreditAge => record.credit_age,
            ScoringFactor::CreditMix => record.credit_mix,
            ScoringFactor::Inquiries => record.inquiries,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoringFactor::PaymentHistory => "payment_history",
            ScoringFactor::CreditUtilization => "credit_utilization",
            ScoringFactor::CreditAge => "credit_age",
            ScoringFactor::CreditMix => "credit_mix",
            ScoringFactor::Inquiries => "inquiries",
        }
    }
}

impl fmt::Display for ScoringFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One factor's weight, in percent. Weights need not sum to 100;
/// the engine normalizes proportionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeight {
    pub factor: ScoringFactor,
    pub weight: Decimal,
}

/// Closed set of conditions a scoring or rejection rule may test
/// against raw financial facts.
///
/// Tagged variants by design: partner configs are validated at save
/// time against this schema rather than carried as loose dictionaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    MissedPaymentsAtLeast { count: u32 },
    DefaultsAtLeast { count: u32 },
    InquiriesAtLeast { count: u32 },
    DtiAbove { ratio: Decimal },
    AccountAgeUnder { months: u32 },
    EmploymentUnder { months: u32 },
    EmploymentAtLeast { months: u32 },
    SavingsRateBelow { ratio: Decimal },
    SavingsRateAtLeast { ratio: Decimal },
}

impl RuleCondition {
    pub fn matches(&self, record: &CreditRecord) -> bool {
        match self {
            RuleCondition::MissedPaymentsAtLeast { count } => {
                record.missed_payments_12m >= *count
            }
            RuleCondition::DefaultsAtLeast { count } => record.defaults_24m >= *count,
            RuleCondition::InquiriesAtLeast { count } => record.inquiries_6m >= *count,
            RuleCondition::DtiAbove { ratio } => record.dti() > *ratio,
            RuleCondition::AccountAgeUnder { months } => {
                record.oldest_account_months < *months
            }
            RuleCondition::EmploymentUnder { months } => record.employment_months < *months,
            RuleCondition::EmploymentAtLeast { months } => record.employment_months >= *months,
            RuleCondition::SavingsRateBelow { ratio } => record.savings_rate < *ratio,
            RuleCondition::SavingsRateAtLeast { ratio } => record.savings_rate >= *ratio,
        }
    }
}

/// A penalty or bonus rule: when the condition matches, `points` are
/// applied to the score exactly once, regardless of how severely the
/// condition is exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRule {
    pub name: String,
    pub condition: RuleCondition,
    /// Point delta. Penalties are configured positive and subtracted;
    /// bonuses are configured positive and added.
    pub points: Decimal,
}

/// A hard rejection rule, evaluated independently of the numeric score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRule {
    pub name: String,
    pub condition: RuleCondition,
}

/// Inclusive lower bounds of each tier above POOR, ascending.
///
/// A score below `fair` is POOR; a score at or above `excellent` is
/// EXCELLENT. Boundaries are inclusive toward the better tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBands {
    pub fair: Decimal,
    pub good: Decimal,
    pub very_good: Decimal,
    pub excellent: Decimal,
}

impl TierBands {
    pub fn tier_for(&self, score: Decimal) -> Tier {
        if score >= self.excellent {
            Tier::Excellent
        } else if score >= self.very_good {
            Tier::VeryGood
        } else if score >= self.good {
            Tier::Good
        } else if score >= self.fair {
            Tier::Fair
        } else {
            Tier::Poor
        }
    }

    fn is_ascending(&self) -> bool {
        self.fair < self.good && self.good < self.very_good && self.very_good < self.excellent
    }
}

/// Engine 1 configuration: the weighted-factor (FICO-like) model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: Vec<FactorWeight>,
    /// Applied in order, each at most once, after the base score.
    pub penalty_rules: Vec<ScoreRule>,
    /// Applied in order after penalties, additively.
    pub bonus_rules: Vec<ScoreRule>,
    /// Force rejection regardless of the numeric score.
    pub rejection_rules: Vec<RejectionRule>,
    pub min_score: Decimal,
    pub max_score: Decimal,
    /// When set, a fired rejection rule downgrades to manual review
    /// instead of auto-rejecting.
    pub allow_manual_override: bool,
    pub tier_bands: TierBands,
}

impl ScoringConfig {
    /// Conventional 300–850 configuration with FICO-style weights.
    pub fn standard() -> Self {
        Self {
            weights: vec![
                FactorWeight {
                    factor: ScoringFactor::PaymentHistory,
                    weight: dec!(35),
                },
                FactorWeight {
                    factor: ScoringFactor::CreditUtilization,
                    weight: dec!(30),
                },
                FactorWeight {
                    factor: ScoringFactor::CreditAge,
                    weight: dec!(15),
                },
                FactorWeight {
                    factor: ScoringFactor::CreditMix,
                    weight: dec!(10),
                },
                FactorWeight {
                    factor: ScoringFactor::Inquiries,
                    weight: dec!(10),
                },
            ],
            penalty_rules: vec![
                ScoreRule {
                    name: "late_payments".to_string(),
                    condition: RuleCondition::MissedPaymentsAtLeast { count: 2 },
                    points: dec!(40),
                },
                ScoreRule {
                    name: "recent_default".to_string(),
                    condition: RuleCondition::DefaultsAtLeast { count: 1 },
                    points: dec!(90),
                },
                ScoreRule {
                    name: "inquiry_spree".to_string(),
                    condition: RuleCondition::InquiriesAtLeast { count: 5 },
                    points: dec!(25),
                },
            ],
            bonus_rules: vec![
                ScoreRule {
                    name: "thrifty_saver".to_string(),
                    condition: RuleCondition::SavingsRateAtLeast { ratio: dec!(0.15) },
                    points: dec!(15),
                },
                ScoreRule {
                    name: "long_tenure".to_string(),
                    condition: RuleCondition::EmploymentAtLeast { months: 60 },
                    points: dec!(10),
                },
            ],
            rejection_rules: vec![RejectionRule {
                name: "serial_defaulter".to_string(),
                condition: RuleCondition::DefaultsAtLeast { count: 3 },
            }],
            min_score: dec!(300),
            max_score: dec!(850),
            allow_manual_override: false,
            tier_bands: TierBands {
                fair: dec!(580),
                good: dec!(670),
                very_good: dec!(740),
                excellent: dec!(800),
            },
        }
    }

    /// Validate the config at save time. Scoring functions assume a
    /// validated config and fail closed on anything this rejects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.is_empty() {
            return Err(ConfigError::NoWeights);
        }
        let sum: Decimal = self.weights.iter().map(|w| w.weight).sum();
        if sum <= Decimal::ZERO {
            return Err(ConfigError::ZeroWeightSum);
        }
        if self.min_score >= self.max_score {
            return Err(ConfigError::InvertedScoreBounds {
                min: self.min_score.to_string(),
                max: self.max_score.to_string(),
            });
        }
        if !self.tier_bands.is_ascending() {
            return Err(ConfigError::UnorderedTierBands);
        }
        Ok(())
    }
}

/// The five CAMEL-style pillars of the capacity/character model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Capacity,
    Capital,
    Collateral,
    Conditions,
    Character,
}

impl Pillar {
    pub fn label(&self) -> &'static str {
        match self {
            Pillar::Capacity => "capacity",
            Pillar::Capital => "capital",
            Pillar::Collateral => "collateral",
            Pillar::Conditions => "conditions",
            Pillar::Character => "character",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Closed set of sub-factor signals, each derived from record facts
/// and normalized to [0, 1] with 1 the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Headroom between income and debt payments: 1 - DTI, clamped.
    CashFlow,
    /// Employment tenure, saturating at five years.
    IncomeStability,
    /// Savings rate, saturating at 20% of income.
    SavingsHabit,
    /// Collateral value relative to one year of income, saturating at 1.
    CollateralCoverage,
    /// Age of the oldest account, saturating at ten years.
    CreditDepth,
    PaymentHistory,
    CreditMix,
    /// The normalized inquiries input (already higher-is-better).
    InquiryRestraint,
    /// The normalized utilization input (already higher-is-better).
    UtilizationHeadroom,
}

impl Signal {
    pub fn value(&self, record: &CreditRecord) -> Decimal {
        let clamp01 = |v: Decimal| v.clamp(Decimal::ZERO, Decimal::ONE);
        match self {
            Signal::CashFlow => clamp01(Decimal::ONE - record.dti()),
            Signal::IncomeStability => {
                clamp01(Decimal::from(record.employment_months) / dec!(60))
            }
            Signal::SavingsHabit => clamp01(record.savings_rate / dec!(0.20)),
            Signal::CollateralCoverage => {
                let annual_income = record.monthly_income * dec!(12);
                clamp01(record.collateral_value / annual_income)
            }
            Signal::CreditDepth => {
                clamp01(Decimal::from(record.oldest_account_months) / dec!(120))
            }
            Signal::PaymentHistory => clamp01(record.payment_history),
            Signal::CreditMix => clamp01(record.credit_mix),
            Signal::InquiryRestraint => clamp01(record.inquiries),
            Signal::UtilizationHeadroom => clamp01(record.credit_utilization),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::CashFlow => "cash_flow",
            Signal::IncomeStability => "income_stability",
            Signal::SavingsHabit => "savings_habit",
            Signal::CollateralCoverage => "collateral_coverage",
            Signal::CreditDepth => "credit_depth",
            Signal::PaymentHistory => "payment_history",
            Signal::CreditMix => "credit_mix",
            Signal::InquiryRestraint => "inquiry_restraint",
            Signal::UtilizationHeadroom => "utilization_headroom",
        }
    }
}

/// One signal's weight within a pillar, in percent of the pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWeight {
    pub signal: Signal,
    pub weight: Decimal,
}

/// One pillar's weight within the blend, plus its sub-factor mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarWeight {
    pub pillar: Pillar,
    pub weight: Decimal,
    pub signals: Vec<SignalWeight>,
}

/// Ordered risk cut points on the 0–100 blended score.
///
/// Each is the inclusive lower bound of the better tier:
/// `score >= low` is low risk, `score >= moderate` is moderate,
/// anything below is high risk. Must satisfy `high < moderate < low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCutPoints {
    pub high: Decimal,
    pub moderate: Decimal,
    pub low: Decimal,
}

impl RiskCutPoints {
    pub fn tier_for(&self, score: Decimal) -> RiskTier {
        if score >= self.low {
            RiskTier::Low
        } else if score >= self.moderate {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }
}

/// Engine 2 configuration: the capacity/character five-pillar blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltScoringConfig {
    pub pillars: Vec<PillarWeight>,
    /// Behavioral thresholds. Breaching either caps the risk label
    /// at moderate and is recorded as an applied rule.
    pub max_dti: Decimal,
    pub min_savings_rate: Decimal,
    pub cut_points: RiskCutPoints,
}

impl AltScoringConfig {
    pub fn standard() -> Self {
        Self {
            pillars: vec![
                PillarWeight {
                    pillar: Pillar::Capacity,
                    weight: dec!(30),
                    signals: vec![
                        SignalWeight {
                            signal: Signal::CashFlow,
                            weight: dec!(60),
                        },
                        SignalWeight {
                            signal: Signal::IncomeStability,
                            weight: dec!(40),
                        },
                    ],
                },
                PillarWeight {
                    pillar: Pillar::Capital,
                    weight: dec!(20),
                    signals: vec![
                        SignalWeight {
                            signal: Signal::SavingsHabit,
                            weight: dec!(70),
                        },
                        SignalWeight {
                            signal: Signal::UtilizationHeadroom,
                            weight: dec!(30),
                        },
                    ],
                },
                PillarWeight {
                    pillar: Pillar::Collateral,
                    weight: dec!(15),
                    signals: vec![SignalWeight {
                        signal: Signal::CollateralCoverage,
                        weight: dec!(100),
                    }],
                },
                PillarWeight {
                    pillar: Pillar::Conditions,
                    weight: dec!(10),
                    signals: vec![
                        SignalWeight {
                            signal: Signal::InquiryRestraint,
                            weight: dec!(50),
                        },
                        SignalWeight {
                            signal: Signal::CreditDepth,
                            weight: dec!(50),
                        },
                    ],
                },
                PillarWeight {
                    pillar: Pillar::Character,
                    weight: dec!(25),
                    signals: vec![
                        SignalWeight {
                            signal: Signal::PaymentHistory,
                            weight: dec!(70),
                        },
                        SignalWeight {
                            signal: Signal::CreditMix,
                            weight: dec!(30),
                        },
                    ],
                },
            ],
            max_dti: dec!(0.45),
            min_savings_rate: dec!(0.05),
            cut_points: RiskCutPoints {
                high: dec!(40),
                moderate: dec!(55),
                low: dec!(70),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pillars.is_empty() {
            return Err(ConfigError::NoPillars);
        }
        for pillar in &self.pillars {
            if pillar.signals.is_empty() {
                return Err(ConfigError::EmptyPillar {
                    pillar: pillar.pillar.to_string(),
                });
            }
        }
        let sum: Decimal = self.pillars.iter().map(|p| p.weight).sum();
        if sum <= Decimal::ZERO {
            return Err(ConfigError::ZeroWeightSum);
        }
        if !(self.cut_points.high < self.cut_points.moderate
            && self.cut_points.moderate < self.cut_points.low)
        {
            return Err(ConfigError::UnorderedCutPoints);
        }
        Ok(())
    }
}

/// Conditions that trigger an additive interest-rate adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateTrigger {
    HighDti,
    UnstableEmployment,
    RecentDefault,
}

/// One additive rate adjustment in percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAdjustment {
    pub trigger: RateTrigger,
    pub delta: Decimal,
}

/// A per-tier lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable<T> {
    pub poor: T,
    pub fair: T,
    pub good: T,
    pub very_good: T,
    pub excellent: T,
}

impl<T: Copy> TierTable<T> {
    pub fn get(&self, tier: Tier) -> T {
        match tier {
            Tier::Poor => self.poor,
            Tier::Fair => self.fair,
            Tier::Good => self.good,
            Tier::VeryGood => self.very_good,
            Tier::Excellent => self.excellent,
        }
    }
}

/// Per-partner lending policy: how a score becomes an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingPolicy {
    pub base_loan_amount: TierTable<Decimal>,
    pub income_multiplier: TierTable<Decimal>,
    /// When set, the larger of the tier base amount and the
    /// income-derived amount is offered; otherwise the tier base
    /// amount is authoritative.
    pub allow_income_based_override: bool,
    /// Annual base interest rate in percent.
    pub base_rate: Decimal,
    pub max_rate: Decimal,
    pub rate_adjustments: Vec<RateAdjustment>,
    /// Available term lengths in months, ascending.
    pub term_options: Vec<u32>,
    /// Soft intake threshold: above this, HIGH_DTI rate adjustments
    /// trigger but the application proceeds.
    pub max_dti: Decimal,
    /// Hard threshold: strictly above this, the decision is forced
    /// to reject with DTI_EXCEEDED.
    pub auto_reject_dti: Decimal,
    /// Minimum score required for automatic approval.
    pub min_score: Decimal,
    /// Employment tenure below this is considered unstable (months).
    pub min_employment_months: u32,
    pub require_collateral_for: Vec<Tier>,
    /// Policy-wide tightening toggle, applied atomically from the
    /// snapshot before tier lookup.
    pub recession_mode: bool,
    /// Fractional haircut on all tier base amounts under recession
    /// mode (0.30 means amounts shrink by 30%).
    pub recession_amount_haircut: Decimal,
    /// Added to `min_score` under recession mode.
    pub recession_min_score_bump: Decimal,
}

impl LendingPolicy {
    pub fn standard() -> Self {
        Self {
            base_loan_amount: TierTable {
                poor: dec!(1_000),
                fair: dec!(5_000),
                good: dec!(15_000),
                very_good: dec!(30_000),
                excellent: dec!(50_000),
            },
            income_multiplier: TierTable {
                poor: dec!(1),
                fair: dec!(2),
                good: dec!(4),
                very_good: dec!(6),
                excellent: dec!(8),
            },
            allow_income_based_override: true,
            base_rate: dec!(12.5),
            max_rate: dec!(35.99),
            rate_adjustments: vec![
                RateAdjustment {
                    trigger: RateTrigger::HighDti,
                    delta: dec!(3),
                },
                RateAdjustment {
                    trigger: RateTrigger::UnstableEmployment,
                    delta: dec!(2),
                },
                RateAdjustment {
                    trigger: RateTrigger::RecentDefault,
                    delta: dec!(5),
                },
            ],
            term_options: vec![12, 24, 36, 48, 60],
            max_dti: dec!(0.45),
            auto_reject_dti: dec!(0.60),
            min_score: dec!(580),
            min_employment_months: 12,
            require_collateral_for: vec![Tier::Poor, Tier::Fair],
            recession_mode: false,
            recession_amount_haircut: dec!(0.30),
            recession_min_score_bump: dec!(40),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.term_options.is_empty() {
            return Err(ConfigError::NoTermOptions);
        }
        if self.base_rate > self.max_rate {
            return Err(ConfigError::RateBoundsInverted {
                base: self.base_rate.to_string(),
                max: self.max_rate.to_string(),
            });
        }
        if self.max_dti > self.auto_reject_dti {
            return Err(ConfigError::DtiThresholdsInverted {
                soft: self.max_dti.to_string(),
                hard: self.auto_reject_dti.to_string(),
            });
        }
        // A haircut above 1 would turn recession-mode tier base
        // amounts negative.
        if self.recession_amount_haircut < Decimal::ZERO
            || self.recession_amount_haircut > Decimal::ONE
        {
            return Err(ConfigError::HaircutOutOfRange(
                self.recession_amount_haircut.to_string(),
            ));
        }
        Ok(())
    }
}

/// Which scoring engine a partner has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Weighted,
    Pillar,
}

/// The complete versioned configuration of one partner bank.
///
/// Exactly one version is active per partner at a time. Updates never
/// mutate in place: `next_version` produces a successor, and batches
/// snapshot the version they started with so every row in a batch is
/// judged consistently. The audit trail records the version used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerConfig {
    pub partner: PartnerId,
    pub version: u32,
    pub engine: EngineKind,
    pub scoring: ScoringConfig,
    pub alt_scoring: AltScoringConfig,
    pub lending: LendingPolicy,
    pub created_at: DateTime<Utc>,
}

impl PartnerConfig {
    /// Standard configuration for a partner, version 1.
    pub fn standard(partner: PartnerId) -> Self {
        Self {
            partner,
            version: 1,
            engine: EngineKind::Weighted,
            scoring: ScoringConfig::standard(),
            alt_scoring: AltScoringConfig::standard(),
            lending: LendingPolicy::standard(),
            created_at: Utc::now(),
        }
    }

    /// Produce the superseding version with new sub-configs.
    /// The current config is left untouched.
    pub fn next_version(
        &self,
        scoring: ScoringConfig,
        alt_scoring: AltScoringConfig,
        lending: LendingPolicy,
    ) -> Self {
        Self {
            partner: self.partner.clone(),
            version: self.version + 1,
            engine: self.engine,
            scoring,
            alt_scoring,
            lending,
            created_at: Utc::now(),
        }
    }

    /// Save-time validation of every sub-config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.alt_scoring.validate()?;
        self.lending.validate()?;
        Ok(())
    }
}
