use crate::core::config::ScoringConfig;
use crate::core::decision::{DecisionReason, Outcome, ScoreBreakdown};
use crate::core::record::CreditRecord;
use crate::error::ConfigError;
use crate::scoring::{ForcedOutcome, ScoreCard};
use rust_decimal::Decimal;

/// Engine 1: the weighted-factor (FICO-like) model.
///
/// Base score is the weight-normalized blend of the five factor inputs
/// scaled into the partner's score range. Penalty rules then apply in
/// config order, each at most once, followed by bonus rules, and the
/// result is clamped back into range. Rejection rules are evaluated
/// separately and can force the outcome regardless of the number.
pub struct WeightedModel;

impl WeightedModel {
    pub fn score(record: &CreditRecord, config: &ScoringConfig) -> Result<ScoreCard, ConfigError> {
        config.validate()?;

        let weight_sum: Decimal = config.weights.iter().map(|w| w.weight).sum();
        let range = config.max_score - config.min_score;
        let mut breakdown = ScoreBreakdown::new();
        let mut applied_rules = Vec::new();

        // Base: Σ(value × weight) / Σ(weight), scaled into [min, max].
        // Dividing by the actual sum tolerates partner-entered weights
        // that total 97 or 103 instead of 100.
        let mut blended = Decimal::ZERO;
        for fw in &config.weights {
            let fraction = fw.factor.value(record) * fw.weight / weight_sum;
            blended += fraction;
            breakdown.push(fw.factor.label(), (fraction * range).round_dp(2));
        }
        let mut score = config.min_score + blended * range;

        for rule in &config.penalty_rules {
            if rule.condition.matches(record) {
                score -= rule.points;
                breakdown.push(format!("penalty:{}", rule.name), -rule.points);
                applied_rules.push(rule.name.clone());
            }
        }

        for rule in &config.bonus_rules {
            if rule.condition.matches(record) {
                score += rule.points;
                breakdown.push(format!("bonus:{}", rule.name), rule.points);
                applied_rules.push(rule.name.clone());
            }
        }

        let score = score.clamp(config.min_score, config.max_score).round_dp(2);

        let fired: Vec<&str> = config
            .rejection_rules
            .iter()
            .filter(|r| r.condition.matches(record))
            .map(|r| r.name.as_str())
            .collect();
        let forced = if fired.is_empty() {
            None
        } else {
            let outcome = if config.allow_manual_override {
                Outcome::ManualReview
            } else {
                Outcome::Rejected
            };
            Some(ForcedOutcome {
                outcome,
                reasons: fired
                    .iter()
                    .map(|name| DecisionReason::RejectionRule(name.to_string()))
                    .collect(),
            })
        };

        Ok(ScoreCard {
            score,
            risk_tier: None,
            breakdown,
            applied_rules,
            forced,
        })
    }
}
