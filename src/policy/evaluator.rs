use crate::core::config::{PartnerConfig, RateTrigger};
use crate::core::decision::{Decision, DecisionReason, OfferTerms, Outcome, Tier};
use crate::core::record::CreditRecord;
use crate::scoring::ScoreCard;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// The lending policy evaluator: converts a score card and applicant
/// facts into a decision under the partner's policy snapshot.
///
/// Pure: no I/O, no clocks beyond the decision timestamp, and the
/// policy is read from the snapshotted config version, never ambient
/// state. Recession mode is applied atomically from the snapshot
/// before tier lookup.
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    pub fn evaluate(
        card: &ScoreCard,
        record: &CreditRecord,
        config: &PartnerConfig,
        batch_id: Option<Uuid>,
    ) -> Decision {
        let policy = &config.lending;
        let applicant = record.applicant_id();

        // A DTI above the hard threshold rejects unconditionally,
        // even when a rejection rule also fired and would have routed
        // to manual review. Fired rule reasons are still carried.
        let dti = record.dti();
        if dti > policy.auto_reject_dti {
            let mut reasons = vec![DecisionReason::DtiExceeded];
            if let Some(forced) = &card.forced {
                reasons.extend(forced.reasons.iter().cloned());
            }
            return Decision::automated(
                applicant,
                batch_id,
                config.version,
                card.score,
                card.risk_tier,
                card.breakdown.clone(),
                Outcome::Rejected,
                None,
                reasons,
            );
        }

        // A fired rejection rule short-circuits the rest of policy
        // evaluation; the numeric score is still carried for audit.
        if let Some(forced) = &card.forced {
            return Decision::automated(
                applicant,
                batch_id,
                config.version,
                card.score,
                card.risk_tier,
                card.breakdown.clone(),
                forced.outcome,
                None,
                forced.reasons.clone(),
            );
        }

        // The capacity/character model scores 0-100; rescale into the
        // partner's band range so both engines share tier semantics.
        let banded_score = if card.risk_tier.is_some() {
            let scoring = &config.scoring;
            scoring.min_score + card.score / dec!(100) * (scoring.max_score - scoring.min_score)
        } else {
            card.score
        };

        let min_score = if policy.recession_mode {
            policy.min_score + policy.recession_min_score_bump
        } else {
            policy.min_score
        };
        if banded_score < min_score {
            return Decision::automated(
                applicant,
                batch_id,
                config.version,
                card.score,
                card.risk_tier,
                card.breakdown.clone(),
                Outcome::Rejected,
                None,
                vec![DecisionReason::ScoreBelowMinimum],
            );
        }

        let tier = config.scoring.tier_bands.tier_for(banded_score);
        let mut reasons = Vec::new();

        // Rate triggers are evaluated independently; adjustments are
        // additive and a trigger only moves the rate if the policy
        // configures a delta for it.
        let high_dti = dti > policy.max_dti;
        let unstable_employment = record.employment_months < policy.min_employment_months;
        let recent_default = record.defaults_24m > 0;
        if high_dti {
            reasons.push(DecisionReason::HighDti);
        }
        if unstable_employment {
            reasons.push(DecisionReason::UnstableEmployment);
        }
        if recent_default {
            reasons.push(DecisionReason::RecentDefault);
        }

        let mut rate = policy.base_rate;
        for adjustment in &policy.rate_adjustments {
            let triggered = match adjustment.trigger {
                RateTrigger::HighDti => high_dti,
                RateTrigger::UnstableEmployment => unstable_employment,
                RateTrigger::RecentDefault => recent_default,
            };
            if triggered {
                rate += adjustment.delta;
            }
        }
        let rate = rate.min(policy.max_rate);

        let amount = Self::max_amount(record, tier, policy);
        let term_months = Self::term_for(tier, &policy.term_options);
        let offer = OfferTerms {
            amount,
            rate,
            term_months,
        };

        let needs_collateral =
            policy.require_collateral_for.contains(&tier) && !record.has_collateral();
        if needs_collateral {
            reasons.push(DecisionReason::CollateralRequired);
            return Decision::automated(
                applicant,
                batch_id,
                config.version,
                card.score,
                card.risk_tier,
                card.breakdown.clone(),
                Outcome::ManualReview,
                // Proposed terms are surfaced for the reviewer.
                Some(offer),
                reasons,
            );
        }

        Decision::automated(
            applicant,
            batch_id,
            config.version,
            card.score,
            card.risk_tier,
            card.breakdown.clone(),
            Outcome::Approved,
            Some(offer),
            reasons,
        )
    }

    /// Maximum loan amount for the tier, under recession haircuts and
    /// the income-based override when the policy allows it.
    fn max_amount(
        record: &CreditRecord,
        tier: Tier,
        policy: &crate::core::config::LendingPolicy,
    ) -> Decimal {
        let mut base = policy.base_loan_amount.get(tier);
        if policy.recession_mode {
            base *= Decimal::ONE - policy.recession_amount_haircut;
        }
        if policy.allow_income_based_override {
            let income_based = record.monthly_income * policy.income_multiplier.get(tier);
            base.max(income_based)
        } else {
            base
        }
    }

    /// Better tiers unlock longer terms: the top two tiers get the
    /// longest option, mid-tier the median, the rest the shortest.
    fn term_for(tier: Tier, options: &[u32]) -> u32 {
        match tier {
            Tier::Excellent | Tier::VeryGood => *options.last().unwrap_or(&12),
            Tier::Good => options.get(options.len() / 2).copied().unwrap_or(12),
            Tier::Fair | Tier::Poor => *options.first().unwrap_or(&12),
        }
    }
}
