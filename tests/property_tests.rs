use lending_engine::core::batch::{BatchStatus, ImportBatch};
use lending_engine::core::config::PartnerConfig;
use lending_engine::core::decision::{DecisionReason, Outcome};
use lending_engine::core::partner::PartnerId;
use lending_engine::core::record::CreditRecord;
use lending_engine::error::FieldError;
use lending_engine::policy::evaluator::PolicyEvaluator;
use lending_engine::scoring::pillar::PillarModel;
use lending_engine::scoring::weighted::WeightedModel;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Generate a unit-interval input with four decimal places.
fn arb_unit() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Generate a savings rate in [0, 0.5].
fn arb_savings_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=5_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Generate an arbitrary validated credit record. Income is always
/// positive; debt ranges from zero to roughly double the income so
/// both DTI regimes appear.
fn arb_record() -> impl Strategy<Value = CreditRecord> {
    (
        (arb_unit(), arb_unit(), arb_unit(), arb_unit(), arb_unit()),
        1_000u64..20_000u64,
        0u64..200u64,
        (0u32..4u32, 0u32..6u32, 0u32..10u32),
        (0u32..360u32, 0u32..240u32),
        arb_savings_rate(),
        prop::option::of(5_000u64..500_000u64),
    )
        .prop_map(
            |(
                (payment_history, credit_utilization, credit_age, credit_mix, inquiries),
                income,
                debt_pct,
                (defaults_24m, missed_payments_12m, inquiries_6m),
                (oldest_account_months, employment_months),
                savings_rate,
                collateral,
            )| {
                let monthly_income = Decimal::from(income);
                CreditRecord {
                    email: "applicant@example.com".to_string(),
                    national_id: None,
                    phone: None,
                    payment_history,
                    credit_utilization,
                    credit_age,
                    credit_mix,
                    inquiries,
                    monthly_income,
                    monthly_debt: monthly_income * Decimal::from(debt_pct) / Decimal::from(100),
                    defaults_24m,
                    missed_payments_12m,
                    inquiries_6m,
                    oldest_account_months,
                    employment_months,
                    savings_rate,
                    collateral_value: collateral.map(Decimal::from).unwrap_or(Decimal::ZERO),
                }
            },
        )
}

fn standard_config() -> PartnerConfig {
    PartnerConfig::standard(PartnerId::new("PROP-TEST"))
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Weighted scores stay inside the configured range.
    //
    // No combination of inputs, penalties, and bonuses may push a score
    // outside [min_score, max_score].
    // ===================================================================
    #[test]
    fn weighted_score_always_in_range(record in arb_record()) {
        let config = standard_config().scoring;
        let card = WeightedModel::score(&record, &config).unwrap();
        prop_assert!(
            card.score >= config.min_score && card.score <= config.max_score,
            "Score {} must be in [{}, {}]",
            card.score,
            config.min_score,
            config.max_score
        );
    }

    // ===================================================================
    // INVARIANT 2: Scoring is deterministic.
    //
    // The same record under the same config must always produce the
    // same score. No randomness, no hidden state, no clock dependence.
    // ===================================================================
    #[test]
    fn scoring_is_deterministic(record in arb_record()) {
        let config = standard_config();
        let first = WeightedModel::score(&record, &config.scoring).unwrap();
        let second = WeightedModel::score(&record, &config.scoring).unwrap();
        prop_assert_eq!(first.score, second.score);
        prop_assert_eq!(first.breakdown.entries().len(), second.breakdown.entries().len());

        let alt_first = PillarModel::score(&record, &config.alt_scoring).unwrap();
        let alt_second = PillarModel::score(&record, &config.alt_scoring).unwrap();
        prop_assert_eq!(alt_first.score, alt_second.score);
    }

    // ===================================================================
    // INVARIANT 3: Pillar scores stay on the 0-100 scale.
    // ===================================================================
    #[test]
    fn pillar_score_always_in_range(record in arb_record()) {
        let config = standard_config().alt_scoring;
        let card = PillarModel::score(&record, &config).unwrap();
        prop_assert!(
            card.score >= Decimal::ZERO && card.score <= Decimal::from(100),
            "Pillar score {} must be in [0, 100]",
            card.score
        );
    }

    // ===================================================================
    // INVARIANT 4: Weights are relative, not absolute.
    //
    // Scaling every factor weight by the same constant must not change
    // the score, because blending divides by the actual weight sum.
    // ===================================================================
    #[test]
    fn weight_scaling_preserves_score(record in arb_record(), scale in 2u32..10u32) {
        let config = standard_config().scoring;
        let mut scaled = config.clone();
        for weight in &mut scaled.weights {
            weight.weight *= Decimal::from(scale);
        }
        let base = WeightedModel::score(&record, &config).unwrap();
        let rescaled = WeightedModel::score(&record, &scaled).unwrap();
        prop_assert_eq!(base.score, rescaled.score);
    }

    // ===================================================================
    // INVARIANT 5: Hard DTI breaches always reject.
    //
    // Above the auto-reject threshold the outcome is Rejected with
    // DTI_EXCEEDED, regardless of how strong the score looks.
    // ===================================================================
    #[test]
    fn hard_dti_always_rejects(mut record in arb_record(), over in 61u64..200u64) {
        let config = standard_config();
        record.monthly_debt = record.monthly_income * Decimal::from(over) / Decimal::from(100);
        prop_assume!(record.dti() > config.lending.auto_reject_dti);

        let card = WeightedModel::score(&record, &config.scoring).unwrap();
        let decision = PolicyEvaluator::evaluate(&card, &record, &config, None);
        prop_assert_eq!(decision.outcome(), Outcome::Rejected);
        prop_assert!(decision.reasons().contains(&DecisionReason::DtiExceeded));
        prop_assert!(decision.offer().is_none());
    }

    // ===================================================================
    // INVARIANT 6: Offered rates never exceed the configured ceiling.
    //
    // Rate adjustments are additive; the clamp to max_rate must hold
    // no matter how many triggers fire.
    // ===================================================================
    #[test]
    fn offer_rate_never_exceeds_ceiling(record in arb_record()) {
        let config = standard_config();
        let card = WeightedModel::score(&record, &config.scoring).unwrap();
        let decision = PolicyEvaluator::evaluate(&card, &record, &config, None);
        if let Some(offer) = decision.offer() {
            prop_assert!(
                offer.rate >= config.lending.base_rate && offer.rate <= config.lending.max_rate,
                "Rate {} must be in [{}, {}]",
                offer.rate,
                config.lending.base_rate,
                config.lending.max_rate
            );
            prop_assert!(config.lending.term_options.contains(&offer.term_months));
        }
    }

    // ===================================================================
    // INVARIANT 7: Batch counters are conserved.
    //
    // For any interleaving of successes and failures,
    // processed == successful + failed, and the final status follows
    // from the counts alone.
    // ===================================================================
    #[test]
    fn batch_counters_conserved(events in prop::collection::vec(any::<bool>(), 0..50)) {
        let mut batch = ImportBatch::new(
            "prop.csv",
            PartnerId::new("PROP-TEST"),
            "tester",
            1,
            events.len(),
        );
        for &success in &events {
            if success {
                batch.record_success();
            } else {
                batch.record_failure(vec![FieldError::new("field", "bad value")]);
            }
            prop_assert_eq!(
                batch.processed_records(),
                batch.successful_records() + batch.failed_records()
            );
        }

        let status = batch.finalize();
        let successes = events.iter().filter(|&&s| s).count();
        let failures = events.len() - successes;
        let expected = if successes == 0 && !events.is_empty() {
            BatchStatus::Failed
        } else if failures == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Partial
        };
        prop_assert_eq!(status, expected);
    }

    // ===================================================================
    // INVARIANT 8: Evaluation never manufactures a score.
    //
    // The decision carries exactly the score the engine produced
    // (pillar scores rescaled into the configured band for weighted
    // configs are checked separately in the evaluator unit tests).
    // ===================================================================
    #[test]
    fn decision_preserves_weighted_score(record in arb_record()) {
        let config = standard_config();
        let card = WeightedModel::score(&record, &config.scoring).unwrap();
        let decision = PolicyEvaluator::evaluate(&card, &record, &config, None);
        prop_assert_eq!(decision.score(), card.score);
    }
}
