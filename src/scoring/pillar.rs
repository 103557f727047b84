use crate::core::config::AltScoringConfig;
use crate::core::decision::ScoreBreakdown;
use crate::core::record::CreditRecord;
use crate::error::ConfigError;
use crate::scoring::ScoreCard;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Engine 2: the capacity/character five-pillar model.
///
/// Each pillar is a weighted blend of closed-set signals derived from
/// record facts; the pillars blend into a 0–100 score that maps to a
/// risk label via ordered cut points. Cut points are inclusive lower
/// bounds of the better tier, so a score exactly on a boundary gets
/// the better label.
pub struct PillarModel;

impl PillarModel {
    pub fn score(
        record: &CreditRecord,
        config: &AltScoringConfig,
    ) -> Result<ScoreCard, ConfigError> {
        config.validate()?;

        let pillar_weight_sum: Decimal = config.pillars.iter().map(|p| p.weight).sum();
        let mut breakdown = ScoreBreakdown::new();
        let mut applied_rules = Vec::new();
        let mut score = Decimal::ZERO;

        for pillar in &config.pillars {
            let signal_weight_sum: Decimal = pillar.signals.iter().map(|s| s.weight).sum();
            if signal_weight_sum <= Decimal::ZERO {
                return Err(ConfigError::EmptyPillar {
                    pillar: pillar.pillar.to_string(),
                });
            }

            let mut pillar_value = Decimal::ZERO;
            for sw in &pillar.signals {
                let value = sw.signal.value(record);
                pillar_value += value * sw.weight / signal_weight_sum;
                breakdown.push(
                    format!("{}/{}", pillar.pillar.label(), sw.signal.label()),
                    value.round_dp(4),
                );
            }

            // Pillar contribution on the 0-100 scale.
            let contribution =
                (pillar_value * pillar.weight / pillar_weight_sum * dec!(100)).round_dp(2);
            breakdown.push(pillar.pillar.label(), contribution);
            score += contribution;
        }

        let score = score.clamp(Decimal::ZERO, dec!(100)).round_dp(2);
        let mut risk_tier = config.cut_points.tier_for(score);

        // Behavioral threshold breaches cap the label at moderate risk.
        if record.dti() > config.max_dti {
            applied_rules.push("max_dti_breach".to_string());
        }
        if record.savings_rate < config.min_savings_rate {
            applied_rules.push("min_savings_rate_breach".to_string());
        }
        if !applied_rules.is_empty() {
            risk_tier = risk_tier.max(crate::core::decision::RiskTier::Moderate);
        }

        Ok(ScoreCard {
            score,
            risk_tier: Some(risk_tier),
            breakdown,
            applied_rules,
            forced: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decision::RiskTier;
    use rust_decimal::Decimal;

    fn strong_record() -> CreditRecord {
        CreditRecord {
            email: "jane@example.com".to_string(),
            national_id: None,
            phone: None,
            payment_history: dec!(1),
            credit_utilization: dec!(1),
            credit_age: dec!(1),
            credit_mix: dec!(1),
            inquiries: dec!(1),
            monthly_income: dec!(8000),
            monthly_debt: dec!(800),
            defaults_24m: 0,
            missed_payments_12m: 0,
            inquiries_6m: 0,
            oldest_account_months: 180,
            employment_months: 84,
            savings_rate: dec!(0.25),
            collateral_value: dec!(120_000),
        }
    }

    fn weak_record() -> CreditRecord {
        CreditRecord {
            email: "sam@example.com".to_string(),
            national_id: None,
            phone: None,
            payment_history: dec!(0.2),
            credit_utilization: dec!(0.1),
            credit_age: dec!(0.1),
            credit_mix: dec!(0.2),
            inquiries: dec!(0.3),
            monthly_income: dec!(2000),
            monthly_debt: dec!(1500),
            defaults_24m: 1,
            missed_payments_12m: 4,
            inquiries_6m: 6,
            oldest_account_months: 8,
            employment_months: 3,
            savings_rate: Decimal::ZERO,
            collateral_value: Decimal::ZERO,
        }
    }

    #[test]
    fn test_strong_record_is_low_risk() {
        let card = PillarModel::score(&strong_record(), &AltScoringConfig::standard()).unwrap();
        assert_eq!(card.risk_tier, Some(RiskTier::Low));
        assert!(card.score > dec!(70));
        assert!(card.applied_rules.is_empty());
    }

    #[test]
    fn test_weak_record_is_high_risk() {
        let card = PillarModel::score(&weak_record(), &AltScoringConfig::standard()).unwrap();
        assert_eq!(card.risk_tier, Some(RiskTier::High));
    }

    #[test]
    fn test_dti_breach_caps_at_moderate() {
        let mut record = strong_record();
        // DTI 0.5 over the 0.45 threshold.
        record.monthly_debt = dec!(4000);
        let card = PillarModel::score(&record, &AltScoringConfig::standard()).unwrap();
        assert!(card.applied_rules.contains(&"max_dti_breach".to_string()));
        assert_eq!(card.risk_tier, Some(RiskTier::Moderate));
    }

    #[test]
    fn test_savings_breach_recorded() {
        let mut record = strong_record();
        record.savings_rate = dec!(0.01);
        let card = PillarModel::score(&record, &AltScoringConfig::standard()).unwrap();
        assert!(card
            .applied_rules
            .contains(&"min_savings_rate_breach".to_string()));
    }

    #[test]
    fn test_score_bounded_0_100() {
        for record in [strong_record(), weak_record()] {
            let card = PillarModel::score(&record, &AltScoringConfig::standard()).unwrap();
            assert!(card.score >= Decimal::ZERO && card.score <= dec!(100));
        }
    }

    #[test]
    fn test_breakdown_has_pillar_and_signal_entries() {
        let card = PillarModel::score(&strong_record(), &AltScoringConfig::standard()).unwrap();
        assert!(card.breakdown.contribution("capacity").is_some());
        assert!(card.breakdown.contribution("capacity/cash_flow").is_some());
        assert!(card.breakdown.contribution("character").is_some());
    }

    #[test]
    fn test_no_pillars_fails_closed() {
        let mut config = AltScoringConfig::standard();
        config.pillars.clear();
        assert_eq!(
            PillarModel::score(&strong_record(), &config).unwrap_err(),
            ConfigError::NoPillars
        );
    }

    #[test]
    fn test_scoring_is_pure() {
        let config = AltScoringConfig::standard();
        let record = strong_record();
        let a = PillarModel::score(&record, &config).unwrap();
        let b = PillarModel::score(&record, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_off_hundred_pillar_weights_normalize() {
        let mut config = AltScoringConfig::standard();
        // 30 + 20 + 15 + 10 + 28 = 103; still scales to 0-100.
        config.pillars[4].weight = dec!(28);
        let card = PillarModel::score(&strong_record(), &config).unwrap();
        assert!(card.score <= dec!(100));
    }
}
