//! Recession mode example.
//!
//! Demonstrates how flipping the recession switch on a partner's
//! lending policy tightens the score floor and trims offer amounts
//! for the same applicants.

use lending_engine::core::config::PartnerConfig;
use lending_engine::core::partner::PartnerId;
use lending_engine::core::record::CreditRecord;
use lending_engine::policy::evaluator::PolicyEvaluator;
use lending_engine::scoring::weighted::WeightedModel;
use rust_decimal_macros::dec;

fn applicant(email: &str, strength: rust_decimal::Decimal) -> CreditRecord {
    CreditRecord {
        email: email.to_string(),
        national_id: None,
        phone: None,
        payment_history: strength,
        credit_utilization: strength,
        credit_age: strength,
        credit_mix: strength,
        inquiries: strength,
        monthly_income: dec!(6_000),
        monthly_debt: dec!(1_500),
        defaults_24m: 0,
        missed_payments_12m: 0,
        inquiries_6m: 1,
        oldest_account_months: 84,
        employment_months: 48,
        savings_rate: dec!(0.10),
        collateral_value: dec!(0),
    }
}

fn main() {
    env_logger::init();

    println!("╔════════════════════════════════════════════╗");
    println!("║  lending-engine: Recession Mode Example    ║");
    println!("╚════════════════════════════════════════════╝\n");

    let partner = PartnerId::new("ACME-BANK");
    let normal = PartnerConfig::standard(partner.clone());

    let mut recession = PartnerConfig::standard(partner);
    recession.lending.recession_mode = true;
    recession.lending.allow_income_based_override = false;

    let applicants = vec![
        applicant("strong@example.com", dec!(0.92)),
        applicant("middling@example.com", dec!(0.58)),
        applicant("marginal@example.com", dec!(0.52)),
    ];

    for config in [&normal, &recession] {
        let label = if config.lending.recession_mode {
            "RECESSION POLICY"
        } else {
            "NORMAL POLICY"
        };
        println!("━━━ {} ━━━\n", label);
        println!(
            "  Minimum score: {} (+{} in recession)",
            config.lending.min_score,
            if config.lending.recession_mode {
                config.lending.recession_min_score_bump
            } else {
                dec!(0)
            }
        );
        println!();

        for record in &applicants {
            let card = WeightedModel::score(record, &config.scoring)
                .expect("standard config is valid");
            let decision = PolicyEvaluator::evaluate(&card, record, config, None);
            println!("{}\n", decision);
        }
    }
}
