//! Synthetic applicant generation.
//!
//! Produces raw upload rows shaped like a partner CSV export, for
//! load testing the pipeline and seeding demos. Rows use the standard
//! mapping profile's column names.

use crate::core::record::RawRecord;
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a synthetic applicant population.
#[derive(Debug, Clone)]
pub struct PopulationConfig {
    /// Number of rows to generate.
    pub rows: usize,
    /// Probability that a row is corrupted (blank email, junk income,
    /// or an out-of-range scoring input).
    pub dirty_fraction: f64,
    /// Fraction of applicants carrying collateral.
    pub collateral_fraction: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            dirty_fraction: 0.0,
            collateral_fraction: 0.25,
        }
    }
}

/// Generate a random applicant population for testing.
pub fn generate_population(config: &PopulationConfig) -> Vec<RawRecord> {
    let mut rng = rand::thread_rng();
    let mut rows = Vec::with_capacity(config.rows);

    for i in 0..config.rows {
        let mut row = RawRecord::new();
        row.set("email", format!("applicant{:04}@example.com", i));
        row.set("national_id", format!("{:09}", rng.gen_range(100_000_000u64..999_999_999)));
        row.set("phone", format!("555{:07}", rng.gen_range(0u32..9_999_999)));
        row.set("payment_history", format_unit(rng.gen_range(0.30..=1.0)));
        row.set("credit_utilization", format_unit(rng.gen_range(0.10..=1.0)));
        row.set("credit_age", format_unit(rng.gen_range(0.05..=1.0)));
        row.set("credit_mix", format_unit(rng.gen_range(0.10..=1.0)));
        row.set("inquiries", format_unit(rng.gen_range(0.20..=1.0)));

        let income = rng.gen_range(2_500.0..15_000.0);
        let debt = income * rng.gen_range(0.05..0.55);
        row.set("monthly_income", format!("${:.2}", income));
        row.set("monthly_debt", format!("${:.2}", debt));

        row.set("defaults_24m", rng.gen_range(0u32..2).to_string());
        row.set("missed_payments_12m", rng.gen_range(0u32..3).to_string());
        row.set("inquiries_6m", rng.gen_range(0u32..6).to_string());
        row.set("employment_months", rng.gen_range(0u32..240).to_string());
        row.set("savings_rate", format!("{:.1}%", rng.gen_range(0.0..30.0)));

        if rng.gen_bool(config.collateral_fraction.clamp(0.0, 1.0)) {
            row.set(
                "collateral_value",
                format!("${:.2}", rng.gen_range(5_000.0..250_000.0)),
            );
        }

        if rng.gen_bool(config.dirty_fraction.clamp(0.0, 1.0)) {
            corrupt(&mut row, &mut rng);
        }

        rows.push(row);
    }

    rows
}

fn format_unit(value: f64) -> String {
    let decimal = Decimal::from_f64_retain(value).unwrap_or(Decimal::ONE);
    decimal.round_dp(4).to_string()
}

/// Break a row in one of the ways real uploads break.
fn corrupt(row: &mut RawRecord, rng: &mut impl Rng) {
    match rng.gen_range(0..4) {
        0 => row.set("email", ""),
        1 => row.set("monthly_income", "n/a"),
        2 => row.set("payment_history", "1.7"),
        _ => row.set("monthly_income", "$0.00"),
    }
}
