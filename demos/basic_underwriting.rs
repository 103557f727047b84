//! Basic underwriting example.
//!
//! Demonstrates the full decision pipeline: a partner upload is
//! mapped to canonical records, scored, and turned into offers.

use lending_engine::audit::recorder::AuditLog;
use lending_engine::core::config::PartnerConfig;
use lending_engine::core::partner::PartnerId;
use lending_engine::core::record::RawRecord;
use lending_engine::mapping::profile::MappingProfile;
use lending_engine::pipeline::orchestrator::{
    BatchOrchestrator, BatchRequest, OrchestratorSettings,
};

fn applicant(email: &str, inputs: [&str; 5], income: &str, debt: &str) -> RawRecord {
    let mut row = RawRecord::new();
    row.set("email", email);
    row.set("payment_history", inputs[0]);
    row.set("credit_utilization", inputs[1]);
    row.set("credit_age", inputs[2]);
    row.set("credit_mix", inputs[3]);
    row.set("inquiries", inputs[4]);
    row.set("monthly_income", income);
    row.set("monthly_debt", debt);
    row.set("defaults_24m", "0");
    row.set("missed_payments_12m", "0");
    row.set("inquiries_6m", "1");
    row.set("employment_months", "48");
    row.set("savings_rate", "12%");
    row
}

fn main() {
    env_logger::init();

    println!("╔══════════════════════════════════════════════╗");
    println!("║  lending-engine: Basic Underwriting Example  ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let partner = PartnerId::new("ACME-BANK");
    let config = PartnerConfig::standard(partner.clone());
    let profile = MappingProfile::standard(partner);

    // --- Scenario: one upload, three very different applicants ---
    println!("━━━ Processing a three-row upload ━━━\n");

    let rows = vec![
        applicant(
            "ana@example.com",
            ["0.95", "0.90", "0.85", "0.80", "0.90"],
            "$8,000.00",
            "$1,600.00",
        ),
        applicant(
            "ben@example.com",
            ["0.60", "0.55", "0.50", "0.55", "0.60"],
            "$4,200.00",
            "$1,900.00",
        ),
        applicant(
            "carla@example.com",
            ["0.40", "0.35", "0.30", "0.40", "0.35"],
            "$3,000.00",
            "$2,100.00",
        ),
    ];

    let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
    let mut audit = AuditLog::new();
    let request = BatchRequest {
        filename: "three_applicants.csv".to_string(),
        initiator: "demo".to_string(),
        rows,
        batch_id: None,
        cancel: None,
    };

    let outcome = orchestrator
        .process(request, &config, &profile, &mut audit)
        .expect("standard config is valid");

    println!("{}", outcome.summary);

    println!("━━━ Decisions ━━━\n");
    for row in &outcome.rows {
        if let Some(decision) = &row.decision {
            println!("{}\n", decision);
        }
    }

    println!("━━━ Score breakdown for the strongest applicant ━━━\n");
    if let Some(decision) = &outcome.rows[0].decision {
        for entry in decision.breakdown().entries() {
            println!("  {:<28} {:>10}", entry.label, entry.contribution);
        }
    }

    println!("\nAudit trail holds {} entries.", audit.len());
}
