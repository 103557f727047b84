//! lending-engine CLI
//!
//! Run scoring and batch underwriting from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Process an upload under the standard partner config
//! lending-engine process --input upload.json --partner ACME-BANK
//!
//! # Output as JSON
//! lending-engine process --input upload.json --format json
//!
//! # Score a single applicant row
//! lending-engine score --input applicant.json --engine pillar
//!
//! # Generate a synthetic upload for testing
//! lending-engine generate --rows 100 --dirty 0.1 --output upload.json
//! ```

use lending_engine::audit::recorder::AuditLog;
use lending_engine::core::config::{EngineKind, PartnerConfig};
use lending_engine::core::partner::PartnerId;
use lending_engine::core::record::RawRecord;
use lending_engine::mapping::profile::MappingProfile;
use lending_engine::mapping::resolver;
use lending_engine::pipeline::orchestrator::{
    BatchOrchestrator, BatchRequest, OrchestratorSettings,
};
use lending_engine::pipeline::synth::{generate_population, PopulationConfig};
use lending_engine::policy::evaluator::PolicyEvaluator;
use lending_engine::scoring::pillar::PillarModel;
use lending_engine::scoring::weighted::WeightedModel;
use lending_engine::validation;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"lending-engine — configuration-driven credit scoring and lending decisions

USAGE:
    lending-engine <COMMAND> [OPTIONS]

COMMANDS:
    process     Run a batch of applicant rows through the full pipeline
    score       Score and evaluate a single applicant row
    generate    Generate a synthetic applicant upload (for testing)
    help        Show this message

OPTIONS (process, score):
    --input <FILE>      Path to JSON upload file
    --partner <ID>      Partner identifier (default: ACME-BANK)
    --config <FILE>     Partner config JSON (default: built-in standard config)
    --profile <FILE>    Mapping profile JSON (default: built-in standard profile)
    --engine <ENGINE>   Scoring engine: weighted (default) or pillar
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (process):
    --initiator <NAME>  Recorded as the batch initiator (default: cli)
    --concurrency <N>   Worker threads for row evaluation (default: 4)

OPTIONS (generate):
    --rows <N>          Number of rows (default: 100)
    --dirty <F>         Fraction of corrupted rows, 0.0-1.0 (default: 0)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    lending-engine process --input upload.json --partner ACME-BANK
    lending-engine process --input upload.json --format json --concurrency 8
    lending-engine score --input applicant.json --engine pillar
    lending-engine generate --rows 500 --dirty 0.05 --output upload.json"#
    );
}

/// JSON schema for upload files: `{ "rows": [ { "email": "...", ... } ] }`.
#[derive(serde::Deserialize)]
struct UploadFile {
    rows: Vec<RawRecord>,
}

fn load_rows(path: &str) -> Vec<RawRecord> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: UploadFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "rows": [
    {{ "email": "jane@example.com", "payment_history": "0.95", "monthly_income": "$6,500", ... }}
  ]
}}"#
        );
        process::exit(1);
    });
    file.rows
}

fn load_config(path: Option<&str>, partner: PartnerId, engine: EngineKind) -> PartnerConfig {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config '{}': {}", path, e);
                process::exit(1);
            });
            serde_json::from_str(&content).unwrap_or_else(|e| {
                eprintln!("Error parsing config JSON: {}", e);
                process::exit(1);
            })
        }
        None => PartnerConfig::standard(partner),
    };
    config.engine = engine;
    config.validate().unwrap_or_else(|e| {
        eprintln!("Invalid partner config: {}", e);
        process::exit(1);
    });
    config
}

fn load_profile(path: Option<&str>, partner: PartnerId) -> MappingProfile {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading profile '{}': {}", path, e);
                process::exit(1);
            });
            serde_json::from_str(&content).unwrap_or_else(|e| {
                eprintln!("Error parsing profile JSON: {}", e);
                process::exit(1);
            })
        }
        None => MappingProfile::standard(partner),
    }
}

fn parse_engine(value: &str) -> EngineKind {
    match value {
        "weighted" => EngineKind::Weighted,
        "pillar" => EngineKind::Pillar,
        other => {
            eprintln!("Unknown engine '{}': expected 'weighted' or 'pillar'", other);
            process::exit(1);
        }
    }
}

fn cmd_process(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut profile_path = None;
    let mut partner = "ACME-BANK".to_string();
    let mut engine = EngineKind::Weighted;
    let mut format = "text".to_string();
    let mut initiator = "cli".to_string();
    let mut concurrency = 4usize;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }));
            }
            "--profile" => {
                i += 1;
                profile_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--profile requires a file path");
                    process::exit(1);
                }));
            }
            "--partner" => {
                i += 1;
                partner = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--partner requires an identifier");
                    process::exit(1);
                });
            }
            "--engine" => {
                i += 1;
                engine = parse_engine(args.get(i).map(String::as_str).unwrap_or_else(|| {
                    eprintln!("--engine requires 'weighted' or 'pillar'");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            "--initiator" => {
                i += 1;
                initiator = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--initiator requires a name");
                    process::exit(1);
                });
            }
            "--concurrency" => {
                i += 1;
                concurrency = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--concurrency requires a number");
                        process::exit(1);
                    });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let partner = PartnerId::new(&partner);
    let config = load_config(config_path.as_deref(), partner.clone(), engine);
    let profile = load_profile(profile_path.as_deref(), partner);
    let rows = load_rows(&path);

    let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings {
        concurrency,
        ..Default::default()
    });
    let mut audit = AuditLog::new();
    let request = BatchRequest {
        filename: path,
        initiator,
        rows,
        batch_id: None,
        cancel: None,
    };

    let outcome = orchestrator
        .process(request, &config, &profile, &mut audit)
        .unwrap_or_else(|e| {
            eprintln!("Batch aborted: {}", e);
            process::exit(1);
        });

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
    } else {
        println!("{}", outcome.summary);
        for row in &outcome.rows {
            if let Some(decision) = &row.decision {
                println!("{}", decision);
            }
        }
        for error in &outcome.summary.errors {
            println!("  {}", error);
        }
    }
}

fn cmd_score(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut profile_path = None;
    let mut partner = "ACME-BANK".to_string();
    let mut engine = EngineKind::Weighted;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }));
            }
            "--profile" => {
                i += 1;
                profile_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--profile requires a file path");
                    process::exit(1);
                }));
            }
            "--partner" => {
                i += 1;
                partner = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--partner requires an identifier");
                    process::exit(1);
                });
            }
            "--engine" => {
                i += 1;
                engine = parse_engine(args.get(i).map(String::as_str).unwrap_or_else(|| {
                    eprintln!("--engine requires 'weighted' or 'pillar'");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let content = fs::read_to_string(&path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    let raw: RawRecord = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected a single JSON object of column/value pairs.");
        process::exit(1);
    });

    let partner = PartnerId::new(&partner);
    let config = load_config(config_path.as_deref(), partner.clone(), engine);
    let profile = load_profile(profile_path.as_deref(), partner);
    let as_of = chrono::Utc::now().date_naive();

    let draft = resolver::resolve(&raw, &profile, as_of).unwrap_or_else(|errors| {
        for error in &errors {
            eprintln!("{}", error);
        }
        process::exit(1);
    });
    let record = validation::validate(draft).unwrap_or_else(|errors| {
        for error in &errors {
            eprintln!("{}", error);
        }
        process::exit(1);
    });

    let card = match config.engine {
        EngineKind::Weighted => WeightedModel::score(&record, &config.scoring),
        EngineKind::Pillar => PillarModel::score(&record, &config.alt_scoring),
    }
    .unwrap_or_else(|e| {
        eprintln!("Scoring failed: {}", e);
        process::exit(1);
    });

    let decision = PolicyEvaluator::evaluate(&card, &record, &config, None);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&decision).unwrap());
    } else {
        println!("{}", decision);
    }
}

fn cmd_generate(args: &[String]) {
    let mut rows = 100usize;
    let mut dirty = 0.0f64;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--rows" => {
                i += 1;
                rows = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--rows requires a number");
                        process::exit(1);
                    });
            }
            "--dirty" => {
                i += 1;
                dirty = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--dirty requires a fraction between 0 and 1");
                        process::exit(1);
                    });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let population = generate_population(&PopulationConfig {
        rows,
        dirty_fraction: dirty,
        ..Default::default()
    });

    #[derive(serde::Serialize)]
    struct OutputFile {
        rows: Vec<RawRecord>,
    }

    let json = serde_json::to_string_pretty(&OutputFile { rows: population }).unwrap();

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Generated {} rows → {}", rows, path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "process" => cmd_process(rest),
        "score" => cmd_score(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
