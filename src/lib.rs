//! # lending-engine
//!
//! Configuration-driven credit scoring and lending-decision engine.
//!
//! Partner institutions upload applicant data in their own column
//! layouts; the engine maps each row to a canonical record, validates
//! it, scores it under the partner's configured model, and renders an
//! auditable lending decision.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: records, decisions, partner configuration, batches
//! - **mapping** — Field-mapping profiles and raw-row resolution
//! - **scoring** — Weighted credit scoring and the pillar-based alternative model
//! - **policy** — Lending policy evaluation: outcomes, rates, offer terms
//! - **pipeline** — Batch orchestration and synthetic population generation
//! - **audit** — Append-only decision audit trail with manual overrides

pub mod audit;
pub mod core;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod policy;
pub mod scoring;
pub mod validation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::audit::recorder::AuditLog;
    pub use crate::core::config::{EngineKind, LendingPolicy, PartnerConfig, ScoringConfig};
    pub use crate::core::decision::{Decision, Outcome, RiskTier, Tier};
    pub use crate::core::partner::{ApplicantId, PartnerId};
    pub use crate::core::record::{CreditRecord, RawRecord};
    pub use crate::mapping::profile::MappingProfile;
    pub use crate::pipeline::orchestrator::{
        BatchOrchestrator, BatchRequest, OrchestratorSettings,
    };
    pub use crate::policy::evaluator::PolicyEvaluator;
}
