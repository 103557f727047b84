use crate::audit::recorder::AuditLog;
use crate::core::batch::{BatchSummary, ImportBatch};
use crate::core::config::{EngineKind, PartnerConfig};
use crate::core::decision::Decision;
use crate::core::record::{CreditRecord, RawRecord, RecordStatus};
use crate::error::{FieldError, PipelineError};
use crate::mapping::profile::MappingProfile;
use crate::mapping::resolver;
use crate::policy::evaluator::PolicyEvaluator;
use crate::scoring::pillar::PillarModel;
use crate::scoring::weighted::WeightedModel;
use crate::validation;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cooperative cancellation handle for a running batch.
///
/// Cancellation is checked between rows: in-flight evaluations
/// complete, no new rows start, and the batch resolves to `partial`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where finished decisions go. The audit log is the default store;
/// tests substitute flaky stores to exercise the retry path.
pub trait DecisionStore {
    fn persist(&mut self, decision: &Decision) -> Result<Uuid, String>;
}

impl DecisionStore for AuditLog {
    fn persist(&mut self, decision: &Decision) -> Result<Uuid, String> {
        Ok(self.record_decision(decision.clone()))
    }
}

/// One upload to process.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub filename: String,
    pub initiator: String,
    /// Rows in upload order; indices are used for error reporting.
    pub rows: Vec<RawRecord>,
    /// Supply the previous ID to re-process idempotently after a crash.
    pub batch_id: Option<Uuid>,
    pub cancel: Option<CancelToken>,
}

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Upper bound on worker threads for row evaluation.
    pub concurrency: usize,
    /// Attempts per row when persisting a decision fails.
    pub persist_retries: u32,
    /// Reference date for date-transform resolution.
    pub as_of: NaiveDate,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            persist_retries: 2,
            as_of: chrono::Utc::now().date_naive(),
        }
    }
}

/// Everything known about one row after processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row: usize,
    pub status: RecordStatus,
    pub record: Option<CreditRecord>,
    pub decision: Option<Decision>,
    pub errors: Vec<FieldError>,
}

/// Final result of a batch run: the summary plus per-row outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub summary: BatchSummary,
    pub rows: Vec<RowOutcome>,
}

/// Pure per-row evaluation result, produced inside the worker pool.
enum RowEval {
    Ok(Box<(CreditRecord, Decision)>),
    Invalid(Vec<FieldError>),
}

/// Drives an upload through resolve → validate → score → evaluate,
/// fanning rows out across a bounded worker pool and merging results
/// under a single-writer discipline (only this orchestrator's thread
/// touches the batch counters).
pub struct BatchOrchestrator {
    settings: OrchestratorSettings,
    /// Finalized outcomes by batch ID, so re-processing the same batch
    /// after a crash returns the recorded result instead of double
    /// counting.
    finished: HashMap<Uuid, BatchOutcome>,
}

impl BatchOrchestrator {
    pub fn new(settings: OrchestratorSettings) -> Self {
        Self {
            settings,
            finished: HashMap::new(),
        }
    }

    /// The recorded outcome of a finished batch, if this orchestrator
    /// ran it.
    pub fn outcome(&self, batch_id: Uuid) -> Option<&BatchOutcome> {
        self.finished.get(&batch_id)
    }

    /// Process one upload under the given partner config snapshot and
    /// mapping profile.
    ///
    /// The config is read once here and never re-read per row: a
    /// partner config update mid-batch cannot change how queued rows
    /// are judged. A `ConfigError` aborts before any row is processed.
    pub fn process(
        &mut self,
        request: BatchRequest,
        config: &PartnerConfig,
        profile: &MappingProfile,
        store: &mut dyn DecisionStore,
    ) -> Result<BatchOutcome, PipelineError> {
        if let Some(batch_id) = request.batch_id {
            if let Some(existing) = self.finished.get(&batch_id) {
                info!(
                    "batch {} already finalized as {}; returning recorded outcome",
                    batch_id, existing.summary.status
                );
                return Ok(existing.clone());
            }
        }

        // Snapshot: the batch is judged under this version throughout.
        let config = config.clone();

        let mut batch = match request.batch_id {
            Some(id) => ImportBatch::with_id(
                id,
                &request.filename,
                config.partner.clone(),
                &request.initiator,
                config.version,
                request.rows.len(),
            ),
            None => ImportBatch::new(
                &request.filename,
                config.partner.clone(),
                &request.initiator,
                config.version,
                request.rows.len(),
            ),
        };

        // A bad config snapshot fails the whole batch before any row
        // is touched; the failed record stays on the books.
        if let Err(err) = config.validate() {
            warn!("batch {}: config v{} rejected: {}", batch.id(), config.version, err);
            batch.fail_before_start(FieldError::new("config", err.to_string()));
            let outcome = BatchOutcome {
                summary: batch.summary(),
                rows: Vec::new(),
            };
            self.finished.insert(batch.id(), outcome);
            return Err(err.into());
        }
        info!(
            "batch {}: processing {} rows for {} under config v{}",
            batch.id(),
            request.rows.len(),
            config.partner,
            config.version
        );

        let cancel = request.cancel.clone().unwrap_or_default();
        let batch_id = batch.id();
        let evals = self.evaluate_rows(&request.rows, &config, profile, batch_id, &cancel);

        // Single writer: merge results into the counters in row order.
        let mut rows: Vec<RowOutcome> = Vec::with_capacity(request.rows.len());
        for (row, eval) in evals {
            // Cancellation is honored here too: an evaluated row whose
            // decision has not been recorded yet stays pending, so it
            // can be re-run under a fresh batch.
            if cancel.is_cancelled() {
                rows.push(RowOutcome {
                    row,
                    status: RecordStatus::Pending,
                    record: None,
                    decision: None,
                    errors: Vec::new(),
                });
                continue;
            }
            match eval {
                Some(RowEval::Ok(boxed)) => {
                    let (record, decision) = *boxed;
                    match self.persist_with_retry(store, &decision, row) {
                        Ok(()) => {
                            batch.record_success();
                            rows.push(RowOutcome {
                                row,
                                status: RecordStatus::Processed,
                                record: Some(record),
                                decision: Some(decision),
                                errors: Vec::new(),
                            });
                        }
                        Err(err) => {
                            warn!("batch {}: {}", batch_id, err);
                            let field_error = FieldError::new(
                                "persistence",
                                err.to_string(),
                            )
                            .with_row(row);
                            batch.record_failure(vec![field_error.clone()]);
                            rows.push(RowOutcome {
                                row,
                                status: RecordStatus::Error,
                                record: Some(record),
                                decision: Some(decision),
                                errors: vec![field_error],
                            });
                        }
                    }
                }
                Some(RowEval::Invalid(errors)) => {
                    let stamped: Vec<FieldError> =
                        errors.into_iter().map(|e| e.with_row(row)).collect();
                    debug!(
                        "batch {}: row {} invalid ({} field errors)",
                        batch_id,
                        row,
                        stamped.len()
                    );
                    batch.record_failure(stamped.clone());
                    rows.push(RowOutcome {
                        row,
                        status: RecordStatus::Error,
                        record: None,
                        decision: None,
                        errors: stamped,
                    });
                }
                // Row skipped by cancellation: never started, stays pending.
                None => rows.push(RowOutcome {
                    row,
                    status: RecordStatus::Pending,
                    record: None,
                    decision: None,
                    errors: Vec::new(),
                }),
            }
            debug_assert_eq!(
                batch.processed_records(),
                batch.successful_records() + batch.failed_records()
            );
        }

        if cancel.is_cancelled() {
            batch.request_cancel();
        }
        let status = batch.finalize();
        info!(
            "batch {}: finalized {} ({}/{} successful)",
            batch_id,
            status,
            batch.successful_records(),
            batch.total_records()
        );

        let outcome = BatchOutcome {
            summary: batch.summary(),
            rows,
        };
        self.finished.insert(batch_id, outcome.clone());
        Ok(outcome)
    }

    /// Evaluate all rows, fanning out across up to `concurrency`
    /// scoped worker threads. Row evaluation is pure computation with
    /// no shared state, so rows are independent by construction.
    ///
    /// Returns (row index, evaluation) pairs in row order; `None`
    /// marks a row skipped by cancellation.
    fn evaluate_rows(
        &self,
        raw_rows: &[RawRecord],
        config: &PartnerConfig,
        profile: &MappingProfile,
        batch_id: Uuid,
        cancel: &CancelToken,
    ) -> Vec<(usize, Option<RowEval>)> {
        let workers = self.settings.concurrency.max(1).min(raw_rows.len().max(1));
        let chunk_size = raw_rows.len().div_ceil(workers).max(1);
        let as_of = self.settings.as_of;

        let mut merged: Vec<(usize, Option<RowEval>)> = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for (chunk_index, chunk) in raw_rows.chunks(chunk_size).enumerate() {
                let base = chunk_index * chunk_size;
                let cancel = cancel.clone();
                handles.push(scope.spawn(move || {
                    let mut evals = Vec::with_capacity(chunk.len());
                    for (offset, raw) in chunk.iter().enumerate() {
                        let row = base + offset;
                        if cancel.is_cancelled() {
                            evals.push((row, None));
                            continue;
                        }
                        evals.push((row, Some(evaluate_row(raw, config, profile, batch_id, as_of))));
                    }
                    evals
                }));
            }
            handles
                .into_iter()
                .flat_map(|h| h.join().expect("row evaluation worker panicked"))
                .collect()
        });
        merged.sort_by_key(|(row, _)| *row);
        merged
    }

    fn persist_with_retry(
        &self,
        store: &mut dyn DecisionStore,
        decision: &Decision,
        row: usize,
    ) -> Result<(), PipelineError> {
        let attempts = self.settings.persist_retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match store.persist(decision) {
                Ok(_) => return Ok(()),
                Err(message) => {
                    debug!(
                        "persist attempt {}/{} for row {} failed: {}",
                        attempt, attempts, row, message
                    );
                    last_error = message;
                }
            }
        }
        Err(PipelineError::Persistence {
            row,
            message: last_error,
        })
    }
}

/// The pure per-row pipeline: resolve → validate → score → evaluate.
fn evaluate_row(
    raw: &RawRecord,
    config: &PartnerConfig,
    profile: &MappingProfile,
    batch_id: Uuid,
    as_of: NaiveDate,
) -> RowEval {
    let draft = match resolver::resolve(raw, profile, as_of) {
        Ok(draft) => draft,
        Err(errors) => return RowEval::Invalid(errors),
    };
    let record = match validation::validate(draft) {
        Ok(record) => record,
        Err(errors) => return RowEval::Invalid(errors),
    };
    // Config was validated at batch start; a scoring failure here
    // would mean the snapshot changed underneath us.
    let card = match config.engine {
        EngineKind::Weighted => WeightedModel::score(&record, &config.scoring),
        EngineKind::Pillar => PillarModel::score(&record, &config.alt_scoring),
    };
    let card = match card {
        Ok(card) => card,
        Err(err) => {
            return RowEval::Invalid(vec![FieldError::new("config", err.to_string())]);
        }
    };
    let decision = PolicyEvaluator::evaluate(&card, &record, config, Some(batch_id));
    RowEval::Ok(Box::new((record, decision)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::BatchStatus;
    use crate::core::partner::PartnerId;
    use crate::pipeline::synth::{generate_population, PopulationConfig};

    fn setup() -> (PartnerConfig, MappingProfile) {
        let partner = PartnerId::new("ACME-BANK");
        (
            PartnerConfig::standard(partner.clone()),
            MappingProfile::standard(partner),
        )
    }

    fn request(rows: Vec<RawRecord>) -> BatchRequest {
        BatchRequest {
            filename: "upload.csv".to_string(),
            initiator: "ops@acme.example".to_string(),
            rows,
            batch_id: None,
            cancel: None,
        }
    }

    fn clean_rows(n: usize) -> Vec<RawRecord> {
        generate_population(&PopulationConfig {
            rows: n,
            dirty_fraction: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_clean_batch_completes() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let outcome = orchestrator
            .process(request(clean_rows(20)), &config, &profile, &mut audit)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Completed);
        assert_eq!(outcome.summary.processed_records, 20);
        assert_eq!(outcome.summary.failed_records, 0);
        assert_eq!(audit.len(), 20);
    }

    #[test]
    fn test_counters_consistent() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let mut rows = clean_rows(5);
        rows[2].set("email", "");
        let outcome = orchestrator
            .process(request(rows), &config, &profile, &mut audit)
            .unwrap();
        let s = &outcome.summary;
        assert_eq!(s.processed_records, s.successful_records + s.failed_records);
        assert_eq!(s.processed_records, 5);
    }

    #[test]
    fn test_invalid_row_does_not_abort_siblings() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let mut rows = clean_rows(4);
        rows[1].set("email", "");
        let outcome = orchestrator
            .process(request(rows), &config, &profile, &mut audit)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Partial);
        assert_eq!(outcome.summary.successful_records, 3);
        assert_eq!(outcome.summary.failed_records, 1);
        // Error carries the row index and field for correction.
        let err = &outcome.summary.errors[0];
        assert_eq!(err.row, Some(1));
        assert_eq!(err.field, "email");
    }

    #[test]
    fn test_all_rows_failing_marks_batch_failed() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let mut rows = clean_rows(3);
        for row in &mut rows {
            row.set("email", "");
        }
        let outcome = orchestrator
            .process(request(rows), &config, &profile, &mut audit)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Failed);
        assert_eq!(outcome.summary.successful_records, 0);
    }

    #[test]
    fn test_empty_batch_completes() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let outcome = orchestrator
            .process(request(Vec::new()), &config, &profile, &mut audit)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Completed);
        assert_eq!(outcome.summary.processed_records, 0);
    }

    #[test]
    fn test_config_error_aborts_before_any_row() {
        let (mut config, profile) = setup();
        config.scoring.weights.clear();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let batch_id = Uuid::new_v4();
        let mut req = request(clean_rows(5));
        req.batch_id = Some(batch_id);

        let result = orchestrator.process(req, &config, &profile, &mut audit);
        assert!(matches!(result, Err(PipelineError::Config(_))));
        assert!(audit.is_empty());

        // The batch record survives as failed with zero processed rows.
        let recorded = orchestrator.outcome(batch_id).unwrap();
        assert_eq!(recorded.summary.status, BatchStatus::Failed);
        assert_eq!(recorded.summary.processed_records, 0);
        assert_eq!(recorded.summary.errors[0].field, "config");
    }

    #[test]
    fn test_idempotent_reprocessing() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let batch_id = Uuid::new_v4();
        let rows = clean_rows(6);

        let mut req = request(rows.clone());
        req.batch_id = Some(batch_id);
        let first = orchestrator
            .process(req.clone(), &config, &profile, &mut audit)
            .unwrap();

        // Re-processing the same batch ID must not double count.
        let second = orchestrator
            .process(req, &config, &profile, &mut audit)
            .unwrap();
        assert_eq!(first.summary.batch_id, second.summary.batch_id);
        assert_eq!(first.summary.processed_records, second.summary.processed_records);
        assert_eq!(audit.len(), 6);
    }

    #[test]
    fn test_cancelled_before_start_resolves_partial() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());
        let mut audit = AuditLog::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut req = request(clean_rows(8));
        req.cancel = Some(cancel);
        let outcome = orchestrator
            .process(req, &config, &profile, &mut audit)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Partial);
        assert_eq!(outcome.summary.processed_records, 0);
        assert!(outcome.rows.iter().all(|r| r.status == RecordStatus::Pending));
    }

    /// A store that cancels the batch after recording a fixed number
    /// of decisions, so cancellation lands mid-run deterministically.
    struct CancellingStore {
        after: usize,
        persisted: usize,
        cancel: CancelToken,
        inner: AuditLog,
    }

    impl DecisionStore for CancellingStore {
        fn persist(&mut self, decision: &Decision) -> Result<Uuid, String> {
            let id = self.inner.persist(decision)?;
            self.persisted += 1;
            if self.persisted == self.after {
                self.cancel.cancel();
            }
            Ok(id)
        }
    }

    #[test]
    fn test_cancelled_mid_batch_keeps_recorded_rows() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings {
            concurrency: 1,
            ..Default::default()
        });
        let cancel = CancelToken::new();
        let mut store = CancellingStore {
            after: 3,
            persisted: 0,
            cancel: cancel.clone(),
            inner: AuditLog::new(),
        };
        let mut req = request(clean_rows(8));
        req.cancel = Some(cancel);
        let outcome = orchestrator
            .process(req, &config, &profile, &mut store)
            .unwrap();

        // Rows recorded before the cancel stay on the books; the rest
        // stay pending and the batch resolves partial.
        assert_eq!(outcome.summary.status, BatchStatus::Partial);
        assert_eq!(outcome.summary.successful_records, 3);
        assert_eq!(outcome.summary.processed_records, 3);
        for row in &outcome.rows {
            if row.row < 3 {
                assert_eq!(row.status, RecordStatus::Processed);
                assert!(row.decision.is_some());
            } else {
                assert_eq!(row.status, RecordStatus::Pending);
                assert!(row.decision.is_none());
            }
        }
        assert_eq!(store.inner.len(), 3);
    }

    #[test]
    fn test_row_outcomes_in_row_order() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings {
            concurrency: 3,
            ..Default::default()
        });
        let mut audit = AuditLog::new();
        let outcome = orchestrator
            .process(request(clean_rows(10)), &config, &profile, &mut audit)
            .unwrap();
        let indices: Vec<usize> = outcome.rows.iter().map(|r| r.row).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_worker_matches_many_workers() {
        let (config, profile) = setup();
        let rows = clean_rows(12);
        let mut audit_a = AuditLog::new();
        let mut audit_b = AuditLog::new();

        let mut serial = BatchOrchestrator::new(OrchestratorSettings {
            concurrency: 1,
            ..Default::default()
        });
        let mut parallel = BatchOrchestrator::new(OrchestratorSettings {
            concurrency: 8,
            ..Default::default()
        });

        let a = serial
            .process(request(rows.clone()), &config, &profile, &mut audit_a)
            .unwrap();
        let b = parallel
            .process(request(rows), &config, &profile, &mut audit_b)
            .unwrap();

        assert_eq!(a.summary.successful_records, b.summary.successful_records);
        let scores_a: Vec<_> = a.rows.iter().filter_map(|r| r.decision.as_ref().map(|d| d.score())).collect();
        let scores_b: Vec<_> = b.rows.iter().filter_map(|r| r.decision.as_ref().map(|d| d.score())).collect();
        assert_eq!(scores_a, scores_b);
    }

    struct FlakyStore {
        fail_next: u32,
        inner: AuditLog,
    }

    impl DecisionStore for FlakyStore {
        fn persist(&mut self, decision: &Decision) -> Result<Uuid, String> {
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err("store unavailable".to_string());
            }
            self.inner.persist(decision)
        }
    }

    #[test]
    fn test_persistence_retry_recovers() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings {
            concurrency: 1,
            persist_retries: 3,
            ..Default::default()
        });
        let mut store = FlakyStore {
            fail_next: 1,
            inner: AuditLog::new(),
        };
        let outcome = orchestrator
            .process(request(clean_rows(2)), &config, &profile, &mut store)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Completed);
    }

    #[test]
    fn test_persistence_exhaustion_marks_partial() {
        let (config, profile) = setup();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings {
            concurrency: 1,
            persist_retries: 2,
            ..Default::default()
        });
        // First row exhausts both attempts; second persists fine.
        let mut store = FlakyStore {
            fail_next: 2,
            inner: AuditLog::new(),
        };
        let outcome = orchestrator
            .process(request(clean_rows(2)), &config, &profile, &mut store)
            .unwrap();
        assert_eq!(outcome.summary.status, BatchStatus::Partial);
        assert_eq!(outcome.summary.failed_records, 1);
        assert_eq!(outcome.summary.errors[0].field, "persistence");
    }

    #[test]
    fn test_config_snapshot_isolation() {
        let (config, profile) = setup();
        let rows = clean_rows(5);
        let mut audit_a = AuditLog::new();
        let mut audit_b = AuditLog::new();
        let mut orchestrator = BatchOrchestrator::new(OrchestratorSettings::default());

        let before = orchestrator
            .process(request(rows.clone()), &config, &profile, &mut audit_a)
            .unwrap();

        // A v2 with harsher penalties exists now, but re-running rows
        // under the v1 snapshot must reproduce the v1 scores.
        let mut harsher = config.scoring.clone();
        harsher.penalty_rules[0].points = rust_decimal_macros::dec!(500);
        let _v2 = config.next_version(harsher, config.alt_scoring.clone(), config.lending.clone());

        let after = orchestrator
            .process(request(rows), &config, &profile, &mut audit_b)
            .unwrap();
        let scores = |o: &BatchOutcome| -> Vec<_> {
            o.rows
                .iter()
                .filter_map(|r| r.decision.as_ref().map(|d| d.score()))
                .collect()
        };
        assert_eq!(scores(&before), scores(&after));
    }
}
