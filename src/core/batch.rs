use crate::core::partner::PartnerId;
use crate::error::FieldError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
    Partial,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Partial => "partial",
        };
        write!(f, "{}", label)
    }
}

/// One file upload's worth of rows moving through the pipeline.
///
/// Created at upload start with status `processing`, mutated only by the
/// orchestrator as rows complete, and finalized exactly once. Counters
/// maintain `processed == successful + failed` after every row and only
/// ever increase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    id: Uuid,
    filename: String,
    partner: PartnerId,
    initiator: String,
    /// Partner config version snapshotted at batch start.
    config_version: u32,
    status: BatchStatus,
    total_records: usize,
    processed_records: usize,
    successful_records: usize,
    failed_records: usize,
    /// Row-level errors in row order.
    errors: Vec<FieldError>,
    cancelled: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ImportBatch {
    pub fn new(
        filename: impl Into<String>,
        partner: PartnerId,
        initiator: impl Into<String>,
        config_version: u32,
        total_records: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            partner,
            initiator: initiator.into(),
            config_version,
            status: BatchStatus::Processing,
            total_records,
            processed_records: 0,
            successful_records: 0,
            failed_records: 0,
            errors: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Create a batch with a specific ID (for idempotent re-processing).
    pub fn with_id(
        id: Uuid,
        filename: impl Into<String>,
        partner: PartnerId,
        initiator: impl Into<String>,
        config_version: u32,
        total_records: usize,
    ) -> Self {
        let mut batch = Self::new(filename, partner, initiator, config_version, total_records);
        batch.id = id;
        batch
    }

    /// Record one successfully processed row.
    pub fn record_success(&mut self) {
        debug_assert!(!self.is_finalized());
        self.successful_records += 1;
        self.processed_records += 1;
    }

    /// Record one failed row with its field errors.
    pub fn record_failure(&mut self, errors: Vec<FieldError>) {
        debug_assert!(!self.is_finalized());
        self.failed_records += 1;
        self.processed_records += 1;
        self.errors.extend(errors);
    }

    /// Request cancellation. In-flight rows complete; no new rows start.
    pub fn request_cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_finalized(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Finalize the batch exactly once; later calls are no-ops.
    ///
    /// Status is computed deterministically: `failed` iff nothing
    /// succeeded and there were rows to process; `completed` iff
    /// nothing failed; otherwise `partial`. A cancelled batch always
    /// resolves to `partial`.
    pub fn finalize(&mut self) -> BatchStatus {
        if self.is_finalized() {
            return self.status;
        }
        self.status = if self.cancelled {
            BatchStatus::Partial
        } else if self.successful_records == 0 && self.total_records > 0 {
            BatchStatus::Failed
        } else if self.failed_records == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Partial
        };
        self.completed_at = Some(Utc::now());
        self.status
    }

    /// Fail the whole batch before any row runs (configuration error).
    pub fn fail_before_start(&mut self, error: FieldError) -> BatchStatus {
        if self.is_finalized() {
            return self.status;
        }
        self.errors.push(error);
        self.status = BatchStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.status
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn partner(&self) -> &PartnerId {
        &self.partner
    }

    pub fn initiator(&self) -> &str {
        &self.initiator
    }

    pub fn config_version(&self) -> u32 {
        self.config_version
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn processed_records(&self) -> usize {
        self.processed_records
    }

    pub fn successful_records(&self) -> usize {
        self.successful_records
    }

    pub fn failed_records(&self) -> usize {
        self.failed_records
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The per-batch summary exposed at the boundary.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.id,
            status: self.status,
            total_records: self.total_records,
            processed_records: self.processed_records,
            successful_records: self.successful_records,
            failed_records: self.failed_records,
            errors: self.errors.clone(),
        }
    }
}

/// Boundary output for one finished batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub total_records: usize,
    pub processed_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub errors: Vec<FieldError>,
}

impl BatchSummary {
    /// Share of processed rows that succeeded, as a percentage for
    /// display.
    pub fn success_percent(&self) -> f64 {
        if self.processed_records == 0 {
            return 0.0;
        }
        let pct = Decimal::from(self.successful_records) / Decimal::from(self.processed_records)
            * Decimal::from(100);
        pct.to_string().parse::<f64>().unwrap_or(0.0)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Batch {} ===", self.batch_id)?;
        writeln!(f, "Status:     {}", self.status)?;
        writeln!(f, "Total:      {}", self.total_records)?;
        writeln!(f, "Processed:  {}", self.processed_records)?;
        writeln!(f, "Successful: {}", self.successful_records)?;
        writeln!(f, "Failed:     {}", self.failed_records)?;
        writeln!(f, "Success:    {:.1}%", self.success_percent())?;
        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for err in &self.errors {
                writeln!(f, "  {}", err)?;
            }
        }
        Ok(())
    }
}
