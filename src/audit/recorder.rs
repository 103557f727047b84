use crate::core::decision::{Decision, OfferTerms, Outcome, OverrideError};
use crate::core::partner::ApplicantId;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable entry in the decision audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    id: Uuid,
    applicant: ApplicantId,
    batch_id: Option<Uuid>,
    /// "system" for automated decisions, otherwise the overriding actor.
    actor: String,
    decision: Decision,
    /// Back-reference to the audit entry this one corrects.
    supersedes: Option<Uuid>,
    recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn applicant(&self) -> &ApplicantId {
        &self.applicant
    }

    pub fn batch_id(&self) -> Option<Uuid> {
        self.batch_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    pub fn supersedes(&self) -> Option<Uuid> {
        self.supersedes
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Append-only audit log of every automated and overridden decision.
///
/// Entries are never deleted or edited; corrections append a new entry
/// with a `supersedes` back-reference. Decisions are retained here even
/// if the source credit record is later purged.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

pub const SYSTEM_ACTOR: &str = "system";

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an automated decision. Returns the entry ID.
    pub fn record_decision(&mut self, decision: Decision) -> Uuid {
        let id = Uuid::new_v4();
        debug!(
            "audit: recording {} decision for {}",
            decision.outcome(),
            decision.applicant()
        );
        self.entries.push(AuditEntry {
            id,
            applicant: decision.applicant().clone(),
            batch_id: decision.batch_id(),
            actor: SYSTEM_ACTOR.to_string(),
            decision,
            supersedes: None,
            recorded_at: Utc::now(),
        });
        id
    }

    /// Apply a manual override to a previously recorded decision.
    ///
    /// The override is validated by the decision state machine
    /// (justification and actor are mandatory, and only manual-review
    /// or auto-rejected decisions can move). On success a new entry is
    /// appended referencing the superseded one; the original entry is
    /// untouched.
    pub fn record_override(
        &mut self,
        original_entry: Uuid,
        outcome: Outcome,
        actor: impl Into<String>,
        justification: impl Into<String>,
        offer: Option<OfferTerms>,
    ) -> Result<&AuditEntry, OverrideError> {
        let actor = actor.into();
        let justification = justification.into();

        let original = self
            .entries
            .iter()
            .find(|e| e.id == original_entry)
            .ok_or(OverrideError::UnknownEntry(original_entry))?;

        let overridden =
            original
                .decision
                .override_to(outcome, actor.clone(), justification, offer)?;

        info!(
            "audit: {} overrode decision for {} to {}",
            actor,
            overridden.applicant(),
            outcome
        );
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            applicant: overridden.applicant().clone(),
            batch_id: overridden.batch_id(),
            actor,
            decision: overridden,
            supersedes: Some(original_entry),
            recorded_at: Utc::now(),
        };
        self.entries.push(entry);
        Ok(self.entries.last().expect("just pushed"))
    }

    // --- Queries ---

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_applicant(&self, applicant: &ApplicantId) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| &e.applicant == applicant)
            .collect()
    }

    pub fn by_batch(&self, batch_id: Uuid) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.batch_id == Some(batch_id))
            .collect()
    }

    pub fn by_actor(&self, actor: &str) -> Vec<&AuditEntry> {
        self.entries.iter().filter(|e| e.actor == actor).collect()
    }

    pub fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.recorded_at >= from && e.recorded_at <= to)
            .collect()
    }

    /// The latest (controlling) entry for an applicant: the most recent
    /// one not superseded by a later entry.
    pub fn latest_for(&self, applicant: &ApplicantId) -> Option<&AuditEntry> {
        let superseded: Vec<Uuid> = self
            .entries
            .iter()
            .filter_map(|e| e.supersedes)
            .collect();
        self.entries
            .iter()
            .rev()
            .find(|e| &e.applicant == applicant && !superseded.contains(&e.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decision::{DecisionReason, ScoreBreakdown};
    use rust_decimal_macros::dec;

    fn sample_decision(outcome: Outcome) -> Decision {
        Decision::automated(
            ApplicantId::new("jane@example.com"),
            Some(Uuid::new_v4()),
            1,
            dec!(610),
            None,
            ScoreBreakdown::new(),
            outcome,
            None,
            vec![DecisionReason::HighDti],
        )
    }

    #[test]
    fn test_record_and_query_by_applicant() {
        let mut log = AuditLog::new();
        log.record_decision(sample_decision(Outcome::Approved));
        log.record_decision(sample_decision(Outcome::Rejected));
        let jane = ApplicantId::new("jane@example.com");
        assert_eq!(log.by_applicant(&jane).len(), 2);
        assert!(log.by_applicant(&ApplicantId::new("nobody@x.com")).is_empty());
    }

    #[test]
    fn test_query_by_batch() {
        let mut log = AuditLog::new();
        let decision = sample_decision(Outcome::Approved);
        let batch_id = decision.batch_id().unwrap();
        log.record_decision(decision);
        assert_eq!(log.by_batch(batch_id).len(), 1);
        assert!(log.by_batch(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_override_appends_with_back_reference() {
        let mut log = AuditLog::new();
        let entry_id = log.record_decision(sample_decision(Outcome::ManualReview));
        let overridden = log
            .record_override(
                entry_id,
                Outcome::Approved,
                "analyst-7",
                "verified income docs",
                None,
            )
            .unwrap();
        assert_eq!(overridden.supersedes(), Some(entry_id));
        assert_eq!(overridden.actor(), "analyst-7");
        // Original entry untouched; log grew by one.
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].decision().outcome(), Outcome::ManualReview);
    }

    #[test]
    fn test_override_requires_justification() {
        let mut log = AuditLog::new();
        let entry_id = log.record_decision(sample_decision(Outcome::ManualReview));
        let result = log.record_override(entry_id, Outcome::Approved, "analyst-7", "", None);
        assert!(result.is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_latest_for_follows_supersession() {
        let mut log = AuditLog::new();
        let entry_id = log.record_decision(sample_decision(Outcome::ManualReview));
        log.record_override(entry_id, Outcome::Approved, "analyst-7", "docs checked", None)
            .unwrap();
        let jane = ApplicantId::new("jane@example.com");
        let latest = log.latest_for(&jane).unwrap();
        assert_eq!(latest.decision().outcome(), Outcome::Approved);
        assert!(latest.decision().is_manual());
    }

    #[test]
    fn test_query_by_actor() {
        let mut log = AuditLog::new();
        let entry_id = log.record_decision(sample_decision(Outcome::ManualReview));
        log.record_override(entry_id, Outcome::Rejected, "analyst-7", "insufficient docs", None)
            .unwrap();
        assert_eq!(log.by_actor(SYSTEM_ACTOR).len(), 1);
        assert_eq!(log.by_actor("analyst-7").len(), 1);
    }

    #[test]
    fn test_date_range_query() {
        let mut log = AuditLog::new();
        log.record_decision(sample_decision(Outcome::Approved));
        let now = Utc::now();
        let hour = chrono::Duration::hours(1);
        assert_eq!(log.in_range(now - hour, now + hour).len(), 1);
        assert!(log.in_range(now + hour, now + hour + hour).is_empty());
    }
}
