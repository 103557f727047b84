use crate::core::partner::ApplicantId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One raw uploaded row: an opaque map of source column name to cell text.
///
/// This is the only shape the engine accepts from file parsers. Column
/// names are whatever the partner's upload happened to use; nothing
/// downstream of the field-mapping resolver ever sees these keys.
///
/// # Examples
///
/// ```
/// use lending_engine::core::record::RawRecord;
///
/// let mut raw = RawRecord::new();
/// raw.set("E-Mail Address", "jane@example.com");
/// raw.set("Monthly Salary", "$4,200.00");
/// assert_eq!(raw.get("E-Mail Address"), Some("jane@example.com"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, String)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Canonical record as produced by the field-mapping resolver,
/// before validation.
///
/// Every field is optional: the resolver fills in what it could map and
/// parse, and the validation layer decides whether the result is usable.
/// Values are already typed (the resolver owns all string parsing).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalDraft {
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    /// Scoring inputs, each normalized to [0, 1] by the upstream exporter.
    pub payment_history: Option<Decimal>,
    pub credit_utilization: Option<Decimal>,
    pub credit_age: Option<Decimal>,
    pub credit_mix: Option<Decimal>,
    pub inquiries: Option<Decimal>,
    /// Raw financial facts.
    pub monthly_income: Option<Decimal>,
    pub monthly_debt: Option<Decimal>,
    pub defaults_24m: Option<u32>,
    pub missed_payments_12m: Option<u32>,
    pub inquiries_6m: Option<u32>,
    pub oldest_account_months: Option<u32>,
    pub employment_months: Option<u32>,
    pub savings_rate: Option<Decimal>,
    pub collateral_value: Option<Decimal>,
}

/// A validated canonical credit record, ready for scoring.
///
/// Construction goes through the validation layer, which guarantees:
/// the five scoring inputs lie in [0, 1], counters are non-negative,
/// identity fields are well-formed, and `monthly_income` is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub email: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub payment_history: Decimal,
    pub credit_utilization: Decimal,
    pub credit_age: Decimal,
    pub credit_mix: Decimal,
    pub inquiries: Decimal,
    pub monthly_income: Decimal,
    pub monthly_debt: Decimal,
    pub defaults_24m: u32,
    pub missed_payments_12m: u32,
    pub inquiries_6m: u32,
    pub oldest_account_months: u32,
    pub employment_months: u32,
    pub savings_rate: Decimal,
    pub collateral_value: Decimal,
}

impl CreditRecord {
    /// The applicant identity key for the audit trail.
    pub fn applicant_id(&self) -> ApplicantId {
        ApplicantId::new(self.email.clone())
    }

    /// Debt-to-income ratio: monthly debt payments over monthly income.
    ///
    /// `monthly_income` is guaranteed positive by validation, so this
    /// is always defined.
    pub fn dti(&self) -> Decimal {
        self.monthly_debt / self.monthly_income
    }

    /// Whether the applicant attached any collateral.
    pub fn has_collateral(&self) -> bool {
        self.collateral_value > Decimal::ZERO
    }
}

/// Processing status of one imported row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Processed,
    Error,
}
