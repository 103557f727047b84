use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a partner bank.
///
/// A partner is the institution whose scoring configuration and lending
/// policy govern the evaluation of a batch. Every batch is processed
/// under exactly one partner's active configuration.
///
/// # Examples
///
/// ```
/// use lending_engine::core::partner::PartnerId;
///
/// let acme = PartnerId::new("ACME-BANK");
/// let metro = PartnerId::new("METRO-CU");
/// assert_ne!(acme, metro);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(String);

impl PartnerId {
    /// Create a new partner identifier.
    ///
    /// Convention: institution short code in upper kebab case
    /// (e.g., "ACME-BANK", "METRO-CU").
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this partner ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartnerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier for a loan applicant.
///
/// Derived from the applicant's identity fields at import time (email is
/// the primary key in canonical records). Used to key the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(String);

impl ApplicantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApplicantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
