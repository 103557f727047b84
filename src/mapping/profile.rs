use crate::core::partner::PartnerId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of canonical target fields a mapping may populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Email,
    NationalId,
    Phone,
    PaymentHistory,
    CreditUtilization,
    CreditAge,
    CreditMix,
    Inquiries,
    MonthlyIncome,
    MonthlyDebt,
    Defaults24m,
    MissedPayments12m,
    Inquiries6m,
    OldestAccountMonths,
    EmploymentMonths,
    SavingsRate,
    CollateralValue,
}

impl CanonicalField {
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::Email => "email",
            CanonicalField::NationalId => "national_id",
            CanonicalField::Phone => "phone",
            CanonicalField::PaymentHistory => "payment_history",
            CanonicalField::CreditUtilization => "credit_utilization",
            CanonicalField::CreditAge => "credit_age",
            CanonicalField::CreditMix => "credit_mix",
            CanonicalField::Inquiries => "inquiries",
            CanonicalField::MonthlyIncome => "monthly_income",
            CanonicalField::MonthlyDebt => "monthly_debt",
            CanonicalField::Defaults24m => "defaults_24m",
            CanonicalField::MissedPayments12m => "missed_payments_12m",
            CanonicalField::Inquiries6m => "inquiries_6m",
            CanonicalField::OldestAccountMonths => "oldest_account_months",
            CanonicalField::EmploymentMonths => "employment_months",
            CanonicalField::SavingsRate => "savings_rate",
            CanonicalField::CollateralValue => "collateral_value",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Intermediate value produced by applying a transform to raw cell text.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformedValue {
    Text(String),
    Number(Decimal),
    /// Whole months, produced by the date transform relative to `as_of`.
    Months(u32),
}

/// The closed set of value transforms.
///
/// Transforms are pure: same input text and `as_of` date, same output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Pass the cell text through unchanged.
    Identity,
    /// Strip non-digits; a local `0` prefix becomes the country code.
    Phone { country_code: String },
    /// Strip currency symbols and thousands separators, parse a number.
    Currency,
    /// Parse a number; values above 1 are treated as percent and
    /// divided by 100.
    Percentage,
    /// Parse a calendar date and convert to whole months before
    /// `as_of`. Fails closed on unparseable input.
    Date,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

impl Transform {
    /// Apply this transform to one cell. Errors are plain messages;
    /// the resolver wraps them into field errors with context.
    pub fn apply(&self, value: &str, as_of: NaiveDate) -> Result<TransformedValue, String> {
        let value = value.trim();
        match self {
            Transform::Identity => Ok(TransformedValue::Text(value.to_string())),
            Transform::Phone { country_code } => {
                let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return Err("no digits in phone value".to_string());
                }
                let normalized = match digits.strip_prefix('0') {
                    Some(rest) => format!("{}{}", country_code, rest),
                    None => digits,
                };
                Ok(TransformedValue::Text(normalized))
            }
            Transform::Currency => {
                let cleaned: String = value
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                cleaned
                    .parse::<Decimal>()
                    .map(TransformedValue::Number)
                    .map_err(|_| format!("not a currency amount: '{}'", value))
            }
            Transform::Percentage => {
                let cleaned = value.trim_end_matches('%').trim();
                let number: Decimal = cleaned
                    .parse()
                    .map_err(|_| format!("not a percentage: '{}'", value))?;
                let ratio = if number > Decimal::ONE {
                    number / dec!(100)
                } else {
                    number
                };
                Ok(TransformedValue::Number(ratio))
            }
            Transform::Date => {
                let date = DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                    .ok_or_else(|| format!("unparseable date: '{}'", value))?;
                if date > as_of {
                    return Err(format!("date '{}' is in the future", value));
                }
                let months = (as_of.years_since(date).unwrap_or(0) * 12)
                    + months_within_year(date, as_of);
                Ok(TransformedValue::Months(months))
            }
        }
    }
}

/// Residual months after whole years between `from` and `to`.
fn months_within_year(from: NaiveDate, to: NaiveDate) -> u32 {
    use chrono::Datelike;
    let years = to.years_since(from).unwrap_or(0);
    let total_months = (to.year() - from.year()) as i64 * 12 + (to.month() as i64 - from.month() as i64);
    let residual = total_months - (years as i64 * 12);
    residual.clamp(0, 11) as u32
}

/// One mapping from a source column to a canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub target: CanonicalField,
    /// Source column name exactly as it appears in the upload.
    pub source: String,
    pub transform: Transform,
    pub required: bool,
}

/// Versioned, per-partner mapping profile, reusable across uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingProfile {
    pub partner: PartnerId,
    pub version: u32,
    pub fields: Vec<FieldMapping>,
}

impl MappingProfile {
    /// A profile matching the conventional canonical column headers,
    /// useful for exports that already use our names.
    pub fn standard(partner: PartnerId) -> Self {
        let req = |target: CanonicalField, source: &str| FieldMapping {
            target,
            source: source.to_string(),
            transform: Transform::Identity,
            required: true,
        };
        let opt = |target: CanonicalField, source: &str, transform: Transform| FieldMapping {
            target,
            source: source.to_string(),
            transform,
            required: false,
        };
        Self {
            partner,
            version: 1,
            fields: vec![
                req(CanonicalField::Email, "email"),
                opt(CanonicalField::NationalId, "national_id", Transform::Identity),
                opt(
                    CanonicalField::Phone,
                    "phone",
                    Transform::Phone {
                        country_code: "1".to_string(),
                    },
                ),
                req(CanonicalField::PaymentHistory, "payment_history"),
                req(CanonicalField::CreditUtilization, "credit_utilization"),
                req(CanonicalField::CreditAge, "credit_age"),
                req(CanonicalField::CreditMix, "credit_mix"),
                req(CanonicalField::Inquiries, "inquiries"),
                FieldMapping {
                    target: CanonicalField::MonthlyIncome,
                    source: "monthly_income".to_string(),
                    transform: Transform::Currency,
                    required: true,
                },
                FieldMapping {
                    target: CanonicalField::MonthlyDebt,
                    source: "monthly_debt".to_string(),
                    transform: Transform::Currency,
                    required: true,
                },
                opt(CanonicalField::Defaults24m, "defaults_24m", Transform::Identity),
                opt(
                    CanonicalField::MissedPayments12m,
                    "missed_payments_12m",
                    Transform::Identity,
                ),
                opt(CanonicalField::Inquiries6m, "inquiries_6m", Transform::Identity),
                opt(
                    CanonicalField::OldestAccountMonths,
                    "oldest_account_opened",
                    Transform::Date,
                ),
                opt(
                    CanonicalField::EmploymentMonths,
                    "employment_months",
                    Transform::Identity,
                ),
                opt(
                    CanonicalField::SavingsRate,
                    "savings_rate",
                    Transform::Percentage,
                ),
                opt(
                    CanonicalField::CollateralValue,
                    "collateral_value",
                    Transform::Currency,
                ),
            ],
        }
    }
}
