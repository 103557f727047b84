//! Validation layer: canonical drafts to scoring-ready records.
//!
//! Every rule for a row is checked in one pass so the caller can report
//! all problems at once; validation never fails fast on the first error.

use crate::core::record::{CanonicalDraft, CreditRecord};
use crate::error::FieldError;
use rust_decimal::Decimal;

/// Validate a canonical draft into a `CreditRecord`.
///
/// Guarantees on success: the five scoring inputs lie in [0, 1],
/// counters are present or defaulted to zero, identity fields are
/// well-formed, and monthly income is positive.
pub fn validate(draft: CanonicalDraft) -> Result<CreditRecord, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = match &draft.email {
        Some(email) if looks_like_email(email) => Some(email.clone()),
        Some(email) => {
            errors.push(
                FieldError::new("email", "not a valid email address").with_value(email.clone()),
            );
            None
        }
        None => {
            errors.push(FieldError::new("email", "missing required field"));
            None
        }
    };

    if let Some(phone) = &draft.phone {
        if !looks_like_phone(phone) {
            errors.push(
                FieldError::new("phone", "not a valid phone number").with_value(phone.clone()),
            );
        }
    }

    let payment_history = check_unit_interval(&mut errors, "payment_history", draft.payment_history);
    let credit_utilization =
        check_unit_interval(&mut errors, "credit_utilization", draft.credit_utilization);
    let credit_age = check_unit_interval(&mut errors, "credit_age", draft.credit_age);
    let credit_mix = check_unit_interval(&mut errors, "credit_mix", draft.credit_mix);
    let inquiries = check_unit_interval(&mut errors, "inquiries", draft.inquiries);

    let monthly_income = match draft.monthly_income {
        Some(income) if income > Decimal::ZERO => Some(income),
        Some(income) => {
            errors.push(
                FieldError::new("monthly_income", "must be positive")
                    .with_value(income.to_string()),
            );
            None
        }
        None => {
            errors.push(FieldError::new("monthly_income", "missing required field"));
            None
        }
    };

    let monthly_debt = match draft.monthly_debt {
        Some(debt) if debt >= Decimal::ZERO => Some(debt),
        Some(debt) => {
            errors.push(
                FieldError::new("monthly_debt", "must not be negative")
                    .with_value(debt.to_string()),
            );
            None
        }
        None => {
            errors.push(FieldError::new("monthly_debt", "missing required field"));
            None
        }
    };

    let savings_rate = match draft.savings_rate {
        Some(rate) if (Decimal::ZERO..=Decimal::ONE).contains(&rate) => rate,
        Some(rate) => {
            errors.push(
                FieldError::new("savings_rate", "must lie in [0, 1]")
                    .with_value(rate.to_string()),
            );
            Decimal::ZERO
        }
        None => Decimal::ZERO,
    };

    let collateral_value = match draft.collateral_value {
        Some(value) if value >= Decimal::ZERO => value,
        Some(value) => {
            errors.push(
                FieldError::new("collateral_value", "must not be negative")
                    .with_value(value.to_string()),
            );
            Decimal::ZERO
        }
        None => Decimal::ZERO,
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    // Unwraps are safe: every None pushed an error above.
    Ok(CreditRecord {
        email: email.unwrap(),
        national_id: draft.national_id,
        phone: draft.phone,
        payment_history: payment_history.unwrap(),
        credit_utilization: credit_utilization.unwrap(),
        credit_age: credit_age.unwrap(),
        credit_mix: credit_mix.unwrap(),
        inquiries: inquiries.unwrap(),
        monthly_income: monthly_income.unwrap(),
        monthly_debt: monthly_debt.unwrap(),
        defaults_24m: draft.defaults_24m.unwrap_or(0),
        missed_payments_12m: draft.missed_payments_12m.unwrap_or(0),
        inquiries_6m: draft.inquiries_6m.unwrap_or(0),
        oldest_account_months: draft.oldest_account_months.unwrap_or(0),
        employment_months: draft.employment_months.unwrap_or(0),
        savings_rate,
        collateral_value,
    })
}

fn check_unit_interval(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<Decimal>,
) -> Option<Decimal> {
    match value {
        Some(v) if (Decimal::ZERO..=Decimal::ONE).contains(&v) => Some(v),
        Some(v) => {
            errors.push(
                FieldError::new(field, "scoring input must lie in [0, 1]")
                    .with_value(v.to_string()),
            );
            None
        }
        None => {
            errors.push(FieldError::new(field, "missing required field"));
            None
        }
    }
}

/// Minimal structural email check: one '@', non-empty local part,
/// domain containing a dot.
fn looks_like_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.contains(char::is_whitespace)
}

/// Normalized phones are all digits, 7 to 15 of them.
fn looks_like_phone(s: &str) -> bool {
    let len = s.chars().count();
    (7..=15).contains(&len) && s.chars().all(|c| c.is_ascii_digit())
}
