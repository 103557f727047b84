use crate::core::record::{CanonicalDraft, RawRecord};
use crate::error::FieldError;
use crate::mapping::profile::{CanonicalField, MappingProfile, TransformedValue};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Resolve one raw row into a canonical draft under a mapping profile.
///
/// Pure and deterministic: the same (row, profile, as_of) triple always
/// yields the same result, which makes retries and mapping previews
/// safe. Unknown source columns are ignored. All problems for the row
/// are collected in one pass; a missing required field never aborts
/// the batch, only this row.
pub fn resolve(
    raw: &RawRecord,
    profile: &MappingProfile,
    as_of: NaiveDate,
) -> Result<CanonicalDraft, Vec<FieldError>> {
    let mut draft = CanonicalDraft::default();
    let mut errors = Vec::new();

    for mapping in &profile.fields {
        let cell = match raw.get(&mapping.source) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                if mapping.required {
                    errors.push(FieldError::new(
                        mapping.target.label(),
                        format!("missing required field (source column '{}')", mapping.source),
                    ));
                }
                continue;
            }
        };

        match mapping.transform.apply(cell, as_of) {
            Ok(value) => {
                if let Err(err) = assign(&mut draft, mapping.target, value) {
                    errors.push(err.with_value(cell));
                }
            }
            Err(message) => {
                errors.push(
                    FieldError::new(mapping.target.label(), message).with_value(cell),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(draft)
    } else {
        Err(errors)
    }
}

/// Place a transformed value into its slot in the draft, coercing text
/// to numbers where the target is numeric.
fn assign(
    draft: &mut CanonicalDraft,
    target: CanonicalField,
    value: TransformedValue,
) -> Result<(), FieldError> {
    match target {
        CanonicalField::Email => draft.email = Some(expect_text(value)),
        CanonicalField::NationalId => draft.national_id = Some(expect_text(value)),
        CanonicalField::Phone => draft.phone = Some(expect_text(value)),
        CanonicalField::PaymentHistory => {
            draft.payment_history = Some(expect_number(target, value)?)
        }
        CanonicalField::CreditUtilization => {
            draft.credit_utilization = Some(expect_number(target, value)?)
        }
        CanonicalField::CreditAge => draft.credit_age = Some(expect_number(target, value)?),
        CanonicalField::CreditMix => draft.credit_mix = Some(expect_number(target, value)?),
        CanonicalField::Inquiries => draft.inquiries = Some(expect_number(target, value)?),
        CanonicalField::MonthlyIncome => {
            draft.monthly_income = Some(expect_number(target, value)?)
        }
        CanonicalField::MonthlyDebt => draft.monthly_debt = Some(expect_number(target, value)?),
        CanonicalField::Defaults24m => draft.defaults_24m = Some(expect_count(target, value)?),
        CanonicalField::MissedPayments12m => {
            draft.missed_payments_12m = Some(expect_count(target, value)?)
        }
        CanonicalField::Inquiries6m => draft.inquiries_6m = Some(expect_count(target, value)?),
        CanonicalField::OldestAccountMonths => {
            draft.oldest_account_months = Some(expect_count(target, value)?)
        }
        CanonicalField::EmploymentMonths => {
            draft.employment_months = Some(expect_count(target, value)?)
        }
        CanonicalField::SavingsRate => draft.savings_rate = Some(expect_number(target, value)?),
        CanonicalField::CollateralValue => {
            draft.collateral_value = Some(expect_number(target, value)?)
        }
    }
    Ok(())
}

fn expect_text(value: TransformedValue) -> String {
    match value {
        TransformedValue::Text(s) => s,
        TransformedValue::Number(n) => n.to_string(),
        TransformedValue::Months(m) => m.to_string(),
    }
}

fn expect_number(target: CanonicalField, value: TransformedValue) -> Result<Decimal, FieldError> {
    match value {
        TransformedValue::Number(n) => Ok(n),
        TransformedValue::Months(m) => Ok(Decimal::from(m)),
        TransformedValue::Text(s) => s.trim().parse::<Decimal>().map_err(|_| {
            FieldError::new(target.label(), format!("expected a number, got '{}'", s))
        }),
    }
}

fn expect_count(target: CanonicalField, value: TransformedValue) -> Result<u32, FieldError> {
    match value {
        TransformedValue::Months(m) => Ok(m),
        TransformedValue::Number(n) => count_from_decimal(target, n),
        TransformedValue::Text(s) => {
            let n: Decimal = s.trim().parse().map_err(|_| {
                FieldError::new(target.label(), format!("expected a count, got '{}'", s))
            })?;
            count_from_decimal(target, n)
        }
    }
}

fn count_from_decimal(target: CanonicalField, n: Decimal) -> Result<u32, FieldError> {
    if n < Decimal::ZERO || n.fract() != Decimal::ZERO {
        return Err(FieldError::new(
            target.label(),
            format!("expected a non-negative whole number, got '{}'", n),
        ));
    }
    n.to_u32()
        .ok_or_else(|| FieldError::new(target.label(), format!("count '{}' out of range", n)))
}
