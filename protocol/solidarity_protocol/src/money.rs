//! Monetary amounts: decimals at the edges, integer cents in storage.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::{ProtocolError, Result};

/// Largest single amount accepted anywhere: one billion, in cents.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Convert a strictly positive amount with at most two decimal places to cents.
pub fn to_cents(amount: Decimal, field: &str) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(ProtocolError::validation(format!(
            "{field} must be greater than zero"
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(ProtocolError::validation(format!(
            "{field} cannot have more than two decimal places"
        )));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .filter(|cents| *cents <= MAX_AMOUNT_CENTS)
        .ok_or_else(|| {
            ProtocolError::validation(format!(
                "{field} cannot exceed {}",
                from_cents(MAX_AMOUNT_CENTS)
            ))
        })
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Sum stored amounts without the `i64` ceiling of a SQL `SUM`.
pub fn sum_cents(cents: impl IntoIterator<Item = i64>) -> Decimal {
    cents
        .into_iter()
        .fold(Decimal::ZERO, |total, c| total.saturating_add(from_cents(c)))
}
