//! # Pledges
//!
//! A pledge is an append-only donation record against an event. It carries an
//! amount, an item description, or both, and moves the event's running totals
//! by exactly what it carries:
//!
//! | Pledge contents      | `current_amount` | `current_items` |
//! |----------------------|------------------|-----------------|
//! | amount only          | `+ amount`       | unchanged       |
//! | description only     | unchanged        | `+ 1`           |
//! | amount + description | `+ amount`       | `+ 1`           |
//!
//! Goals are advisory: totals keep growing after a goal is met.

use rust_decimal::Decimal;

use crate::errors::{ProtocolError, Result};
use crate::money::to_cents;
use crate::validation::non_blank;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pledge {
    amount_cents: Option<i64>,
    items_description: Option<String>,
}

impl Pledge {
    /// A blank description counts as absent; an amount, when given, must be
    /// strictly positive.
    pub fn new(amount: Option<Decimal>, items_description: Option<String>) -> Result<Self> {
        let items_description = non_blank(items_description);
        if amount.is_none() && items_description.is_none() {
            return Err(ProtocolError::validation(
                "a donation needs an amount or an item description",
            ));
        }
        let amount_cents = amount
            .map(|a| to_cents(a, "donation amount"))
            .transpose()?;
        Ok(Self {
            amount_cents,
            items_description,
        })
    }

    pub fn amount_cents(&self) -> Option<i64> {
        self.amount_cents
    }

    pub fn items_description(&self) -> Option<&str> {
        self.items_description.as_deref()
    }

    /// Increment applied to the event's `current_amount` (in cents).
    pub fn amount_delta(&self) -> i64 {
        self.amount_cents.unwrap_or(0)
    }

    /// Increment applied to the event's `current_items`: donations are
    /// counted, not item quantities.
    pub fn items_delta(&self) -> i64 {
        i64::from(self.items_description.is_some())
    }
}

/// Running totals of an event, in storage units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub amount_cents: i64,
    pub items: i64,
}

impl Totals {
    /// Totals after `pledge`. Refused when either total would overflow.
    pub fn apply(self, pledge: &Pledge) -> Result<Self> {
        let amount_cents = self.amount_cents.checked_add(pledge.amount_delta());
        let items = self.items.checked_add(pledge.items_delta());
        match (amount_cents, items) {
            (Some(amount_cents), Some(items)) => Ok(Self {
                amount_cents,
                items,
            }),
            _ => Err(ProtocolError::validation(
                "this donation would overflow the event's running totals",
            )),
        }
    }
}
