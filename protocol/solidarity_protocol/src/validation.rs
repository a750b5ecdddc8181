//! Input validation for items, aid requests and events.
//!
//! Constructors here take the raw, possibly incomplete input an API caller
//! sent and either return a fully-populated value or a
//! [`ProtocolError::Validation`]. Nothing in this module touches storage.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::{ProtocolError, Result};
use crate::money::to_cents;
use crate::types::{Category, EventStatus, Urgency};

/// Admission cap: pending requests a single beneficiary may hold at once.
pub const MAX_PENDING_REQUESTS: i64 = 3;

/// Trimmed, non-empty text or `None` when the input is absent or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| ProtocolError::validation(message))
}

/// A replacement text field must not be blank when supplied.
fn replacement(value: Option<String>, field: &str) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) => non_blank(Some(v))
            .map(Some)
            .ok_or_else(|| ProtocolError::validation(format!("{field} cannot be empty"))),
    }
}

fn positive_quantity(quantity: i64) -> Result<i64> {
    if quantity <= 0 {
        return Err(ProtocolError::validation("quantity must be greater than zero"));
    }
    Ok(quantity)
}

// ─────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub category: Category,
}

impl NewItem {
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        quantity: Option<i64>,
        category: Option<Category>,
    ) -> Result<Self> {
        const MISSING: &str = "name, description, quantity and category are required";
        let name = required(name, MISSING)?;
        let description = required(description, MISSING)?;
        let quantity = quantity.ok_or_else(|| ProtocolError::validation(MISSING))?;
        let category = category.ok_or_else(|| ProtocolError::validation(MISSING))?;
        Ok(Self {
            name,
            description,
            quantity: positive_quantity(quantity)?,
            category,
        })
    }
}

/// Owner edits to an item. Status is deliberately absent: it only moves
/// through reservation and delivery approval.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub category: Option<Category>,
}

impl ItemChanges {
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        quantity: Option<i64>,
        category: Option<Category>,
    ) -> Result<Self> {
        Ok(Self {
            name: replacement(name, "name")?,
            description: replacement(description, "description")?,
            quantity: quantity.map(positive_quantity).transpose()?,
            category,
        })
    }
}

// ─────────────────────────────────────────────────────────
// Aid requests
// ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub urgency: Urgency,
}

impl NewRequest {
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        category: Option<Category>,
        urgency: Option<Urgency>,
    ) -> Result<Self> {
        const MISSING: &str = "title, description, category and urgency are required";
        Ok(Self {
            title: required(title, MISSING)?,
            description: required(description, MISSING)?,
            category: category.ok_or_else(|| ProtocolError::validation(MISSING))?,
            urgency: urgency.ok_or_else(|| ProtocolError::validation(MISSING))?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
}

impl RequestChanges {
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        category: Option<Category>,
        urgency: Option<Urgency>,
    ) -> Result<Self> {
        Ok(Self {
            title: replacement(title, "title")?,
            description: replacement(description, "description")?,
            category,
            urgency,
        })
    }
}

// ─────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────

/// `end` must fall strictly after `start`.
pub fn validate_schedule(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end <= start {
        return Err(ProtocolError::validation(
            "end date must be after the start date",
        ));
    }
    Ok(())
}

/// A start date may be today but never in the past.
pub fn validate_start_not_past(start: NaiveDate, today: NaiveDate) -> Result<()> {
    if start < today {
        return Err(ProtocolError::validation(
            "start date cannot be earlier than today",
        ));
    }
    Ok(())
}

fn goal_items(goal: i64) -> Result<i64> {
    if goal <= 0 {
        return Err(ProtocolError::validation(
            "item goal must be greater than zero",
        ));
    }
    Ok(goal)
}

/// Validated event contents, also used as the merge target for edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_amount_cents: Option<i64>,
    pub goal_items: Option<i64>,
    pub status: EventStatus,
}

impl EventDraft {
    /// Validate a brand-new event created on `today`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        goal_amount: Option<Decimal>,
        goal_item_count: Option<i64>,
        today: NaiveDate,
    ) -> Result<Self> {
        const MISSING: &str = "title, description, start date and end date are required";
        let title = required(title, MISSING)?;
        let description = required(description, MISSING)?;
        let start_date = start_date.ok_or_else(|| ProtocolError::validation(MISSING))?;
        let end_date = end_date.ok_or_else(|| ProtocolError::validation(MISSING))?;

        validate_start_not_past(start_date, today)?;
        validate_schedule(start_date, end_date)?;

        Ok(Self {
            title,
            description,
            start_date,
            end_date,
            goal_amount_cents: goal_amount.map(|a| to_cents(a, "goal amount")).transpose()?,
            goal_items: goal_item_count.map(goal_items).transpose()?,
            status: EventStatus::Active,
        })
    }

    /// Merge `changes` into this draft and re-validate the result.
    ///
    /// A start date is only checked against `today` when it actually moves,
    /// so an organization can still edit an event that has already begun.
    pub fn apply(self, changes: EventChanges, today: NaiveDate) -> Result<Self> {
        let title = replacement(changes.title, "title")?.unwrap_or(self.title);
        let description =
            replacement(changes.description, "description")?.unwrap_or(self.description);

        let start_date = match changes.start_date {
            Some(start) if start != self.start_date => {
                validate_start_not_past(start, today)?;
                start
            }
            _ => self.start_date,
        };
        let end_date = changes.end_date.unwrap_or(self.end_date);
        validate_schedule(start_date, end_date)?;

        let status = match changes.status {
            Some(next) if next != self.status => {
                if !self.status.can_transition_to(next) {
                    return Err(ProtocolError::state_conflict(format!(
                        "event cannot move from {} to {}",
                        self.status, next
                    )));
                }
                next
            }
            _ => self.status,
        };

        let goal_amount_cents = match changes.goal_amount {
            Some(amount) => Some(to_cents(amount, "goal amount")?),
            None => self.goal_amount_cents,
        };
        let goal_items = match changes.goal_items {
            Some(goal) => Some(goal_items(goal)?),
            None => self.goal_items,
        };

        Ok(Self {
            title,
            description,
            start_date,
            end_date,
            goal_amount_cents,
            goal_items,
            status,
        })
    }
}

/// Partial edit of an event; `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub goal_amount: Option<Decimal>,
    pub goal_items: Option<i64>,
    pub status: Option<EventStatus>,
}

// ─────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Profile {
    pub fn new(name: Option<String>, phone: Option<String>, address: Option<String>) -> Result<Self> {
        Ok(Self {
            name: required(name, "name is required")?,
            phone: non_blank(phone),
            address: non_blank(address),
        })
    }
}

/// Lower-cased address with a single `@` and non-empty local/domain parts.
pub fn normalize_email(email: Option<String>) -> Result<String> {
    let email = required(email, "email is required")?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(ProtocolError::validation("email address is not valid")),
    }
}
