//! Records read from the database, request bodies, and response shapes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solidarity_protocol::money::from_cents;
use solidarity_protocol::{
    Category, EventStatus, ItemStatus, RequestStatus, Role, Urgency,
};

// ─────────────────────────────────────────────────────────
// Response envelope
// ─────────────────────────────────────────────────────────

/// Every response body: a success flag, an optional human-readable message,
/// and the resulting entity on success.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileBody {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Registration {
    pub user: User,
    pub token: String,
}

/// A freshly signed bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
}

// ─────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    #[sqlx(try_from = "String")]
    pub category: Category,
    #[sqlx(try_from = "String")]
    pub status: ItemStatus,
    pub donor_id: i64,
    pub donor_name: Option<String>,
    pub beneficiary_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryBreakdown {
    #[sqlx(try_from = "String")]
    pub category: Category,
    pub count: i64,
    pub delivered: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemTotals {
    pub total_items: i64,
    pub available_items: i64,
    pub reserved_items: i64,
    pub delivered_items: i64,
    pub total_donors: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemStats {
    pub general: ItemTotals,
    pub by_category: Vec<CategoryBreakdown>,
}

// ─────────────────────────────────────────────────────────
// Aid requests
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AidRequest {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: Category,
    #[sqlx(try_from = "String")]
    pub urgency: Urgency,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub beneficiary_id: i64,
    pub beneficiary_name: Option<String>,
    pub approved_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub urgency: Option<Urgency>,
    pub category: Option<Category>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestTotals {
    pub total_requests: i64,
    pub pending_requests: i64,
    pub approved_requests: i64,
    pub rejected_requests: i64,
    pub total_beneficiaries: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UrgencyBreakdown {
    #[sqlx(try_from = "String")]
    pub urgency: Urgency,
    pub count: i64,
    pub approved: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestCategoryBreakdown {
    #[sqlx(try_from = "String")]
    pub category: Category,
    pub count: i64,
    pub approved: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestStats {
    pub general: RequestTotals,
    pub by_urgency: Vec<UrgencyBreakdown>,
    pub by_category: Vec<RequestCategoryBreakdown>,
}

// ─────────────────────────────────────────────────────────
// Events and pledges
// ─────────────────────────────────────────────────────────

/// An event row as stored, money in cents.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_amount_cents: Option<i64>,
    pub goal_items: Option<i64>,
    pub current_amount_cents: i64,
    pub current_items: i64,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub organization_id: i64,
    pub organization_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goal_amount: Option<Decimal>,
    pub goal_items: Option<i64>,
    pub current_amount: Decimal,
    pub current_items: i64,
    pub status: EventStatus,
    pub organization_id: i64,
    pub organization_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<EventRecord> for Event {
    fn from(r: EventRecord) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            start_date: r.start_date,
            end_date: r.end_date,
            goal_amount: r.goal_amount_cents.map(from_cents),
            goal_items: r.goal_items,
            current_amount: from_cents(r.current_amount_cents),
            current_items: r.current_items,
            status: r.status,
            organization_id: r.organization_id,
            organization_name: r.organization_name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// An event together with its pledge ledger, newest pledge first.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub donations: Vec<Donation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub goal_amount: Option<Decimal>,
    pub goal_items: Option<i64>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DonationBody {
    pub amount: Option<Decimal>,
    pub items_description: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DonationRecord {
    pub id: i64,
    pub event_id: i64,
    pub donor_id: i64,
    pub donor_name: Option<String>,
    pub amount_cents: Option<i64>,
    pub items_description: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub event_id: i64,
    pub donor_id: i64,
    pub donor_name: Option<String>,
    pub amount: Option<Decimal>,
    pub items_description: Option<String>,
    pub created_at: i64,
}

impl From<DonationRecord> for Donation {
    fn from(r: DonationRecord) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            donor_id: r.donor_id,
            donor_name: r.donor_name,
            amount: r.amount_cents.map(from_cents),
            items_description: r.items_description,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventTotals {
    pub total_events: i64,
    pub active_events: i64,
    pub finished_events: i64,
    pub cancelled_events: i64,
    pub total_organizations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationTotals {
    pub total_donations: i64,
    pub total_amount: Decimal,
    pub total_donors: i64,
    pub events_with_donations: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventStats {
    pub events: EventTotals,
    pub donations: DonationTotals,
}

// ─────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ReportPeriod {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserTotals {
    pub total_users: i64,
    pub total_donors: i64,
    pub total_beneficiaries: i64,
    pub total_organizations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReportTotals {
    pub total_events: i64,
    pub active_events: i64,
    pub finished_events: i64,
    pub total_amount_raised: Decimal,
    pub total_items_raised: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopDonor {
    pub id: i64,
    pub name: String,
    pub items_donated: i64,
    pub items_delivered: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneralReport {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub users: UserTotals,
    pub items: ItemTotals,
    pub requests: RequestTotals,
    pub events: EventReportTotals,
    pub items_by_category: Vec<CategoryBreakdown>,
    pub requests_by_urgency: Vec<UrgencyBreakdown>,
    pub top_donors: Vec<TopDonor>,
}

/// Activity of users grouped by the first segment of their address.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegionImpact {
    pub region: String,
    pub users: i64,
    pub items_donated: i64,
    pub requests_made: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyGrowth {
    /// `YYYY-MM`, UTC.
    pub month: String,
    pub new_users: i64,
    pub new_donors: i64,
    pub new_beneficiaries: i64,
}

/// Time from listing to delivery for delivered items.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryEfficiency {
    pub avg_delivery_time_days: Option<f64>,
    pub fast_deliveries: i64,
    pub slow_deliveries: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImpactReport {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub by_region: Vec<RegionImpact>,
    pub monthly_growth: Vec<MonthlyGrowth>,
    pub delivery_efficiency: DeliveryEfficiency,
}
