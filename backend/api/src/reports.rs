//! Read-only aggregate reporting.
//!
//! The general report reuses the aggregate queries of each engine, narrowed
//! to a [`Period`] of creation days when one is given. The impact report
//! looks at where activity happens, how fast the network grows and how long
//! deliveries take.

use chrono::NaiveDate;
use solidarity_protocol::money::sum_cents;
use solidarity_protocol::{authorize, Actor, ItemStatus, Operation, ProtocolError};
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::models::{
    DeliveryEfficiency, EventReportTotals, GeneralReport, ImpactReport, MonthlyGrowth,
    RegionImpact, TopDonor, UserTotals,
};
use crate::{items, requests};

/// Closed range of creation days. The default covers all time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl Period {
    /// A range only applies when both ends are given.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        match (start, end) {
            (Some(start), Some(end)) if start > end => Err(ProtocolError::validation(
                "start date must not be after the end date",
            )
            .into()),
            (Some(start), Some(end)) => Ok(Self {
                start: Some(start),
                end: Some(end),
            }),
            _ => Ok(Self::default()),
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// SQL predicate on a unix-seconds column. Uses parameters `?1` and `?2`,
    /// bound by [`Period::bind_as`].
    pub(crate) fn created_within(column: &str) -> String {
        format!("(?1 IS NULL OR date({column}, 'unixepoch') BETWEEN ?1 AND ?2)")
    }

    pub(crate) fn bind_as<'q, O>(
        &self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
        query.bind(self.start).bind(self.end)
    }
}

#[derive(sqlx::FromRow)]
struct EventRollup {
    total_events: i64,
    active_events: i64,
    finished_events: i64,
}

async fn user_totals(pool: &SqlitePool, period: &Period) -> Result<UserTotals> {
    let sql = format!(
        "SELECT COUNT(*) AS total_users, \
         COALESCE(SUM(role = 'donor'), 0) AS total_donors, \
         COALESCE(SUM(role = 'beneficiary'), 0) AS total_beneficiaries, \
         COALESCE(SUM(role = 'organization'), 0) AS total_organizations \
         FROM users WHERE {}",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_one(pool).await?)
}

async fn event_totals(pool: &SqlitePool, period: &Period) -> Result<EventReportTotals> {
    let sql = format!(
        "SELECT COUNT(*) AS total_events, \
         COALESCE(SUM(status = 'active'), 0) AS active_events, \
         COALESCE(SUM(status = 'finished'), 0) AS finished_events \
         FROM events WHERE {}",
        Period::created_within("created_at")
    );
    let rollup: EventRollup = period.bind_as(sqlx::query_as(&sql)).fetch_one(pool).await?;

    // Running totals may each sit near the 64-bit limit, so they are summed
    // here rather than with SQL SUM.
    let sql = format!(
        "SELECT current_amount_cents, current_items FROM events WHERE {}",
        Period::created_within("created_at")
    );
    let totals: Vec<(i64, i64)> = period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?;
    let items = totals
        .iter()
        .fold(0i64, |sum, (_, items)| sum.saturating_add(*items));
    Ok(EventReportTotals {
        total_events: rollup.total_events,
        active_events: rollup.active_events,
        finished_events: rollup.finished_events,
        total_amount_raised: sum_cents(totals.iter().map(|(cents, _)| *cents)),
        total_items_raised: items,
    })
}

async fn top_donors(pool: &SqlitePool, period: &Period) -> Result<Vec<TopDonor>> {
    let sql = format!(
        "SELECT u.id, u.name, COUNT(i.id) AS items_donated, \
         COALESCE(SUM(i.status = 'delivered'), 0) AS items_delivered \
         FROM users u JOIN items i ON i.donor_id = u.id \
         WHERE {} \
         GROUP BY u.id, u.name \
         ORDER BY items_donated DESC, u.id \
         LIMIT 10",
        Period::created_within("i.created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?)
}

/// Admin-only overview of the whole network.
pub async fn general_report(
    pool: &SqlitePool,
    actor: &Actor,
    period: Period,
) -> Result<GeneralReport> {
    authorize(actor, Operation::ViewReports)?;

    let report = GeneralReport {
        start_date: period.start(),
        end_date: period.end(),
        users: user_totals(pool, &period).await?,
        items: items::totals(pool, &period).await?,
        requests: requests::totals(pool, &period).await?,
        events: event_totals(pool, &period).await?,
        items_by_category: items::by_category(pool, &period).await?,
        requests_by_urgency: requests::by_urgency(pool, &period).await?,
        top_donors: top_donors(pool, &period).await?,
    };

    info!(
        admin_id = actor.id,
        start = ?period.start(),
        end = ?period.end(),
        "general report generated"
    );
    Ok(report)
}

// ─────────────────────────────────────────────────────────
// Impact
// ─────────────────────────────────────────────────────────

/// Seconds in a week; deliveries at or under this are "fast".
const FAST_DELIVERY_SECS: i64 = 7 * 86_400;

async fn impact_by_region(pool: &SqlitePool, period: &Period) -> Result<Vec<RegionImpact>> {
    let sql = format!(
        "WITH located AS ( \
             SELECT id, COALESCE(NULLIF(TRIM(CASE WHEN instr(address, ',') > 0 \
                 THEN substr(address, 1, instr(address, ',') - 1) ELSE address END), ''), \
                 'unspecified') AS region \
             FROM users) \
         SELECT l.region, COUNT(*) AS users, \
         COALESCE(SUM((SELECT COUNT(*) FROM items i \
             WHERE i.donor_id = l.id AND {})), 0) AS items_donated, \
         COALESCE(SUM((SELECT COUNT(*) FROM requests r \
             WHERE r.beneficiary_id = l.id AND {})), 0) AS requests_made \
         FROM located l \
         GROUP BY l.region \
         ORDER BY items_donated DESC, l.region",
        Period::created_within("i.created_at"),
        Period::created_within("r.created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?)
}

/// Registrations per month, latest twelve months with activity first.
async fn monthly_growth(pool: &SqlitePool, period: &Period) -> Result<Vec<MonthlyGrowth>> {
    let sql = format!(
        "SELECT strftime('%Y-%m', created_at, 'unixepoch') AS month, \
         COUNT(*) AS new_users, \
         COALESCE(SUM(role = 'donor'), 0) AS new_donors, \
         COALESCE(SUM(role = 'beneficiary'), 0) AS new_beneficiaries \
         FROM users WHERE {} \
         GROUP BY month ORDER BY month DESC LIMIT 12",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?)
}

async fn delivery_efficiency(pool: &SqlitePool, period: &Period) -> Result<DeliveryEfficiency> {
    let sql = format!(
        "SELECT AVG((updated_at - created_at) / 86400.0) AS avg_delivery_time_days, \
         COALESCE(SUM(updated_at - created_at <= ?3), 0) AS fast_deliveries, \
         COALESCE(SUM(updated_at - created_at > ?3), 0) AS slow_deliveries \
         FROM items WHERE status = ?4 AND {}",
        Period::created_within("created_at")
    );
    Ok(period
        .bind_as(sqlx::query_as(&sql))
        .bind(FAST_DELIVERY_SECS)
        .bind(ItemStatus::Delivered.as_str())
        .fetch_one(pool)
        .await?)
}

/// Regional activity, growth and delivery speed. Organizations and admins.
pub async fn impact_report(
    pool: &SqlitePool,
    actor: &Actor,
    period: Period,
) -> Result<ImpactReport> {
    authorize(actor, Operation::ViewImpact)?;

    let report = ImpactReport {
        start_date: period.start(),
        end_date: period.end(),
        by_region: impact_by_region(pool, &period).await?,
        monthly_growth: monthly_growth(pool, &period).await?,
        delivery_efficiency: delivery_efficiency(pool, &period).await?,
    };

    info!(
        actor_id = actor.id,
        role = %actor.role,
        start = ?period.start(),
        end = ?period.end(),
        "impact report generated"
    );
    Ok(report)
}
