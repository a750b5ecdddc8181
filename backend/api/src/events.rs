//! Event pledge aggregator.
//!
//! Organizations run time-boxed fundraising events. Pledges are appended to
//! `event_donations` and folded into the event's running totals in the same
//! transaction. The transaction opens with the increment itself, so
//! concurrent pledges to one event serialize on its row and no increment is
//! lost.

use chrono::NaiveDate;
use solidarity_protocol::validation::{EventChanges, EventDraft};
use solidarity_protocol::money::sum_cents;
use solidarity_protocol::{
    authorize, require_owner, Actor, EventStatus, Operation, Pledge, ProtocolError, Totals,
};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::errors::{ApiError, Result};
use crate::models::{
    Donation, DonationRecord, DonationTotals, Event, EventDetail, EventFilter, EventRecord,
    EventStats, EventTotals,
};

const EVENT_SELECT: &str = "SELECT e.id, e.title, e.description, e.start_date, e.end_date, \
     e.goal_amount_cents, e.goal_items, e.current_amount_cents, e.current_items, e.status, \
     e.organization_id, u.name AS organization_name, e.created_at, e.updated_at \
     FROM events e LEFT JOIN users u ON u.id = e.organization_id";

const DONATION_SELECT: &str = "SELECT d.id, d.event_id, d.donor_id, u.name AS donor_name, \
     d.amount_cents, d.items_description, d.created_at \
     FROM event_donations d LEFT JOIN users u ON u.id = d.donor_id";

async fn load<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<Option<EventRecord>> {
    let event = sqlx::query_as::<_, EventRecord>(&format!("{EVENT_SELECT} WHERE e.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(event)
}

fn missing() -> ProtocolError {
    ProtocolError::not_found("event not found")
}

/// Why an owner-scoped write matched no row: missing or foreign.
async fn owner_miss(
    executor: impl SqliteExecutor<'_>,
    actor: &Actor,
    id: i64,
) -> Result<EventRecord> {
    let event = load(executor, id).await?.ok_or_else(missing)?;
    require_owner(actor, event.organization_id, "event")?;
    Ok(event)
}

fn draft_of(event: &EventRecord) -> EventDraft {
    EventDraft {
        title: event.title.clone(),
        description: event.description.clone(),
        start_date: event.start_date,
        end_date: event.end_date,
        goal_amount_cents: event.goal_amount_cents,
        goal_items: event.goal_items,
        status: event.status,
    }
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

pub async fn list_events(pool: &SqlitePool, filter: EventFilter) -> Result<Vec<Event>> {
    let mut query = QueryBuilder::<Sqlite>::new(EVENT_SELECT);
    if let Some(status) = filter.status {
        query.push(" WHERE e.status = ").push_bind(status.as_str());
    }
    query.push(" ORDER BY e.created_at DESC, e.id DESC");

    let rows = query.build_query_as::<EventRecord>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(Event::from).collect())
}

/// Pledges recorded against `event_id`, newest first.
pub async fn list_donations(pool: &SqlitePool, event_id: i64) -> Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, DonationRecord>(&format!(
        "{DONATION_SELECT} WHERE d.event_id = ? ORDER BY d.created_at DESC, d.id DESC"
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Donation::from).collect())
}

pub async fn get_event(pool: &SqlitePool, id: i64) -> Result<EventDetail> {
    let event = load(pool, id).await?.ok_or_else(missing)?;
    Ok(EventDetail {
        event: event.into(),
        donations: list_donations(pool, id).await?,
    })
}

// ─────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────

pub async fn create_event(pool: &SqlitePool, actor: &Actor, draft: EventDraft) -> Result<Event> {
    authorize(actor, Operation::CreateEvent)?;

    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        "INSERT INTO events \
         (title, description, start_date, end_date, goal_amount_cents, goal_items, organization_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(draft.goal_amount_cents)
    .bind(draft.goal_items)
    .bind(actor.id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let created = load(&mut *tx, id).await?.ok_or_else(missing)?;
    tx.commit().await?;

    info!(
        event_id = id,
        organization_id = actor.id,
        start = %draft.start_date,
        end = %draft.end_date,
        "event created"
    );
    Ok(created.into())
}

/// Owner edit. Supplied fields replace stored ones and the merged event is
/// validated as a whole; `today` anchors the start-date check.
pub async fn update_event(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    changes: EventChanges,
    today: NaiveDate,
) -> Result<Event> {
    authorize(actor, Operation::UpdateEvent)?;

    let mut tx = pool.begin().await?;
    // Claim the row first so the merge below works on a stable snapshot.
    let claimed = sqlx::query(
        "UPDATE events SET updated_at = unixepoch() WHERE id = ? AND organization_id = ?",
    )
    .bind(id)
    .bind(actor.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let current = if claimed == 0 {
        // Only reached when the event is missing or foreign, both errors.
        owner_miss(&mut *tx, actor, id).await?
    } else {
        load(&mut *tx, id).await?.ok_or_else(missing)?
    };

    let merged = draft_of(&current).apply(changes, today).map_err(|err| {
        debug!(event_id = id, error = %err, "event update refused");
        ApiError::from(err)
    })?;

    sqlx::query(
        "UPDATE events SET title = ?, description = ?, start_date = ?, end_date = ?, \
         goal_amount_cents = ?, goal_items = ?, status = ?, updated_at = unixepoch() \
         WHERE id = ?",
    )
    .bind(&merged.title)
    .bind(&merged.description)
    .bind(merged.start_date)
    .bind(merged.end_date)
    .bind(merged.goal_amount_cents)
    .bind(merged.goal_items)
    .bind(merged.status.as_str())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = load(&mut *tx, id).await?.ok_or_else(missing)?;
    tx.commit().await?;

    if current.status != merged.status {
        info!(event_id = id, from = %current.status, to = %merged.status, "event closed");
    } else {
        debug!(event_id = id, "event updated");
    }
    Ok(updated.into())
}

/// Remove an event that has not received any pledge.
pub async fn delete_event(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<()> {
    authorize(actor, Operation::DeleteEvent)?;

    let mut tx = pool.begin().await?;
    let deleted = sqlx::query(
        "DELETE FROM events WHERE id = ? AND organization_id = ? \
         AND NOT EXISTS (SELECT 1 FROM event_donations WHERE event_id = ?)",
    )
    .bind(id)
    .bind(actor.id)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if deleted == 0 {
        owner_miss(&mut *tx, actor, id).await?;
        debug!(event_id = id, "delete refused, event has donations");
        return Err(ProtocolError::Conflict(
            "event has received donations and cannot be deleted".to_string(),
        )
        .into());
    }
    tx.commit().await?;

    info!(event_id = id, "event deleted");
    Ok(())
}

/// Record a pledge against an active event and move its running totals.
pub async fn donate(pool: &SqlitePool, actor: &Actor, event_id: i64, pledge: Pledge) -> Result<Donation> {
    authorize(actor, Operation::Donate)?;

    let mut tx = pool.begin().await?;
    // Overflowing integer arithmetic in SQLite silently yields REAL, so the
    // headroom is part of the guard.
    let credited = sqlx::query(
        "UPDATE events SET current_amount_cents = current_amount_cents + ?1, \
         current_items = current_items + ?2, updated_at = unixepoch() \
         WHERE id = ?3 AND status = ?4 \
           AND current_amount_cents <= 9223372036854775807 - ?1 \
           AND current_items <= 9223372036854775807 - ?2",
    )
    .bind(pledge.amount_delta())
    .bind(pledge.items_delta())
    .bind(event_id)
    .bind(EventStatus::Active.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if credited == 0 {
        let Some(event) = load(&mut *tx, event_id)
            .await?
            .filter(|event| event.status.accepts_pledges())
        else {
            debug!(event_id, donor_id = actor.id, "pledge refused, event not active");
            return Err(ProtocolError::not_found("event not found or not active").into());
        };
        let totals = Totals {
            amount_cents: event.current_amount_cents,
            items: event.current_items,
        };
        debug!(event_id, donor_id = actor.id, "pledge refused, totals would overflow");
        return Err(totals
            .apply(&pledge)
            .err()
            .unwrap_or_else(|| ProtocolError::state_conflict("event changed while pledging"))
            .into());
    }

    let id = sqlx::query(
        "INSERT INTO event_donations (event_id, donor_id, amount_cents, items_description) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(event_id)
    .bind(actor.id)
    .bind(pledge.amount_cents())
    .bind(pledge.items_description())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let record = sqlx::query_as::<_, DonationRecord>(&format!("{DONATION_SELECT} WHERE d.id = ?"))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(
        event_id,
        donor_id = actor.id,
        amount_cents = pledge.amount_delta(),
        items = pledge.items_delta(),
        "pledge recorded"
    );
    Ok(record.into())
}

// ─────────────────────────────────────────────────────────
// Aggregates
// ─────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct DonationRollup {
    total_donations: i64,
    total_donors: i64,
    events_with_donations: i64,
}

pub async fn event_stats(pool: &SqlitePool, actor: &Actor) -> Result<EventStats> {
    authorize(actor, Operation::ViewStats)?;

    let events: EventTotals = sqlx::query_as(
        "SELECT COUNT(*) AS total_events, \
         COALESCE(SUM(status = 'active'), 0) AS active_events, \
         COALESCE(SUM(status = 'finished'), 0) AS finished_events, \
         COALESCE(SUM(status = 'cancelled'), 0) AS cancelled_events, \
         COUNT(DISTINCT organization_id) AS total_organizations \
         FROM events",
    )
    .fetch_one(pool)
    .await?;

    let rollup: DonationRollup = sqlx::query_as(
        "SELECT COUNT(*) AS total_donations, \
         COUNT(DISTINCT donor_id) AS total_donors, \
         COUNT(DISTINCT event_id) AS events_with_donations \
         FROM event_donations",
    )
    .fetch_one(pool)
    .await?;

    let amounts: Vec<i64> = sqlx::query_scalar(
        "SELECT amount_cents FROM event_donations WHERE amount_cents IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    Ok(EventStats {
        events,
        donations: DonationTotals {
            total_donations: rollup.total_donations,
            total_amount: sum_cents(amounts),
            total_donors: rollup.total_donors,
            events_with_donations: rollup.events_with_donations,
        },
    })
}
