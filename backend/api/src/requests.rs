//! Aid request admission and triage.
//!
//! A beneficiary may hold at most [`MAX_PENDING_REQUESTS`] pending requests.
//! The cap is part of the `INSERT … SELECT … WHERE` that creates the row, so
//! concurrent submissions cannot overshoot it. Resolution by an organization
//! or admin is final.

use solidarity_protocol::validation::{NewRequest, RequestChanges};
use solidarity_protocol::{
    authorize, require_owner, Actor, Operation, ProtocolError, RequestStatus, Resolution,
    MAX_PENDING_REQUESTS,
};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::errors::{ApiError, Result};
use crate::models::{
    AidRequest, RequestCategoryBreakdown, RequestFilter, RequestStats, RequestTotals,
    UrgencyBreakdown,
};
use crate::reports::Period;

const REQUEST_SELECT: &str = "SELECT r.id, r.title, r.description, r.category, r.urgency, \
     r.status, r.beneficiary_id, u.name AS beneficiary_name, r.approved_by, \
     r.created_at, r.updated_at \
     FROM requests r LEFT JOIN users u ON u.id = r.beneficiary_id";

async fn load<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<Option<AidRequest>> {
    let request = sqlx::query_as::<_, AidRequest>(&format!("{REQUEST_SELECT} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(request)
}

fn missing() -> ProtocolError {
    ProtocolError::not_found("request not found")
}

/// Why an owner edit or delete matched no row.
fn owner_miss(actor: &Actor, request: Option<AidRequest>) -> ApiError {
    let Some(request) = request else {
        return missing().into();
    };
    if let Err(err) = require_owner(actor, request.beneficiary_id, "request") {
        return err.into();
    }
    ProtocolError::state_conflict(format!(
        "request is {} and can no longer be changed",
        request.status
    ))
    .into()
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

pub async fn list_requests(pool: &SqlitePool, filter: RequestFilter) -> Result<Vec<AidRequest>> {
    let mut query = QueryBuilder::<Sqlite>::new(REQUEST_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        query.push(" AND r.status = ").push_bind(status.as_str());
    }
    if let Some(urgency) = filter.urgency {
        query.push(" AND r.urgency = ").push_bind(urgency.as_str());
    }
    if let Some(category) = filter.category {
        query.push(" AND r.category = ").push_bind(category.as_str());
    }
    query.push(" ORDER BY r.created_at DESC, r.id DESC");

    Ok(query.build_query_as::<AidRequest>().fetch_all(pool).await?)
}

pub async fn get_request(pool: &SqlitePool, id: i64) -> Result<AidRequest> {
    load(pool, id).await?.ok_or_else(|| missing().into())
}

// ─────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────

/// Submit a new pending request, subject to the admission cap.
pub async fn create_request(
    pool: &SqlitePool,
    actor: &Actor,
    request: NewRequest,
) -> Result<AidRequest> {
    authorize(actor, Operation::CreateRequest)?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "INSERT INTO requests (title, description, category, urgency, beneficiary_id) \
         SELECT ?, ?, ?, ?, ? \
         WHERE (SELECT COUNT(*) FROM requests \
                WHERE beneficiary_id = ? AND status = ?) < ?",
    )
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.category.as_str())
    .bind(request.urgency.as_str())
    .bind(actor.id)
    .bind(actor.id)
    .bind(RequestStatus::Pending.as_str())
    .bind(MAX_PENDING_REQUESTS)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        debug!(beneficiary_id = actor.id, "request refused, pending cap reached");
        return Err(ProtocolError::AdmissionLimit(format!(
            "you already have {MAX_PENDING_REQUESTS} pending requests, \
             wait for one to be resolved"
        ))
        .into());
    }

    let id = result.last_insert_rowid();
    let created = load(&mut *tx, id).await?.ok_or_else(missing)?;
    tx.commit().await?;

    info!(
        request_id = id,
        beneficiary_id = actor.id,
        urgency = %request.urgency,
        "aid request submitted"
    );
    Ok(created)
}

pub async fn update_request(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    changes: RequestChanges,
) -> Result<AidRequest> {
    authorize(actor, Operation::UpdateRequest)?;

    let mut tx = pool.begin().await?;
    let updated = sqlx::query(
        "UPDATE requests SET title = COALESCE(?, title), \
         description = COALESCE(?, description), category = COALESCE(?, category), \
         urgency = COALESCE(?, urgency), updated_at = unixepoch() \
         WHERE id = ? AND beneficiary_id = ? AND status = ?",
    )
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.category.map(|c| c.as_str()))
    .bind(changes.urgency.map(|u| u.as_str()))
    .bind(id)
    .bind(actor.id)
    .bind(RequestStatus::Pending.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let request = load(&mut *tx, id).await?;
    if updated == 0 {
        return Err(owner_miss(actor, request));
    }
    let request = request.ok_or_else(missing)?;
    tx.commit().await?;

    debug!(request_id = id, "aid request updated");
    Ok(request)
}

pub async fn delete_request(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<()> {
    authorize(actor, Operation::DeleteRequest)?;

    let mut tx = pool.begin().await?;
    let deleted = sqlx::query(
        "DELETE FROM requests WHERE id = ? AND beneficiary_id = ? AND status = ?",
    )
    .bind(id)
    .bind(actor.id)
    .bind(RequestStatus::Pending.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(owner_miss(actor, load(&mut *tx, id).await?));
    }
    tx.commit().await?;

    info!(request_id = id, "aid request withdrawn");
    Ok(())
}

/// Record the final outcome of a pending request.
pub async fn resolve_request(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    resolution: Resolution,
) -> Result<AidRequest> {
    authorize(actor, Operation::ResolveRequest)?;
    let target = resolution.target_status();

    let mut tx = pool.begin().await?;
    let resolved = sqlx::query(
        "UPDATE requests SET status = ?, approved_by = ?, updated_at = unixepoch() \
         WHERE id = ? AND status = ?",
    )
    .bind(target.as_str())
    .bind(actor.id)
    .bind(id)
    .bind(target.predecessor().map(|s| s.as_str()))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let request = load(&mut *tx, id).await?.ok_or_else(missing)?;
    if resolved == 0 {
        debug!(request_id = id, status = %request.status, "request already resolved");
        return Err(ProtocolError::state_conflict(format!(
            "request has already been {}",
            request.status
        ))
        .into());
    }
    tx.commit().await?;

    info!(request_id = id, approver_id = actor.id, status = %target, "aid request resolved");
    Ok(request)
}

pub async fn approve_request(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<AidRequest> {
    resolve_request(pool, actor, id, Resolution::Approve).await
}

pub async fn reject_request(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<AidRequest> {
    resolve_request(pool, actor, id, Resolution::Reject).await
}

// ─────────────────────────────────────────────────────────
// Aggregates
// ─────────────────────────────────────────────────────────

pub(crate) async fn totals(pool: &SqlitePool, period: &Period) -> Result<RequestTotals> {
    let sql = format!(
        "SELECT COUNT(*) AS total_requests, \
         COALESCE(SUM(status = 'pending'), 0) AS pending_requests, \
         COALESCE(SUM(status = 'approved'), 0) AS approved_requests, \
         COALESCE(SUM(status = 'rejected'), 0) AS rejected_requests, \
         COUNT(DISTINCT beneficiary_id) AS total_beneficiaries \
         FROM requests WHERE {}",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_one(pool).await?)
}

pub(crate) async fn by_urgency(pool: &SqlitePool, period: &Period) -> Result<Vec<UrgencyBreakdown>> {
    let sql = format!(
        "SELECT urgency, COUNT(*) AS count, \
         COALESCE(SUM(status = 'approved'), 0) AS approved \
         FROM requests WHERE {} \
         GROUP BY urgency \
         ORDER BY CASE urgency WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?)
}

pub(crate) async fn by_category(
    pool: &SqlitePool,
    period: &Period,
) -> Result<Vec<RequestCategoryBreakdown>> {
    let sql = format!(
        "SELECT category, COUNT(*) AS count, \
         COALESCE(SUM(status = 'approved'), 0) AS approved \
         FROM requests WHERE {} \
         GROUP BY category ORDER BY count DESC, category",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?)
}

pub async fn request_stats(pool: &SqlitePool, actor: &Actor) -> Result<RequestStats> {
    authorize(actor, Operation::ViewStats)?;
    let period = Period::default();
    Ok(RequestStats {
        general: totals(pool, &period).await?,
        by_urgency: by_urgency(pool, &period).await?,
        by_category: by_category(pool, &period).await?,
    })
}
