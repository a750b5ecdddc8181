//! Item allocation engine.
//!
//! Items move `available → reserved → delivered` and never back. Every
//! transition is a single conditional `UPDATE` whose `WHERE` clause carries
//! the precondition; when no row changes, the item is re-read inside the
//! same transaction to report *why*.

use solidarity_protocol::validation::{non_blank, ItemChanges, NewItem};
use solidarity_protocol::{
    authorize, require_owner, Actor, ItemStatus, Operation, ProtocolError, RequestStatus,
    MAX_PENDING_REQUESTS,
};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::errors::Result;
use crate::models::{CategoryBreakdown, Item, ItemFilter, ItemStats, ItemTotals};
use crate::reports::Period;

const ITEM_SELECT: &str = "SELECT i.id, i.name, i.description, i.quantity, i.category, \
     i.status, i.donor_id, u.name AS donor_name, i.beneficiary_id, i.created_at, i.updated_at \
     FROM items i LEFT JOIN users u ON u.id = i.donor_id";

async fn load<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!("{ITEM_SELECT} WHERE i.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(item)
}

fn missing() -> ProtocolError {
    ProtocolError::not_found("item not found")
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

/// Items matching every supplied filter, newest first.
pub async fn list_items(pool: &SqlitePool, filter: ItemFilter) -> Result<Vec<Item>> {
    let mut query = QueryBuilder::<Sqlite>::new(ITEM_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(search) = non_blank(filter.search) {
        let pattern = format!("%{}%", search.to_lowercase());
        query
            .push(" AND (LOWER(i.name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(i.description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category {
        query.push(" AND i.category = ").push_bind(category.as_str());
    }
    if let Some(status) = filter.status {
        query.push(" AND i.status = ").push_bind(status.as_str());
    }
    query.push(" ORDER BY i.created_at DESC, i.id DESC");

    Ok(query.build_query_as::<Item>().fetch_all(pool).await?)
}

pub async fn get_item(pool: &SqlitePool, id: i64) -> Result<Item> {
    load(pool, id).await?.ok_or_else(|| missing().into())
}

// ─────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────

pub async fn create_item(pool: &SqlitePool, actor: &Actor, item: NewItem) -> Result<Item> {
    authorize(actor, Operation::CreateItem)?;

    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        "INSERT INTO items (name, description, quantity, category, donor_id) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.category.as_str())
    .bind(actor.id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let created = load(&mut *tx, id).await?.ok_or_else(missing)?;
    tx.commit().await?;

    info!(item_id = id, donor_id = actor.id, category = %item.category, "item listed");
    Ok(created)
}

/// Owner edit of the descriptive fields. Status is not editable here.
pub async fn update_item(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    changes: ItemChanges,
) -> Result<Item> {
    authorize(actor, Operation::UpdateItem)?;

    let mut tx = pool.begin().await?;
    let updated = sqlx::query(
        "UPDATE items SET name = COALESCE(?, name), description = COALESCE(?, description), \
         quantity = COALESCE(?, quantity), category = COALESCE(?, category), \
         updated_at = unixepoch() \
         WHERE id = ? AND donor_id = ?",
    )
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.quantity)
    .bind(changes.category.map(|c| c.as_str()))
    .bind(id)
    .bind(actor.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let item = load(&mut *tx, id).await?.ok_or_else(missing)?;
    if updated == 0 {
        require_owner(actor, item.donor_id, "item")?;
    }
    tx.commit().await?;

    debug!(item_id = id, "item updated");
    Ok(item)
}

/// Remove an item the owner listed. Only available items can be removed.
pub async fn delete_item(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<()> {
    authorize(actor, Operation::DeleteItem)?;

    let mut tx = pool.begin().await?;
    let deleted = sqlx::query(
        "DELETE FROM items WHERE id = ? AND donor_id = ? AND status = ?",
    )
    .bind(id)
    .bind(actor.id)
    .bind(ItemStatus::Available.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if deleted == 0 {
        let item = load(&mut *tx, id).await?.ok_or_else(missing)?;
        require_owner(actor, item.donor_id, "item")?;
        debug!(item_id = id, status = %item.status, "delete refused");
        return Err(ProtocolError::state_conflict(format!(
            "item is {} and can no longer be deleted",
            item.status
        ))
        .into());
    }
    tx.commit().await?;

    info!(item_id = id, "item deleted");
    Ok(())
}

/// Reserve an available item for the calling beneficiary.
///
/// The availability guard and the pending-request cap are evaluated by the
/// same statement that writes the reservation, so two beneficiaries racing
/// for one item produce exactly one reservation.
pub async fn request_item(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<Item> {
    authorize(actor, Operation::ReserveItem)?;

    let mut tx = pool.begin().await?;
    let reserved = sqlx::query(
        "UPDATE items SET status = ?, beneficiary_id = ?, updated_at = unixepoch() \
         WHERE id = ? AND status = ? \
           AND (SELECT COUNT(*) FROM requests \
                WHERE beneficiary_id = ? AND status = ?) < ?",
    )
    .bind(ItemStatus::Reserved.as_str())
    .bind(actor.id)
    .bind(id)
    .bind(ItemStatus::Reserved.predecessor().map(|s| s.as_str()))
    .bind(actor.id)
    .bind(RequestStatus::Pending.as_str())
    .bind(MAX_PENDING_REQUESTS)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let item = load(&mut *tx, id).await?.ok_or_else(missing)?;
    if reserved == 0 {
        if !item.status.can_transition_to(ItemStatus::Reserved) {
            debug!(item_id = id, status = %item.status, "item not available");
            return Err(ProtocolError::not_found("item not found or no longer available").into());
        }
        debug!(item_id = id, beneficiary_id = actor.id, "pending request cap reached");
        return Err(ProtocolError::AdmissionLimit(format!(
            "beneficiary already has {MAX_PENDING_REQUESTS} pending requests"
        ))
        .into());
    }
    tx.commit().await?;

    info!(item_id = id, beneficiary_id = actor.id, "item reserved");
    Ok(item)
}

/// Confirm delivery of a reserved item. Only the donor who listed it may.
pub async fn approve_delivery(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<Item> {
    authorize(actor, Operation::ApproveDelivery)?;

    let mut tx = pool.begin().await?;
    let delivered = sqlx::query(
        "UPDATE items SET status = ?, updated_at = unixepoch() \
         WHERE id = ? AND donor_id = ? AND status = ?",
    )
    .bind(ItemStatus::Delivered.as_str())
    .bind(id)
    .bind(actor.id)
    .bind(ItemStatus::Delivered.predecessor().map(|s| s.as_str()))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let item = load(&mut *tx, id).await?.ok_or_else(missing)?;
    if delivered == 0 {
        require_owner(actor, item.donor_id, "item")?;
        debug!(item_id = id, status = %item.status, "delivery refused");
        return Err(ProtocolError::state_conflict(format!(
            "item is {}, only reserved items can be delivered",
            item.status
        ))
        .into());
    }
    tx.commit().await?;

    info!(
        item_id = id,
        donor_id = actor.id,
        beneficiary_id = item.beneficiary_id,
        "item delivered"
    );
    Ok(item)
}

// ─────────────────────────────────────────────────────────
// Aggregates
// ─────────────────────────────────────────────────────────

pub(crate) async fn totals(pool: &SqlitePool, period: &Period) -> Result<ItemTotals> {
    let sql = format!(
        "SELECT COUNT(*) AS total_items, \
         COALESCE(SUM(status = 'available'), 0) AS available_items, \
         COALESCE(SUM(status = 'reserved'), 0) AS reserved_items, \
         COALESCE(SUM(status = 'delivered'), 0) AS delivered_items, \
         COUNT(DISTINCT donor_id) AS total_donors \
         FROM items WHERE {}",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_one(pool).await?)
}

pub(crate) async fn by_category(
    pool: &SqlitePool,
    period: &Period,
) -> Result<Vec<CategoryBreakdown>> {
    let sql = format!(
        "SELECT category, COUNT(*) AS count, \
         COALESCE(SUM(status = 'delivered'), 0) AS delivered \
         FROM items WHERE {} \
         GROUP BY category ORDER BY count DESC, category",
        Period::created_within("created_at")
    );
    Ok(period.bind_as(sqlx::query_as(&sql)).fetch_all(pool).await?)
}

pub async fn item_stats(pool: &SqlitePool, actor: &Actor) -> Result<ItemStats> {
    authorize(actor, Operation::ViewStats)?;
    let period = Period::default();
    Ok(ItemStats {
        general: totals(pool, &period).await?,
        by_category: by_category(pool, &period).await?,
    })
}
