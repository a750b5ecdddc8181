//! Shared fixtures for the engine and HTTP tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Days, NaiveDate, Utc};
use solidarity_protocol::validation::{EventDraft, NewItem, NewRequest};
use solidarity_protocol::{Actor, Category, ProtocolError, Role, Urgency};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::errors::{ApiError, Result};

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        api_port: 0,
        max_connections: 1,
        jwt_secret: "solidarity-test-secret".to_string(),
        token_ttl_hours: 1,
        bootstrap_admin_email: None,
        bootstrap_admin_name: "Administrator".to_string(),
    }
}

pub async fn setup() -> SqlitePool {
    db::init_memory_pool().await.unwrap()
}

/// A file-backed database with several connections, for tests that need
/// real concurrent transactions. Removed again by [`FileDb::drop`].
pub struct FileDb {
    pub pool: SqlitePool,
    path: PathBuf,
}

impl FileDb {
    pub async fn new(max_connections: u32) -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        let path = std::env::temp_dir().join(format!(
            "solidarity-test-{}-{}.db",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        let pool = db::init_pool(&path.display().to_string(), max_connections)
            .await
            .unwrap();
        Self { pool, path }
    }
}

impl Drop for FileDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

pub async fn user(pool: &SqlitePool, name: &str, role: Role) -> Actor {
    let id = sqlx::query("INSERT INTO users (name, email, role) VALUES (?, ?, ?)")
        .bind(name)
        .bind(format!("{}@example.org", name.to_lowercase()))
        .bind(role.as_str())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
    Actor::new(id, role)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_from_today(days: u64) -> NaiveDate {
    today().checked_add_days(Days::new(days)).unwrap()
}

pub fn new_item(name: &str) -> NewItem {
    NewItem::new(
        Some(name.to_string()),
        Some(format!("{name} in good condition")),
        Some(1),
        Some(Category::Clothing),
    )
    .unwrap()
}

pub fn new_request(title: &str) -> NewRequest {
    NewRequest::new(
        Some(title.to_string()),
        Some(format!("{title} for a family of four")),
        Some(Category::Food),
        Some(Urgency::High),
    )
    .unwrap()
}

pub fn event_draft(title: &str) -> EventDraft {
    EventDraft::new(
        Some(title.to_string()),
        Some("Winter fundraising drive".to_string()),
        Some(today()),
        Some(days_from_today(30)),
        None,
        None,
        today(),
    )
    .unwrap()
}

/// Unwrap the domain error of a refused operation.
pub fn domain_error<T: std::fmt::Debug>(result: Result<T>) -> ProtocolError {
    match result {
        Err(ApiError::Domain(err)) => err,
        other => panic!("expected a domain error, got {other:?}"),
    }
}
