//! User registration, profiles and the administrator bootstrap.

use solidarity_protocol::validation::{non_blank, normalize_email, Profile};
use solidarity_protocol::{authorize, Actor, Operation, ProtocolError, Role};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::issue_token;
use crate::config::Config;
use crate::db::is_unique_violation;
use crate::errors::{ApiError, Result};
use crate::models::{ProfileBody, RegisterBody, Registration, User};

const USER_SELECT: &str =
    "SELECT id, name, email, role, phone, address, created_at FROM users";

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ProtocolError::not_found("user not found").into())
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE email = ?"))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Create an account and hand back a bearer token for it.
///
/// Anyone may register as donor, beneficiary or organization. Registering an
/// administrator requires an authenticated administrator as `caller`.
pub async fn register(
    pool: &SqlitePool,
    config: &Config,
    caller: Option<&Actor>,
    body: RegisterBody,
) -> Result<Registration> {
    let name = non_blank(body.name)
        .ok_or_else(|| ProtocolError::validation("name, email and role are required"))?;
    let email = normalize_email(body.email)?;
    let role = body
        .role
        .ok_or_else(|| ProtocolError::validation("name, email and role are required"))?;

    if role == Role::Admin {
        let caller = caller.ok_or_else(|| {
            ProtocolError::permission("only an administrator can register administrators")
        })?;
        authorize(caller, Operation::RegisterAdmin)?;
    }

    let inserted = sqlx::query(
        "INSERT INTO users (name, email, role, phone, address) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(&email)
    .bind(role.as_str())
    .bind(non_blank(body.phone))
    .bind(non_blank(body.address))
    .execute(pool)
    .await;

    let id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        Err(err) if is_unique_violation(&err) => {
            return Err(ProtocolError::Conflict(format!("email {email} is already registered")).into())
        }
        Err(err) => return Err(ApiError::Database(err)),
    };

    let user = get_user(pool, id).await?;
    let token = issue_token(config, user.id)?;
    info!(user_id = id, role = %role, "user registered");
    Ok(Registration { user, token })
}

pub async fn update_profile(pool: &SqlitePool, actor: &Actor, body: ProfileBody) -> Result<User> {
    let profile = Profile::new(body.name, body.phone, body.address)?;

    sqlx::query("UPDATE users SET name = ?, phone = ?, address = ? WHERE id = ?")
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(actor.id)
        .execute(pool)
        .await?;

    get_user(pool, actor.id).await
}

/// Every account, newest first. Administrators only.
pub async fn list_users(pool: &SqlitePool, actor: &Actor) -> Result<Vec<User>> {
    authorize(actor, Operation::ListUsers)?;
    let users = sqlx::query_as::<_, User>(&format!(
        "{USER_SELECT} ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Ensure an administrator with `email` exists. Existing accounts are left
/// untouched, whatever their role.
pub async fn bootstrap_admin(pool: &SqlitePool, email: &str, name: &str) -> Result<User> {
    let email = normalize_email(Some(email.to_string()))?;

    let created = sqlx::query(
        "INSERT INTO users (name, email, role) VALUES (?, ?, 'admin') \
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(name)
    .bind(&email)
    .execute(pool)
    .await?
    .rows_affected();

    let user = find_by_email(pool, &email)
        .await?
        .ok_or_else(|| ProtocolError::not_found("bootstrap administrator vanished"))?;

    if created == 1 {
        info!(user_id = user.id, email = %email, "bootstrap administrator created");
    } else if user.role != Role::Admin {
        warn!(
            user_id = user.id,
            role = %user.role,
            "BOOTSTRAP_ADMIN_EMAIL belongs to a non-admin account"
        );
    }
    Ok(user)
}
