//! Axum REST API: router, extractors and handlers.
//!
//! Handlers stay thin. They check the caller's role, turn a request body into
//! a validated domain value, call one engine operation and wrap the result in
//! an [`Envelope`].

use std::sync::Arc;

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use solidarity_protocol::validation::{
    EventChanges, EventDraft, ItemChanges, NewItem, NewRequest, RequestChanges,
};
use solidarity_protocol::{authorize, Operation, Pledge, ProtocolError};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{issue_token, AuthUser};
use crate::config::Config;
use crate::errors::{ApiError, Result};
use crate::models::{
    DonationBody, Envelope, EventBody, EventFilter, IssuedToken, ItemBody, ItemFilter,
    ProfileBody, RegisterBody, ReportPeriod, RequestBody, RequestFilter,
};
use crate::reports::Period;
use crate::{events, items, reports, requests, users};

pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
}

// ─────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────

/// JSON body whose rejections are reported as validation errors.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ProtocolError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string whose rejections are reported as validation errors.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| ProtocolError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameters whose rejections are reported as validation errors.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| ProtocolError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::data(data))
}

fn created<T: Serialize>(message: &str, data: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(Envelope::with_message(message, data)))
}

fn done(message: &str) -> Json<Envelope<()>> {
    Json(Envelope::message(message))
}

// ─────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/token/refresh", post(refresh_token))
        .route("/user/profile", get(get_profile).put(update_profile))
        .route("/users", get(list_users))
        .route("/items", get(list_items).post(create_item))
        .route("/items/stats", get(item_stats))
        .route("/items/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/items/:id/request", post(request_item))
        .route("/items/:id/approve-delivery", post(approve_delivery))
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/stats", get(request_stats))
        .route(
            "/requests/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/requests/:id/approve", post(approve_request))
        .route("/requests/:id/reject", post(reject_request))
        .route("/events", get(list_events).post(create_event))
        .route("/events/stats", get(event_stats))
        .route("/events/:id", get(get_event).put(update_event).delete(delete_event))
        .route("/events/:id/donate", post(donate))
        .route("/reports/general", get(general_report))
        .route("/reports/impact", get(impact_report));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Health & users
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`
pub async fn health() -> impl IntoResponse {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /api/register`
async fn register(
    State(state): State<Arc<AppState>>,
    caller: Option<AuthUser>,
    ApiJson(body): ApiJson<RegisterBody>,
) -> Result<impl IntoResponse> {
    let caller = caller.map(|AuthUser(actor)| actor);
    let registration = users::register(&state.pool, &state.config, caller.as_ref(), body).await?;
    Ok(created("User registered successfully", registration))
}

/// `POST /api/token/refresh`: trade a still-valid token for a new one.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse> {
    let token = issue_token(&state.config, actor.id)?;
    Ok(ok(IssuedToken { token }))
}

/// `GET /api/user/profile`
async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse> {
    Ok(ok(users::get_user(&state.pool, actor.id).await?))
}

/// `PUT /api/user/profile`
async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<ProfileBody>,
) -> Result<impl IntoResponse> {
    let user = users::update_profile(&state.pool, &actor, body).await?;
    Ok(Json(Envelope::with_message("Profile updated successfully", user)))
}

/// `GET /api/users`
async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse> {
    Ok(ok(users::list_users(&state.pool, &actor).await?))
}

// ─────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────

/// `GET /api/items?search=&category=&status=`
async fn list_items(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<ItemFilter>,
) -> Result<impl IntoResponse> {
    Ok(ok(items::list_items(&state.pool, filter).await?))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    Ok(ok(items::get_item(&state.pool, id).await?))
}

async fn item_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse> {
    Ok(ok(items::item_stats(&state.pool, &actor).await?))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<ItemBody>,
) -> Result<impl IntoResponse> {
    authorize(&actor, Operation::CreateItem)?;
    let item = NewItem::new(body.name, body.description, body.quantity, body.category)?;
    let item = items::create_item(&state.pool, &actor, item).await?;
    Ok(created("Item created successfully", item))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ItemBody>,
) -> Result<impl IntoResponse> {
    authorize(&actor, Operation::UpdateItem)?;
    let changes = ItemChanges::new(body.name, body.description, body.quantity, body.category)?;
    let item = items::update_item(&state.pool, &actor, id, changes).await?;
    Ok(Json(Envelope::with_message("Item updated successfully", item)))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    items::delete_item(&state.pool, &actor, id).await?;
    Ok(done("Item deleted successfully"))
}

/// `POST /api/items/:id/request`
async fn request_item(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    let item = items::request_item(&state.pool, &actor, id).await?;
    Ok(Json(Envelope::with_message("Item requested successfully", item)))
}

/// `POST /api/items/:id/approve-delivery`
async fn approve_delivery(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    let item = items::approve_delivery(&state.pool, &actor, id).await?;
    Ok(Json(Envelope::with_message("Delivery approved successfully", item)))
}

// ─────────────────────────────────────────────────────────
// Aid requests
// ─────────────────────────────────────────────────────────

async fn list_requests(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> Result<impl IntoResponse> {
    Ok(ok(requests::list_requests(&state.pool, filter).await?))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    Ok(ok(requests::get_request(&state.pool, id).await?))
}

async fn request_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse> {
    Ok(ok(requests::request_stats(&state.pool, &actor).await?))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<RequestBody>,
) -> Result<impl IntoResponse> {
    authorize(&actor, Operation::CreateRequest)?;
    let request = NewRequest::new(body.title, body.description, body.category, body.urgency)?;
    let request = requests::create_request(&state.pool, &actor, request).await?;
    Ok(created("Request created successfully", request))
}

async fn update_request(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RequestBody>,
) -> Result<impl IntoResponse> {
    authorize(&actor, Operation::UpdateRequest)?;
    let changes = RequestChanges::new(body.title, body.description, body.category, body.urgency)?;
    let request = requests::update_request(&state.pool, &actor, id, changes).await?;
    Ok(Json(Envelope::with_message("Request updated successfully", request)))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    requests::delete_request(&state.pool, &actor, id).await?;
    Ok(done("Request deleted successfully"))
}

async fn approve_request(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    let request = requests::approve_request(&state.pool, &actor, id).await?;
    Ok(Json(Envelope::with_message("Request approved successfully", request)))
}

async fn reject_request(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    let request = requests::reject_request(&state.pool, &actor, id).await?;
    Ok(Json(Envelope::with_message("Request rejected", request)))
}

// ─────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────

async fn list_events(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<EventFilter>,
) -> Result<impl IntoResponse> {
    Ok(ok(events::list_events(&state.pool, filter).await?))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    Ok(ok(events::get_event(&state.pool, id).await?))
}

async fn event_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse> {
    Ok(ok(events::event_stats(&state.pool, &actor).await?))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(body): ApiJson<EventBody>,
) -> Result<impl IntoResponse> {
    authorize(&actor, Operation::CreateEvent)?;
    let draft = EventDraft::new(
        body.title,
        body.description,
        body.start_date,
        body.end_date,
        body.goal_amount,
        body.goal_items,
        Utc::now().date_naive(),
    )?;
    let event = events::create_event(&state.pool, &actor, draft).await?;
    Ok(created("Event created successfully", event))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<EventBody>,
) -> Result<impl IntoResponse> {
    authorize(&actor, Operation::UpdateEvent)?;
    let changes = EventChanges {
        title: body.title,
        description: body.description,
        start_date: body.start_date,
        end_date: body.end_date,
        goal_amount: body.goal_amount,
        goal_items: body.goal_items,
        status: body.status,
    };
    let event =
        events::update_event(&state.pool, &actor, id, changes, Utc::now().date_naive()).await?;
    Ok(Json(Envelope::with_message("Event updated successfully", event)))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    events::delete_event(&state.pool, &actor, id).await?;
    Ok(done("Event deleted successfully"))
}

/// `POST /api/events/:id/donate`
async fn donate(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<DonationBody>,
) -> Result<impl IntoResponse> {
    let pledge = Pledge::new(body.amount, body.items_description)?;
    let donation = events::donate(&state.pool, &actor, id, pledge).await?;
    Ok(created("Donation recorded successfully", donation))
}

// ─────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────

/// `GET /api/reports/general?start_date=&end_date=`
async fn general_report(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiQuery(period): ApiQuery<ReportPeriod>,
) -> Result<impl IntoResponse> {
    let period = Period::new(period.start_date, period.end_date)?;
    Ok(ok(reports::general_report(&state.pool, &actor, period).await?))
}

/// `GET /api/reports/impact?start_date=&end_date=`
async fn impact_report(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiQuery(period): ApiQuery<ReportPeriod>,
) -> Result<impl IntoResponse> {
    let period = Period::new(period.start_date, period.end_date)?;
    Ok(ok(reports::impact_report(&state.pool, &actor, period).await?))
}
