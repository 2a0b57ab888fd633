use crate::countdown::web::CountdownState;
use crate::countdown::{Countdown, CountdownError, DEFAULT_EXPIRY_THRESHOLD_DAYS};
use crate::web::api::{ApiError, ErrorResponse, api_error};
use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Request body for creating or updating a countdown.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CountdownRequest {
    /// Countdown title
    #[serde(default)]
    title: Option<String>,
    /// Target date, `YYYY-MM-DD`
    #[serde(default)]
    target_date: Option<String>,
}

impl CountdownRequest {
    /// Returns title and target date when both are present and non-empty.
    fn validated(&self) -> Result<(&str, &str), ApiError> {
        match (self.title.as_deref(), self.target_date.as_deref()) {
            (Some(title), Some(target_date)) if !title.is_empty() && !target_date.is_empty() => {
                Ok((title, target_date))
            }
            _ => Err(api_error(
                StatusCode::BAD_REQUEST,
                "Title and target_date are required",
            )),
        }
    }
}

/// Response for a created countdown.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    /// Identifier of the new countdown
    pub id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CleanupResponse {
    /// Number of countdowns removed
    pub removed: usize,
    pub message: String,
}

/// Query parameters for the cleanup endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CleanupQuery {
    /// Countdowns with fewer days remaining than this are removed
    #[serde(default = "default_threshold_days")]
    threshold_days: i64,
}

fn default_threshold_days() -> i64 {
    DEFAULT_EXPIRY_THRESHOLD_DAYS
}

/// Turns a malformed body into the same `{error}` shape as other failures.
fn parse_request(
    payload: Result<Json<CountdownRequest>, JsonRejection>,
) -> Result<CountdownRequest, ApiError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        tracing::warn!("Rejected countdown request: {}", rejection.body_text());
        api_error(rejection.status(), &rejection.body_text())
    })
}

fn store_error(err: CountdownError, action: &str) -> ApiError {
    match err {
        CountdownError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "Countdown not found"),
        err => {
            tracing::error!("Error trying to {} countdown: {}", action, err);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Failed to {} countdown", action),
            )
        }
    }
}

/// Handler for GET /api/countdowns - Returns all countdowns, soonest first.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/countdowns",
    responses(
        (status = 200, description = "Countdowns ordered by days remaining", body = [Countdown])
    ),
    tag = "Countdowns"
)]
pub async fn list_countdowns_handler(
    State(state): State<Arc<CountdownState>>,
) -> Json<Vec<Countdown>> {
    Json(state.store.list_all().await)
}

/// Handler for GET /api/countdowns/active - Returns countdowns that have not passed.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/countdowns/active",
    responses(
        (status = 200, description = "Countdowns with zero or more days remaining", body = [Countdown])
    ),
    tag = "Countdowns"
)]
pub async fn list_active_countdowns_handler(
    State(state): State<Arc<CountdownState>>,
) -> Json<Vec<Countdown>> {
    Json(state.store.list_active().await)
}

/// Handler for GET /api/countdowns/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/countdowns/{id}",
    params(("id" = String, Path, description = "Countdown identifier")),
    responses(
        (status = 200, description = "The countdown", body = Countdown),
        (status = 404, description = "Countdown not found", body = ErrorResponse)
    ),
    tag = "Countdowns"
)]
pub async fn get_countdown_handler(
    State(state): State<Arc<CountdownState>>,
    Path(id): Path<String>,
) -> Result<Json<Countdown>, ApiError> {
    state
        .store
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Countdown not found"))
}

/// Handler for POST /api/countdowns.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/countdowns",
    request_body = CountdownRequest,
    responses(
        (status = 201, description = "Countdown added", body = CreatedResponse),
        (status = 400, description = "Title or target date missing", body = ErrorResponse),
        (status = 422, description = "Body is not a valid countdown", body = ErrorResponse),
        (status = 500, description = "Countdown could not be stored", body = ErrorResponse)
    ),
    tag = "Countdowns"
)]
pub async fn create_countdown_handler(
    State(state): State<Arc<CountdownState>>,
    payload: Result<Json<CountdownRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let request = parse_request(payload)?;
    let (title, target_date) = request.validated()?;
    let id = state
        .store
        .add(title, target_date)
        .await
        .map_err(|err| store_error(err, "add"))?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: "Countdown added successfully".to_string(),
        }),
    ))
}

/// Handler for PUT /api/countdowns/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/countdowns/{id}",
    params(("id" = String, Path, description = "Countdown identifier")),
    request_body = CountdownRequest,
    responses(
        (status = 200, description = "Countdown updated", body = MessageResponse),
        (status = 400, description = "Title or target date missing", body = ErrorResponse),
        (status = 422, description = "Body is not a valid countdown", body = ErrorResponse),
        (status = 404, description = "Countdown not found", body = ErrorResponse),
        (status = 500, description = "Countdown could not be stored", body = ErrorResponse)
    ),
    tag = "Countdowns"
)]
pub async fn update_countdown_handler(
    State(state): State<Arc<CountdownState>>,
    Path(id): Path<String>,
    payload: Result<Json<CountdownRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = parse_request(payload)?;
    let (title, target_date) = request.validated()?;
    state
        .store
        .update(&id, title, target_date)
        .await
        .map_err(|err| store_error(err, "update"))?;

    Ok(Json(MessageResponse {
        message: "Countdown updated successfully".to_string(),
    }))
}

/// Handler for DELETE /api/countdowns/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/countdowns/{id}",
    params(("id" = String, Path, description = "Countdown identifier")),
    responses(
        (status = 200, description = "Countdown deleted", body = MessageResponse),
        (status = 404, description = "Countdown not found", body = ErrorResponse),
        (status = 500, description = "Countdown could not be stored", body = ErrorResponse)
    ),
    tag = "Countdowns"
)]
pub async fn delete_countdown_handler(
    State(state): State<Arc<CountdownState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .delete(&id)
        .await
        .map_err(|err| store_error(err, "delete"))?;

    Ok(Json(MessageResponse {
        message: "Countdown deleted successfully".to_string(),
    }))
}

/// Handler for POST /api/countdowns/cleanup - Removes long expired countdowns.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/countdowns/cleanup",
    params(CleanupQuery),
    responses(
        (status = 200, description = "Expired countdowns removed", body = CleanupResponse),
        (status = 500, description = "Countdowns could not be stored", body = ErrorResponse)
    ),
    tag = "Countdowns"
)]
pub async fn cleanup_countdowns_handler(
    State(state): State<Arc<CountdownState>>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let removed = state
        .store
        .cleanup_expired(query.threshold_days)
        .await
        .map_err(|err| store_error(err, "clean up"))?;

    Ok(Json(CleanupResponse {
        removed,
        message: format!("Removed {} expired countdowns", removed),
    }))
}

/// Creates and returns the countdowns API router.
pub fn create_api_router(state: Arc<CountdownState>) -> Router {
    Router::new()
        .route(
            "/countdowns",
            get(list_countdowns_handler).post(create_countdown_handler),
        )
        .route("/countdowns/active", get(list_active_countdowns_handler))
        .route("/countdowns/cleanup", post(cleanup_countdowns_handler))
        .route(
            "/countdowns/{id}",
            get(get_countdown_handler)
                .put(update_countdown_handler)
                .delete(delete_countdown_handler),
        )
        .with_state(state)
}
