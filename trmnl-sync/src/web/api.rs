use std::sync::Arc;

use axum::{Json, Router, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::countdown::{self, Countdown, web::CountdownState};
use crate::tracking::{self, Task, web::TrackingState};

/// Error body returned by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable description of the failure
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Error half of a JSON handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        countdown::api::list_countdowns_handler,
        countdown::api::list_active_countdowns_handler,
        countdown::api::get_countdown_handler,
        countdown::api::create_countdown_handler,
        countdown::api::update_countdown_handler,
        countdown::api::delete_countdown_handler,
        countdown::api::cleanup_countdowns_handler,
        tracking::api::get_tracked_tasks_handler,
    ),
    components(schemas(
        Countdown,
        Task,
        ErrorResponse,
        countdown::api::CountdownRequest,
        countdown::api::CreatedResponse,
        countdown::api::MessageResponse,
        countdown::api::CleanupResponse,
    )),
    tags(
        (name = "Countdowns", description = "Manage countdowns shown on the display"),
        (name = "Tasks", description = "Todoist tasks carrying the tracked label"),
    )
)]
pub struct ApiDoc;

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(
    countdown_state: Arc<CountdownState>,
    tracking_state: Arc<TrackingState>,
) -> Router {
    let countdown_routes = countdown::api::create_api_router(countdown_state);
    let task_routes = tracking::api::create_api_router(tracking_state);
    Router::new()
        .nest("/api", countdown_routes.merge(task_routes))
        .route("/api-docs/openapi.json", get(openapi_handler))
}
