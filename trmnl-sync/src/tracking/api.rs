use crate::tracking::Task;
use crate::tracking::web::TrackingState;
use crate::web::api::{ApiError, ErrorResponse, api_error};
use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use std::sync::Arc;

/// Handler for GET /api/tasks - Returns tracked tasks with their progress.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Tracked tasks", body = [Task]),
        (status = 502, description = "Todoist could not be reached", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tracked_tasks_handler(
    State(state): State<Arc<TrackingState>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    match state.tracker.get_tracked_tasks().await {
        Ok(tasks) => Ok(Json(tasks)),
        Err(err) => {
            tracing::error!("Failed to get tracked tasks: {}", err);
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                "Failed to retrieve tracked tasks",
            ))
        }
    }
}

/// Creates and returns the tracked tasks API router.
pub fn create_api_router(state: Arc<TrackingState>) -> Router {
    Router::new()
        .route("/tasks", get(get_tracked_tasks_handler))
        .with_state(state)
}
