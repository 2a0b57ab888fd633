use crate::todoist::TodoistClient;
use crate::tracking::{Task, TaskTracker};
use crate::web::WebError;
use askama::Template;
use axum::{Router, extract::State, response::Html, routing::get};
use std::sync::Arc;

pub struct TrackingState {
    pub tracker: Arc<TaskTracker<TodoistClient>>,
}

/// A tracked task prepared for display.
struct TaskRow {
    title: String,
    due: String,
    percentage: String,
}

impl From<Task> for TaskRow {
    fn from(task: Task) -> Self {
        Self {
            percentage: task.progress_percentage(),
            title: task.title,
            due: task.due.unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "tasks/tasks.html")]
struct TasksTemplate {
    tasks: Vec<TaskRow>,
}

impl TasksTemplate {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(TaskRow::from).collect(),
        }
    }
}

/// Handler for the /tasks page showing progress bars for tracked tasks.
#[tracing::instrument(skip(state))]
async fn tasks_handler(State(state): State<Arc<TrackingState>>) -> Result<Html<String>, WebError> {
    let tasks = state.tracker.get_tracked_tasks().await?;
    let template = TasksTemplate::new(tasks);
    template.render().map(Html).map_err(WebError::from)
}

/// Creates and returns the router serving the tracked tasks page.
pub fn create_tracking_router(state: Arc<TrackingState>) -> Router {
    Router::new()
        .route("/tasks", get(tasks_handler))
        .with_state(state)
}
