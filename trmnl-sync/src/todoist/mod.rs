//! Todoist API access.
//!
//! Tasks are read through the REST API, completed tasks through the Sync API.
//! Everything here is read-only: remote tasks are never mutated.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub mod backoff;

pub use backoff::{BackoffPolicy, get_task_with_backoff};

use crate::config::Config;

pub const DEFAULT_REST_URL: &str = "https://api.todoist.com/rest/v2";
pub const DEFAULT_SYNC_URL: &str = "https://api.todoist.com/sync/v9";

/// Page size requested from the completed tasks endpoint.
const COMPLETED_TASKS_LIMIT: u32 = 200;

/// A task as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub due: Option<Due>,
}

impl TaskRecord {
    /// Returns true if the task carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|candidate| candidate == label)
    }

    /// Returns true if the task is a direct sub-task of `parent_id`.
    pub fn is_child_of(&self, parent_id: &str) -> bool {
        self.parent_id.as_deref() == Some(parent_id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Due {
    /// Human readable due date, e.g. "every monday" or "Jan 12".
    pub string: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// An entry of the completed tasks listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletedRecord {
    pub task_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletedTasksResponse {
    items: Vec<CompletedRecord>,
}

/// Error type for task source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request could not be sent or its body could not be decoded.
    #[error("Todoist request failed: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("Todoist responded with status {0}")]
    Status(reqwest::StatusCode),
}

/// Read access to a remote task tracker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Lists all active tasks.
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, SourceError>;

    /// Lists recently completed tasks.
    async fn list_completed_tasks(&self) -> Result<Vec<CompletedRecord>, SourceError>;

    /// Fetches a single task by ID. One attempt, see [`get_task_with_backoff`] for retries.
    async fn get_task(&self, task_id: &str) -> Result<TaskRecord, SourceError>;
}

/// HTTP client for the Todoist REST and Sync APIs.
#[derive(Clone)]
pub struct TodoistClient {
    http: reqwest::Client,
    api_key: String,
    rest_url: String,
    sync_url: String,
}

impl TodoistClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            rest_url: DEFAULT_REST_URL.to_string(),
            sync_url: DEFAULT_SYNC_URL.to_string(),
        }
    }

    /// Points the client at different API roots.
    pub fn with_base_urls(mut self, rest_url: &str, sync_url: &str) -> Self {
        self.rest_url = rest_url.trim_end_matches('/').to_string();
        self.sync_url = sync_url.trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key.clone())
            .with_base_urls(&config.todoist_rest_url, &config.todoist_sync_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SourceError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }
        Ok(response.json::<T>().await?)
    }
}

impl std::fmt::Debug for TodoistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoistClient")
            .field("rest_url", &self.rest_url)
            .field("sync_url", &self.sync_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskSource for TodoistClient {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, SourceError> {
        let url = format!("{}/tasks", self.rest_url);
        let tasks: Vec<TaskRecord> = self.get_json(self.http.get(url)).await?;
        tracing::debug!("Received {} tasks", tasks.len());
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn list_completed_tasks(&self) -> Result<Vec<CompletedRecord>, SourceError> {
        tracing::info!("Requesting completed tasks list...");
        let url = format!("{}/completed/get_all", self.sync_url);
        let request = self
            .http
            .get(url)
            .query(&[("limit", COMPLETED_TASKS_LIMIT)]);
        let response: CompletedTasksResponse = self.get_json(request).await?;
        tracing::info!("Received {} completed tasks", response.items.len());
        Ok(response.items)
    }

    #[tracing::instrument(skip(self))]
    async fn get_task(&self, task_id: &str) -> Result<TaskRecord, SourceError> {
        let url = format!("{}/tasks/{}", self.rest_url, task_id);
        self.get_json(self.http.get(url)).await
    }
}
