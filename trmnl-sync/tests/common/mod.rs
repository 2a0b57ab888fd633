use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use trmnl_sync::countdown::CountdownStore;
use trmnl_sync::countdown::web::CountdownState;
use trmnl_sync::todoist::TodoistClient;
use trmnl_sync::tracking::TaskTracker;
use trmnl_sync::tracking::web::TrackingState;
use trmnl_sync::web::create_app;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";
pub const LABEL: &str = "track";

/// Address nothing listens on, so requests to it fail fast.
#[allow(dead_code)]
pub const DEAD_URL: &str = "http://127.0.0.1:9";

/// Test context for endpoint tests.
pub struct TestContext {
    #[allow(dead_code)] // directory is kept so the data file is not removed
    pub dir: TempDir,
    pub store: Arc<CountdownStore>,
    pub app: Router,
}

impl TestContext {
    /// Builds the full app with Todoist reachable under `todoist_url`.
    pub async fn new(todoist_url: &str) -> anyhow::Result<Self> {
        let (dir, store) = open_store().await?;
        let tracker = TaskTracker::new(todoist_client(todoist_url), LABEL);
        let app = create_app(
            Arc::new(CountdownState {
                store: store.clone(),
            }),
            Arc::new(TrackingState {
                tracker: Arc::new(tracker),
            }),
        );
        Ok(Self { dir, store, app })
    }
}

pub async fn open_store() -> anyhow::Result<(TempDir, Arc<CountdownStore>)> {
    let dir = tempfile::tempdir()?;
    let store = CountdownStore::open(dir.path().join("countdowns.json")).await?;
    Ok((dir, Arc::new(store)))
}

/// Client for a fake Todoist serving REST under `/rest` and Sync under `/sync`.
pub fn todoist_client(base_url: &str) -> TodoistClient {
    TodoistClient::new(API_KEY).with_base_urls(
        &format!("{}/rest", base_url),
        &format!("{}/sync", base_url),
    )
}

fn task(id: &str, content: &str, parent_id: Option<&str>, labels: &[&str]) -> Value {
    json!({
        "id": id,
        "content": content,
        "parent_id": parent_id,
        "labels": labels,
        "is_completed": false,
        "due": null,
    })
}

/// Mounts a Todoist account with one tracked task "Write report" that has one
/// pending and one completed sub-task, plus an untracked task.
#[allow(dead_code)]
pub async fn mount_tracked_task(server: &MockServer) {
    mount_slow_tracked_task(server, Duration::ZERO).await;
}

/// Same account as [`mount_tracked_task`], with every task listing answered
/// after `delay`.
#[allow(dead_code)]
pub async fn mount_slow_tracked_task(server: &MockServer, delay: Duration) {
    let mut tracked = task("100", "Write report", None, &[LABEL]);
    tracked["due"] = json!({"string": "next friday", "date": "2099-01-02"});

    Mock::given(method("GET"))
        .and(path("/rest/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    tracked,
                    task("101", "Draft outline", Some("100"), &[]),
                    task("200", "Groceries", None, &["home"]),
                ]))
                .set_delay(delay),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sync/completed/get_all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"task_id": "102", "content": "Collect numbers", "completed_at": "2024-05-01T10:00:00.000000Z"}
            ]
        })))
        .mount(server)
        .await;

    let mut done = task("102", "Collect numbers", Some("100"), &[]);
    done["is_completed"] = json!(true);
    Mock::given(method("GET"))
        .and(path("/rest/tasks/102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done))
        .mount(server)
        .await;
}

/// Mounts a Todoist that fails every request.
#[allow(dead_code)]
pub async fn mount_failing_todoist(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
