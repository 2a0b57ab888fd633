use std::sync::Arc;
use std::time::Duration;
use trmnl_sync::countdown::CountdownStore;
use trmnl_sync::sync::{Endpoints, SchedulerState, SyncError, SyncScheduler};
use trmnl_sync::todoist::TodoistClient;
use trmnl_sync::tracking::TaskTracker;
use trmnl_sync::trmnl::{DeliveryError, WebhookClient};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

fn scheduler(
    todoist: &str,
    trmnl: &MockServer,
    store: Arc<CountdownStore>,
    interval: Duration,
) -> SyncScheduler<TodoistClient> {
    SyncScheduler::new(
        TaskTracker::new(common::todoist_client(todoist), common::LABEL),
        store,
        WebhookClient::new(Duration::from_secs(5)).unwrap(),
        Endpoints {
            tasks: format!("{}/webhook/tasks", trmnl.uri()),
            countdowns: format!("{}/webhook/countdowns", trmnl.uri()),
        },
        interval,
    )
}

async fn mount_webhook(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn cycle_posts_progress_and_countdowns() {
    let todoist = MockServer::start().await;
    common::mount_tracked_task(&todoist).await;
    let trmnl = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/tasks"))
        .and(body_partial_json(serde_json::json!({
            "merge_variables": {
                "tasks": [{"title": "Write report", "progress": "50.00%"}],
                "total_tasks": 1
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&trmnl)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/countdowns"))
        .and(body_partial_json(serde_json::json!({
            "merge_variables": {
                "countdowns": [{"title": "Launch"}],
                "total_countdowns": 1
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&trmnl)
        .await;

    let (_dir, store) = common::open_store().await.unwrap();
    store.add("Launch", "2099-01-01").await.unwrap();

    let report = scheduler(&todoist.uri(), &trmnl, store, Duration::from_secs(60))
        .run_cycle()
        .await;

    assert!(report.is_success());
    assert_eq!(report.tasks.unwrap(), 1);
    assert_eq!(report.countdowns.unwrap(), 1);
}

#[tokio::test]
async fn failing_task_webhook_does_not_block_countdowns() {
    let todoist = MockServer::start().await;
    common::mount_tracked_task(&todoist).await;
    let trmnl = MockServer::start().await;
    mount_webhook(&trmnl, "/webhook/tasks", 500).await;
    Mock::given(method("POST"))
        .and(path("/webhook/countdowns"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&trmnl)
        .await;

    let (_dir, store) = common::open_store().await.unwrap();
    let report = scheduler(&todoist.uri(), &trmnl, store, Duration::from_secs(60))
        .run_cycle()
        .await;

    assert!(matches!(
        report.tasks,
        Err(SyncError::Delivery(DeliveryError::Status { .. }))
    ));
    assert_eq!(report.countdowns.unwrap(), 0);
}

#[tokio::test]
async fn unreachable_todoist_still_posts_countdowns() {
    let trmnl = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/tasks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&trmnl)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/countdowns"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&trmnl)
        .await;

    let (_dir, store) = common::open_store().await.unwrap();
    let report = scheduler(common::DEAD_URL, &trmnl, store, Duration::from_secs(60))
        .run_cycle()
        .await;

    assert!(matches!(report.tasks, Err(SyncError::Fetch(_))));
    assert!(report.countdowns.is_ok());
}

#[tokio::test]
async fn non_200_success_status_counts_as_failed_delivery() {
    let trmnl = MockServer::start().await;
    mount_webhook(&trmnl, "/webhook/countdowns", 202).await;

    let (_dir, store) = common::open_store().await.unwrap();
    let report = scheduler(common::DEAD_URL, &trmnl, store, Duration::from_secs(60))
        .run_cycle()
        .await;

    assert!(matches!(
        report.countdowns,
        Err(SyncError::Delivery(DeliveryError::Status { .. }))
    ));
}

#[tokio::test]
async fn stop_during_cycle_lets_the_cycle_finish() {
    let todoist = MockServer::start().await;
    common::mount_slow_tracked_task(&todoist, Duration::from_millis(500)).await;
    let trmnl = MockServer::start().await;
    mount_webhook(&trmnl, "/webhook/tasks", 200).await;
    mount_webhook(&trmnl, "/webhook/countdowns", 200).await;

    let (_dir, store) = common::open_store().await.unwrap();
    let handle = scheduler(&todoist.uri(), &trmnl, store, Duration::from_secs(3600)).spawn();
    let mut state = handle.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|state| *state == SchedulerState::RunningCycle),
    )
    .await
    .unwrap()
    .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(Duration::from_secs(10), handle.shutdown())
        .await
        .unwrap()
        .unwrap();

    // Both steps of the interrupted cycle were posted, and no further cycle ran.
    assert_eq!(trmnl.received_requests().await.unwrap().len(), 2);
    assert_eq!(*state.borrow_and_update(), SchedulerState::Stopped);
}

#[tokio::test]
async fn runs_cycles_until_shut_down() {
    let todoist = MockServer::start().await;
    common::mount_tracked_task(&todoist).await;
    let trmnl = MockServer::start().await;
    mount_webhook(&trmnl, "/webhook/tasks", 200).await;
    mount_webhook(&trmnl, "/webhook/countdowns", 200).await;

    let (_dir, store) = common::open_store().await.unwrap();
    let handle = scheduler(&todoist.uri(), &trmnl, store, Duration::from_millis(50)).spawn();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let posted = trmnl.received_requests().await.unwrap().len();
        if posted >= 4 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected at least two cycles, saw {} posts",
            posted
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let mut state = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(10), handle.shutdown())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*state.borrow_and_update(), SchedulerState::Stopped);
}
