use axum::Router;
use axum::http::StatusCode;
use axum::response::Html;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{self, Config};
use crate::countdown::CountdownStore;
use crate::countdown::web::{CountdownState, create_countdown_router};
use crate::sync::{Endpoints, SyncScheduler};
use crate::todoist::TodoistClient;
use crate::tracking::web::{TrackingState, create_tracking_router};
use crate::tracking::{TaskTracker, TrackingError};
use crate::trmnl::{self, WebhookClient};

pub mod api;

/// Custom error type for web handler operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Represents an error during template rendering.
    /// The specific `askama::Error` is captured as the source of this error.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Tracked tasks could not be fetched from Todoist.
    #[error("Tracked tasks are unavailable")]
    Tracking(#[from] TrackingError),
}

impl axum::response::IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, user_facing_error_message) = match self {
            WebError::Tracking(err) => {
                tracing::error!("Failed to render tracked tasks: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Tracked tasks could not be loaded from Todoist. Please try again later.",
                )
            }
            WebError::Template(err) => {
                tracing::error!("Failed to render template: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your request. Please try again later.",
                )
            }
        };
        (
            status_code,
            Html(format!("<h1>Error</h1><p>{}</p>", user_facing_error_message)),
        )
            .into_response()
    }
}

/// Builds the full application router.
pub fn create_app(countdown_state: Arc<CountdownState>, tracking_state: Arc<TrackingState>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_countdown_router(countdown_state.clone()))
        .merge(create_tracking_router(tracking_state.clone()))
        .merge(api::create_api_router(countdown_state, tracking_state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Opens the countdown store, starts the sync scheduler and serves the web UI
/// until Ctrl-C is received.
#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    tracing::info!("Starting with {:?}", config);

    let store = Arc::new(CountdownStore::open(&config.data_file).await?);
    let source = TodoistClient::from_config(&config);

    let scheduler = SyncScheduler::new(
        TaskTracker::new(source.clone(), config.label.clone()),
        store.clone(),
        WebhookClient::new(trmnl::DEFAULT_TIMEOUT)?,
        Endpoints::from_config(&config),
        config.polling_interval(),
    );
    let scheduler_handle = scheduler.spawn();
    tracing::info!("TRMNL sync service started");

    let countdown_state = Arc::new(CountdownState { store });
    let tracking_state = Arc::new(TrackingState {
        tracker: Arc::new(TaskTracker::new(source, config.label.clone())),
    });
    let app = create_app(countdown_state, tracking_state);

    let server_address = server_address(&config);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped, waiting for the sync service");
    scheduler_handle.shutdown().await?;
    Ok(())
}

fn server_address(config: &Config) -> String {
    format!("0.0.0.0:{}", config.port)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
