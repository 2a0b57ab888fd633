use crate::countdown::{Countdown, CountdownStore};
use crate::web::WebError;
use askama::Template;
use axum::{Router, extract::State, response::Html, routing::get};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct CountdownState {
    pub store: Arc<CountdownStore>,
}

#[derive(Template)]
#[template(path = "countdowns/countdowns.html")]
struct CountdownsTemplate {
    countdowns: Vec<Countdown>,
}

impl CountdownsTemplate {
    pub fn new(countdowns: Vec<Countdown>) -> Self {
        Self { countdowns }
    }
}

/// Handler for the countdown management page.
#[tracing::instrument(skip(state))]
async fn countdowns_handler(
    State(state): State<Arc<CountdownState>>,
) -> Result<Html<String>, WebError> {
    let countdowns = state.store.list_all().await;
    let template = CountdownsTemplate::new(countdowns);
    template.render().map(Html).map_err(WebError::from)
}

/// Creates and returns the router serving the countdown page.
pub fn create_countdown_router(state: Arc<CountdownState>) -> Router {
    Router::new()
        .route("/", get(countdowns_handler))
        .with_state(state)
}
