use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::feed_handlers::{ask, clear_blocks, get_blocks, get_stats};
use crate::handlers::scrape_handlers::{poll_job, start_scrape};
use crate::state::AppState;

pub fn feed_routes(state: AppState) -> Router {
    Router::new()
        .route("/scrape", post(start_scrape))
        .route("/jobs/{id}", get(poll_job))
        .route("/blocks", get(get_blocks).delete(clear_blocks))
        .route("/stats", get(get_stats))
        .route("/ask", post(ask))
        .with_state(state)
}
