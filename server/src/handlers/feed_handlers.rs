use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use feed_scraper_cli::analysis::{FeedStats, FilterCriteria};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct BlocksQuery {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskPayload {
    pub question: String,
}

/// GET /api/blocks — also makes the given criteria the session's current view.
pub async fn get_blocks(
    State(state): State<AppState>,
    Query(query): Query<BlocksQuery>,
) -> impl IntoResponse {
    let defaults = FilterCriteria::default();
    let criteria = FilterCriteria::new(
        query.min_length.unwrap_or(defaults.min_length),
        query.max_length.unwrap_or(defaults.max_length),
        query.keyword.as_deref(),
    );

    let mut session = state.session.write().await;
    session.criteria = criteria;
    let blocks = session.filtered();

    Json(json!({
        "total": session.blocks.len(),
        "count": blocks.len(),
        "criteria": session.criteria,
        "blocks": blocks,
    }))
}

/// DELETE /api/blocks
pub async fn clear_blocks(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.blocks.clear();
    session.criteria = FilterCriteria::default();
    StatusCode::NO_CONTENT
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.session.read().await.filtered();
    Json(json!(FeedStats::compute(&view)))
}

/// POST /api/ask
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskPayload>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Question must not be empty" })),
        ));
    }

    let view = {
        let session = state.session.read().await;
        if session.blocks.is_empty() {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({ "message": "Nothing collected yet, run a scrape first" })),
            ));
        }
        session.filtered()
    };

    let answer = state.answerer.answer(&view, question).await;
    Ok((StatusCode::OK, Json(json!({ "answer": answer }))))
}
