pub mod feed;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use feed::feed_routes;

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", feed_routes(state))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use feed_scraper_cli::{ai::QuestionAnswerer, config::AppConfig};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_with(answerer: QuestionAnswerer) -> AppState {
        AppState::new(AppConfig::default(), answerer)
    }

    async fn seed(state: &AppState, blocks: &[&str]) {
        state.session.write().await.blocks = blocks.iter().map(|b| b.to_string()).collect();
    }

    async fn call(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn blocks_are_filtered_and_criteria_remembered() {
        let state = state_with(QuestionAnswerer::new(None));
        let long = "x".repeat(200);
        seed(&state, &["Breaking NEWS today", "short", &long]).await;

        let (status, body) = call(
            &state,
            Method::GET,
            "/api/blocks?min_length=5&max_length=50&keyword=news",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["blocks"], json!(["Breaking NEWS today"]));
        assert_eq!(state.session.read().await.criteria.keyword.as_deref(), Some("news"));
    }

    #[tokio::test]
    async fn stats_follow_the_current_view() {
        let state = state_with(QuestionAnswerer::new(None));
        seed(&state, &["rust rust #async", "python @guido"]).await;
        call(&state, Method::GET, "/api/blocks?keyword=rust", None).await;

        let (status, body) = call(&state, Method::GET, "/api/stats", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["block_count"], 1);
        assert_eq!(body["hashtags"], json!([["#async", 1]]));
        assert_eq!(body["mentions"], json!([]));
    }

    #[tokio::test]
    async fn ask_without_key_answers_with_error_text() {
        let state = state_with(QuestionAnswerer::new(None));
        seed(&state, &["something happened in the feed today"]).await;

        let (status, body) = call(
            &state,
            Method::POST,
            "/api/ask",
            Some(json!({ "question": "what happened?" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().starts_with("Error:"));
    }

    #[tokio::test]
    async fn ask_returns_model_reply_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Mostly **rust**." } }]
            })))
            .mount(&server)
            .await;

        let answerer = QuestionAnswerer::new(Some("test-key".into())).with_base_url(server.uri());
        let state = state_with(answerer);
        seed(&state, &["a post about rust and nothing else"]).await;

        let (_, body) = call(
            &state,
            Method::POST,
            "/api/ask",
            Some(json!({ "question": "topics?" })),
        )
        .await;

        assert_eq!(body["answer"], "Mostly **rust**.");
    }

    #[tokio::test]
    async fn ask_rejects_blank_question_and_empty_session() {
        let state = state_with(QuestionAnswerer::new(None));

        let (status, _) = call(&state, Method::POST, "/api/ask", Some(json!({ "question": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&state, Method::POST, "/api/ask", Some(json!({ "question": "hi" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let state = state_with(QuestionAnswerer::new(None));
        let uri = format!("/api/jobs/{}", uuid::Uuid::new_v4());
        let (status, _) = call(&state, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn wait_for_job(state: &AppState, uri: &str) -> Value {
        let mut job = Value::Null;
        for _ in 0..50 {
            job = call(state, Method::GET, uri, None).await.1;
            if job["status"] != "running" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        job
    }

    fn replay_state(dir: &std::path::Path, duration_secs: u64) -> AppState {
        let mut config = AppConfig {
            replay_dir: Some(dir.to_path_buf()),
            ..AppConfig::default()
        };
        config.scrape.duration = Duration::from_secs(duration_secs);
        AppState::new(config, QuestionAnswerer::new(None))
    }

    #[tokio::test]
    async fn scrape_starts_without_a_body_and_drops_finished_jobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("01.html"),
            r#"<article><div lang="en">A post replayed without any request body</div></article>"#,
        )
        .unwrap();
        let state = replay_state(dir.path(), 1);

        let (status, body) = call(&state, Method::POST, "/api/scrape", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let first = format!("/api/jobs/{}", body["job_id"].as_str().unwrap());
        assert_eq!(wait_for_job(&state, &first).await["status"], "done");

        let (status, body) = call(&state, Method::POST, "/api/scrape", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let second = format!("/api/jobs/{}", body["job_id"].as_str().unwrap());

        assert_eq!(call(&state, Method::GET, &first, None).await.0, StatusCode::NOT_FOUND);
        assert_eq!(state.jobs.len(), 1);
        assert_eq!(wait_for_job(&state, &second).await["count"], 1);
    }

    #[tokio::test]
    async fn replay_scrape_fills_the_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("01.html"),
            r#"<article><div lang="en">A replayed post that is long enough</div></article>
               <article><div lang="en">tiny</div></article>"#,
        )
        .unwrap();

        let config = AppConfig {
            replay_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        let state = AppState::new(config, QuestionAnswerer::new(None));

        let (status, body) = call(
            &state,
            Method::POST,
            "/api/scrape",
            Some(json!({ "duration_secs": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let uri = format!("/api/jobs/{}", body["job_id"].as_str().unwrap());

        let job = wait_for_job(&state, &uri).await;

        assert_eq!(job["status"], "done");
        assert_eq!(job["count"], 1);
        assert_eq!(
            state.session.read().await.blocks,
            vec!["A replayed post that is long enough".to_string()]
        );
    }

    #[tokio::test]
    async fn second_scrape_is_refused_while_one_runs() {
        let state = state_with(QuestionAnswerer::new(None));
        let _running = state.try_begin_scrape().unwrap();

        let (status, _) = call(&state, Method::POST, "/api/scrape", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
