use feed_scraper_cli::ai::QuestionAnswerer;
use feed_scraper_cli::error::AiError;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("post number {:02} from the feed", i)).collect()
}

#[tokio::test]
async fn sends_one_user_message_and_returns_reply_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Two posts.\n" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answerer = QuestionAnswerer::new(Some("sk-test".into()))
        .with_model("gpt-4o-mini")
        .with_base_url(format!("{}/", server.uri()));
    let answer = answerer.answer(&feed(60), "how many?").await;
    assert_eq!(answer, "  Two posts.\n");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    let prompt = messages[0]["content"].as_str().unwrap();
    assert!(prompt.contains("post number 49"));
    assert!(!prompt.contains("post number 50"));
    assert!(prompt.ends_with("Question: how many?"));
}

#[tokio::test]
async fn remote_failure_becomes_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let answerer = QuestionAnswerer::new(Some("sk-test".into())).with_base_url(server.uri());

    let answer = answerer.answer(&feed(3), "anything new?").await;
    assert!(answer.starts_with("Error:"));
    assert!(answer.contains("429"));

    let err = answerer.ask(&feed(3), "anything new?").await.unwrap_err();
    assert!(matches!(err, AiError::Status { .. }));
}

#[tokio::test]
async fn unreachable_service_becomes_error_text() {
    let answerer =
        QuestionAnswerer::new(Some("sk-test".into())).with_base_url("http://127.0.0.1:9");
    let answer = answerer.answer(&feed(1), "hello?").await;
    assert!(answer.starts_with("Error:"));
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let answerer = QuestionAnswerer::new(Some("sk-test".into())).with_base_url(server.uri());
    let err = answerer.ask(&feed(1), "hello?").await.unwrap_err();
    assert!(matches!(err, AiError::EmptyResponse));
}
