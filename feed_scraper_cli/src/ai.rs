use crate::error::AiError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Only the first blocks, in collection order, go into the prompt.
pub const MAX_PROMPT_BLOCKS: usize = 50;

/// Fixed frame around the feed text and the user's question.
pub fn build_prompt(blocks: &[String], question: &str) -> String {
    let feed = blocks
        .iter()
        .take(MAX_PROMPT_BLOCKS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "These are tweets I saw today:\n\n{}\n\nQuestion: {}",
        feed, question
    )
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct QuestionAnswerer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl QuestionAnswerer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Always returns text: the model's reply, or a message starting with
    /// `Error:` describing what went wrong.
    pub async fn answer(&self, blocks: &[String], question: &str) -> String {
        match self.ask(blocks, question).await {
            Ok(reply) => reply,
            Err(AiError::MissingCredential) => {
                warn!("question asked without an API key");
                "Error: no OpenAI API key configured. Set OPENAI_API_KEY in the environment or the secrets file.".to_string()
            }
            Err(e) => {
                warn!("question answering failed: {}", e);
                format!("Error: could not get an answer from the language model ({})", e)
            }
        }
    }

    pub async fn ask(&self, blocks: &[String], question: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingCredential)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| AiError::InvalidCredential)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": build_prompt(blocks, question)
                }
            ]
        });

        info!(
            "asking {} about {} blocks",
            self.model,
            blocks.len().min(MAX_PROMPT_BLOCKS)
        );
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(headers)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status { status, body });
        }

        let completion = response.json::<ChatCompletion>().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_keeps_only_the_first_fifty_blocks() {
        let blocks: Vec<String> = (0..60).map(|i| format!("block number {:02}", i)).collect();
        let prompt = build_prompt(&blocks, "what happened?");

        assert!(prompt.starts_with("These are tweets I saw today:\n\nblock number 00\n\n"));
        assert!(prompt.contains("block number 49\n\nQuestion: what happened?"));
        assert!((50..60).all(|i| !prompt.contains(&format!("block number {:02}", i))));
    }

    #[test]
    fn prompt_with_no_blocks_still_carries_question() {
        assert_eq!(
            build_prompt(&[], "anything?"),
            "These are tweets I saw today:\n\n\n\nQuestion: anything?"
        );
    }

    #[tokio::test]
    async fn missing_key_yields_error_text() {
        let answerer = QuestionAnswerer::new(None);
        assert!(!answerer.has_credential());
        let answer = answerer.answer(&["some text".into()], "why?").await;
        assert!(answer.starts_with("Error:"));
        assert!(answer.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        assert!(!QuestionAnswerer::new(Some("  ".into())).has_credential());
    }
}
