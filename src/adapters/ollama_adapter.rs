//! Ollama chat API text generator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::error::AdvisorError;
use crate::ports::text_port::{TextGenerator, TextRequest};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

/// Zero temperature keeps extraction replies stable across calls.
#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

fn chat_body<'a>(model: &'a str, request: &'a TextRequest) -> ChatBody<'a> {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: &request.system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.user,
    });
    ChatBody {
        model,
        messages,
        stream: false,
        format: request.json.then_some("json"),
        options: ChatOptions { temperature: 0.0 },
    }
}

pub struct OllamaAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
    max_attempts: u32,
}

impl OllamaAdapter {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
            timeout,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    async fn attempt(&self, body: &ChatBody<'_>) -> Result<String, AdvisorError> {
        let response = self.client.post(&self.endpoint).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdvisorError::Http {
                reason: format!("{} returned {}", self.endpoint, status),
            });
        }
        let reply: ChatReply = response.json().await?;
        Ok(reply.message.content)
    }
}

#[async_trait]
impl TextGenerator for OllamaAdapter {
    async fn complete(&self, request: &TextRequest) -> Result<String, AdvisorError> {
        let body = chat_body(&self.model, request);
        let seconds = self.timeout.as_secs();

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match timeout(self.timeout, self.attempt(&body)).await {
                Ok(Ok(content)) => {
                    debug!(model = %self.model, attempt, chars = content.len(), "completion received");
                    return Ok(content);
                }
                Ok(Err(e)) => {
                    warn!(model = %self.model, attempt, error = %e, "completion failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    warn!(model = %self.model, attempt, seconds, "completion timed out");
                    last_error = Some(AdvisorError::timeout("text generation", seconds));
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(attempt - 1))).await;
            }
        }
        Err(last_error.unwrap_or_else(|| AdvisorError::Http {
            reason: "no completion attempts were made".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_request_sets_format() {
        let request = TextRequest::json("extract tickers", "how is AAPL?");
        let body = serde_json::to_value(chat_body("gemma3", &request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gemma3",
                "messages": [
                    {"role": "system", "content": "extract tickers"},
                    {"role": "user", "content": "how is AAPL?"}
                ],
                "stream": false,
                "format": "json",
                "options": {"temperature": 0.0}
            })
        );
    }

    #[test]
    fn text_request_omits_format_and_empty_system() {
        let request = TextRequest::text("", "hello");
        let body = serde_json::to_value(chat_body("gemma3", &request)).unwrap();
        assert!(body.get("format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn reply_content_is_extracted() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"model":"gemma3","message":{"role":"assistant","content":"{\"tickers\":[]}"},"done":true}"#,
        )
        .unwrap();
        assert_eq!(reply.message.content, r#"{"tickers":[]}"#);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let adapter = OllamaAdapter::new("http://127.0.0.1:9", "gemma3", Duration::from_secs(2))
            .unwrap()
            .with_max_attempts(1);
        let err = adapter
            .complete(&TextRequest::text("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Http { .. } | AdvisorError::Timeout { .. }));
    }
}
