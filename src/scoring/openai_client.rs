// src/scoring/openai_client.rs
use super::{OpenAiModel, ScoringEngine};
use crate::error::{AppError, UpstreamKind};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// OpenAI chat-completions backed scoring engine.
pub struct OpenAiEngine {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiEngine {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn classify_status(status: StatusCode, body: &str) -> AppError {
        match status {
            StatusCode::UNAUTHORIZED => {
                AppError::upstream(UpstreamKind::Authentication, "Invalid OpenAI API key")
            }
            StatusCode::TOO_MANY_REQUESTS => AppError::upstream(
                UpstreamKind::Throttled,
                "OpenAI rate limit exceeded",
            ),
            _ => AppError::upstream(
                UpstreamKind::Transport,
                format!("OpenAI returned status {}: {}", status, summarize(body)),
            ),
        }
    }
}

#[rocket::async_trait]
impl ScoringEngine for OpenAiEngine {
    async fn complete(
        &self,
        system_text: &str,
        user_json: &str,
        model: OpenAiModel,
        api_key: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: model.as_str(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_text,
                },
                ChatMessage {
                    role: "user",
                    content: user_json,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: 0.2,
        };

        info!("Sending request to OpenAI: {} ({})", url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("OpenAI request timed out after {:?}", self.timeout);
                    AppError::upstream(
                        UpstreamKind::Transport,
                        format!("Request timed out after {}s", self.timeout.as_secs()),
                    )
                } else {
                    error!("OpenAI request failed: {}", e);
                    AppError::upstream(UpstreamKind::Transport, e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::upstream(
                UpstreamKind::Transport,
                format!("Failed to read response body: {}", e),
            )
        })?;

        if !status.is_success() {
            error!("OpenAI API error {}: {}", status, summarize(&body));
            return Err(Self::classify_status(status, &body));
        }

        let chat: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse OpenAI response envelope: {}", e);
            AppError::upstream(
                UpstreamKind::Malformed,
                format!("Unexpected response envelope: {}", e),
            )
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                AppError::upstream(UpstreamKind::Malformed, "Response contained no message")
            })?;

        info!("Successfully received response from OpenAI");
        Ok(content)
    }
}

/// First 200 characters, for logs and error messages.
fn summarize(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        format!("{}...", trimmed.chars().take(200).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        let auth = OpenAiEngine::classify_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(
            auth,
            AppError::Upstream {
                kind: UpstreamKind::Authentication,
                ..
            }
        ));

        let throttled = OpenAiEngine::classify_status(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(
            throttled,
            AppError::Upstream {
                kind: UpstreamKind::Throttled,
                ..
            }
        ));

        let other = OpenAiEngine::classify_status(StatusCode::BAD_GATEWAY, "upstream down");
        match other {
            AppError::Upstream {
                kind: UpstreamKind::Transport,
                message,
            } => assert!(message.contains("502")),
            e => panic!("unexpected: {:?}", e),
        }
    }

    #[test]
    fn test_summarize_truncates() {
        let long = "x".repeat(500);
        assert_eq!(summarize(&long).len(), 203);
        assert_eq!(summarize("  short "), "short");
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: OpenAiModel::Gpt4o.as_str(),
            messages: vec![ChatMessage {
                role: "system",
                content: "hi",
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: 0.2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let engine = OpenAiEngine::new("http://127.0.0.1:9", 2).unwrap();
        let err = engine
            .complete("system", "{}", OpenAiModel::Gpt4o, "sk-test")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream {
                kind: UpstreamKind::Transport,
                ..
            }
        ));
    }
}
