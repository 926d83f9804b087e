// src/scoring/mod.rs
pub mod openai_client;
pub mod prompt;
pub mod types;

pub use openai_client::OpenAiEngine;
pub use prompt::INSTRUCTION_PROMPT;
pub use types::*;

use crate::error::{AppError, UpstreamKind};
use std::sync::Arc;
use tracing::{error, info};

/// Remote chat-completion capability. Returns the raw assistant message
/// content, which must be a JSON document.
#[rocket::async_trait]
pub trait ScoringEngine: Send + Sync {
    async fn complete(
        &self,
        system_text: &str,
        user_json: &str,
        model: OpenAiModel,
        api_key: &str,
    ) -> Result<String, AppError>;
}

pub struct ScoringClient {
    engine: Arc<dyn ScoringEngine>,
}

impl ScoringClient {
    pub fn new(engine: Arc<dyn ScoringEngine>) -> Self {
        Self { engine }
    }

    pub async fn score(
        &self,
        instruction: &str,
        payload: &serde_json::Value,
        api_key: Option<&str>,
        model: OpenAiModel,
    ) -> Result<AnalyzerOutput, AppError> {
        let api_key = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                error!("Scoring skipped: OPENAI_API_KEY is not configured");
                return Err(AppError::upstream(
                    UpstreamKind::Configuration,
                    "OPENAI_API_KEY is not configured",
                ));
            }
        };

        let user_json = serde_json::to_string(payload).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize scoring payload: {}", e))
        })?;

        info!("Requesting analysis from scoring engine with model {}", model);
        let content = self
            .engine
            .complete(instruction, &user_json, model, api_key)
            .await?;

        let output = parse_analyzer_output(&content)?;
        info!(
            "Scoring engine verdict: {} ({} fit)",
            output.recommendation(),
            output.overall_fit()
        );
        Ok(output)
    }
}
