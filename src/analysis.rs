// src/analysis.rs
use crate::error::AppError;
use crate::github::{Aggregator, FetchFlags, GitHubStats};
use crate::scoring::{AnalyzerOutput, ScoringClient, INSTRUCTION_PROMPT};
use crate::types::AnalysisRequest;
use serde_json::{json, Value};
use tracing::info;

/// Runs aggregation then scoring for one validated request.
pub struct AnalysisService {
    aggregator: Aggregator,
    scoring: ScoringClient,
    api_key: Option<String>,
}

impl AnalysisService {
    pub fn new(aggregator: Aggregator, scoring: ScoringClient, api_key: Option<String>) -> Self {
        Self {
            aggregator,
            scoring,
            api_key,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerOutput, AppError> {
        info!(
            "Starting analysis of {} for '{}' ({} {})",
            request.username,
            request.job_role.title,
            request.job_role.seniority,
            request.job_role.focus
        );

        let stats = self
            .aggregator
            .aggregate(
                &request.username,
                FetchFlags {
                    include_all_commits: request.include_all_commits,
                },
            )
            .await?;

        let payload = build_payload(request, &stats);

        let output = self
            .scoring
            .score(
                INSTRUCTION_PROMPT,
                &payload,
                self.api_key.as_deref(),
                request.model,
            )
            .await?;

        info!("Analysis of {} completed", request.username);
        Ok(output)
    }
}

/// The user message sent to the scoring engine.
pub fn build_payload(request: &AnalysisRequest, stats: &GitHubStats) -> Value {
    json!({
        "candidate": {
            "username": request.username,
            "github_stats": stats,
        },
        "job_role": request.job_role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::signals;
    use crate::github::{RawGitHubData, RawStatistics};
    use crate::scoring::OpenAiModel;
    use crate::types::{Focus, JobRole, Seniority};
    use chrono::Utc;

    #[test]
    fn test_payload_shape() {
        let request = AnalysisRequest {
            username: "octocat".to_string(),
            job_role: JobRole {
                title: "Engineer".to_string(),
                required_skills: vec!["JavaScript".to_string()],
                nice_to_have_skills: vec![],
                seniority: Seniority::Mid,
                focus: Focus::Frontend,
            },
            include_all_commits: false,
            model: OpenAiModel::Gpt4o,
            cache_seconds: 3600,
        };
        let stats = signals::derive(
            &RawGitHubData {
                statistics: RawStatistics::default(),
                languages: Default::default(),
                profile: None,
                top_repositories: vec![],
            },
            Utc::now(),
        );

        let payload = build_payload(&request, &stats);
        assert_eq!(payload["candidate"]["username"], "octocat");
        assert_eq!(payload["candidate"]["github_stats"]["commit_frequency"], "low");
        assert_eq!(
            payload["candidate"]["github_stats"]["commit_consistency"],
            "sporadic"
        );
        assert_eq!(payload["job_role"]["seniority"], "mid");
        assert_eq!(payload["job_role"]["focus"], "frontend");
        assert_eq!(payload["job_role"]["required_skills"][0], "JavaScript");
    }
}
