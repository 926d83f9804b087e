// src/github/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitHubError {
    /// Network failures, 5xx, rate limits and rejected tokens. Retried.
    #[error("transient GitHub failure: {0}")]
    Transient(String),
    #[error("GitHub user not found: {0}")]
    NotFound(String),
    #[error("GitHub request failed: {0}")]
    Permanent(String),
}

impl GitHubError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHubError::Transient(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchFlags {
    pub include_all_commits: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatistics {
    pub total_commits: u64,
    pub total_prs: u64,
    pub total_prs_merged: u64,
    pub total_reviews: u64,
    pub total_issues: u64,
    pub contributed_to: u64,
}

/// Language name to total bytes across the user's own repositories.
pub type LanguageSizes = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub repo_count: u64,
    pub follower_count: u64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub language: Option<String>,
}

/// Everything fetched for one user before signals are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGitHubData {
    pub statistics: RawStatistics,
    pub languages: LanguageSizes,
    /// `None` when the profile fetch failed.
    pub profile: Option<Profile>,
    pub top_repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitFrequency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitConsistency {
    Sporadic,
    Consistent,
    VeryConsistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStyle {
    Team,
    Solo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentationLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadmeQuality {
    Poor,
    Average,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collaboration {
    pub team_ratio: f64,
    pub solo_ratio: f64,
    pub style: CollaborationStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Documentation {
    pub documented_ratio: f64,
    pub level: DocumentationLevel,
    pub readme_quality: ReadmeQuality,
}

/// Normalized, per-request view of a GitHub account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitHubStats {
    pub account_age_years: u32,
    pub public_repos: u64,
    pub followers: u64,
    pub total_commits: u64,
    pub total_prs: u64,
    pub total_prs_merged: u64,
    pub total_reviews: u64,
    pub total_issues: u64,
    pub contributed_to: u64,
    pub commits_per_year: f64,
    pub commit_frequency: CommitFrequency,
    pub commit_consistency: CommitConsistency,
    pub top_languages: Vec<LanguageShare>,
    pub collaboration: Collaboration,
    pub documentation: Documentation,
    pub top_repositories: Vec<RepositorySummary>,
}
