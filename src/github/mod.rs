// src/github/mod.rs
pub mod aggregator;
pub mod client;
pub mod signals;
pub mod types;

pub use aggregator::Aggregator;
pub use client::GitHubClient;
pub use types::*;

/// Read-only view of a GitHub account. Implementations are expected to
/// retry transient failures themselves before returning an error.
#[rocket::async_trait]
pub trait GitHubSource: Send + Sync {
    async fn fetch_statistics(
        &self,
        username: &str,
        flags: FetchFlags,
    ) -> Result<RawStatistics, GitHubError>;

    async fn fetch_languages(&self, username: &str) -> Result<LanguageSizes, GitHubError>;

    async fn fetch_profile(&self, username: &str) -> Result<Profile, GitHubError>;

    async fn fetch_top_repositories(
        &self,
        username: &str,
    ) -> Result<Vec<RepositorySummary>, GitHubError>;
}
