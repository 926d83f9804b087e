// src/github/client.rs
use super::types::*;
use super::GitHubSource;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "hiring-signal";
const MIN_ATTEMPTS: usize = 3;
const MAX_ATTEMPTS: usize = 10;

const STATS_QUERY: &str = r#"
query userInfo($login: String!) {
  user(login: $login) {
    contributionsCollection {
      totalCommitContributions
      totalPullRequestReviewContributions
    }
    repositoriesContributedTo(
      first: 1
      contributionTypes: [COMMIT, ISSUE, PULL_REQUEST, REPOSITORY]
    ) {
      totalCount
    }
    pullRequests(first: 1) {
      totalCount
    }
    mergedPullRequests: pullRequests(states: MERGED) {
      totalCount
    }
    openIssues: issues(states: OPEN) {
      totalCount
    }
    closedIssues: issues(states: CLOSED) {
      totalCount
    }
  }
}
"#;

const LANGUAGES_QUERY: &str = r#"
query userLanguages($login: String!) {
  user(login: $login) {
    repositories(ownerAffiliations: OWNER, isFork: false, first: 100) {
      nodes {
        name
        languages(first: 10, orderBy: {field: SIZE, direction: DESC}) {
          edges {
            size
            node {
              name
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserData<T> {
    user: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TotalCount {
    #[serde(rename = "totalCount")]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    total_commit_contributions: u64,
    total_pull_request_review_contributions: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsUser {
    contributions_collection: ContributionsCollection,
    repositories_contributed_to: TotalCount,
    pull_requests: TotalCount,
    merged_pull_requests: TotalCount,
    open_issues: TotalCount,
    closed_issues: TotalCount,
}

#[derive(Debug, Deserialize)]
struct LanguagesUser {
    repositories: RepositoryNodes,
}

#[derive(Debug, Deserialize)]
struct RepositoryNodes {
    #[serde(default)]
    nodes: Vec<Option<LanguageRepository>>,
}

#[derive(Debug, Deserialize)]
struct LanguageRepository {
    languages: LanguageEdges,
}

#[derive(Debug, Deserialize)]
struct LanguageEdges {
    #[serde(default)]
    edges: Vec<LanguageEdge>,
}

#[derive(Debug, Deserialize)]
struct LanguageEdge {
    size: u64,
    node: LanguageNode,
}

#[derive(Debug, Deserialize)]
struct LanguageNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RestUser {
    public_repos: u64,
    followers: u64,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RestRepository {
    name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    language: Option<String>,
    #[serde(default)]
    fork: bool,
}

#[derive(Debug, Deserialize)]
struct CommitSearch {
    total_count: u64,
}

/// GitHub GraphQL + REST client.
///
/// Transient failures are retried, rotating through the configured tokens
/// so a rate-limited or revoked token does not fail the request.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    tokens: Vec<String>,
    backoff: Duration,
    top_repositories: usize,
}

impl GitHubClient {
    pub fn new(
        api_url: impl Into<String>,
        tokens: Vec<String>,
        timeout_secs: u64,
        top_repositories: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            tokens,
            backoff: Duration::from_millis(250),
            top_repositories,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn max_attempts(&self) -> usize {
        self.tokens.len().clamp(MIN_ATTEMPTS, MAX_ATTEMPTS)
    }

    fn token_for_attempt(&self, attempt: usize) -> Option<String> {
        if self.tokens.is_empty() {
            None
        } else {
            Some(self.tokens[attempt % self.tokens.len()].clone())
        }
    }

    async fn with_retry<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, GitHubError>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        retry_transient(
            label,
            self.max_attempts(),
            self.backoff,
            |attempt| self.token_for_attempt(attempt),
            operation,
        )
        .await
    }

    fn authorize(&self, request: RequestBuilder, token: Option<String>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        login: &str,
        token: Option<String>,
    ) -> Result<T, GitHubError> {
        let url = format!("{}/graphql", self.api_url);
        let request = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "variables": { "login": login } }));

        let body = send(self.authorize(request, token)).await?;
        let response: GraphQlResponse<UserData<T>> = serde_json::from_str(&body)
            .map_err(|e| GitHubError::Permanent(format!("Unexpected GraphQL response: {}", e)))?;
        unwrap_graphql(response, login)
    }

    async fn rest<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<String>,
    ) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        let request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");

        let body = send(self.authorize(request, token)).await?;
        serde_json::from_str(&body)
            .map_err(|e| GitHubError::Permanent(format!("Unexpected REST response: {}", e)))
    }

    async fn fetch_total_commits(&self, username: &str) -> Result<u64, GitHubError> {
        let path = format!("/search/commits?q=author:{}&per_page=1", username);
        let search: CommitSearch = self
            .with_retry("commit search", |token| self.rest(&path, token))
            .await?;
        Ok(search.total_count)
    }
}

#[rocket::async_trait]
impl GitHubSource for GitHubClient {
    async fn fetch_statistics(
        &self,
        username: &str,
        flags: FetchFlags,
    ) -> Result<RawStatistics, GitHubError> {
        let user: StatsUser = self
            .with_retry("statistics", |token| self.graphql(STATS_QUERY, username, token))
            .await?;

        let mut statistics = RawStatistics {
            total_commits: user.contributions_collection.total_commit_contributions,
            total_prs: user.pull_requests.total_count,
            total_prs_merged: user.merged_pull_requests.total_count,
            total_reviews: user
                .contributions_collection
                .total_pull_request_review_contributions,
            total_issues: user.open_issues.total_count + user.closed_issues.total_count,
            contributed_to: user.repositories_contributed_to.total_count,
        };

        if flags.include_all_commits {
            statistics.total_commits = self.fetch_total_commits(username).await?;
        }

        debug!("Fetched statistics for {}: {:?}", username, statistics);
        Ok(statistics)
    }

    async fn fetch_languages(&self, username: &str) -> Result<LanguageSizes, GitHubError> {
        let user: LanguagesUser = self
            .with_retry("languages", |token| {
                self.graphql(LANGUAGES_QUERY, username, token)
            })
            .await?;

        let mut sizes = LanguageSizes::new();
        for repository in user.repositories.nodes.into_iter().flatten() {
            for edge in repository.languages.edges {
                *sizes.entry(edge.node.name).or_insert(0) += edge.size;
            }
        }
        Ok(sizes)
    }

    async fn fetch_profile(&self, username: &str) -> Result<Profile, GitHubError> {
        let path = format!("/users/{}", username);
        let user: RestUser = self
            .with_retry("profile", |token| self.rest(&path, token))
            .await?;

        Ok(Profile {
            repo_count: user.public_repos,
            follower_count: user.followers,
            created_at: user.created_at,
        })
    }

    async fn fetch_top_repositories(
        &self,
        username: &str,
    ) -> Result<Vec<RepositorySummary>, GitHubError> {
        let path = format!("/users/{}/repos?type=owner&sort=pushed&per_page=100", username);
        let repositories: Vec<RestRepository> = self
            .with_retry("repositories", |token| self.rest(&path, token))
            .await?;

        Ok(select_top_repositories(repositories, self.top_repositories))
    }
}

/// Run `operation` until it succeeds, fails permanently, or `max_attempts`
/// is reached. Sleeps `backoff * 2^attempt` between attempts.
pub(crate) async fn retry_transient<T, F, Fut, K>(
    label: &str,
    max_attempts: usize,
    backoff: Duration,
    token_for_attempt: K,
    operation: F,
) -> Result<T, GitHubError>
where
    F: Fn(Option<String>) -> Fut,
    Fut: Future<Output = Result<T, GitHubError>>,
    K: Fn(usize) -> Option<String>,
{
    let mut attempt = 0;
    loop {
        match operation(token_for_attempt(attempt)).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                warn!(
                    "GitHub {} attempt {}/{} failed, retrying: {}",
                    label,
                    attempt + 1,
                    max_attempts,
                    err
                );
                tokio::time::sleep(backoff * 2u32.pow(attempt as u32)).await;
                attempt += 1;
            }
            Err(err) => {
                info!("GitHub {} failed after {} attempt(s): {}", label, attempt + 1, err);
                return Err(err);
            }
        }
    }
}

async fn send(request: RequestBuilder) -> Result<String, GitHubError> {
    let response = request
        .send()
        .await
        .map_err(|e| GitHubError::Transient(format!("request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GitHubError::Transient(format!("failed to read body: {}", e)))?;

    match classify_status(status) {
        None => Ok(body),
        Some(err) => Err(err),
    }
}

pub(crate) fn classify_status(status: StatusCode) -> Option<GitHubError> {
    if status.is_success() {
        return None;
    }
    let err = match status {
        StatusCode::UNAUTHORIZED => GitHubError::Transient("bad credentials".to_string()),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            GitHubError::Transient("rate limited".to_string())
        }
        StatusCode::NOT_FOUND => GitHubError::NotFound("resource not found".to_string()),
        s if s.is_server_error() => GitHubError::Transient(format!("server error {}", s)),
        s => GitHubError::Permanent(format!("unexpected status {}", s)),
    };
    Some(err)
}

fn unwrap_graphql<T>(
    response: GraphQlResponse<UserData<T>>,
    login: &str,
) -> Result<T, GitHubError> {
    if let Some(error) = response.errors.first() {
        return Err(match error.error_type.as_deref() {
            Some("NOT_FOUND") => GitHubError::NotFound(login.to_string()),
            Some("RATE_LIMITED") => GitHubError::Transient("rate limited".to_string()),
            _ => GitHubError::Permanent(error.message.clone()),
        });
    }
    response
        .data
        .and_then(|data| data.user)
        .ok_or_else(|| GitHubError::NotFound(login.to_string()))
}

fn select_top_repositories(
    repositories: Vec<RestRepository>,
    limit: usize,
) -> Vec<RepositorySummary> {
    let mut owned: Vec<RestRepository> = repositories.into_iter().filter(|r| !r.fork).collect();
    owned.sort_by(|a, b| {
        b.stargazers_count
            .cmp(&a.stargazers_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    owned
        .into_iter()
        .take(limit)
        .map(|r| RepositorySummary {
            name: r.name,
            description: r.description,
            stars: r.stargazers_count,
            language: r.language,
        })
        .collect()
}
