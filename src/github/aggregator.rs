// src/github/aggregator.rs
use super::signals;
use super::types::*;
use super::GitHubSource;
use crate::clock::Clock;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Aggregator {
    source: Arc<dyn GitHubSource>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn GitHubSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Fetch statistics, languages, profile and top repositories
    /// concurrently, then derive the normalized stats.
    ///
    /// Statistics and languages are required: the first of them to fail
    /// aborts the aggregation. Profile and repository failures degrade to
    /// defaults.
    pub async fn aggregate(
        &self,
        username: &str,
        flags: FetchFlags,
    ) -> Result<GitHubStats, AppError> {
        info!("Aggregating GitHub data for {}", username);

        let profile = async {
            match self.source.fetch_profile(username).await {
                Ok(profile) => Ok::<_, GitHubError>(Some(profile)),
                Err(e) => {
                    warn!("Profile fetch failed for {}, using defaults: {}", username, e);
                    Ok(None)
                }
            }
        };

        let top_repositories = async {
            match self.source.fetch_top_repositories(username).await {
                Ok(repositories) => Ok::<_, GitHubError>(repositories),
                Err(e) => {
                    warn!("Repository fetch failed for {}: {}", username, e);
                    Ok(Vec::new())
                }
            }
        };

        let (statistics, languages, profile, top_repositories) = tokio::try_join!(
            self.source.fetch_statistics(username, flags),
            self.source.fetch_languages(username),
            profile,
            top_repositories,
        )
        .map_err(|e| {
            error!("GitHub aggregation failed for {}: {}", username, e);
            match e {
                GitHubError::NotFound(_) => {
                    AppError::Aggregation(format!("GitHub user '{}' not found", username))
                }
                GitHubError::Transient(_) => {
                    AppError::Aggregation("GitHub API is unavailable, try again later".to_string())
                }
                GitHubError::Permanent(_) => {
                    AppError::Aggregation("GitHub API request failed".to_string())
                }
            }
        })?;

        let raw = RawGitHubData {
            statistics,
            languages,
            profile,
            top_repositories,
        };
        let stats = signals::derive(&raw, self.clock.now());

        info!(
            "Aggregated GitHub data for {}: {} commits, {:?} frequency",
            username, stats.total_commits, stats.commit_frequency
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixtureSource {
        statistics: Result<RawStatistics, GitHubError>,
        languages: Result<LanguageSizes, GitHubError>,
        profile: Result<Profile, GitHubError>,
        saw_all_commits: AtomicBool,
    }

    impl FixtureSource {
        fn healthy() -> Self {
            Self {
                statistics: Ok(RawStatistics {
                    total_commits: 240,
                    contributed_to: 3,
                    ..Default::default()
                }),
                languages: Ok([("Go".to_string(), 100)].into_iter().collect()),
                profile: Ok(Profile {
                    repo_count: 9,
                    follower_count: 12,
                    created_at: Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()),
                }),
                saw_all_commits: AtomicBool::new(false),
            }
        }
    }

    #[rocket::async_trait]
    impl GitHubSource for FixtureSource {
        async fn fetch_statistics(
            &self,
            _username: &str,
            flags: FetchFlags,
        ) -> Result<RawStatistics, GitHubError> {
            self.saw_all_commits
                .store(flags.include_all_commits, Ordering::SeqCst);
            self.statistics.clone()
        }

        async fn fetch_languages(&self, _username: &str) -> Result<LanguageSizes, GitHubError> {
            self.languages.clone()
        }

        async fn fetch_profile(&self, _username: &str) -> Result<Profile, GitHubError> {
            self.profile.clone()
        }

        async fn fetch_top_repositories(
            &self,
            _username: &str,
        ) -> Result<Vec<RepositorySummary>, GitHubError> {
            Err(GitHubError::Transient("server error 502".into()))
        }
    }

    fn aggregator(source: FixtureSource) -> (Aggregator, Arc<FixtureSource>) {
        let source = Arc::new(source);
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        ));
        (Aggregator::new(source.clone(), clock), source)
    }

    #[tokio::test]
    async fn test_aggregate_combines_sources() {
        let (aggregator, source) = aggregator(FixtureSource::healthy());
        let stats = aggregator
            .aggregate(
                "octocat",
                FetchFlags {
                    include_all_commits: true,
                },
            )
            .await
            .unwrap();

        assert!(source.saw_all_commits.load(Ordering::SeqCst));
        assert_eq!(stats.account_age_years, 2);
        assert_eq!(stats.public_repos, 9);
        assert_eq!(stats.commit_frequency, CommitFrequency::Medium);
        assert_eq!(stats.top_languages[0].name, "Go");
        assert!(stats.top_repositories.is_empty());
    }

    #[tokio::test]
    async fn test_profile_failure_degrades_to_defaults() {
        let mut source = FixtureSource::healthy();
        source.profile = Err(GitHubError::Transient("timeout".into()));
        let (aggregator, _) = aggregator(source);

        let stats = aggregator
            .aggregate("octocat", FetchFlags::default())
            .await
            .unwrap();
        assert_eq!(stats.account_age_years, 1);
        assert_eq!(stats.public_repos, 0);
        assert_eq!(stats.followers, 0);
    }

    #[tokio::test]
    async fn test_statistics_failure_aborts() {
        let mut source = FixtureSource::healthy();
        source.statistics = Err(GitHubError::NotFound("octocat".into()));
        let (aggregator, _) = aggregator(source);

        let err = aggregator
            .aggregate("octocat", FetchFlags::default())
            .await
            .unwrap_err();
        match err {
            AppError::Aggregation(message) => assert!(message.contains("not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_languages_failure_aborts() {
        let mut source = FixtureSource::healthy();
        source.languages = Err(GitHubError::Permanent("unexpected status 422".into()));
        let (aggregator, _) = aggregator(source);

        assert!(aggregator
            .aggregate("octocat", FetchFlags::default())
            .await
            .is_err());
    }
}
