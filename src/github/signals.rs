// src/github/signals.rs
//! Secondary signals derived from fetched GitHub numbers.
//!
//! Everything here is a pure function of its inputs (including `now`), so
//! fixed fixtures always produce the same [`GitHubStats`].

use super::types::*;
use chrono::{DateTime, Utc};

pub const FREQUENCY_MEDIUM_PER_YEAR: f64 = 50.0;
pub const FREQUENCY_HIGH_PER_YEAR: f64 = 200.0;
pub const CONSISTENCY_CONSISTENT_PER_MONTH: f64 = 2.0;
pub const CONSISTENCY_VERY_CONSISTENT_PER_MONTH: f64 = 10.0;
pub const DOCUMENTATION_MEDIUM_RATIO: f64 = 0.3;
pub const DOCUMENTATION_HIGH_RATIO: f64 = 0.7;
pub const README_AVERAGE_RATIO: f64 = 0.4;
pub const README_STRONG_RATIO: f64 = 0.7;
/// A repository counts as documented when its description is longer than this.
pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const TOP_LANGUAGES: usize = 5;

pub fn derive(raw: &RawGitHubData, now: DateTime<Utc>) -> GitHubStats {
    let profile = raw.profile.clone().unwrap_or_else(default_profile);
    let account_age_years = account_age_years(profile.created_at, now);
    let commits_per_year = raw.statistics.total_commits as f64 / account_age_years as f64;

    GitHubStats {
        account_age_years,
        public_repos: profile.repo_count,
        followers: profile.follower_count,
        total_commits: raw.statistics.total_commits,
        total_prs: raw.statistics.total_prs,
        total_prs_merged: raw.statistics.total_prs_merged,
        total_reviews: raw.statistics.total_reviews,
        total_issues: raw.statistics.total_issues,
        contributed_to: raw.statistics.contributed_to,
        commits_per_year: round2(commits_per_year),
        commit_frequency: commit_frequency(commits_per_year),
        commit_consistency: commit_consistency(commits_per_year / 12.0),
        top_languages: top_languages(&raw.languages, TOP_LANGUAGES),
        collaboration: collaboration(raw.statistics.contributed_to, profile.repo_count),
        documentation: documentation(&raw.top_repositories),
        top_repositories: raw.top_repositories.clone(),
    }
}

/// Fallback used when the profile cannot be fetched: no repos, no
/// followers, one year old.
pub fn default_profile() -> Profile {
    Profile {
        repo_count: 0,
        follower_count: 0,
        created_at: None,
    }
}

/// Whole years since account creation, never less than 1.
pub fn account_age_years(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    created_at
        .and_then(|created| now.years_since(created))
        .unwrap_or(0)
        .max(1)
}

pub fn commit_frequency(commits_per_year: f64) -> CommitFrequency {
    if commits_per_year < FREQUENCY_MEDIUM_PER_YEAR {
        CommitFrequency::Low
    } else if commits_per_year < FREQUENCY_HIGH_PER_YEAR {
        CommitFrequency::Medium
    } else {
        CommitFrequency::High
    }
}

pub fn commit_consistency(commits_per_month: f64) -> CommitConsistency {
    if commits_per_month < CONSISTENCY_CONSISTENT_PER_MONTH {
        CommitConsistency::Sporadic
    } else if commits_per_month < CONSISTENCY_VERY_CONSISTENT_PER_MONTH {
        CommitConsistency::Consistent
    } else {
        CommitConsistency::VeryConsistent
    }
}

/// Largest languages first; equal sizes are ordered by name.
pub fn top_languages(languages: &LanguageSizes, limit: usize) -> Vec<LanguageShare> {
    let total: u64 = languages.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut entries: Vec<(&String, &u64)> = languages
        .iter()
        .filter(|(_, size)| **size > 0)
        .collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .take(limit)
        .map(|(name, size)| LanguageShare {
            name: name.clone(),
            percentage: round2(*size as f64 / total as f64 * 100.0),
        })
        .collect()
}

pub fn collaboration(contributed_to: u64, owned_repos: u64) -> Collaboration {
    let total = contributed_to + owned_repos;
    let team_ratio = if total == 0 {
        0.0
    } else {
        contributed_to as f64 / total as f64
    };

    Collaboration {
        team_ratio: round2(team_ratio),
        solo_ratio: round2(1.0 - team_ratio),
        style: if team_ratio >= 0.5 {
            CollaborationStyle::Team
        } else {
            CollaborationStyle::Solo
        },
    }
}

pub fn documentation(repositories: &[RepositorySummary]) -> Documentation {
    let documented = repositories
        .iter()
        .filter(|repo| {
            repo.description
                .as_deref()
                .is_some_and(|d| d.trim().chars().count() > DESCRIPTION_MIN_CHARS)
        })
        .count();
    let ratio = if repositories.is_empty() {
        0.0
    } else {
        documented as f64 / repositories.len() as f64
    };

    Documentation {
        documented_ratio: round2(ratio),
        level: documentation_level(ratio),
        readme_quality: readme_quality(ratio),
    }
}

pub fn documentation_level(ratio: f64) -> DocumentationLevel {
    if ratio < DOCUMENTATION_MEDIUM_RATIO {
        DocumentationLevel::Low
    } else if ratio < DOCUMENTATION_HIGH_RATIO {
        DocumentationLevel::Medium
    } else {
        DocumentationLevel::High
    }
}

pub fn readme_quality(ratio: f64) -> ReadmeQuality {
    if ratio < README_AVERAGE_RATIO {
        ReadmeQuality::Poor
    } else if ratio < README_STRONG_RATIO {
        ReadmeQuality::Average
    } else {
        ReadmeQuality::Strong
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
