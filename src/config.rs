// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::scoring::OpenAiModel;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheSettings,
    pub openai: OpenAiSettings,
    pub github: GitHubSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Sweep expired records every N checks.
    pub cleanup_interval: u64,
    pub max_tracked_clients: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub default_seconds: u64,
    pub min_seconds: u64,
    pub max_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// Read from `OPENAI_API_KEY` only, never from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub default_model: OpenAiModel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub api_url: String,
    #[serde(skip)]
    pub tokens: Vec<String>,
    pub timeout_secs: u64,
    pub top_repositories: usize,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: Option<AppConfig>,
    #[serde(default)]
    production: Option<AppConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            rate_limit: RateLimitSettings::default(),
            cache: CacheSettings::default(),
            openai: OpenAiSettings::default(),
            github: GitHubSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            cleanup_interval: 256,
            max_tracked_clients: 10_000,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_seconds: 3600,
            min_seconds: 300,
            max_seconds: 86_400,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
            default_model: OpenAiModel::default(),
        }
    }
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            tokens: Vec::new(),
            timeout_secs: 30,
            top_repositories: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration: built-in defaults, then the optional YAML file
    /// section for the current environment, then environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let environment = Self::environment();
        info!("Loading configuration for environment: {}", environment);

        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config.yaml"));

        let mut config = if path.exists() {
            Self::load_from_file(&path, &environment)?
        } else {
            if config_path.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            info!("No config.yaml found, using built-in defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.check()?;
        Ok(config)
    }

    /// Config file section in use: `HIRING_SIGNAL_ENV`, then `ENVIRONMENT`,
    /// then `local`.
    pub fn environment() -> String {
        Self::environment_from(|key| std::env::var(key).ok())
    }

    pub fn environment_from<F>(lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        ["HIRING_SIGNAL_ENV", "ENVIRONMENT"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| "local".to_string())
    }

    fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let section = match environment {
            "production" => file.production,
            _ => file.local,
        };
        Ok(section.unwrap_or_default())
    }

    /// Overlay environment variables. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = non_empty("ROCKET_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }
        if let Some(address) = non_empty("ROCKET_ADDRESS") {
            self.server.address = address;
        }

        if let Some(value) = non_empty("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_number("RATE_LIMIT_MAX_REQUESTS", &value)?;
        }
        if let Some(value) = non_empty("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = parse_number("RATE_LIMIT_WINDOW_SECS", &value)?;
        }

        if let Some(value) = non_empty("CACHE_SECONDS_DEFAULT") {
            self.cache.default_seconds = parse_number("CACHE_SECONDS_DEFAULT", &value)?;
        }
        if let Some(value) = non_empty("CACHE_SECONDS_MIN") {
            self.cache.min_seconds = parse_number("CACHE_SECONDS_MIN", &value)?;
        }
        if let Some(value) = non_empty("CACHE_SECONDS_MAX") {
            self.cache.max_seconds = parse_number("CACHE_SECONDS_MAX", &value)?;
        }

        self.openai.api_key = non_empty("OPENAI_API_KEY").map(|k| k.trim().to_string());
        if let Some(url) = non_empty("OPENAI_API_URL") {
            self.openai.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = non_empty("GITHUB_API_URL") {
            self.github.api_url = url.trim_end_matches('/').to_string();
        }
        self.github.tokens = collect_github_tokens(&non_empty);

        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 {
            anyhow::bail!("rate_limit.max_requests must be at least 1");
        }
        if self.rate_limit.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be at least 1");
        }
        if self.cache.min_seconds > self.cache.max_seconds {
            anyhow::bail!(
                "cache.min_seconds ({}) is greater than cache.max_seconds ({})",
                self.cache.min_seconds,
                self.cache.max_seconds
            );
        }
        if self.openai.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set, every analysis will fail");
        }
        if self.github.tokens.is_empty() {
            warn!("No GitHub token configured (GITHUB_TOKEN or PAT_1..PAT_n)");
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got '{}'", key, value))
}

/// `GITHUB_TOKEN` first, then `PAT_1`, `PAT_2`, ... until the first gap.
fn collect_github_tokens<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut tokens = Vec::new();
    if let Some(token) = lookup("GITHUB_TOKEN") {
        tokens.push(token.trim().to_string());
    }
    for index in 1.. {
        match lookup(&format!("PAT_{}", index)) {
            Some(token) => tokens.push(token.trim().to_string()),
            None => break,
        }
    }
    let mut seen = HashSet::new();
    tokens.retain(|token| seen.insert(token.clone()));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.openai.timeout_secs, 60);
        assert_eq!(config.openai.default_model, OpenAiModel::Gpt4o);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup_from(&[
                ("OPENAI_API_KEY", " sk-test "),
                ("RATE_LIMIT_MAX_REQUESTS", "25"),
                ("ROCKET_PORT", "9000"),
                ("GITHUB_TOKEN", "ghp_a"),
                ("PAT_1", "ghp_b"),
                ("PAT_2", "ghp_c"),
                ("PAT_4", "ghp_skipped"),
            ]))
            .unwrap();

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.rate_limit.max_requests, 25);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.github.tokens, vec!["ghp_a", "ghp_b", "ghp_c"]);
    }

    #[test]
    fn test_environment_resolution_order() {
        assert_eq!(AppConfig::environment_from(lookup_from(&[])), "local");
        assert_eq!(
            AppConfig::environment_from(lookup_from(&[("ENVIRONMENT", "production")])),
            "production"
        );
        assert_eq!(
            AppConfig::environment_from(lookup_from(&[
                ("HIRING_SIGNAL_ENV", "local"),
                ("ENVIRONMENT", "production"),
            ])),
            "local"
        );
    }

    #[test]
    fn test_duplicate_tokens_keep_first_occurrence() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup_from(&[
                ("GITHUB_TOKEN", "ghp_a"),
                ("PAT_1", "ghp_b"),
                ("PAT_2", "ghp_a"),
                ("PAT_3", " ghp_b "),
                ("PAT_4", "ghp_c"),
            ]))
            .unwrap();

        assert_eq!(config.github.tokens, vec!["ghp_a", "ghp_b", "ghp_c"]);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env(lookup_from(&[("ROCKET_PORT", "not-a-port")]))
            .is_err());
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
local:
  rate_limit:
    max_requests: 3
production:
  rate_limit:
    max_requests: 100
    window_secs: 120
  cache:
    default_seconds: 7200
"#;
        let local = AppConfig::from_yaml(yaml, "local").unwrap();
        assert_eq!(local.rate_limit.max_requests, 3);
        assert_eq!(local.rate_limit.window_secs, 60);

        let production = AppConfig::from_yaml(yaml, "production").unwrap();
        assert_eq!(production.rate_limit.max_requests, 100);
        assert_eq!(production.rate_limit.window_secs, 120);
        assert_eq!(production.cache.default_seconds, 7200);
    }
}
