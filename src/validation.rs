// src/validation.rs
//! Turns raw `/api/analyze` query parameters into an [`AnalysisRequest`].
//!
//! Checks run in a fixed order: `username` presence, then presence of the
//! job-role group, then each field individually. The first failure is
//! reported and names the offending field.

use crate::config::{AppConfig, CacheSettings};
use crate::error::AppError;
use crate::scoring::OpenAiModel;
use crate::types::{AnalysisRequest, Focus, JobRole, Seniority};
use crate::utils::{char_len, non_blank, split_comma_list, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use rocket::form::FromForm;

pub const MAX_USERNAME_CHARS: usize = 39;
pub const MAX_JOB_TITLE_CHARS: usize = 100;
pub const MAX_SKILLS: usize = 50;
pub const MAX_SKILL_CHARS: usize = 50;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*$").expect("valid username regex"));

/// Query string exactly as received. Every field is optional here so that
/// missing parameters produce our own 400 messages.
#[derive(Debug, Clone, Default, PartialEq, FromForm)]
pub struct AnalyzeParams {
    pub username: Option<String>,
    pub job_title: Option<String>,
    pub required_skills: Option<String>,
    pub nice_to_have_skills: Option<String>,
    pub seniority: Option<String>,
    pub focus: Option<String>,
    pub include_all_commits: Option<String>,
    pub openai_model: Option<String>,
    pub cache_seconds: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub default_model: OpenAiModel,
    pub cache: CacheSettings,
}

impl From<&AppConfig> for ValidationPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_model: config.openai.default_model,
            cache: config.cache.clone(),
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

pub fn validate(
    params: &AnalyzeParams,
    policy: &ValidationPolicy,
) -> Result<AnalysisRequest, AppError> {
    let username = non_blank(params.username.as_deref())
        .ok_or_else(|| AppError::bad_input("Missing required parameter: username"))?;

    let job_title = non_blank(params.job_title.as_deref());
    let required_skills = non_blank(params.required_skills.as_deref());
    let seniority = non_blank(params.seniority.as_deref());
    let focus = non_blank(params.focus.as_deref());

    let (job_title, required_skills, seniority, focus) =
        match (job_title, required_skills, seniority, focus) {
            (Some(t), Some(r), Some(s), Some(f)) => (t, r, s, f),
            _ => {
                return Err(AppError::bad_input(
                    "Missing required parameters: job_title, required_skills, seniority, focus",
                ))
            }
        };

    let username = validate_username(username)?;
    let title = validate_job_title(job_title)?;
    let required_skills = validate_skills("required_skills", required_skills, true)?;
    let nice_to_have_skills = validate_skills(
        "nice_to_have_skills",
        params.nice_to_have_skills.as_deref().unwrap_or(""),
        false,
    )?;
    let seniority = Seniority::parse(seniority).ok_or_else(|| {
        AppError::bad_input(format!(
            "Invalid seniority '{}'. Valid values: {}",
            truncate_chars(seniority, 50),
            join_valid(Seniority::ALL.iter().map(Seniority::as_str))
        ))
    })?;
    let focus = Focus::parse(focus).ok_or_else(|| {
        AppError::bad_input(format!(
            "Invalid focus '{}'. Valid values: {}",
            truncate_chars(focus, 50),
            join_valid(Focus::ALL.iter().map(Focus::as_str))
        ))
    })?;

    Ok(AnalysisRequest {
        username,
        job_role: JobRole {
            title,
            required_skills,
            nice_to_have_skills,
            seniority,
            focus,
        },
        include_all_commits: parse_flag(params.include_all_commits.as_deref()),
        model: validate_model(params.openai_model.as_deref(), policy.default_model)?,
        cache_seconds: resolve_cache_seconds(params.cache_seconds.as_deref(), &policy.cache),
    })
}

pub fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::bad_input("Missing required parameter: username"));
    }
    if char_len(username) > MAX_USERNAME_CHARS {
        return Err(AppError::bad_input(format!(
            "Invalid username: must be at most {} characters",
            MAX_USERNAME_CHARS
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(AppError::bad_input(
            "Invalid username: only alphanumeric characters and single hyphens are allowed, \
             and it cannot start or end with a hyphen",
        ));
    }
    Ok(username.to_string())
}

fn validate_job_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::bad_input("Invalid job_title: must not be empty"));
    }
    if char_len(title) > MAX_JOB_TITLE_CHARS {
        return Err(AppError::bad_input(format!(
            "Invalid job_title: must be at most {} characters",
            MAX_JOB_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

fn validate_skills(field: &str, raw: &str, required: bool) -> Result<Vec<String>, AppError> {
    let skills = split_comma_list(raw);

    if required && skills.is_empty() {
        return Err(AppError::bad_input(format!(
            "Invalid {}: at least one skill is required",
            field
        )));
    }
    if skills.len() > MAX_SKILLS {
        return Err(AppError::bad_input(format!(
            "Invalid {}: at most {} skills are allowed, got {}",
            field,
            MAX_SKILLS,
            skills.len()
        )));
    }
    if let Some(skill) = skills.iter().find(|s| char_len(s) > MAX_SKILL_CHARS) {
        return Err(AppError::bad_input(format!(
            "Invalid {}: '{}' exceeds {} characters",
            field,
            truncate_chars(skill, 20),
            MAX_SKILL_CHARS
        )));
    }
    Ok(skills)
}

/// `true`/`1` enable the flag. Anything else, including garbage, is false.
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        non_blank(raw).map(str::to_ascii_lowercase).as_deref(),
        Some("true") | Some("1")
    )
}

/// Absent or blank selects the default; an unknown model is rejected like
/// any other invalid enum value.
fn validate_model(raw: Option<&str>, default: OpenAiModel) -> Result<OpenAiModel, AppError> {
    match non_blank(raw) {
        None => Ok(default),
        Some(value) => OpenAiModel::parse(value).ok_or_else(|| {
            AppError::bad_input(format!(
                "Invalid openai_model '{}'. Valid values: {}",
                truncate_chars(value, 50),
                join_valid(OpenAiModel::ALL.iter().map(OpenAiModel::as_str))
            ))
        }),
    }
}

pub fn resolve_cache_seconds(raw: Option<&str>, cache: &CacheSettings) -> u64 {
    non_blank(raw)
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(cache.default_seconds)
        .clamp(cache.min_seconds, cache.max_seconds)
}

fn join_valid<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}
