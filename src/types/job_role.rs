// src/types/job_role.rs
use crate::scoring::OpenAiModel;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
}

impl Seniority {
    pub const ALL: [Seniority; 3] = [Seniority::Junior, Seniority::Mid, Seniority::Senior];

    pub fn as_str(&self) -> &'static str {
        match self {
            Seniority::Junior => "junior",
            Seniority::Mid => "mid",
            Seniority::Senior => "senior",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Frontend,
    Backend,
    Fullstack,
    Data,
    Infra,
}

impl Focus {
    pub const ALL: [Focus; 5] = [
        Focus::Frontend,
        Focus::Backend,
        Focus::Fullstack,
        Focus::Data,
        Focus::Infra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Focus::Frontend => "frontend",
            Focus::Backend => "backend",
            Focus::Fullstack => "fullstack",
            Focus::Data => "data",
            Focus::Infra => "infra",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role the candidate is evaluated against. Built once per request by the
/// validator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRole {
    pub title: String,
    pub required_skills: Vec<String>,
    pub nice_to_have_skills: Vec<String>,
    pub seniority: Seniority,
    pub focus: Focus,
}

/// A fully validated `/api/analyze` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub username: String,
    pub job_role: JobRole,
    pub include_all_commits: bool,
    pub model: OpenAiModel,
    pub cache_seconds: u64,
}
