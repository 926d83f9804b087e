// src/lib.rs
//! Recruiter-facing GitHub enrichment service.
//!
//! `GET /api/analyze` validates a job role and GitHub username, enforces a
//! per-client request budget, aggregates the user's public activity and asks
//! an LLM for a structured hiring recommendation.

pub mod analysis;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod rate_limit;
pub mod scoring;
pub mod types;
pub mod utils;
pub mod validation;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, UpstreamKind};
pub use web::{build_rocket, start_web_server};
