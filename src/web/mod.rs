// src/web/mod.rs
pub mod client_id;
pub mod cors_utils;
pub mod handlers;
pub mod types;

pub use client_id::ClientIdentifier;
pub use cors_utils::Cors;
pub use types::*;

use crate::analysis::AnalysisService;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::github::{Aggregator, GitHubClient, GitHubSource};
use crate::rate_limit::{InMemoryRateLimiter, RateLimitPolicy, RateLimiter};
use crate::scoring::{OpenAiEngine, ScoringClient, ScoringEngine};
use crate::validation::{AnalyzeParams, ValidationPolicy};
use anyhow::Result;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catchers, get, routes, Build, Rocket, State};
use std::sync::Arc;
use tracing::{error, info};

#[get("/analyze?<params..>")]
pub async fn analyze(
    params: AnalyzeParams,
    client: ClientIdentifier,
    config: &State<ServerConfig>,
    limiter: &State<Arc<dyn RateLimiter>>,
    service: &State<AnalysisService>,
) -> ApiResponse {
    handlers::analyze_handler(params, client, config, limiter, service).await
}

#[get("/health")]
pub async fn health() -> Json<&'static str> {
    handlers::health_handler().await
}

#[rocket::catch(404)]
pub fn not_found() -> ApiResponse {
    ApiResponse::plain_error(Status::NotFound, "Not found")
}

#[rocket::catch(500)]
pub fn internal_error() -> ApiResponse {
    ApiResponse::plain_error(Status::InternalServerError, "Internal server error")
}

#[rocket::catch(default)]
pub fn default_catcher(status: Status, _request: &rocket::Request<'_>) -> ApiResponse {
    ApiResponse::plain_error(status, status.reason().unwrap_or("Request failed"))
}

/// Assemble the Rocket instance with explicit collaborators.
pub fn build_rocket(
    config: &AppConfig,
    github: Arc<dyn GitHubSource>,
    engine: Arc<dyn ScoringEngine>,
    clock: Arc<dyn Clock>,
) -> Rocket<Build> {
    let limiter: Arc<dyn RateLimiter> =
        Arc::new(InMemoryRateLimiter::new(clock.clone(), &config.rate_limit));

    let service = AnalysisService::new(
        Aggregator::new(github, clock.clone()),
        ScoringClient::new(engine),
        config.openai.api_key.clone(),
    );

    let server_config = ServerConfig {
        validation: ValidationPolicy::from(config),
        rate_limit: RateLimitPolicy::from(&config.rate_limit),
        clock,
    };

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    rocket::custom(figment)
        .attach(Cors)
        .manage(server_config)
        .manage(limiter)
        .manage(service)
        .register("/", catchers![not_found, internal_error, default_catcher])
        .mount(
            "/api",
            routes![analyze, health, cors_utils::universal_options_handler],
        )
}

// Main server start function
pub async fn start_web_server(config: AppConfig) -> Result<()> {
    let github = GitHubClient::new(
        config.github.api_url.clone(),
        config.github.tokens.clone(),
        config.github.timeout_secs,
        config.github.top_repositories,
    )?;
    let engine = OpenAiEngine::new(config.openai.base_url.clone(), config.openai.timeout_secs)?;

    info!("Starting GitHub hiring-signal API server");
    info!(
        "Rate limit: {} requests per {}s per client",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    info!("GitHub tokens configured: {}", config.github.tokens.len());
    info!(
        "Server: http://{}:{}",
        config.server.address, config.server.port
    );

    let rocket = build_rocket(
        &config,
        Arc::new(github),
        Arc::new(engine),
        Arc::new(SystemClock),
    );

    if let Err(e) = rocket.launch().await {
        error!("Server terminated with error: {}", e);
        return Err(anyhow::anyhow!("Rocket failed: {}", e));
    }

    Ok(())
}
