// src/web/types.rs
use crate::clock::Clock;
use crate::error::AppError;
use crate::rate_limit::{RateLimitDecision, RateLimitPolicy};
use crate::validation::ValidationPolicy;
use chrono::SecondsFormat;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;

pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";
pub const STALE_WHILE_REVALIDATE_SECS: u64 = 86_400;

pub struct ServerConfig {
    pub validation: ValidationPolicy,
    pub rate_limit: RateLimitPolicy,
    pub clock: Arc<dyn Clock>,
}

/// JSON response carrying the cache and rate-limit headers every
/// `/api/analyze` outcome must have.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: Status,
    pub body: Value,
    pub cache_control: String,
    pub rate_limit: Option<RateLimitDecision>,
    pub retry_after: Option<u64>,
    pub request_id: Option<String>,
}

impl ApiResponse {
    pub fn success(
        body: Value,
        cache_seconds: u64,
        rate_limit: RateLimitDecision,
        request_id: String,
    ) -> Self {
        Self {
            status: Status::Ok,
            body,
            cache_control: success_cache_control(cache_seconds),
            rate_limit: Some(rate_limit),
            retry_after: None,
            request_id: Some(request_id),
        }
    }

    pub fn from_error(
        error: &AppError,
        rate_limit: Option<RateLimitDecision>,
        request_id: Option<String>,
    ) -> Self {
        let (body, retry_after) = match error {
            AppError::RateLimited { retry_after_secs } => (
                json!({ "error": error.client_message(), "retryAfter": retry_after_secs }),
                Some(*retry_after_secs),
            ),
            _ => (json!({ "error": error.client_message() }), None),
        };

        Self {
            status: error.status(),
            body,
            cache_control: NO_STORE.to_string(),
            rate_limit,
            retry_after,
            request_id,
        }
    }

    /// Plain error used by catchers, outside any rate-limited route.
    pub fn plain_error(status: Status, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
            cache_control: NO_STORE.to_string(),
            rate_limit: None,
            retry_after: None,
            request_id: None,
        }
    }
}

pub fn success_cache_control(cache_seconds: u64) -> String {
    format!(
        "public, max-age={0}, s-maxage={0}, stale-while-revalidate={1}",
        cache_seconds, STALE_WHILE_REVALIDATE_SECS
    )
}

impl<'r> Responder<'r, 'static> for ApiResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = self.body.to_string();
        let mut builder = Response::build();
        builder
            .status(self.status)
            .header(ContentType::JSON)
            .raw_header("Cache-Control", self.cache_control)
            .sized_body(body.len(), Cursor::new(body));

        if let Some(rate_limit) = self.rate_limit {
            builder
                .raw_header("X-RateLimit-Limit", rate_limit.limit.to_string())
                .raw_header("X-RateLimit-Remaining", rate_limit.remaining.to_string())
                .raw_header(
                    "X-RateLimit-Reset",
                    rate_limit
                        .reset_at
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                );
        }
        if let Some(retry_after) = self.retry_after {
            builder.raw_header("Retry-After", retry_after.to_string());
        }
        if let Some(request_id) = self.request_id {
            builder.raw_header("X-Request-Id", request_id);
        }

        builder.ok()
    }
}
