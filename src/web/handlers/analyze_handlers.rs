// src/web/handlers/analyze_handlers.rs
//! `GET /api/analyze`: rate-limit check, validation, aggregation, scoring.
//! Any stage may short-circuit into an error response.

use crate::analysis::AnalysisService;
use crate::error::AppError;
use crate::rate_limit::RateLimiter;
use crate::validation::{validate, AnalyzeParams};
use crate::web::client_id::ClientIdentifier;
use crate::web::types::{ApiResponse, ServerConfig};
use rocket::State;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub async fn analyze_handler(
    params: AnalyzeParams,
    client: ClientIdentifier,
    config: &State<ServerConfig>,
    limiter: &State<Arc<dyn RateLimiter>>,
    service: &State<AnalysisService>,
) -> ApiResponse {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("analyze", request_id = %request_id, client = %client.0);

    async move {
        let policy = config.rate_limit;
        let decision = limiter.check(&client.0, policy.max_requests, policy.window);
        if !decision.allowed {
            let retry_after_secs = decision.retry_after_secs(config.clock.now());
            warn!(
                "Rate limit exceeded for {}, retry in {}s",
                client.0, retry_after_secs
            );
            return ApiResponse::from_error(
                &AppError::RateLimited { retry_after_secs },
                Some(decision),
                Some(request_id),
            );
        }

        let request = match validate(&params, &config.validation) {
            Ok(request) => request,
            Err(e) => {
                info!("Rejected invalid request: {}", e);
                return ApiResponse::from_error(&e, Some(decision), Some(request_id));
            }
        };

        match service.analyze(&request).await {
            Ok(output) => {
                info!(
                    "Analysis for {} succeeded: {}",
                    request.username,
                    output.recommendation()
                );
                ApiResponse::success(
                    output.into_value(),
                    request.cache_seconds,
                    decision,
                    request_id,
                )
            }
            Err(e) => {
                match &e {
                    AppError::Internal(inner) => {
                        error!("Unexpected failure analyzing {}: {:?}", request.username, inner)
                    }
                    other => error!("Analysis failed for {}: {}", request.username, other),
                }
                ApiResponse::from_error(&e, Some(decision), Some(request_id))
            }
        }
    }
    .instrument(span)
    .await
}
