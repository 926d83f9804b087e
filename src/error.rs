// src/error.rs
use rocket::http::Status;
use thiserror::Error;

/// Classified failure of the upstream scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// No API key configured on the server.
    Configuration,
    /// The engine rejected the API key.
    Authentication,
    /// The engine's own rate limit was hit. Not retried.
    Throttled,
    /// Unparseable or incomplete response body.
    Malformed,
    /// Timeout, connection failure or an unexpected status.
    Transport,
}

impl UpstreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamKind::Configuration => "configuration",
            UpstreamKind::Authentication => "authentication",
            UpstreamKind::Throttled => "throttled",
            UpstreamKind::Malformed => "malformed",
            UpstreamKind::Transport => "transport",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadInput(String),

    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Upstream {} failure: {message}", kind.as_str())]
    Upstream { kind: UpstreamKind, message: String },

    #[error("GitHub aggregation failed: {0}")]
    Aggregation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        AppError::BadInput(message.into())
    }

    pub fn upstream(kind: UpstreamKind, message: impl Into<String>) -> Self {
        AppError::Upstream {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            AppError::BadInput(_) => Status::BadRequest,
            AppError::RateLimited { .. } => Status::TooManyRequests,
            AppError::Upstream { .. } | AppError::Aggregation(_) | AppError::Internal(_) => {
                Status::InternalServerError
            }
        }
    }

    /// Text that is safe to hand back to the caller. Partner payloads and
    /// internal details stay in the server logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::BadInput(message) => message.clone(),
            AppError::RateLimited { .. } => {
                "Too many requests. Please try again later.".to_string()
            }
            AppError::Upstream { kind, .. } => match kind {
                UpstreamKind::Configuration => {
                    "Analysis service is not configured on this server".to_string()
                }
                UpstreamKind::Authentication => {
                    "Analysis service authentication failed".to_string()
                }
                UpstreamKind::Throttled => {
                    "Analysis service is rate limited, try again later".to_string()
                }
                UpstreamKind::Malformed => {
                    "Analysis service returned an invalid response".to_string()
                }
                UpstreamKind::Transport => "Analysis service request failed".to_string(),
            },
            AppError::Aggregation(message) => {
                format!("Failed to fetch GitHub data: {}", message)
            }
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
