use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to fetch assessment titles (HTTP {status})")]
    TitleFetch { status: u16 },

    #[error("Upstream {endpoint} returned HTTP {status}")]
    Upstream { endpoint: String, status: u16 },

    #[error("Unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the UI should offer a retry for this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TitleFetch { .. }
                | Error::Upstream { .. }
                | Error::InvalidResponse { .. }
                | Error::Reqwest(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let retryable = self.is_retryable();
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_GATEWAY, format!("Malformed upstream JSON: {}", err)),
            err @ (Error::TitleFetch { .. }
            | Error::Upstream { .. }
            | Error::InvalidResponse { .. }) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, format!("External service error: {}", err)),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message, "retryable": retryable }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_retryable() {
        assert!(Error::TitleFetch { status: 503 }.is_retryable());
        assert!(Error::Upstream { endpoint: "candidates".into(), status: 500 }.is_retryable());
        assert!(!Error::NotFound("candidate".into()).is_retryable());
        assert!(!Error::Config("missing".into()).is_retryable());
    }

    #[test]
    fn title_fetch_maps_to_bad_gateway() {
        let resp = Error::TitleFetch { status: 404 }.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let resp = Error::NotFound("candidate c1".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
