//! Error handling for the vehicle counter

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raw source request did not complete (network failure, non-2xx status)
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },

    /// Raw source body is not an integer
    #[error("Parse error: {0}")]
    Parse(String),

    /// Store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Malformed inbound API payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short kind label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport { .. } => "transport",
            Error::Parse(_) => "parse",
            Error::Persistence(_) => "persistence",
            Error::Validation(_) => "validation",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::Transport { .. } => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
            Error::Parse(_) => (StatusCode::BAD_GATEWAY, "PARSE_ERROR"),
            Error::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };

        let message = match &self {
            Error::Validation(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request error"
            );
        } else {
            tracing::debug!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "success": false,
            "error_code": error_code,
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let resp = Error::Validation("bad body".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_persistence_maps_to_internal_error() {
        let resp = Error::Persistence(sqlx::Error::PoolClosed).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_side_variants_map_to_500() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(io.kind(), "io");
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let config = Error::Config("bad client".to_string());
        assert_eq!(config.kind(), "config");
        assert_eq!(config.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_kind_labels() {
        let transport = Error::Transport {
            status: Some(503),
            body: None,
            message: "unavailable".to_string(),
        };
        assert_eq!(transport.kind(), "transport");
        assert_eq!(Error::Parse("abc".to_string()).kind(), "parse");
    }
}
