//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store could not be reached (refused, timed out, dropped, or closed)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Store was reached but rejected the command
    #[error("Store error: {0}")]
    Store(String),

    /// Value could not be encoded as JSON
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Stored payload could not be decoded into the requested type
    #[error("Deserialization failed for key '{key}': {message}")]
    Deserialization { key: String, message: String },

    /// Invalid configuration or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CacheError {
    /// True for failures where the store never answered.
    ///
    /// Cache-aside callers use this to fall through to the source of truth.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }
}

// == Redis Error Conversion ==
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            CacheError::StoreUnavailable(err.to_string())
        } else {
            CacheError::Store(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CacheError::Store(_)
            | CacheError::Serialization(_)
            | CacheError::Deserialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use redis::{ErrorKind, RedisError, ServerErrorKind};

    #[test]
    fn test_io_error_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: CacheError = RedisError::from(io).into();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_server_response_error_maps_to_store() {
        let server = RedisError::from((
            ErrorKind::Server(ServerErrorKind::ResponseError),
            "WRONGTYPE Operation against a key holding the wrong kind of value",
        ));
        let err: CacheError = server.into();

        assert!(matches!(err, CacheError::Store(_)));
        assert!(!err.is_unavailable());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (CacheError::StoreUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::InvalidInput("ttl".into()), StatusCode::BAD_REQUEST),
            (CacheError::Store("rejected".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CacheError::Serialization("map key".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_deserialization_message_names_key() {
        let err = CacheError::Deserialization {
            key: "magazine:editorials:1".to_string(),
            message: "expected value".to_string(),
        };
        assert!(err.to_string().contains("magazine:editorials:1"));
    }
}
