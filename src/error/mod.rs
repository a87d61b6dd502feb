use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway-originated errors.
///
/// Each variant carries a stable symbolic code that callers can match on.
/// Backend-originated failures are relayed verbatim and never pass through
/// this type; only decisions made inside the gateway (auth, rate limiting,
/// routing) and transport failures on the gateway-to-backend hop do.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication token is required")]
    TokenRequired,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("Rate limit exceeded for policy '{0}'")]
    RateLimitExceeded(String),

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Service timed out: {0}")]
    ServiceTimeout(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::TokenRequired => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidToken => StatusCode::UNAUTHORIZED,
            GatewayError::TokenExpired => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::EndpointNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ServiceTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ServiceError(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable machine-matchable error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "INTERNAL_SERVER_ERROR",
            GatewayError::TokenRequired => "TOKEN_REQUIRED",
            GatewayError::InvalidToken => "INVALID_TOKEN",
            GatewayError::TokenExpired => "TOKEN_EXPIRED",
            GatewayError::RateLimitExceeded(_) => "RATE_LIMIT_EXCEEDED",
            GatewayError::EndpointNotFound(_) => "ENDPOINT_NOT_FOUND",
            GatewayError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            GatewayError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            GatewayError::ServiceTimeout(_) => "SERVICE_TIMEOUT",
            GatewayError::ServiceError(_) => "SERVICE_ERROR",
            GatewayError::Internal(_) => "INTERNAL_SERVER_ERROR",
            GatewayError::Io(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            },
        }));

        (status, body).into_response()
    }
}
