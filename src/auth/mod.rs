pub mod token;

pub use token::{Claims, TokenVerifier};

use crate::error::{GatewayError, Result};
use axum::http::HeaderMap;

/// Extract a bearer token from the Authorization header.
///
/// A missing header is reported as `TOKEN_REQUIRED`, a header that is
/// present but does not use the Bearer scheme as `INVALID_TOKEN`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str> {
    let auth_header = headers
        .get("authorization")
        .ok_or(GatewayError::TokenRequired)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| GatewayError::InvalidToken)?;

    auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(GatewayError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_valid_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_token_required() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(GatewayError::TokenRequired)
        ));
    }

    #[test]
    fn test_malformed_scheme_is_invalid_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(GatewayError::InvalidToken)
        ));
    }

    #[test]
    fn test_empty_bearer_is_invalid_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer ".parse().unwrap());
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(GatewayError::InvalidToken)
        ));
    }
}
