use crate::error::{GatewayError, Result};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Identity claims carried in a signed token.
///
/// Minted by the users service at login/registration; the gateway only
/// verifies and extracts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// User email
    pub email: String,
    /// User role (engineer, manager, director, admin)
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Verifies signed identity tokens.
///
/// Holds the decoding key and validation rules, built once at startup and
/// read-only afterwards, so concurrent verification needs no locking.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for HS256 tokens signed with the given secret
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No clock skew allowance; expiry is enforced exactly.
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and extract its claims.
    ///
    /// A well-formed token past its expiry maps to `TOKEN_EXPIRED`; every
    /// other defect (bad signature, wrong algorithm, missing fields,
    /// malformed encoding) maps to `INVALID_TOKEN`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => GatewayError::TokenExpired,
                    _ => GatewayError::InvalidToken,
                }
            })?;

        Ok(token_data.claims)
    }
}
