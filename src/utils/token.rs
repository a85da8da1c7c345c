use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};
use crate::models::UserRole;

/// JWT claims: user id in `sub`, plus the username and role so a validated
/// token is a complete identity on its own.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub name: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: i32,
    username: &str,
    role: UserRole,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        name: username.to_string(),
        role,
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Decode and verify a token (signature and expiry). Returns the claims;
/// any failure collapses to a 401, the caller never learns why a token
/// was bad.
pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<TokenClaims, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(data) => Ok(data.claims),
        Err(_) => Err(HttpError::new(
            ErrorMessage::InvalidToken.to_string(),
            StatusCode::UNAUTHORIZED,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret";

    #[test]
    fn round_trip_preserves_identity_claims() {
        let token = create_token(42, "marie", UserRole::Artisan, SECRET, 60).unwrap();
        let claims = decode_token(token, SECRET).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.name, "marie");
        assert_eq!(claims.role, UserRole::Artisan);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token(42, "marie", UserRole::Client, SECRET, 60).unwrap();
        assert!(decode_token(token, b"other-secret").is_err());
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = create_token(42, "marie", UserRole::Client, SECRET, -120).unwrap();
        assert!(decode_token(token, SECRET).is_err());
    }
}
