//! Access and refresh tokens.
//!
//! Access tokens are short-lived HS256 JWTs issued by `clinicops`. Refresh
//! tokens are opaque; `user_sessions` only ever sees their SHA-256 digest.

use chrono::{Duration, Utc};
use clinicops_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::env_or;

/// `iss` claim written into and required from every access token.
pub const TOKEN_ISSUER: &str = "clinicops";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: DbId,
    /// Authorization tier: `admin`, `manager` or `staff`.
    pub role: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// `JWT_SECRET` is required; `JWT_ACCESS_EXPIRY_MINS` (15) and
    /// `JWT_REFRESH_EXPIRY_DAYS` (7) are optional.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty.
    pub fn from_env() -> Self {
        let secret = env_or("JWT_SECRET", String::new());
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        Self {
            secret,
            access_token_expiry_mins: env_or("JWT_ACCESS_EXPIRY_MINS", 15),
            refresh_token_expiry_days: env_or("JWT_REFRESH_EXPIRY_DAYS", 7),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}

/// Sign an access token for `user_id` acting with `role`.
pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let issued_at = Utc::now();
    let claims = Claims {
        sub: user_id,
        role: role.to_owned(),
        iss: TOKEN_ISSUER.to_owned(),
        exp: (issued_at + config.access_ttl()).timestamp(),
        iat: issued_at.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature, issuer and expiry and return the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &JwtConfig::validation(),
    )
    .map(|data| data.claims)
}

/// New refresh token as `(plaintext, digest)`. Only the digest is stored.
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let digest = hash_refresh_token(&plaintext);
    (plaintext, digest)
}

pub fn hash_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "clinic-test-secret-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn sign(claims: &Claims, config: &JwtConfig) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_at(offset_secs: i64, iss: &str) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: 7,
            role: "staff".into(),
            iss: iss.into(),
            exp: now + offset_secs,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn issued_token_carries_role_and_lifetime() {
        let config = config();
        let token = generate_access_token(42, "manager", &config).unwrap();

        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        // Past the default 60-second leeway.
        let token = sign(&claims_at(-300, TOKEN_ISSUER), &config);
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let config = config();
        let token = sign(&claims_at(300, "someone-else"), &config);
        assert!(validate_token(&token, &config).is_err());
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = generate_access_token(1, "staff", &config()).unwrap();
        let other = JwtConfig {
            secret: "a-different-secret".to_string(),
            ..config()
        };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn refresh_digest_is_hex_sha256() {
        let (plaintext, digest) = generate_refresh_token();
        assert_eq!(digest, hash_refresh_token(&plaintext));
        assert_eq!(digest.len(), 64);
        assert_ne!(plaintext, generate_refresh_token().0);
    }
}
