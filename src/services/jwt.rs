use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::JwtSettings, errors::AppError};

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Full API access.
    Access,
    /// Only valid for completing a login at `/api/auth/verify-mfa`.
    Mfa,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 token issuing and validation, shared by all route groups.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    mfa_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_ttl: Duration, mfa_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            mfa_ttl,
        }
    }

    pub fn from_settings(settings: &JwtSettings) -> Self {
        Self::new(
            &settings.secret_key,
            Duration::minutes(settings.access_token_minutes),
            Duration::minutes(settings.mfa_token_minutes),
        )
    }

    pub fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Mfa => self.mfa_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            log::error!("Failed to sign token for user {}: {}", user_id, e);
            AppError::Internal
        })
    }

    /// Decodes `token` and checks signature, expiry and kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                log::debug!("Rejected token: {}", e);
                AppError::Unauthorized("Invalid or expired token".to_string())
            })?;

        if data.claims.kind != expected {
            return Err(AppError::Unauthorized("Token cannot be used here".to_string()));
        }
        Ok(data.claims)
    }
}
