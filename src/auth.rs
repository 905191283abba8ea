/// Session token issuing and verification
use crate::{
    db::account::Account,
    error::{LedgerError, LedgerResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Signed claim set handed out at sign-in.
///
/// Nothing is stored server side. A token stays valid until `exp`, even if the
/// account's role or password changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues HS256 session tokens with a server-held secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Build and sign the claim set for an authenticated account
    pub fn issue(&self, account: &Account) -> LedgerResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            email: account.email.clone(),
            role: account.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| LedgerError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token with full validation
    ///
    /// This performs:
    /// 1. JWT signature verification
    /// 2. Expiration checking
    pub fn verify(&self, token: &str) -> LedgerResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew
        validation.leeway = 60;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT verification failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        LedgerError::Authentication("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        LedgerError::Authentication("Invalid token signature".to_string())
                    }
                    _ => LedgerError::Authentication(format!("Invalid token: {}", e)),
                }
            })
    }
}
