//! Token Service
//!
//! Issues and verifies signed, expiring JWTs. Tokens are self-contained:
//! nothing about an issued token is stored server-side, so a token stays
//! valid until its `exp` passes.

use crate::config::AuthConfig;
use crate::error::AuthError;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Claim names owned by the token service
const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// JWT claims set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Any additional named claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Claims for a subject; `iat` and `exp` are filled in at issuance
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            sub: subject.into(),
            iat: 0,
            exp: 0,
            extra: Map::new(),
        }
    }

    /// Attach an additional claim
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Signs and verifies access tokens
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Create a token service from the secret and algorithm in `config`
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.secret_key.is_empty() {
            return Err(AuthError::Config("SECRET_KEY is not set".to_string()));
        }

        let name = config.algorithm.trim();
        if name.is_empty() {
            return Err(AuthError::Config("ALGORITHM is not set".to_string()));
        }

        let algorithm = Algorithm::from_str(name)
            .map_err(|_| AuthError::Config(format!("unknown ALGORITHM: {name}")))?;

        // The key is a shared secret, so only HMAC algorithms apply.
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Config(format!(
                "ALGORITHM {name} is not supported with a shared secret"
            )));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
        })
    }

    /// Sign `claims` with `exp = now + ttl`
    pub fn issue(&self, claims: Claims, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(claims, ttl, Utc::now())
    }

    /// Sign `claims` as if issued at `now`
    pub fn issue_at(
        &self,
        mut claims: Claims,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Config("token ttl is out of range".to_string()))?;
        if exp.timestamp() <= now.timestamp() {
            return Err(AuthError::Config(
                "token ttl must be at least one second".to_string(),
            ));
        }

        claims.iat = now.timestamp();
        claims.exp = exp.timestamp();
        for name in RESERVED_CLAIMS {
            claims.extra.remove(name);
        }

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature, and expiry relative to `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["sub", "exp"]);
        // Expiry is checked below against `now` with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        let claims = token_data.claims;

        if claims.exp <= now.timestamp() {
            tracing::debug!(sub = %claims.sub, exp = claims.exp, "Token expired");
            return Err(AuthError::ExpiredToken);
        }

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::InvalidToken)?;

    let (scheme, token) = header.trim().split_once(' ').ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return Err(AuthError::InvalidToken);
    }

    Ok(token)
}
