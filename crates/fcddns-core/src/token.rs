//! Claim token codec
//!
//! Tokens are JWTs in compact serialization signed with HS256 over a shared
//! secret. The payload names the record the bearer may update:
//!
//! ```json
//! {"domain":"example.com","host":"home","ip":"203.0.113.7","exp":1767225600}
//! ```
//!
//! [`TokenCodec::verify`] only hands out claims after the algorithm, the
//! signature and the time bounds all check out. [`TokenCodec::inspect`] is the
//! administrative variant that decodes untrusted claims next to a validity
//! flag; it must never feed the request path.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while signing or verifying a token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token could not be produced
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification was attempted with an empty secret
    #[error("token secret is empty")]
    EmptySecret,

    /// Token is not three base64url segments of JSON
    #[error("token is malformed: {0}")]
    Malformed(String),

    /// Header names an algorithm other than HS256
    #[error("token is not signed with HS256")]
    UnsupportedAlgorithm,

    /// Signature does not match the payload
    #[error("token signature is invalid")]
    InvalidSignature,

    /// `exp` is in the past
    #[error("token is expired")]
    Expired,

    /// `nbf` is in the future
    #[error("token is not valid yet")]
    NotYetValid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::UnsupportedAlgorithm,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// Signed claim set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// DNS zone name, e.g. `example.com`
    #[serde(default)]
    pub domain: String,

    /// Record label relative to `domain`, e.g. `home`
    #[serde(default)]
    pub host: String,

    /// Default target address when the request carries no override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Issued at (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not before (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl Claims {
    /// Create claims for `host.domain` without an IP or time bounds
    pub fn new(domain: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            host: host.into(),
            ..Self::default()
        }
    }

    /// Pin the target address
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Stamp `iat` with the current time
    pub fn issued_now(mut self) -> Self {
        self.iat = Some(now());
        self
    }

    /// Expire the token `ttl` after now
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.exp = Some(now().saturating_add(ttl));
        self
    }

    /// The IP claim, treating an empty string as absent
    ///
    /// Tokens minted by older tooling always carry `"ip":""`.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// Result of [`TokenCodec::inspect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInspection {
    /// Claims as found in the payload, trusted only if `valid`
    pub claims: Claims,
    /// Whether `verify` would accept the token
    pub valid: bool,
    /// Why the token is invalid
    pub reason: Option<TokenError>,
}

/// HS256 token signer and verifier bound to one shared secret
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    leeway_secs: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<REDACTED>")
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec for the given secret with zero clock leeway
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            leeway_secs: 0,
        }
    }

    /// Tolerate clock skew on `exp` and `nbf`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway_secs = leeway.as_secs();
        self
    }

    /// Sign `claims` into a compact token
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Signing("secret is empty".to_string()));
        }

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &self.validation(),
        )?;
        Ok(data.claims)
    }

    /// Decode `token` and report whether it would verify
    pub fn inspect(&self, token: &str) -> Result<TokenInspection, TokenError> {
        let claims = decode_unverified(token)?;
        let reason = self.verify(token).err();

        Ok(TokenInspection {
            valid: reason.is_none(),
            claims,
            reason,
        })
    }

    /// HS256 only; `exp` and `nbf` are checked when present but not required
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation
    }
}

/// Payload of `token` without checking the signature or time bounds
fn decode_unverified(token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
