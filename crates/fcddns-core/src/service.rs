//! Request handling
//!
//! [`DdnsService`] is what every entry adapter calls. It owns the token
//! codec and a shared registry and turns one `/ddns/v1/...` request into a
//! status code and a plain-text body:
//!
//! ```text
//! path ─▶ parse_path ─▶ verify token ─▶ resolve claims/IP ─▶ registry.get(domain)
//!                                                              │
//!                                    DdnsResponse ◀── operator.update (with deadline)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::reconcile::UpdateRequest;
use crate::registry::OperatorRegistry;
use crate::router::parse_path;
use crate::token::{Claims, TokenCodec};
use crate::traits::{InvocationContext, UpdateResult};

/// Default deadline for one provider update
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Platform-neutral inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdnsRequest {
    /// Raw request path, e.g. `/ddns/v1/{token}/203.0.113.7`
    pub path: String,
    /// Source address as observed by the adapter, used as last-resort IP
    pub client_ip: Option<String>,
}

impl DdnsRequest {
    /// Create a request without an observed client address
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            client_ip: None,
        }
    }

    /// Attach the observed client address
    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = Some(client_ip.into());
        self
    }
}

/// Platform-neutral response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdnsResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Plain-text body
    pub body: String,
}

impl DdnsResponse {
    /// 200 with `body`
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    /// Status and message of `err`
    pub fn from_error(err: &Error) -> Self {
        Self {
            status_code: err.status_code(),
            body: err.to_string(),
        }
    }
}

/// Derive the update target from verified claims
///
/// The IP comes from the path override, else the `ip` claim, else the
/// address the adapter observed; without any of them the request fails.
pub fn resolve_update(
    claims: &Claims,
    ip_override: Option<&str>,
    client_ip: Option<&str>,
) -> Result<UpdateRequest> {
    if claims.domain.is_empty() || claims.host.is_empty() {
        return Err(Error::InvalidClaims {
            host: claims.host.clone(),
            domain: claims.domain.clone(),
        });
    }

    let ip = ip_override
        .filter(|ip| !ip.is_empty())
        .or_else(|| claims.ip())
        .or_else(|| client_ip.filter(|ip| !ip.is_empty()))
        .ok_or(Error::MissingIp)?;

    UpdateRequest::new(claims.domain.as_str(), claims.host.as_str(), ip)
}

/// The gateway: token verification, dispatch, and response mapping
#[derive(Debug, Clone)]
pub struct DdnsService {
    codec: TokenCodec,
    registry: Arc<OperatorRegistry>,
    update_timeout: Duration,
}

impl DdnsService {
    /// Create a service with the default update deadline
    pub fn new(codec: TokenCodec, registry: Arc<OperatorRegistry>) -> Self {
        Self {
            codec,
            registry,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
        }
    }

    /// Create a service from validated configuration
    pub fn from_config(config: &DdnsConfig, registry: Arc<OperatorRegistry>) -> Self {
        let codec = TokenCodec::new(&config.jwt_secret)
            .with_leeway(Duration::from_secs(config.token_leeway_secs));

        Self::new(codec, registry)
            .with_update_timeout(Duration::from_secs(config.update_timeout_secs))
    }

    /// Abort provider calls that take longer than `timeout`
    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    /// The registry requests are dispatched through
    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Handle one request; never fails, errors become 4xx/5xx responses
    pub async fn handle(&self, ctx: &InvocationContext, request: &DdnsRequest) -> DdnsResponse {
        match self.process(ctx, request).await {
            Ok(_) => DdnsResponse::ok("ok"),
            Err(e) => {
                if e.status_code() >= 500 {
                    error!(request_id = ?ctx.request_id, "DDNS update failed: {}", e);
                } else {
                    warn!(request_id = ?ctx.request_id, "DDNS request rejected: {}", e);
                }
                DdnsResponse::from_error(&e)
            }
        }
    }

    /// Handle one request, keeping the typed outcome
    pub async fn process(
        &self,
        ctx: &InvocationContext,
        request: &DdnsRequest,
    ) -> Result<UpdateResult> {
        let routed = parse_path(&request.path)?;
        let claims = self.codec.verify(&routed.token)?;
        let update = resolve_update(
            &claims,
            routed.ip_override.as_deref(),
            request.client_ip.as_deref(),
        )?;

        let fqdn = update.fqdn();
        let operator = self
            .registry
            .get(&update.domain)
            .ok_or_else(|| Error::OperatorNotFound(update.domain.clone()))?;

        info!(
            request_id = ?ctx.request_id,
            provider = operator.provider_name(),
            "DDNS: {} => {}",
            fqdn,
            update.desired_ip
        );

        let call = operator.update(ctx, &update.domain, &update.host, &update.desired_ip);
        match tokio::time::timeout(self.update_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                fqdn,
                secs: self.update_timeout.as_secs(),
            }),
        }
    }
}
