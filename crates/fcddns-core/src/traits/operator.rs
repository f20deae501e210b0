// # Record Operator Trait
//
// Defines the per-provider capability the gateway dispatches to.
//
// ## Implementations
//
// - Cloudflare: `fcddns-provider-cloudflare` crate
// - Aliyun (Alidns): `fcddns-provider-aliyun` crate
//
// ## Usage
//
// ```rust,ignore
// use fcddns_core::{InvocationContext, RecordOperator};
//
// let operator = registry.get("example.com").ok_or(...)?;
// operator
//     .update(&InvocationContext::default(), "example.com", "home", "203.0.113.7")
//     .await?;
// ```

use async_trait::async_trait;

/// Result of reconciling a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// Record existed with another value and was updated
    Updated {
        /// The previous value
        previous_ip: String,
        /// The new value
        new_ip: String,
    },
    /// Record already had the requested value (no-op)
    Unchanged {
        /// The current value
        current_ip: String,
    },
    /// Record did not exist and was created
    Created {
        /// The created value
        new_ip: String,
    },
}

/// Short-lived credentials handed over by the hosting environment
///
/// Serverless platforms (Aliyun Function Compute in particular) pass STS
/// credentials with every invocation. They expire, so a client built from
/// them must not outlive the invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Access key secret
    /// ⚠️ NEVER log this value
    pub access_key_secret: String,
    /// STS security token
    pub security_token: Option<String>,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field(
                "security_token",
                &self.security_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Per-invocation context supplied by the entry adapter
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// Platform request id, for log correlation
    pub request_id: Option<String>,
    /// Credentials scoped to this invocation, if the platform provides any
    pub credentials: Option<SessionCredentials>,
}

impl InvocationContext {
    /// Context for a long-lived process with no per-call credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the platform request id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attach per-invocation credentials
    pub fn with_credentials(mut self, credentials: SessionCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Whether a cached provider client may be reused for this call
    ///
    /// Per-invocation credentials expire with the invocation, so a client
    /// cached from an earlier call cannot stand in for them.
    pub fn allows_cached_client(&self) -> bool {
        self.credentials.is_none()
    }
}

/// Trait for DNS provider operators
///
/// An operator makes the A record `host.domain` point at `ip`, creating it
/// when missing. Implementations hold one lazily-built authenticated client
/// (see [`crate::ClientCache`]) and run [`crate::Reconciler`] against a
/// provider-specific [`crate::RecordBackend`] rather than re-implementing
/// the upsert.
///
/// # Thread Safety
///
/// Operators are shared by every in-flight request through the registry and
/// must be usable across async tasks.
///
/// # No Retries
///
/// A failed call returns an error; the client repeats the whole request.
#[async_trait]
pub trait RecordOperator: Send + Sync {
    /// Reconcile `host.domain` to `ip`
    ///
    /// # Idempotency
    ///
    /// Calling this twice with the same arguments performs no mutation the
    /// second time.
    async fn update(
        &self,
        ctx: &InvocationContext,
        domain: &str,
        host: &str,
        ip: &str,
    ) -> Result<UpdateResult, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
