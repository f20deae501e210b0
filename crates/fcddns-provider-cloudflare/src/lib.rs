// # Cloudflare DNS Operator
//
// Keeps `host.domain` A records in Cloudflare zones pointed at the requested
// address.
//
// ## Flow
//
// 1. Resolve the zone ID from the domain name (`GET /zones?name=...`)
// 2. List A records named `host.domain` in that zone
// 3. Hand the zone backend to the shared reconciler, which creates, updates
//    or leaves the record alone
//
// New records are created unproxied with automatic TTL.
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Operator MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/

mod api;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fcddns_core::{
    ClientCache, CloudflareConfig, Error, InvocationContext, OperatorRegistry, Reconciler,
    RecordOperator, Result, UpdateRequest, UpdateResult,
};

pub use api::CloudflareClient;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare record operator
///
/// One instance serves every domain assigned to Cloudflare. The HTTP client
/// is built on first use and reused afterwards.
pub struct CloudflareOperator {
    /// ⚠️ NEVER log this value
    api_token: String,
    base_url: String,
    clients: ClientCache<CloudflareClient>,
}

impl std::fmt::Debug for CloudflareOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareOperator")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("clients", &self.clients)
            .finish()
    }
}

impl CloudflareOperator {
    /// Create an operator authenticated with `api_token`
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            clients: ClientCache::new(),
        })
    }

    /// Point the operator at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.clients.invalidate();
        self
    }

    /// Authenticated client, built on first use
    pub fn authenticate(&self) -> Result<Arc<CloudflareClient>> {
        // The token is static configuration, so the client is always shareable
        self.clients.get_or_try_init(true, || {
            let http = reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .map_err(|e| Error::provider("cloudflare", format!("Failed to build HTTP client: {e}")))?;

            tracing::debug!("Cloudflare client initialized for {}", self.base_url);
            Ok(CloudflareClient {
                http,
                api_token: self.api_token.clone(),
                base_url: self.base_url.clone(),
            })
        })
    }
}

#[async_trait]
impl RecordOperator for CloudflareOperator {
    async fn update(
        &self,
        ctx: &InvocationContext,
        domain: &str,
        host: &str,
        ip: &str,
    ) -> Result<UpdateResult> {
        let request = UpdateRequest::new(domain, host, ip)?;
        let client = self.authenticate()?;

        let zone_id = client.zone_id(domain).await.map_err(|e| match e {
            Error::Provider { provider, message } => {
                Error::provider(provider, format!("zone lookup for {domain} failed: {message}"))
            }
            other => other,
        })?;
        tracing::debug!(request_id = ?ctx.request_id, "Cloudflare zone {} => {}", domain, zone_id);

        let backend = api::ZoneBackend {
            client: &client,
            zone_id,
        };
        Reconciler::new(&backend).reconcile(&request).await
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Assign a Cloudflare operator to every configured domain
///
/// Returns the number of domains assigned.
pub fn register(registry: &mut OperatorRegistry, config: &CloudflareConfig) -> Result<usize> {
    config.validate()?;

    let operator: Arc<dyn RecordOperator> = Arc::new(CloudflareOperator::new(&config.api_token)?);
    let assigned = registry.assign(&config.domains.join(","), operator);

    tracing::info!("Cloudflare operator assigned to {} domain(s)", assigned);
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        assert!(CloudflareOperator::new("").is_err());
    }

    #[test]
    fn debug_hides_token() {
        let operator = CloudflareOperator::new("super-secret-token").unwrap();
        let debug = format!("{operator:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn client_is_built_once() {
        let operator = CloudflareOperator::new("token").unwrap();
        let first = operator.authenticate().unwrap();
        let second = operator.authenticate().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let operator = CloudflareOperator::new("token")
            .unwrap()
            .with_base_url("http://127.0.0.1:8080/");
        assert_eq!(operator.authenticate().unwrap().base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn register_assigns_domains() {
        let mut registry = OperatorRegistry::new();
        let config = CloudflareConfig {
            api_token: "token".to_string(),
            domains: vec!["example.com".to_string(), "*".to_string()],
        };

        assert_eq!(register(&mut registry, &config).unwrap(), 2);
        assert_eq!(
            registry.get("anything.test").unwrap().provider_name(),
            "cloudflare"
        );
    }

    #[test]
    fn register_rejects_invalid_config() {
        let mut registry = OperatorRegistry::new();
        let config = CloudflareConfig {
            api_token: String::new(),
            domains: vec!["example.com".to_string()],
        };

        assert!(register(&mut registry, &config).is_err());
        assert!(registry.is_empty());
    }
}
