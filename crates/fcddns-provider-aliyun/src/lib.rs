// # Aliyun (Alidns) Record Operator
//
// Keeps `host.domain` A records in Alidns pointed at the requested address.
//
// ## Credentials
//
// Two sources, checked in this order:
//
// 1. Credentials attached to the invocation (Function Compute hands out STS
//    credentials per call). A client built from them serves that call only
//    and is never cached.
// 2. Static credentials from configuration. The client built from them is
//    cached and shared by later calls.
//
// With neither available the update fails with an authentication error.
//
// ## Records
//
// Only records of type `A` with status `ENABLE` are considered. Records are
// created with `AddDomainRecord` and changed with `UpdateDomainRecord`;
// nothing is ever deleted.

mod api;
mod sign;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fcddns_core::{
    AliyunConfig, ClientCache, Error, InvocationContext, OperatorRegistry, Reconciler,
    RecordOperator, Result, SessionCredentials, UpdateRequest, UpdateResult,
};

pub use api::AliyunClient;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Alidns record operator
pub struct AliyunOperator {
    endpoint: String,
    base_url: String,
    static_credentials: Option<SessionCredentials>,
    clients: ClientCache<AliyunClient>,
}

impl std::fmt::Debug for AliyunOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunOperator")
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .field("static_credentials", &self.static_credentials)
            .field("clients", &self.clients)
            .finish()
    }
}

impl AliyunOperator {
    /// Create an operator from configuration
    pub fn new(config: &AliyunConfig) -> Self {
        let static_credentials = match (&config.access_key_id, &config.access_key_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(SessionCredentials {
                    access_key_id: id.clone(),
                    access_key_secret: secret.clone(),
                    security_token: config.security_token.clone().filter(|t| !t.is_empty()),
                })
            }
            _ => None,
        };

        Self {
            endpoint: config.endpoint.clone(),
            base_url: format!("https://{}", config.endpoint),
            static_credentials,
            clients: ClientCache::new(),
        }
    }

    /// Send requests to another URL while still signing for the endpoint host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.clients.invalidate();
        self
    }

    /// Client for this invocation
    ///
    /// Invocation credentials always get a fresh client; static credentials
    /// reuse the cached one.
    pub fn authenticate(&self, ctx: &InvocationContext) -> Result<Arc<AliyunClient>> {
        let credentials = match (&ctx.credentials, &self.static_credentials) {
            (Some(credentials), _) => credentials,
            (None, Some(credentials)) => credentials,
            (None, None) => {
                return Err(Error::auth(
                    "No Aliyun credentials: none attached to the invocation and none configured",
                ));
            }
        };

        self.clients
            .get_or_try_init(ctx.allows_cached_client(), || {
                let http = reqwest::Client::builder()
                    .timeout(DEFAULT_HTTP_TIMEOUT)
                    .build()
                    .map_err(|e| Error::provider("aliyun", format!("Failed to build HTTP client: {e}")))?;

                tracing::debug!(
                    request_id = ?ctx.request_id,
                    "Aliyun client initialized for {} (key {})",
                    self.endpoint,
                    credentials.access_key_id
                );
                Ok(AliyunClient {
                    http,
                    credentials: credentials.clone(),
                    endpoint: self.endpoint.clone(),
                    base_url: self.base_url.clone(),
                })
            })
    }
}

#[async_trait]
impl RecordOperator for AliyunOperator {
    async fn update(
        &self,
        ctx: &InvocationContext,
        domain: &str,
        host: &str,
        ip: &str,
    ) -> Result<UpdateResult> {
        let request = UpdateRequest::new(domain, host, ip)?;
        let client = self.authenticate(ctx)?;

        let backend = api::HostBackend {
            client: &client,
            rr: &request.host,
        };
        Reconciler::new(&backend).reconcile(&request).await
    }

    fn provider_name(&self) -> &'static str {
        "aliyun"
    }
}

/// Assign an Aliyun operator to every configured domain
///
/// Returns the number of domains assigned.
pub fn register(registry: &mut OperatorRegistry, config: &AliyunConfig) -> Result<usize> {
    config.validate()?;

    let operator = AliyunOperator::new(config);
    if operator.static_credentials.is_none() {
        tracing::info!("Aliyun has no static credentials; relying on per-invocation credentials");
    }

    let operator: Arc<dyn RecordOperator> = Arc::new(operator);
    let assigned = registry.assign(&config.domains.join(","), operator);

    tracing::info!("Aliyun operator assigned to {} domain(s)", assigned);
    Ok(assigned)
}
