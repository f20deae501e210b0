//! Configuration types for the DDNS gateway
//!
//! The daemon fills these from environment variables; embedders may
//! deserialize them from any serde format.

use serde::{Deserialize, Serialize};

/// Default Alidns API endpoint
pub const DEFAULT_ALIYUN_ENDPOINT: &str = "alidns.cn-hangzhou.aliyuncs.com";

/// Main gateway configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Shared HS256 token secret
    /// ⚠️ NEVER log this value
    pub jwt_secret: String,

    /// Address the local HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Deadline for one provider update (in seconds)
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,

    /// Clock skew tolerated on `exp`/`nbf` (in seconds)
    #[serde(default)]
    pub token_leeway_secs: u64,

    /// Take the client IP from `X-Forwarded-For` when behind a proxy
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Cloudflare backend, if enabled
    #[serde(default)]
    pub cloudflare: Option<CloudflareConfig>,

    /// Aliyun backend, if enabled
    #[serde(default)]
    pub aliyun: Option<AliyunConfig>,
}

impl std::fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("jwt_secret", &"<REDACTED>")
            .field("listen_addr", &self.listen_addr)
            .field("update_timeout_secs", &self.update_timeout_secs)
            .field("token_leeway_secs", &self.token_leeway_secs)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("cloudflare", &self.cloudflare)
            .field("aliyun", &self.aliyun)
            .finish()
    }
}

impl DdnsConfig {
    /// Create a configuration with defaults and no provider
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            listen_addr: default_listen_addr(),
            update_timeout_secs: default_update_timeout_secs(),
            token_leeway_secs: 0,
            trust_forwarded_for: false,
            cloudflare: None,
            aliyun: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.jwt_secret.is_empty() {
            return Err(crate::Error::config("JWT secret cannot be empty"));
        }

        if !(1..=300).contains(&self.update_timeout_secs) {
            return Err(crate::Error::config(format!(
                "Update timeout must be between 1 and 300 seconds. Got: {}",
                self.update_timeout_secs
            )));
        }

        if self.cloudflare.is_none() && self.aliyun.is_none() {
            return Err(crate::Error::config("No DNS provider configured"));
        }

        if let Some(cloudflare) = &self.cloudflare {
            cloudflare.validate()?;
        }
        if let Some(aliyun) = &self.aliyun {
            aliyun.validate()?;
        }

        Ok(())
    }
}

/// Cloudflare backend configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// API token with Zone:DNS:Edit permission
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Zones served by Cloudflare (`*` for the fallback)
    pub domains: Vec<String>,
}

impl std::fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("api_token", &"<REDACTED>")
            .field("domains", &self.domains)
            .finish()
    }
}

impl CloudflareConfig {
    /// Validate the Cloudflare configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("Cloudflare API token cannot be empty"));
        }
        validate_domains("Cloudflare", &self.domains)
    }
}

/// Aliyun (Alidns) backend configuration
///
/// Static credentials are optional: inside Function Compute the runtime
/// passes STS credentials with every invocation instead.
#[derive(Clone, Serialize, Deserialize)]
pub struct AliyunConfig {
    /// Zones served by Alidns (`*` for the fallback)
    pub domains: Vec<String>,

    /// Static access key id
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Static access key secret
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub access_key_secret: Option<String>,

    /// STS token accompanying temporary static credentials
    #[serde(default)]
    pub security_token: Option<String>,

    /// API endpoint host
    #[serde(default = "default_aliyun_endpoint")]
    pub endpoint: String,
}

impl std::fmt::Debug for AliyunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunConfig")
            .field("domains", &self.domains)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &self.access_key_secret.as_ref().map(|_| "<REDACTED>"))
            .field("security_token", &self.security_token.as_ref().map(|_| "<REDACTED>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl AliyunConfig {
    /// Create a configuration that relies on per-invocation credentials
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains,
            access_key_id: None,
            access_key_secret: None,
            security_token: None,
            endpoint: default_aliyun_endpoint(),
        }
    }

    /// Validate the Aliyun configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let has_id = self.access_key_id.as_deref().is_some_and(|s| !s.is_empty());
        let has_secret = self
            .access_key_secret
            .as_deref()
            .is_some_and(|s| !s.is_empty());
        if has_id != has_secret {
            return Err(crate::Error::config(
                "Aliyun access key id and secret must be set together",
            ));
        }

        if self.endpoint.is_empty() {
            return Err(crate::Error::config("Aliyun endpoint cannot be empty"));
        }

        validate_domains("Aliyun", &self.domains)
    }
}

fn validate_domains(provider: &str, domains: &[String]) -> Result<(), crate::Error> {
    if domains.iter().all(|d| d.trim().is_empty()) {
        return Err(crate::Error::config(format!(
            "{provider} is enabled but no domains are assigned to it"
        )));
    }
    Ok(())
}

fn default_listen_addr() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_update_timeout_secs() -> u64 {
    30
}

fn default_aliyun_endpoint() -> String {
    DEFAULT_ALIYUN_ENDPOINT.to_string()
}
