// Environment configuration for the daemon.
//
// Everything is read from environment variables; see the table in main.rs.

use std::str::FromStr;

use anyhow::{Context, Result};
use fcddns_core::{AliyunConfig, CloudflareConfig, DdnsConfig};
use tracing::Level;

/// Daemon configuration
#[derive(Debug)]
pub struct Config {
    pub ddns: DdnsConfig,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut ddns = DdnsConfig::new(var("JWT_SECRET").unwrap_or_default());

        if let Some(addr) = var("DDNS_LISTEN_ADDR") {
            ddns.listen_addr = addr;
        } else if let Some(port) = var("FC_SERVER_PORT") {
            let port: u16 = parse("FC_SERVER_PORT", &port)?;
            ddns.listen_addr = format!("0.0.0.0:{port}");
        }

        if let Some(secs) = var("DDNS_UPDATE_TIMEOUT_SECS") {
            ddns.update_timeout_secs = parse("DDNS_UPDATE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = var("DDNS_TOKEN_LEEWAY_SECS") {
            ddns.token_leeway_secs = parse("DDNS_TOKEN_LEEWAY_SECS", &secs)?;
        }
        if let Some(flag) = var("DDNS_TRUST_FORWARDED_FOR") {
            ddns.trust_forwarded_for = parse_bool("DDNS_TRUST_FORWARDED_FOR", &flag)?;
        }

        if let Some(domains) = var("CLOUDFLARE_DOMAINS") {
            ddns.cloudflare = Some(CloudflareConfig {
                api_token: var("CLOUDFLARE_API_TOKEN").unwrap_or_default(),
                domains: split_domains(&domains),
            });
        }

        if let Some(domains) = var("ALIYUN_DOMAINS") {
            let mut aliyun = AliyunConfig::new(split_domains(&domains));
            aliyun.access_key_id = var("ALIBABA_CLOUD_ACCESS_KEY_ID");
            aliyun.access_key_secret = var("ALIBABA_CLOUD_ACCESS_KEY_SECRET");
            aliyun.security_token = var("ALIBABA_CLOUD_SECURITY_TOKEN");
            if let Some(endpoint) = var("ALIYUN_DNS_ENDPOINT") {
                aliyun.endpoint = endpoint;
            }
            ddns.aliyun = Some(aliyun);
        }

        Ok(Self {
            ddns,
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ddns.jwt_secret.is_empty() {
            anyhow::bail!(
                "JWT_SECRET is required. \
                Set it via: export JWT_SECRET=your_shared_secret"
            );
        }

        if let Some(cloudflare) = &self.ddns.cloudflare
            && cloudflare.api_token.is_empty()
        {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is required when CLOUDFLARE_DOMAINS is set. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        if self.ddns.cloudflare.is_none() && self.ddns.aliyun.is_none() {
            anyhow::bail!(
                "No domains configured. Set CLOUDFLARE_DOMAINS and/or ALIYUN_DOMAINS \
                (comma-separated, `*` for every other domain)"
            );
        }

        if self.ddns.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!(
                "DDNS_LISTEN_ADDR must be an address like 0.0.0.0:9000. Got: {}",
                self.ddns.listen_addr
            );
        }

        parse_log_level(&self.log_level)?;

        self.ddns.validate()?;
        Ok(())
    }
}

/// Map `DDNS_LOG_LEVEL` to a tracing level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{key} must be a number. Got: {value}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be true or false. Got: {value}"),
    }
}

fn split_domains(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_cloudflare_setup() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("CLOUDFLARE_API_TOKEN", "cf-token"),
            ("CLOUDFLARE_DOMAINS", "example.com, *"),
        ])
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.ddns.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.ddns.update_timeout_secs, 30);
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.ddns.cloudflare.unwrap().domains,
            vec!["example.com", "*"]
        );
    }

    #[test]
    fn aliyun_without_static_keys_is_valid() {
        let config = load(&[("JWT_SECRET", "s3cret"), ("ALIYUN_DOMAINS", "example.org")]).unwrap();
        config.validate().unwrap();

        let aliyun = config.ddns.aliyun.unwrap();
        assert!(aliyun.access_key_id.is_none());
        assert_eq!(aliyun.endpoint, "alidns.cn-hangzhou.aliyuncs.com");
    }

    #[test]
    fn fc_server_port_sets_listen_addr() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("ALIYUN_DOMAINS", "example.org"),
            ("FC_SERVER_PORT", "9100"),
        ])
        .unwrap();
        assert_eq!(config.ddns.listen_addr, "0.0.0.0:9100");

        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("ALIYUN_DOMAINS", "example.org"),
            ("FC_SERVER_PORT", "9100"),
            ("DDNS_LISTEN_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert_eq!(config.ddns.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn missing_secret_fails_validation() {
        let config = load(&[("ALIYUN_DOMAINS", "example.org")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn cloudflare_domains_need_a_token() {
        let config = load(&[("JWT_SECRET", "s3cret"), ("CLOUDFLARE_DOMAINS", "example.com")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CLOUDFLARE_API_TOKEN"));
    }

    #[test]
    fn no_provider_fails_validation() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn numbers_and_flags_are_parsed() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("ALIYUN_DOMAINS", "example.org"),
            ("DDNS_UPDATE_TIMEOUT_SECS", "10"),
            ("DDNS_TOKEN_LEEWAY_SECS", "5"),
            ("DDNS_TRUST_FORWARDED_FOR", "yes"),
        ])
        .unwrap();

        assert_eq!(config.ddns.update_timeout_secs, 10);
        assert_eq!(config.ddns.token_leeway_secs, 5);
        assert!(config.ddns.trust_forwarded_for);

        assert!(load(&[("DDNS_UPDATE_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[("DDNS_TRUST_FORWARDED_FOR", "maybe")]).is_err());
    }

    #[test]
    fn out_of_range_timeout_fails_validation() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("ALIYUN_DOMAINS", "example.org"),
            ("DDNS_UPDATE_TIMEOUT_SECS", "900"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_level_is_checked() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert!(parse_log_level("verbose").is_err());
    }
}
