// `fcddnsd token ...`: mint and inspect update tokens offline.

use std::io::{BufRead, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use fcddns_core::{Claims, TokenCodec};

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Sign a token for <host>.<domain>
    Sign {
        /// DNS zone, e.g. example.com
        domain: String,
        /// Record label, e.g. home
        host: String,
        /// Pin the address the record is set to
        #[arg(long)]
        ip: Option<String>,
        /// Expire the token after this many seconds
        #[arg(long)]
        ttl: Option<u64>,
        /// Shared token secret
        #[arg(short = 's', long = "jwt-secret", env = "JWT_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Decode a token and check it against the secret
    Verify {
        /// The token, or `-` to read it from stdin
        token: String,
        /// Shared token secret
        #[arg(short = 's', long = "jwt-secret", env = "JWT_SECRET", hide_env_values = true)]
        secret: String,
    },
}

/// Run a token subcommand
pub fn run(command: &TokenCommand, stdin: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
    match command {
        TokenCommand::Sign {
            domain,
            host,
            ip,
            ttl,
            secret,
        } => {
            let mut claims = Claims::new(domain.as_str(), host.as_str()).issued_now();
            if let Some(ip) = ip {
                claims = claims.with_ip(ip.as_str());
            }
            if let Some(ttl) = ttl {
                claims = claims.expires_in(Duration::from_secs(*ttl));
            }

            let token = TokenCodec::new(secret)
                .sign(&claims)
                .context("failed to sign token")?;
            writeln!(out, "{token}")?;
        }
        TokenCommand::Verify { token, secret } => {
            let token = expand_stdin(token, stdin)?;

            match TokenCodec::new(secret).inspect(&token) {
                Ok(inspection) => {
                    let claims = &inspection.claims;
                    writeln!(out, "host: {}", claims.host)?;
                    writeln!(out, "domain: {}", claims.domain)?;
                    writeln!(out, "ip: {}", claims.ip().unwrap_or_default())?;
                    writeln!(out, "expires: {}", format_expiry(claims.exp))?;
                    writeln!(out, "valid: {}", inspection.valid)?;
                    if let Some(reason) = inspection.reason {
                        writeln!(out, "reason: {reason}")?;
                    }
                }
                Err(e) => {
                    writeln!(out, "valid: false")?;
                    writeln!(out, "reason: {e}")?;
                }
            }
        }
    }

    Ok(())
}

/// `-` means "read the value from stdin"
fn expand_stdin(value: &str, stdin: &mut impl BufRead) -> Result<String> {
    if value != "-" {
        return Ok(value.to_string());
    }

    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("failed to read token from stdin")?;
    Ok(buf.trim().to_string())
}

fn format_expiry(exp: Option<i64>) -> String {
    match exp.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)) {
        Some(at) => at.to_rfc3339(),
        None => "never".to_string(),
    }
}
