// # fcddnsd - Token-Authenticated DDNS Gateway
//
// A thin integration layer over `fcddns-core`:
// 1. Reading configuration from environment variables
// 2. Registering DNS operators for the configured domains
// 3. Serving `/ddns/v1/{token}[/{ip}]` over HTTP (`serve`, also the FC
//    custom runtime) or API Gateway v2 events through the Lambda runtime
//    (`lambda`)
// 4. Minting and checking tokens offline (`token sign|verify`)
//
// All DDNS logic lives in fcddns-core and the provider crates.
//
// ## Configuration
//
// ### Gateway
// - `JWT_SECRET`: Shared HS256 token secret (required)
// - `DDNS_LISTEN_ADDR`: Bind address (default `0.0.0.0:9000`, or
//   `0.0.0.0:$FC_SERVER_PORT` inside Function Compute)
// - `DDNS_UPDATE_TIMEOUT_SECS`: Deadline for one provider update (default 30)
// - `DDNS_TOKEN_LEEWAY_SECS`: Clock skew tolerated on `exp`/`nbf` (default 0)
// - `DDNS_TRUST_FORWARDED_FOR`: Take the client IP from `X-Forwarded-For`
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ### Cloudflare
// - `CLOUDFLARE_API_TOKEN`: API token with Zone:DNS:Edit permission
// - `CLOUDFLARE_DOMAINS`: Comma-separated zones (`*` for every other zone)
//
// ### Aliyun
// - `ALIYUN_DOMAINS`: Comma-separated zones (`*` for every other zone)
// - `ALIBABA_CLOUD_ACCESS_KEY_ID` / `ALIBABA_CLOUD_ACCESS_KEY_SECRET` /
//   `ALIBABA_CLOUD_SECURITY_TOKEN`: Static credentials (optional inside FC)
// - `ALIYUN_DNS_ENDPOINT`: API host (default `alidns.cn-hangzhou.aliyuncs.com`)
//
// ## Example
//
// ```bash
// export JWT_SECRET=change-me
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_DOMAINS=example.com,*
//
// fcddnsd token sign example.com home
// fcddnsd serve
// curl http://127.0.0.1:9000/ddns/v1/$TOKEN/203.0.113.7
// ```

mod config;
mod lambda;
mod server;
mod token;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fcddns_core::{DdnsConfig, DdnsService, OperatorRegistry};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::Config;
use crate::token::TokenCommand;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser)]
#[command(name = "fcddnsd", version)]
#[command(about = "Token-authenticated DDNS gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the gateway over HTTP (default)
    Serve,
    /// Serve the gateway through the AWS Lambda runtime API
    Lambda,
    /// Sign or verify update tokens
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    if let Commands::Token { command } = &command {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        return match token::run(command, &mut stdin.lock(), &mut stdout.lock()) {
            Ok(()) => DdnsExitCode::CleanShutdown.into(),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                DdnsExitCode::ConfigError.into()
            }
        };
    }

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config::parse_log_level(&config.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting fcddnsd");

    let registry = match build_registry(&config.ddns) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to register DNS operators: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };
    info!("Serving domains: {}", registry.domains().join(", "));

    let service = DdnsService::from_config(&config.ddns, registry);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let outcome = match command {
            Commands::Lambda => run_lambda(service).await,
            _ => run_server(&config.ddns, service).await,
        };

        if let Err(e) = outcome {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Assign operators to the configured domains
fn build_registry(config: &DdnsConfig) -> Result<OperatorRegistry> {
    let mut registry = OperatorRegistry::new();

    if let Some(cloudflare) = &config.cloudflare {
        #[cfg(feature = "cloudflare")]
        {
            info!("Registering Cloudflare operator");
            fcddns_provider_cloudflare::register(&mut registry, cloudflare)?;
        }
        #[cfg(not(feature = "cloudflare"))]
        {
            let _ = cloudflare;
            anyhow::bail!("CLOUDFLARE_DOMAINS is set but fcddnsd was built without the `cloudflare` feature");
        }
    }

    if let Some(aliyun) = &config.aliyun {
        #[cfg(feature = "aliyun")]
        {
            info!("Registering Aliyun operator");
            fcddns_provider_aliyun::register(&mut registry, aliyun)?;
        }
        #[cfg(not(feature = "aliyun"))]
        {
            let _ = aliyun;
            anyhow::bail!("ALIYUN_DOMAINS is set but fcddnsd was built without the `aliyun` feature");
        }
    }

    if registry.is_empty() {
        anyhow::bail!("No domain is assigned to any DNS operator");
    }

    Ok(registry)
}

/// Serve HTTP until SIGTERM/SIGINT
async fn run_server(config: &DdnsConfig, service: DdnsService) -> Result<()> {
    let state = server::AppState {
        service: Arc::new(service),
        trust_forwarded_for: config.trust_forwarded_for,
    };

    server::run(&config.listen_addr, state, async {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown error: {}", e),
        }
        info!("Shutting down");
    })
    .await
}

/// Serve Lambda invocations
async fn run_lambda(service: DdnsService) -> Result<()> {
    if std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_none() {
        anyhow::bail!("AWS_LAMBDA_RUNTIME_API is not set; `lambda` must run inside AWS Lambda");
    }

    lambda::run(service).await
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
