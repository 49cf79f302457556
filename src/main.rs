//! # smcache
//!
//! Command-line front end for the Secrets Manager cache.
//!
//! ## Usage
//!
//! ```bash
//! # Print the current value of a secret
//! smcache get prod/db-password
//!
//! # Resolve the previous version three times (the cache answers calls two and three)
//! smcache get prod/db-password --version-stage AWSPREVIOUS --repeat 3
//!
//! # Serve cached lookups, metrics and probes on port 2773
//! smcache serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrets_manager_cache::constants::DEFAULT_SERVER_PORT;
use secrets_manager_cache::observability::metrics;
use secrets_manager_cache::server::{start_server, ServerState};
use secrets_manager_cache::{
    AwsConfig, AwsSecretsBackend, CacheConfig, GetSecretOptions, SecretsManagerCache,
};
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Read-through cache for AWS Secrets Manager
#[derive(Parser)]
#[command(name = "smcache", version = VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// AWS region (defaults to AWS_REGION or the SDK default chain)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Secrets Manager endpoint override, e.g. a local mock
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Maximum number of secret names kept in the cache
    #[arg(long, global = true)]
    max_cache_size: Option<usize>,

    /// Refresh interval for stage mappings and values, in seconds
    #[arg(long, global = true)]
    refresh_interval_secs: Option<u64>,

    /// Stage used when neither a version id nor a stage is given
    #[arg(long, global = true)]
    default_version_stage: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a secret through the cache and print it
    Get {
        /// Secret name or ARN
        #[arg(value_name = "SECRET_ID")]
        secret_id: String,

        /// Pin the lookup to an immutable version id (wins over --version-stage)
        #[arg(long)]
        version_id: Option<String>,

        /// Resolve through a stage label instead of the default stage
        #[arg(long)]
        version_stage: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Resolve this many times; repeats are answered from the cache
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
    /// Serve cached secret lookups over HTTP, with metrics and probes
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
        port: u16,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// SecretString (or decoded SecretBinary) as text
    Text,
    /// Full GetSecretValue-style JSON payload
    Json,
    /// Raw bytes on stdout
    Binary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secrets_manager_cache=info,smcache=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    metrics::register_metrics().context("Failed to register metrics")?;

    let cache = build_cache(&cli).await?;

    match cli.command {
        Commands::Get {
            secret_id,
            version_id,
            version_stage,
            format,
            repeat,
        } => {
            let options = GetSecretOptions {
                version_id,
                version_stage,
            };
            get_secret(&cache, &secret_id, &options, format, repeat).await
        }
        Commands::Serve { port } => {
            let state = Arc::new(ServerState::new(cache));
            state.is_ready.store(true, Ordering::Relaxed);
            info!("Starting secrets cache server on port {}", port);
            start_server(port, state).await
        }
    }
}

async fn build_cache(cli: &Cli) -> Result<SecretsManagerCache> {
    let mut aws_config = AwsConfig::from_env();
    if cli.region.is_some() {
        aws_config.region.clone_from(&cli.region);
    }
    if cli.endpoint_url.is_some() {
        aws_config.endpoint_url.clone_from(&cli.endpoint_url);
    }

    let mut cache_config = CacheConfig::from_env();
    if let Some(max_cache_size) = cli.max_cache_size {
        cache_config.max_cache_size = max_cache_size;
    }
    if let Some(interval) = cli.refresh_interval_secs {
        cache_config.secret_refresh_interval_secs = interval;
    }
    if let Some(stage) = &cli.default_version_stage {
        cache_config.default_version_stage.clone_from(stage);
    }
    debug!(?aws_config, ?cache_config, "Resolved configuration");

    let backend = AwsSecretsBackend::new(&aws_config).await;
    SecretsManagerCache::new(Arc::new(backend), cache_config)
        .context("Invalid cache configuration")
}

async fn get_secret(
    cache: &SecretsManagerCache,
    secret_id: &str,
    options: &GetSecretOptions,
    format: OutputFormat,
    repeat: u32,
) -> Result<()> {
    for attempt in 1..repeat.max(1) {
        cache
            .get_secret_value(secret_id, options)
            .await
            .with_context(|| format!("Failed to resolve secret {secret_id}"))?;
        debug!(attempt, secret_id, "Resolved secret");
    }

    let output = match format {
        OutputFormat::Text => {
            let text = cache
                .get_secret_string(secret_id, options)
                .await
                .with_context(|| format!("Failed to resolve secret {secret_id}"))?;
            format!("{text}\n").into_bytes()
        }
        OutputFormat::Json => {
            let payload = cache
                .get_secret_value(secret_id, options)
                .await
                .with_context(|| format!("Failed to resolve secret {secret_id}"))?;
            let json =
                serde_json::to_string_pretty(&payload).context("Failed to serialize secret")?;
            format!("{json}\n").into_bytes()
        }
        OutputFormat::Binary => {
            cache
                .get_secret_binary(secret_id, options)
                .await
                .with_context(|| format!("Failed to resolve secret {secret_id}"))?
        }
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;

    let store = cache.store();
    info!(
        secret_id,
        cached_secrets = store.len(),
        lookups = repeat.max(1),
        "Done"
    );
    Ok(())
}
