//! Usage Metrics CLI
//!
//! Serves metrics snapshots over HTTP, or prints a single snapshot.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use usage_metrics::api::{AppState, HttpServer};
use usage_metrics::auth::build_assertion;
use usage_metrics::collector::{CredentialSource, MetricsCollector};
use usage_metrics::config::LoggingConfig;
use usage_metrics::Config;

/// Usage Metrics - public usage counters from the analytics reporting API
#[derive(Parser)]
#[command(name = "usage-metrics")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "USAGE_METRICS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve metrics snapshots over HTTP
    Serve {
        /// Host to bind to
        #[arg(long, env = "USAGE_METRICS_HOST")]
        host: Option<String>,

        /// HTTP port
        #[arg(long, env = "USAGE_METRICS_PORT")]
        port: Option<u16>,
    },

    /// Run one invocation and print the snapshot as JSON
    Fetch {
        /// Pretty-print the snapshot
        #[arg(long)]
        pretty: bool,
    },

    /// Validate configuration and credentials and sign a test assertion
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await,
        Commands::Fetch { pretty } => run_fetch(config, pretty).await,
        Commands::Check => run_check(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr so `fetch` output stays parseable
    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run_serve(config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    info!(
        property_id = %config.analytics.property_id,
        reports = config.analytics.reports.len(),
        "Starting usage-metrics on {}",
        addr
    );

    let collector = MetricsCollector::new(&config.analytics, &config.fallback)?;
    let state = AppState {
        collector: Arc::new(collector),
        credentials: Arc::new(config.credentials.clone()),
        cache_max_age_secs: config.server.cache_max_age_secs,
    };

    HttpServer::new(state).serve(&addr).await?;
    Ok(())
}

async fn run_fetch(config: Config, pretty: bool) -> anyhow::Result<()> {
    let collector = MetricsCollector::new(&config.analytics, &config.fallback)?;
    let snapshot = collector.collect(&config.credentials).await;

    let output = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{output}");
    Ok(())
}

async fn run_check(config: Config) -> anyhow::Result<()> {
    let credentials = config
        .credentials
        .load()
        .await
        .context("credentials are configured but unusable")?
        .context("no service account credentials configured")?;

    let audience = config
        .analytics
        .audience
        .as_deref()
        .unwrap_or(&credentials.token_endpoint);
    let assertion = build_assertion(
        &credentials,
        &config.analytics.scope,
        audience,
        Utc::now(),
        config.analytics.assertion_ttl,
    )
    .context("failed to sign a test assertion")?;

    println!("Configuration OK");
    println!("   Property:        {}", config.analytics.property_id);
    println!(
        "   Reports:         {}",
        config
            .analytics
            .reports
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("   Service account: {}", credentials.issuer);
    println!("   Key id:          {}", credentials.private_key_id);
    println!("   Token endpoint:  {}", credentials.token_endpoint);
    println!("   Assertion valid until {}", assertion.expires_at());
    Ok(())
}
