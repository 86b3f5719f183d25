use anyhow::{Context, Result};
use clap::Parser;
use resume_screener::cli::{handle_command, Cli};
use resume_screener::core::{ServiceClient, SessionStore, SupabaseAuth};
use resume_screener::{ClientConfig, Dashboard, EnvironmentConfig};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EnvironmentConfig::load(cli.config.as_deref())?;

    init_logging(&config)?;

    info!("Starting spectral");
    info!("Matching API: {}", config.api_base_url);
    info!("Identity provider: {}", config.auth_base_url);

    if !config.has_identity_provider() {
        anyhow::bail!("SUPABASE_URL environment variable not set");
    }

    let provider = SupabaseAuth::new(
        &config.auth_base_url,
        &config.auth_anon_key,
        config.request_timeout,
    )
    .context("Failed to create identity client")?
    .with_store(SessionStore::new(config.session_file.clone()));

    let backend = ServiceClient::new(&config.api_base_url, config.request_timeout)
        .context("Failed to create matching API client")?;

    let mut dashboard = Dashboard::new(&config, Arc::new(provider), Arc::new(backend));
    let result = handle_command(cli.command, &mut dashboard).await;
    dashboard.unmount();
    result
}

fn init_logging(config: &ClientConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    Ok(())
}
