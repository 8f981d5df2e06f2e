//! stylegated - stylegate daemon
//!
//! HTTP gateway in front of remotely hosted inference services (virtual
//! try-on, chatbot, text-to-dress, occasion recommendations).
//!
//! Usage:
//!   stylegated [OPTIONS] [config.toml]
//!
//! If no config file is provided, the built-in candidate endpoints are used.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stylegate_api::{create_router, AppState};
use stylegate_registry::{CapabilityRegistry, EndpointResolver};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GatewayConfig;

const DEFAULT_LOG_FILTER: &str = "stylegated=info,stylegate_api=info,stylegate_registry=info,\
                                  stylegate_proxy=info,stylegate_client=info";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "stylegated", version, about = "stylegate inference gateway daemon")]
struct Args {
    /// Gateway config file (TOML)
    config: Option<PathBuf>,

    /// Override the listen port from the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Token for private hosted spaces, used when the config file has none
    #[arg(long, env = "STYLEGATE_HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    tracing::info!("Starting stylegated");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config");
            GatewayConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using built-in endpoints");
            GatewayConfig::default()
        }
    };
    config = config.with_env_token(args.hf_token.clone());
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Directories
    let staging = config.staging_area();
    staging
        .ensure_directories()
        .await
        .context("Failed to create storage directories")?;
    let directories = staging.directories();
    let exist = staging.directories_exist();
    tracing::info!(
        uploads = %directories.uploads,
        uploads_exists = exist.uploads,
        public = %directories.public,
        public_exists = exist.public,
        base_image = %staging.base_image().display(),
        "Storage directories"
    );
    if !staging.base_image().is_file() {
        tracing::warn!(
            base_image = %staging.base_image().display(),
            "Base person image not found, /upload will fail until it exists"
        );
    }

    // Resolve every capability once; failures only mark it unavailable
    let resolver = EndpointResolver::with_policy(Arc::new(config.connector()), config.retry_policy());
    tracing::info!(
        max_attempts = resolver.policy().max_attempts,
        backoff = ?resolver.policy().backoff,
        "Resolving capability endpoints"
    );
    let registry = CapabilityRegistry::build(&resolver, config.capability_configs()).await;
    for (name, status) in registry.statuses() {
        tracing::info!(capability = %name, status = ?status, "Capability status");
    }

    let state = AppState::new(Arc::new(registry), Arc::new(staging));
    let app = create_router(state);

    let ip = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server.host '{}'", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stylegated stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "stylegated",
            "gateway.toml",
            "--port",
            "8080",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("gateway.toml")));
        assert_eq!(args.port, Some(8080));
        assert!(args.log_json);
    }

    #[test]
    fn args_default() {
        let args = Args::try_parse_from(["stylegated"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.port.is_none());
        assert!(!args.log_json);
    }
}
