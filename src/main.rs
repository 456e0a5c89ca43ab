//! Zentinel SOAP STS configuration check.
//!
//! Run with: `zentinel-soap-sts --config config.yaml`
//!
//! Builds the STS client and every configured service port, resolving and
//! merging their policies, and reports the effective endpoint policies.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;
use zentinel_soap_sts::config::WsClientConfig;
use zentinel_soap_sts::{Bus, ClientProxy, GenericPort, StsClientBuilder, WsClients};

/// Verify STS and service port configuration for SOAP clients.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Zentinel SOAP STS check v{}", env!("CARGO_PKG_VERSION"));
    info!("Config file: {}", args.config.display());

    let config: WsClientConfig = if args.config.exists() {
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        WsClientConfig::default()
    };

    info!(
        endpoints = config.endpoints.len(),
        resource_dirs = config.resource_dirs.len(),
        allow_insecure_requests = config.allow_insecure_requests,
        logging = config.features.logging.enabled,
        metrics = config.features.metrics,
        addressing = config.features.addressing,
        call_id = config.features.call_id,
        "Configuration loaded"
    );

    let Some(sts) = config.sts.as_ref() else {
        warn!("No STS configured, nothing to check");
        return Ok(());
    };

    let bus = config
        .resource_dirs
        .iter()
        .fold(Bus::builder(), |builder, dir| builder.resource_dir(dir))
        .build();
    let bus = Arc::new(bus);

    let properties = sts.to_properties().context("Invalid STS settings")?;
    let sts_client = StsClientBuilder::with_bus(Arc::clone(&bus)).build(&properties);
    sts_client
        .resolve_policy()
        .context("Failed to resolve STS client authentication policy")?;
    info!(location = %properties.url(), "STS client ready");

    let clients = WsClients::new(Arc::new(sts_client), || Uuid::new_v4().to_string())
        .with_features(config.features.clone())
        .with_allow_insecure_requests(config.allow_insecure_requests);

    for (name, endpoint) in &config.endpoints {
        let policy = endpoint.policy.as_deref().unwrap_or(clients.default_policy());
        let port: GenericPort = clients
            .build_port(&endpoint.url, policy, endpoint.soap_version)
            .with_context(|| format!("Failed to configure endpoint '{}'", name))?;

        let effective = port.client().effective_policy();
        let vocabulary: Vec<String> = effective.vocabulary().iter().map(|q| q.local.clone()).collect();
        info!(
            endpoint = %name,
            address = %endpoint.url,
            policy = %policy,
            satisfiable = effective.chosen_alternative().is_some(),
            chosen = effective.chosen_alternative().map_or(0, |a| a.len()),
            assertions = ?vocabulary,
            "Endpoint configured"
        );
    }

    info!("All endpoints configured");
    Ok(())
}
