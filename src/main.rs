use anyhow::Result;
use clap::Parser;
use plant_analyzer::app::Analyzer;
use plant_analyzer::models::Config;
use plant_analyzer::server;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "plant-analyzer")]
#[command(about = "Serve AI-backed plant identification")]
struct CliArgs {
    /// Address to listen on; overrides BIND_ADDR.
    #[arg(long, value_name = "ADDR", value_parser = parse_bind_arg)]
    bind: Option<String>,
}

fn parse_bind_arg(input: &str) -> std::result::Result<String, String> {
    input
        .parse::<std::net::SocketAddr>()
        .map(|_| input.to_string())
        .map_err(|_| format!("Invalid address '{}'. Expected HOST:PORT", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_analyzer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting plant-analyzer");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if config.api_key.is_none() {
        warn!("AI_GATEWAY_API_KEY not set; analysis requests will fail until it is configured");
    }

    let analyzer = Arc::new(Analyzer::from_config(&config)?);
    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = TcpListener::bind(&bind_addr).await?;

    server::serve(listener, server::router(analyzer, config.max_body_bytes)).await?;
    Ok(())
}
