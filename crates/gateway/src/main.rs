//! Marketplace admin console server.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_lib::config::GatewayConfig;

#[derive(Parser)]
#[command(name = "market-admin")]
#[command(about = "Admin console for marketplace seller verification and product moderation")]
struct Cli {
    /// Use the in-process backend seeded with demo data
    #[cfg(feature = "demo")]
    #[arg(long, env = "MARKET_ADMIN_DEMO")]
    demo: bool,
    /// Override GATEWAY_HOST
    #[arg(long)]
    host: Option<String>,
    /// Override GATEWAY_PORT
    #[arg(long)]
    port: Option<u16>,
    /// Debug-level logging when RUST_LOG is unset
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = load_config(&cli)?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    gateway_lib::run_server_with_config(config).await
}

#[cfg(feature = "demo")]
fn load_config(cli: &Cli) -> common::AppResult<GatewayConfig> {
    if cli.demo {
        GatewayConfig::demo_from_env()
    } else {
        GatewayConfig::from_env()
    }
}

#[cfg(not(feature = "demo"))]
fn load_config(_cli: &Cli) -> common::AppResult<GatewayConfig> {
    GatewayConfig::from_env()
}
