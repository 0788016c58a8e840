//! Shopwatch Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - SHOPWATCH_HOST: Bind address (default: 0.0.0.0)
//! - SHOPWATCH_PORT: Port number (default: 5000)
//! - SHOPWATCH_SHOPS: Comma-separated known shops (default: conad,tigre,gros)
//! - SHOPWATCH_WEBHOOK_URL: Webhook receiving every alert (default: none)
//! - SHOPWATCH_ALERT_QUEUE: Alert queue capacity (default: 1024)
//! - RUST_LOG: Log level (default: info)

use shopwatch::api::{run_server, ServerConfig};
use shopwatch::THRESHOLD;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = ServerConfig::default();

    let host = std::env::var("SHOPWATCH_HOST").unwrap_or(defaults.host);
    let port: u16 = std::env::var("SHOPWATCH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults.port);
    let alert_queue_capacity = std::env::var("SHOPWATCH_ALERT_QUEUE")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .filter(|c| *c > 0)
        .unwrap_or(defaults.alert_queue_capacity);

    // Parse shop list: "conad,tigre,gros" format
    let shops: Vec<String> = std::env::var("SHOPWATCH_SHOPS")
        .ok()
        .map(|shops_str| {
            shops_str
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or(defaults.shops);

    let webhook_url = std::env::var("SHOPWATCH_WEBHOOK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let config = ServerConfig {
        host,
        port,
        shops,
        webhook_url,
        alert_queue_capacity,
    };

    tracing::info!("Shopwatch configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!("  Shops: {}", config.shops.join(", "));
    tracing::info!("  Threshold: {}", THRESHOLD);
    tracing::info!("  Alert queue capacity: {}", config.alert_queue_capacity);
    match &config.webhook_url {
        Some(url) => tracing::info!("  Webhook: {}", url),
        None => tracing::info!("  Webhook: DISABLED (log only)"),
    }

    run_server(config).await
}
