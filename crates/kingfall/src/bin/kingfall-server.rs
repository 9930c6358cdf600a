//! Standalone Kingfall server: one shared session, one gateway.

use std::sync::Arc;

use kingfall::{GameService, Gateway};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::var("KINGFALL_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9090".to_string());

    let service = Arc::new(GameService::new());
    let gateway = Gateway::bind(&addr, service).await?;

    tracing::info!(%addr, "kingfall server running");
    gateway.run().await?;
    Ok(())
}
