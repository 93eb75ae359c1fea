//! htcollector - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_logging(settings.tracing_level());

    info!("=== htcollector v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting htcollector...");

    run_server(settings).await?;

    Ok(())
}
