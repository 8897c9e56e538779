use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use simple_publisher::{publisher, PublisherConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let config = PublisherConfig::from_env().context("Failed to load publisher configuration")?;
    let settings = config
        .settings()
        .context("Publisher configuration is invalid")?;

    info!(
        broker = %settings.address,
        queue = settings.queue.name(),
        "Publisher starting"
    );

    let declared = publisher(&settings)
        .await
        .context("Failed to publish message")?;

    info!(queue = %declared.name, "Publisher finished");
    Ok(())
}
