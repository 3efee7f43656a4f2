//! Entry point for the linesink batch run.
//!
//! Streams the configured source file through Kafka into the SQLite record
//! store, then prints the final table contents.

use linesink::{Dependencies, RunError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RunError> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let deps = Dependencies::new().await?;
    let records = deps.run().await?;

    for record in &records {
        println!(
            "source: {}, line: {}, length: {}",
            record.source, record.line, record.length
        );
    }

    info!(records = records.len(), "Run complete");
    Ok(())
}
