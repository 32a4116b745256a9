//! Batch extraction runner binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use faceset_worker::{BatchExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("faceset=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting faceset-worker");

    // Load configuration; a positional argument overrides the input dir
    let mut config = WorkerConfig::from_env();
    if let Some(dir) = std::env::args().nth(1) {
        config.input_dir = dir.into();
    }
    info!("Worker config: {:?}", config);

    let executor = BatchExecutor::new(config);
    match executor.run().await {
        Ok(summary) => {
            if summary.failed() > 0 {
                std::process::exit(2);
            }
        }
        Err(e) => {
            error!("Batch failed: {}", e);
            std::process::exit(1);
        }
    }
}
