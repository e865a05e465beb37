mod config;
mod errors;
mod generation;
mod llm_client;
mod pipeline;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::{AppError, EXIT_INTERRUPTED};
use crate::llm_client::OllamaClient;
use crate::pipeline::checkpoint::{ConsoleOperator, HeadlessOperator, Operator};
use crate::pipeline::run_loop::Pipeline;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Fatal error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32, AppError> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting synth v{}", env!("CARGO_PKG_VERSION"));

    let llm = OllamaClient::new(&config.llm)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {e}")))?;
    info!(
        "LLM client initialized (model: {}, url: {})",
        config.llm.model, config.llm.url
    );

    let operator: Box<dyn Operator> = if config.headless {
        info!("Running headless: every checkpoint auto-accepts");
        Box::new(HeadlessOperator)
    } else {
        Box::new(ConsoleOperator::new())
    };

    let mut pipeline = Pipeline::new(config, Arc::new(llm), operator);

    // Interrupt exits immediately; everything accepted so far is already on disk.
    tokio::select! {
        outcome = pipeline.run() => {
            let outcome = outcome?;
            info!("Run finished: {:?}", outcome);
            Ok(outcome.exit_code())
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n\nGeneration stopped by user");
            Ok(EXIT_INTERRUPTED)
        }
    }
}
