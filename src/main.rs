// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use ednsctl::{
    config::Cli,
    constants::TOKIO_WORKER_THREADS,
    report::{render_summary, write_artifact},
};
use kube::Client;
use tracing::{debug, info};

fn main() -> Result<()> {
    // Parse before starting the runtime so --help and flag errors exit immediately
    let cli = Cli::parse();
    ednsctl::install_crypto_provider();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("ednsctl")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_tracing() {
    // Logs go to stderr; stdout carries only the summary.
    //
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json or text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    init_tracing();

    let config = cli.validate()?;
    debug!(?config, "Configuration validated");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let report = ednsctl::run(&config, client).await?;

    print!("{}", render_summary(&report));

    if let Some(output) = &config.output {
        let path = write_artifact(&report, &output.dir, output.format, Utc::now())?;
        println!("\nTXT registry records written to {}", path.display());
    } else {
        info!("Artifact disabled, skipping write");
    }

    Ok(())
}
