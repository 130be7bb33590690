// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — local PDF job runner.
//
// Entry point. Initialises logging, loads the engine config, and runs the
// requested command as a single job.

mod cli;
mod config;
mod runner;

use std::process::ExitCode;

use blattwerk_core::error::Result;
use blattwerk_core::human_errors::humanize_error;
use blattwerk_engine::Dispatcher;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("Blattwerk starting");

    match execute(cli).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            tracing::debug!(kind = ?human.kind, error = %err, "Job failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<std::path::PathBuf> {
    let config = config::load_config(cli.config.as_deref());
    let request = cli.command.to_request(&config)?;
    let dispatcher = Dispatcher::from_config(config);
    runner::run(dispatcher, request, &cli.output_dir).await
}
