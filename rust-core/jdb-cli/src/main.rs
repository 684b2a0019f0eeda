// SPDX-License-Identifier: PMPL-1.0-or-later
//! jdb - command-line access to a JDB data directory.
//!
//! Every command prints its result as pretty JSON on stdout. Logs go to
//! stderr and are controlled with `RUST_LOG` (default `warn`).

mod commands;

use clap::Parser;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let output = commands::run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
