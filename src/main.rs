//! # slurmdbd-operator
//!
//! Entry point. Loads the operator configuration, then delivers the event
//! named on the command line to the reconciler.
//!
//! ## Configuration
//!
//! Read from `--config` or `SLURMDBD_OPERATOR_CONFIG`. A missing file means
//! built-in defaults; `SLURMDBD_HOSTNAME`, `SLURMDBD_PORT` and
//! `SLURMDBD_STATE_FILE` override individual values.
//!
//! ## Logging
//!
//! `RUST_LOG` filters output; the default level is `info`.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use slurmdbd_core::OperatorConfig;
use slurmdbd_operator::cli::Cli;
use slurmdbd_operator::commands::execute_command;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = OperatorConfig::load(&cli.config).with_context(|| {
        format!(
            "Failed to load operator configuration from {}",
            cli.config.display()
        )
    })?;
    debug!(
        config = %cli.config.display(),
        state_file = %config.state_file.display(),
        "Configuration loaded"
    );

    execute_command(&config, cli.command).await
}

/// Initialize tracing subscriber.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
