mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use std::io;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;
use vanadristi_core::QueryClient;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::commands::{
    CommandContext, cmd_ai, cmd_config, cmd_dashboard, cmd_identifications, cmd_identify,
    cmd_plants, cmd_sensor, cmd_target, cmd_view,
};
use crate::config::Config;
use crate::format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "vanadristi", &mut io::stdout());
        return Ok(());
    }

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        config.output_format().unwrap_or_default()
    };
    let opts = FormatOptions::new(cli.no_color || config.no_color, cli.style)
        .with_compact(cli.compact);

    if let Some(ref path) = cli.output {
        tracing::debug!("Output will be written to: {}", path.display());
    }

    // Config works offline and never builds a client.
    let command = match cli.command {
        Commands::Config { action } => return cmd_config(action, format, &opts),
        command => command,
    };

    let client_config = config.client_config(cli.base_url.as_deref());
    client_config
        .validate()
        .context("Invalid client configuration")?;
    tracing::debug!("Using API at {}", client_config.base_url);
    let client = QueryClient::from_config(&client_config).context("Failed to create API client")?;

    let ctx = CommandContext {
        client: &client,
        config: &config,
        format,
        output: cli.output.as_ref(),
        quiet: cli.quiet,
        opts: &opts,
    };

    match command {
        Commands::Plants { action } => cmd_plants(&ctx, action).await,
        Commands::Target { action } => cmd_target(&ctx, action).await,
        Commands::Sensor { action } => cmd_sensor(&ctx, action).await,
        Commands::Ai { action } => cmd_ai(&ctx, action).await,
        Commands::Identify { file } => cmd_identify(&ctx, &file).await,
        Commands::Identifications => cmd_identifications(&ctx).await,
        Commands::Dashboard { watch, interval } => cmd_dashboard(&ctx, watch, interval).await,
        Commands::View { route } => cmd_view(&ctx, &route).await,
        Commands::Config { .. } | Commands::Completions { .. } => {
            // Already handled above
            unreachable!()
        }
    }
}
