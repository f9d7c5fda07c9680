mod commands;
mod domain;
mod services;
#[cfg(test)]
mod test_support;

use crate::commands::base_commands::{CliArgs, Commands};
use crate::commands::completions_cmd::completions_command;
use crate::commands::get_stats_cmd::get_stats_command;
use crate::commands::render_cmd::render_command;
use crate::commands::resolve_click_cmd::resolve_click_command;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    match args.command {
        cmd @ Commands::Render { .. } => render_command(cmd).await,
        cmd @ Commands::ResolveClick { .. } => resolve_click_command(cmd).await,
        cmd @ Commands::GetStats { .. } => get_stats_command(cmd).await,
        cmd @ Commands::Completions { .. } => completions_command(cmd),
    }
}
