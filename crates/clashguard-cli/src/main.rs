use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod config;
mod discovery;
mod dispatch;
mod hook_env;
mod render;

#[cfg(test)]
mod tests;

pub const LOG_ENV: &str = "CLASHGUARD_LOG";

#[derive(Parser, Debug)]
#[command(name = "clashguard")]
#[command(about = "Pre-merge file collision check for package installs", long_about = None)]
struct Cli {
    /// TOML configuration file. Falls back to $CLASHGUARD_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Target root, overriding $ROOT.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Staging tree, overriding $IMAGE.
    #[arg(long, global = true)]
    image: Option<PathBuf>,
    #[arg(long, global = true)]
    destination_repo: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain, global = true)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Run the collision check for the package described by the hook environment.
    Check,
    /// Print the first installed package whose manifest lists a path.
    Owner { path: String },
    /// Print the ignore prefixes the check would use.
    Policy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let status = dispatch::run_cli(cli)?;
    std::process::exit(status)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
