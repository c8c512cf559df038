use clap::Parser;
use setterweave_cli::commands::{Cmd, Command};
use setterweave_cli::log_filter;

/// Setterweave CLI
///
/// Setterweave wires methods marked with `CalledBySetter` into the setter of the property
/// they name, so they run after every assignment with the previous and the new value.
#[derive(Parser)]
#[command(name = "setterweave")]
#[command(about = "Setterweave: property setter hook weaver")]
struct Cli {
    /// Log every rewriting step (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Setterweave CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, directives.as_deref()))
        .with_ansi(false)
        .without_time()
        .init();

    cli.command.execute().await
}
