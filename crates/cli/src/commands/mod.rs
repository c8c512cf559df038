use async_trait::async_trait;
use clap::Subcommand;
use std::error::Error;

pub mod inspect;
pub mod weave;
pub mod weave_all;

/// CLI subcommands for Setterweave.
#[derive(Subcommand)]
pub enum Cmd {
    /// Weave setter hooks into a single module file.
    Weave(weave::WeaveArgs),
    /// Weave every module of a project directory.
    WeaveAll(weave_all::WeaveAllArgs),
    /// Print method bodies, optionally executing one.
    Inspect(inspect::InspectArgs),
}

/// Trait for executing CLI subcommands.
#[async_trait]
pub trait Command {
    /// Executes the subcommand.
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Weave(args) => args.execute().await,
            Cmd::WeaveAll(args) => args.execute().await,
            Cmd::Inspect(args) => args.execute().await,
        }
    }
}

