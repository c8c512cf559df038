//! Module for the `weave-all` subcommand, which weaves every module of a project.

use async_trait::async_trait;
use clap::Args;
use setterweave_runner::{ProjectHost, Runner, RunnerConfig, weave_all};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `weave-all` subcommand.
#[derive(Args)]
pub struct WeaveAllArgs {
    /// Project directory scanned for `*.module.json` files.
    #[arg(short, long, default_value = ".")]
    project: PathBuf,
    /// Extra directory to resolve references from. May be repeated.
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,
    /// Configuration file. Defaults to `setterweave.json` in the project directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[async_trait]
impl super::Command for WeaveAllArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let WeaveAllArgs {
            project,
            search_paths,
            config,
        } = self;

        let mut config = match config {
            Some(path) => RunnerConfig::load(&path)?,
            None => RunnerConfig::discover(&project)?,
        };
        config.search_paths.extend(search_paths);

        let runner = Arc::new(Runner::from_config(&config));
        let host = ProjectHost::new(config.project_root.clone());
        let report = weave_all(&host, runner).await?;

        for (assembly, outcome) in &report.woven {
            let status = if outcome.changed {
                "woven"
            } else if outcome.persisted {
                "cleaned"
            } else {
                "unchanged"
            };
            println!("{:>10} {}", status, assembly.output_path.display());
        }
        for (assembly, message) in &report.failed {
            println!("{:>10} {}: {message}", "failed", assembly.output_path.display());
        }
        println!(
            "Weaving finished: {} of {} module(s) changed",
            report.changed(),
            report.woven.len() + report.failed.len()
        );

        if !report.failed.is_empty() {
            return Err(format!("{} module(s) failed to weave", report.failed.len()).into());
        }
        Ok(())
    }
}
