//! Module for the `weave` subcommand, which instruments a single module file.

use async_trait::async_trait;
use clap::Args;
use serde_json::json;
use setterweave_runner::Runner;
use setterweave_weaver::WeaverConfig;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `weave` subcommand.
#[derive(Args)]
pub struct WeaveArgs {
    /// Module file (`*.module.json`) to instrument.
    pub input: PathBuf,
    /// Where to write the woven module. Defaults to rewriting the input in place.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Full name of the marker attribute.
    #[arg(long, default_value = setterweave_weaver::MARKER_ATTRIBUTE)]
    marker: String,
    /// Keep the reference to the marker assembly even when no markers remain.
    #[arg(long)]
    keep_reference: bool,
    /// Path to emit the pass outcome and diagnostics as JSON.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[async_trait]
impl super::Command for WeaveArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let WeaveArgs {
            input,
            output,
            marker,
            keep_reference,
            report,
        } = self;

        let config = WeaverConfig {
            marker_attribute: marker,
            clean_reference: !keep_reference,
            ..WeaverConfig::default()
        };

        let target = output.unwrap_or_else(|| input.clone());
        let root = input.parent().map(PathBuf::from).unwrap_or_default();
        let runner = Runner::new(root).with_weaver(config);
        let woven = runner.weave_file_to(&input, &target)?;

        println!(
            "{}: {} hook(s) wired, {} rejected",
            target.display(),
            woven.pass.instrumented,
            woven.pass.rejected
        );

        if let Some(path) = report {
            let report = json!({
                "input": input,
                "output": woven.path,
                "persisted": woven.persisted,
                "outcome": woven.pass,
                "diagnostics": woven.diagnostics,
            });
            fs::write(&path, serde_json::to_string_pretty(&report)?)?;
            println!("Report written to {}", path.display());
        }

        if woven.has_errors() {
            return Err(format!("{} hook(s) could not be wired", woven.pass.rejected).into());
        }
        Ok(())
    }
}
