//! Batch weaving driven by host events.

use crate::host::{AssemblyInfo, Host, ReloadLock};
use crate::runner::{Runner, WeaveOutcome};
use crate::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// What a batch over all assemblies did.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    /// Outcomes of assemblies that were woven, in host order
    pub woven: Vec<(AssemblyInfo, WeaveOutcome)>,
    /// Assemblies whose weaving failed, with the error message
    pub failed: Vec<(AssemblyInfo, String)>,
    /// Source files handed back to the host for re-import
    pub reimported: Vec<PathBuf>,
}

impl BatchReport {
    pub fn changed(&self) -> usize {
        self.woven.iter().filter(|(_, o)| o.changed).count()
    }
}

/// Keeps the first assembly for each output path.
pub fn unique_assemblies(assemblies: Vec<AssemblyInfo>) -> Vec<AssemblyInfo> {
    let mut seen = HashSet::new();
    assemblies
        .into_iter()
        .filter(|assembly| seen.insert(assembly.output_path.clone()))
        .collect()
}

/// Weaves every assembly the host knows about.
///
/// The host's reload gate is held for the whole batch. Assemblies are woven in parallel on
/// blocking workers; a failing assembly is logged and does not affect the others. For each
/// assembly that changed, its first source file is re-imported.
pub async fn weave_all(host: &dyn Host, runner: Arc<Runner>) -> Result<BatchReport> {
    let _lock = ReloadLock::acquire(host);
    let assemblies = unique_assemblies(host.assemblies()?);
    info!("Weaving {} assembl(ies)", assemblies.len());

    let mut join_set = JoinSet::new();
    for (index, assembly) in assemblies.iter().enumerate() {
        let runner = Arc::clone(&runner);
        let assembly = assembly.clone();
        join_set.spawn_blocking(move || (index, runner.weave_assembly(&assembly)));
    }

    let mut results: Vec<Option<std::result::Result<WeaveOutcome, String>>> =
        vec![None; assemblies.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result.map_err(|e| e.to_string())),
            Err(join_error) => error!("Weaving task failed: {join_error}"),
        }
    }

    let mut report = BatchReport::default();
    for (assembly, result) in assemblies.into_iter().zip(results) {
        match result {
            Some(Ok(outcome)) => {
                for diagnostic in &outcome.diagnostics {
                    host.report(&assembly, diagnostic);
                }
                if outcome.changed
                    && let Some(source) = assembly.source_files.first()
                {
                    host.reimport(source);
                    report.reimported.push(source.clone());
                }
                report.woven.push((assembly, outcome));
            }
            Some(Err(message)) => {
                error!("Weaving {} failed: {message}", assembly.name);
                report.failed.push((assembly, message));
            }
            None => {
                report
                    .failed
                    .push((assembly, "weaving task did not complete".to_string()));
            }
        }
    }

    info!(
        "Weaving finished: {} changed, {} failed",
        report.changed(),
        report.failed.len()
    );
    Ok(report)
}

/// Weaves the single assembly whose output path is exactly `path`.
///
/// Unknown paths are ignored. A failure is logged and yields `None`, like an assembly
/// that was not found.
pub async fn on_compilation_finished(
    host: &dyn Host,
    runner: Arc<Runner>,
    path: &Path,
) -> Result<Option<WeaveOutcome>> {
    let Some(assembly) = unique_assemblies(host.assemblies()?)
        .into_iter()
        .find(|assembly| assembly.output_path.as_os_str() == path.as_os_str())
    else {
        return Ok(None);
    };

    let task_assembly = assembly.clone();
    let result = tokio::task::spawn_blocking(move || runner.weave_assembly(&task_assembly)).await?;
    match result {
        Ok(outcome) => {
            for diagnostic in &outcome.diagnostics {
                host.report(&assembly, diagnostic);
            }
            Ok(Some(outcome))
        }
        Err(e) => {
            warn!("Weaving {} after compilation failed: {e}", assembly.name);
            Ok(None)
        }
    }
}
