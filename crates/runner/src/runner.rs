use crate::config::RunnerConfig;
use crate::host::AssemblyInfo;
use crate::paths;
use crate::Result;
use serde::{Deserialize, Serialize};
use setterweave_core::io::{load_module, save_module};
use setterweave_weaver::pass::{DefaultPass, Pass};
use setterweave_weaver::{
    Diagnostic, Diagnostics, Level, PassOutcome, SetterHookWeaver, Weaver, WeaverConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of weaving one module file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveOutcome {
    /// Absolute path of the module file
    pub path: PathBuf,
    /// At least one setter was rewritten
    pub changed: bool,
    /// Counters of the pass
    #[serde(default)]
    pub pass: PassOutcome,
    /// The module file was rewritten on disk
    pub persisted: bool,
    /// References that were found on the search paths
    pub resolved_references: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl WeaveOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Error)
    }
}

/// Weaves module files one at a time. Cheap to share between worker threads.
#[derive(Debug, Clone)]
pub struct Runner {
    project_root: PathBuf,
    search_paths: Vec<PathBuf>,
    weaver: WeaverConfig,
}

impl Runner {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            search_paths: Vec::new(),
            weaver: WeaverConfig::default(),
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        let mut runner = Self::new(config.project_root.clone()).with_weaver(config.weaver.clone());
        runner.configure(config.search_paths.iter().cloned());
        runner
    }

    pub fn with_weaver(mut self, weaver: WeaverConfig) -> Self {
        self.weaver = weaver;
        self
    }

    /// Replaces the directories used to resolve references.
    pub fn configure<I>(&mut self, search_paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.search_paths = paths::search_paths(&self.project_root, search_paths);
        debug!("Configured {} search path(s)", self.search_paths.len());
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Weaves the module an assembly was compiled to.
    pub fn weave_assembly(&self, assembly: &AssemblyInfo) -> Result<WeaveOutcome> {
        let path = paths::add_project_root_if_needed(&self.project_root, &assembly.output_path);
        let resolved_references =
            paths::resolve_references(&self.project_root, &assembly.references, &self.search_paths);
        if !assembly.defines.is_empty() {
            debug!("{} compiled with defines {:?}", assembly.name, assembly.defines);
        }

        let mut outcome = self.weave_file(&path)?;
        outcome.resolved_references = resolved_references;
        Ok(outcome)
    }

    /// Loads, weaves and, when anything was edited, saves one module file in place.
    ///
    /// The file is left untouched if the pass fails.
    pub fn weave_file(&self, path: &Path) -> Result<WeaveOutcome> {
        self.weave_file_to(path, path)
    }

    /// Weaves `input` and writes the result to `output`.
    ///
    /// In place, the module is saved only when the pass edited it. A distinct `output` is
    /// always written.
    pub fn weave_file_to(&self, input: &Path, output: &Path) -> Result<WeaveOutcome> {
        let mut module = load_module(input)?;
        let mut diagnostics = Diagnostics::new();

        let weavers: Vec<Box<dyn Weaver>> =
            vec![Box::new(SetterHookWeaver::new(self.weaver.clone()))];
        let outcome: PassOutcome = DefaultPass.run(&mut module, &weavers, &mut diagnostics)?;

        let persisted = outcome.mutated() || output != input;
        if persisted {
            save_module(output, &module)?;
            info!(
                "Wove {} hook(s) into {}",
                outcome.instrumented,
                output.display()
            );
        } else {
            debug!("Nothing to weave in {}", input.display());
        }

        Ok(WeaveOutcome {
            path: output.to_path_buf(),
            changed: outcome.changed(),
            pass: outcome,
            persisted,
            resolved_references: Vec::new(),
            diagnostics: diagnostics.into_entries(),
        })
    }
}
