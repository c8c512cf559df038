//! The environment that owns the modules being woven.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use setterweave_weaver::Diagnostic;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Suffix of module files recognised by [`ProjectHost`].
pub const MODULE_SUFFIX: &str = ".module.json";

/// A compiled assembly as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyInfo {
    pub name: String,
    /// Where the module file was written; may be relative to the project root.
    pub output_path: PathBuf,
    #[serde(default)]
    pub source_files: Vec<PathBuf>,
    #[serde(default)]
    pub references: Vec<PathBuf>,
    #[serde(default)]
    pub defines: Vec<String>,
}

impl AssemblyInfo {
    pub fn new(name: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_path: output_path.into(),
            source_files: Vec::new(),
            references: Vec::new(),
            defines: Vec::new(),
        }
    }
}

/// Operations the orchestration needs from its host.
pub trait Host: Send + Sync {
    /// All assemblies known to the host, possibly with repeated output paths.
    fn assemblies(&self) -> Result<Vec<AssemblyInfo>>;
    /// Stops the host from reloading modules.
    fn lock_reload(&self);
    /// Lets the host reload modules again.
    fn unlock_reload(&self);
    /// Forces the host to re-import a source file.
    fn reimport(&self, source_file: &Path);
    /// Asks the host to pick up all changes on disk.
    fn refresh(&self);
    /// Receives a diagnostic produced while weaving `assembly`.
    fn report(&self, _assembly: &AssemblyInfo, _diagnostic: &Diagnostic) {}
}

/// Holds the host's reload gate for as long as it lives.
///
/// Dropping the guard unlocks the gate and refreshes the host, also while unwinding.
pub struct ReloadLock<'h> {
    host: &'h dyn Host,
}

impl<'h> ReloadLock<'h> {
    pub fn acquire(host: &'h dyn Host) -> Self {
        host.lock_reload();
        debug!("Reload gate locked");
        Self { host }
    }
}

impl Drop for ReloadLock<'_> {
    fn drop(&mut self) {
        self.host.unlock_reload();
        self.host.refresh();
        debug!("Reload gate released");
    }
}

/// File-system host: every `*.module.json` below a directory is an assembly.
#[derive(Debug)]
pub struct ProjectHost {
    root: PathBuf,
    assemblies: Option<Vec<AssemblyInfo>>,
    lock_depth: AtomicUsize,
    refreshes: AtomicUsize,
    reimported: Mutex<Vec<PathBuf>>,
    reported: Mutex<Vec<Diagnostic>>,
}

impl ProjectHost {
    /// Host that scans `root` for module files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            assemblies: None,
            lock_depth: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            reimported: Mutex::new(Vec::new()),
            reported: Mutex::new(Vec::new()),
        }
    }

    /// Host with a fixed list of assemblies instead of a directory scan.
    pub fn with_assemblies(root: impl Into<PathBuf>, assemblies: Vec<AssemblyInfo>) -> Self {
        Self {
            assemblies: Some(assemblies),
            ..Self::new(root)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_locked(&self) -> bool {
        self.lock_depth.load(Ordering::SeqCst) > 0
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn reimported(&self) -> Vec<PathBuf> {
        self.reimported
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }

    pub fn reported(&self) -> Vec<Diagnostic> {
        self.reported
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Every `*.module.json` below the root, in path order.
    fn scan(&self) -> Result<Vec<AssemblyInfo>> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{root}/**/*{MODULE_SUFFIX}");
        debug!("Scanning with pattern {pattern}");

        let mut paths = glob::glob(&pattern)?
            .map(|entry| {
                entry.map_err(|e| Error::Scan {
                    path: e.path().to_path_buf(),
                    source: e.into_error(),
                })
            })
            .collect::<Result<Vec<PathBuf>>>()?;
        paths.sort();

        Ok(paths
            .into_iter()
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.strip_suffix(MODULE_SUFFIX)?.to_string();
                let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
                Some(AssemblyInfo::new(name, relative))
            })
            .collect())
    }
}

impl Host for ProjectHost {
    fn assemblies(&self) -> Result<Vec<AssemblyInfo>> {
        if let Some(assemblies) = &self.assemblies {
            return Ok(assemblies.clone());
        }
        let found = self.scan()?;
        debug!("Found {} module(s) under {}", found.len(), self.root.display());
        Ok(found)
    }

    fn lock_reload(&self) {
        self.lock_depth.fetch_add(1, Ordering::SeqCst);
    }

    fn unlock_reload(&self) {
        let _ = self
            .lock_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| depth.checked_sub(1));
    }

    fn reimport(&self, source_file: &Path) {
        info!("Re-importing {}", source_file.display());
        if let Ok(mut files) = self.reimported.lock() {
            files.push(source_file.to_path_buf());
        }
    }

    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn report(&self, _assembly: &AssemblyInfo, diagnostic: &Diagnostic) {
        if let Ok(mut entries) = self.reported.lock() {
            entries.push(diagnostic.clone());
        }
    }
}
