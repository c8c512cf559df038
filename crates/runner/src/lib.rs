//! Drives the setter hook pass over the modules of a host project.
//!
//! The [`host::Host`] trait is the seam to whatever produced the modules (an editor, a
//! build tool, or a plain directory via [`host::ProjectHost`]). [`runner::Runner`] weaves a
//! single module file; [`editor`] batches that over every assembly a host reports while
//! the host's reload gate is held.

pub mod config;
pub mod editor;
pub mod host;
pub mod paths;
pub mod runner;

use std::path::PathBuf;
use thiserror::Error;

pub use config::RunnerConfig;
pub use editor::{BatchReport, on_compilation_finished, weave_all};
pub use host::{AssemblyInfo, Host, ProjectHost, ReloadLock};
pub use runner::{Runner, WeaveOutcome};

/// Runner error type
#[derive(Debug, Error)]
pub enum Error {
    /// Loading or saving a module failed.
    #[error(transparent)]
    Core(#[from] setterweave_core::Error),

    /// The pass failed fatally for a module.
    #[error(transparent)]
    Weaver(#[from] setterweave_weaver::Error),

    /// The configuration file could not be parsed.
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Enumerating the host's assemblies failed.
    #[error("failed to enumerate assemblies under {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The module file pattern built from the project root is not a valid glob.
    #[error("invalid scan pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A weaving task panicked or was cancelled.
    #[error("weaving task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runner result type
pub type Result<T> = std::result::Result<T, Error>;
