pub mod contract;
pub mod diagnostics;
pub mod discovery;
pub mod instrument;
pub mod module_weaver;
pub mod pass;

use serde::{Deserialize, Serialize};
use setterweave_core::Module;
use thiserror::Error;

pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Diagnostics, Level};
pub use module_weaver::{PassOutcome, SetterHookWeaver, weave_module};

/// Full name of the marker attribute that designates a setter hook.
pub const MARKER_ATTRIBUTE: &str = "SetterWeave.CalledBySetterAttribute";

/// Assembly that defines the marker attribute.
pub const MARKER_ASSEMBLY: &str = "SetterWeave";

/// Weaver error type. Every variant is fatal for the pass over the current module.
#[derive(Debug, Error)]
pub enum Error {
    /// Core operation failed.
    #[error("core operation failed: {0}")]
    Core(#[from] setterweave_core::Error),

    /// The property has a setter but no backing field to hand to the hook.
    #[error("property '{property}' has no backing field '{field}'")]
    MissingBackingField {
        /// Full name of the property.
        property: String,
        /// Name of the field that was looked up.
        field: String,
    },

    /// The backing field does not hold the property's type, so the hook's `ref T` would
    /// alias a slot of another type.
    #[error("backing field '{field}' of property '{property}' is {actual}, expected {expected}")]
    BackingFieldType {
        /// Full name of the property.
        property: String,
        /// Name of the backing field.
        field: String,
        /// Property type.
        expected: String,
        /// Declared field type.
        actual: String,
    },

    /// A method that must be rewritten has no body.
    #[error("method '{0}' has no body")]
    MissingBody(String),
}

/// Weaver result type
pub type Result<T> = std::result::Result<T, Error>;

/// A module-level rewriting pass.
pub trait Weaver: Send + Sync {
    /// Returns the weaver's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the weaver to the module, returning what it did.
    fn execute(&self, module: &mut Module, sink: &mut dyn DiagnosticSink) -> Result<PassOutcome>;
}

/// Configuration of the setter hook weaver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaverConfig {
    /// Full name of the marker attribute to look for
    pub marker_attribute: String,
    /// Assembly defining the marker, dropped from the module's references once unused
    pub marker_assembly: String,
    /// Remove the reference to `marker_assembly` when no markers remain
    pub clean_reference: bool,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            marker_attribute: MARKER_ATTRIBUTE.to_string(),
            marker_assembly: MARKER_ASSEMBLY.to_string(),
            clean_reference: true,
        }
    }
}
