//! Module pass driver for setter hooks.
//!
//! Per candidate method the pass moves through
//! `Unexamined → MarkerFound → MarkerRemoved → PropertyResolved → AccessorsPresent →
//! SignatureValid → Instrumented`; any failed check ends in `Rejected`, which is logged
//! and still counts as handled. Rejections never stop the rest of the module from being
//! woven. Only structural violations while rewriting a body abort the pass.

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::discovery::{self, HookBinding};
use crate::instrument;
use crate::{Result, Weaver, WeaverConfig};
use serde::{Deserialize, Serialize};
use setterweave_core::Module;
use tracing::debug;

/// What one pass over a module did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Hooks wired into setters.
    pub instrumented: usize,
    /// Marker attributes removed, valid or not.
    pub markers_consumed: usize,
    /// Candidates rejected with an error diagnostic.
    pub rejected: usize,
    /// Whether the reference to the marker assembly was dropped.
    pub reference_cleaned: bool,
}

impl PassOutcome {
    /// True when at least one setter was rewritten.
    pub fn changed(&self) -> bool {
        self.instrumented > 0
    }

    /// True when anything in the module was edited and it should be persisted.
    pub fn mutated(&self) -> bool {
        self.instrumented > 0 || self.markers_consumed > 0 || self.reference_cleaned
    }

    /// Adds the counts of `other` to this outcome.
    pub fn merge(&mut self, other: PassOutcome) {
        self.instrumented += other.instrumented;
        self.markers_consumed += other.markers_consumed;
        self.rejected += other.rejected;
        self.reference_cleaned |= other.reference_cleaned;
    }
}

/// Wires every marked hook method into the setter of the property it names.
#[derive(Debug, Default, Clone)]
pub struct SetterHookWeaver {
    config: WeaverConfig,
}

impl SetterHookWeaver {
    pub fn new(config: WeaverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }
}

impl Weaver for SetterHookWeaver {
    fn name(&self) -> &'static str {
        "SetterHook"
    }

    fn execute(&self, module: &mut Module, sink: &mut dyn DiagnosticSink) -> Result<PassOutcome> {
        weave_module(module, &self.config, sink)
    }
}

/// Runs the pass over every method of every type in `module`.
pub fn weave_module(
    module: &mut Module,
    config: &WeaverConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<PassOutcome> {
    debug!("=== SetterHook pass over module {} ===", module.name);
    let mut outcome = PassOutcome::default();

    for ty in &mut module.types {
        for method_index in 0..ty.methods.len() {
            let marked = ty.methods[method_index]
                .attributes
                .iter()
                .filter(|a| a.attribute_type == config.marker_attribute)
                .count();
            if marked == 0 {
                continue;
            }
            outcome.markers_consumed += marked;

            let binding: HookBinding = match discovery::discover(ty, method_index, config, sink) {
                Ok(Some(binding)) => binding,
                Ok(None) => continue,
                Err(rejection) => {
                    sink.emit(rejection.to_diagnostic());
                    outcome.rejected += 1;
                    continue;
                }
            };

            let report = instrument::instrument(ty, &binding)?;
            debug!(
                "Instrumented {} exit point(s), redirected {} branch(es)",
                report.exit_points, report.redirected_branches
            );

            let hook = ty.member_full_name(&ty.methods[binding.hook]);
            let property = ty.property_full_name(&ty.properties[binding.property]);
            sink.emit(Diagnostic::info(
                DiagnosticCode::HookWired,
                format!(
                    "Inserted a call to the method '{hook}' into the setter of the property '{property}'."
                ),
            ));
            outcome.instrumented += 1;
        }
    }

    outcome.merge(clean_reference(module, config, sink));
    Ok(outcome)
}

/// Drops the reference to the marker assembly once no marker is left in the module.
fn clean_reference(
    module: &mut Module,
    config: &WeaverConfig,
    sink: &mut dyn DiagnosticSink,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();
    if !config.clean_reference {
        return outcome;
    }

    let markers_left = module.methods().any(|(_, method)| {
        method
            .attributes
            .iter()
            .any(|a| a.attribute_type == config.marker_attribute)
    });
    let referenced = module
        .assembly_references
        .iter()
        .any(|r| r == &config.marker_assembly);
    if markers_left || !referenced {
        return outcome;
    }

    module
        .assembly_references
        .retain(|r| r != &config.marker_assembly);
    sink.emit(Diagnostic::info(
        DiagnosticCode::ReferenceCleaned,
        format!(
            "Removed the reference to '{}' from the module '{}'.",
            config.marker_assembly, module.name
        ),
    ));
    outcome.reference_cleaned = true;
    outcome
}
