use crate::diagnostics::DiagnosticSink;
use crate::{PassOutcome, Result, Weaver};
use setterweave_core::Module;
use tracing::info;

/// Trait for running a sequence of weavers over a module.
pub trait Pass {
    fn run(
        &self,
        module: &mut Module,
        weavers: &[Box<dyn Weaver>],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PassOutcome>;
}

/// Runs each weaver on a snapshot and commits it only if the weaver succeeds.
///
/// A weaver that fails leaves the module as it was before that weaver ran; the error is
/// returned and later weavers are skipped.
pub struct DefaultPass;

impl Pass for DefaultPass {
    fn run(
        &self,
        module: &mut Module,
        weavers: &[Box<dyn Weaver>],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PassOutcome> {
        let mut total = PassOutcome::default();

        for weaver in weavers {
            let mut snapshot = module.clone();

            let outcome = weaver.execute(&mut snapshot, sink)?;
            if !outcome.mutated() {
                continue;
            }

            info!(
                "{:>14} wired {} hook(s), rejected {}",
                weaver.name(),
                outcome.instrumented,
                outcome.rejected
            );
            *module = snapshot;
            total.merge(outcome);
        }
        Ok(total)
    }
}
