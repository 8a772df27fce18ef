//! The per-module execution protocol.
//!
//! One `execute` call walks
//! `Idle -> BeforeExecution -> InputGathering -> BeforeProcessing -> Processing
//! -> AfterProcessing -> OutputForwarding -> AfterExecution -> Idle`.
//! A failed computation skips forwarding; listeners still see
//! `after_execution` with the error before it is returned. A computation
//! that panics unwinds past the listeners, but the module is left `Idle`.
use super::error::ExecutionError;
use super::process::{ProcessContext, Progress};
use crate::graph::{Module, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    BeforeExecution,
    InputGathering,
    BeforeProcessing,
    Processing,
    AfterProcessing,
    OutputForwarding,
    AfterExecution,
}

/// Observes the execution of one module. All methods default to no-ops.
pub trait ModuleExecutionListener: Send + Sync {
    fn before_execution(&self, _module: &Module) {}
    fn before_processing(&self, _module: &Module) {}
    fn after_processing(&self, _module: &Module) {}
    fn after_execution(&self, _module: &Module, _result: Result<(), &ExecutionError>) {}
    fn progress_changed(&self, _module: &Module, _message: &str, _progress: Progress) {}
}

fn notify(module: &Module, event: impl Fn(&dyn ModuleExecutionListener)) {
    for listener in module.execution_listeners().iter() {
        event(listener.as_ref());
    }
}

/// Puts the module back in `Idle` however `execute` exits.
struct ResetPhase<'a>(&'a Module);

impl Drop for ResetPhase<'_> {
    fn drop(&mut self) {
        self.0.set_phase(ExecutionPhase::Idle);
    }
}

pub(crate) fn execute(module: &Module) -> Result<(), ExecutionError> {
    let span = tracing::debug_span!("execute", module = %module.label());
    let _guard = span.enter();
    let _reset = ResetPhase(module);

    module.set_phase(ExecutionPhase::BeforeExecution);
    notify(module, |listener| listener.before_execution(module));

    module.set_phase(ExecutionPhase::InputGathering);
    let inputs: Vec<Option<Value>> = module
        .inputs()
        .iter()
        .map(|slot| slot.input_link().and_then(|link| link.provide()))
        .collect();

    let result = process(module, &inputs);

    module.set_phase(ExecutionPhase::AfterExecution);
    let outcome = result.as_ref().map(|_| ());
    notify(module, |listener| listener.after_execution(module, outcome));

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::warn!(error = %err, "execution failed");
            Err(err)
        }
    }
}

fn process(module: &Module, inputs: &[Option<Value>]) -> Result<(), ExecutionError> {
    module.set_phase(ExecutionPhase::BeforeProcessing);
    notify(module, |listener| listener.before_processing(module));

    module.set_phase(ExecutionPhase::Processing);
    let mut outputs: Vec<Option<Value>> = vec![None; module.outputs().len()];
    let cx = ProcessContext::new(module);
    module
        .computation()
        .process(&cx, inputs, &mut outputs)
        .map_err(|source| ExecutionError::Failed {
            module: module.label(),
            source: Arc::from(source),
        })?;

    module.set_phase(ExecutionPhase::AfterProcessing);
    notify(module, |listener| listener.after_processing(module));

    module.set_phase(ExecutionPhase::OutputForwarding);
    for (slot, value) in module.outputs().iter().zip(&outputs) {
        for link in slot.output_links() {
            tracing::trace!(link = %link.id(), "forwarding output");
            link.accept(value.clone());
        }
    }
    module.store_outputs(outputs);
    Ok(())
}
