//! The computation a module kind runs and the context handed to it.
use crate::graph::{Module, Slot, Value};
use crate::type_system::TypeExpr;
use std::error::Error;
use std::fmt;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// The work performed by a module when it executes.
///
/// `inputs` holds one entry per input slot (`None` if the slot is unconnected
/// or its link holds no value). `outputs` arrives filled with `None`, one per
/// output slot; whatever is left in it after a successful call is forwarded.
pub trait Computation: Send + Sync {
    fn process(
        &self,
        cx: &ProcessContext<'_>,
        inputs: &[Option<Value>],
        outputs: &mut [Option<Value>],
    ) -> Result<(), BoxError>;

    /// Whether modules of this kind take an opaque configuration value.
    fn accepts_configuration(&self) -> bool {
        false
    }
}

/// Progress of a running computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Indeterminate,
    Fraction(f64),
}

impl Progress {
    /// Negative or NaN values mean "unknown"; anything above 1 is clamped.
    pub fn from_fraction(value: f64) -> Self {
        if value.is_nan() || value < 0.0 {
            Progress::Indeterminate
        } else {
            Progress::Fraction(value.min(1.0))
        }
    }
}

/// What a computation may see of, and do to, the module it runs in.
pub struct ProcessContext<'a> {
    module: &'a Module,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(module: &'a Module) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    pub fn configuration(&self) -> Option<Value> {
        self.module.configuration()
    }

    /// Forwards a progress message to the module's execution listeners.
    pub fn report_progress(&self, message: &str, fraction: f64) {
        let progress = Progress::from_fraction(fraction);
        for listener in self.module.execution_listeners().iter() {
            listener.progress_changed(self.module, message, progress);
        }
    }

    /// Records the runtime type an output actually produces. Returns false if
    /// the module has no such output.
    pub fn narrow_output_type(&self, index: usize, ty: TypeExpr) -> bool {
        match self.module.output(index) {
            Some(slot) => {
                slot.set_actual_type(ty);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ProcessContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext").field("module", &self.module.label()).finish()
    }
}

/// Wraps a closure as a `Computation`.
pub struct FnComputation<F> {
    f: F,
    configurable: bool,
}

impl<F> FnComputation<F>
where
    F: Fn(&ProcessContext<'_>, &[Option<Value>], &mut [Option<Value>]) -> Result<(), BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f, configurable: false }
    }

    pub fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }
}

impl<F> Computation for FnComputation<F>
where
    F: Fn(&ProcessContext<'_>, &[Option<Value>], &mut [Option<Value>]) -> Result<(), BoxError> + Send + Sync,
{
    fn process(
        &self,
        cx: &ProcessContext<'_>,
        inputs: &[Option<Value>],
        outputs: &mut [Option<Value>],
    ) -> Result<(), BoxError> {
        (self.f)(cx, inputs, outputs)
    }

    fn accepts_configuration(&self) -> bool {
        self.configurable
    }
}

/// Shorthand for `FnComputation::new`.
pub fn from_fn<F>(f: F) -> FnComputation<F>
where
    F: Fn(&ProcessContext<'_>, &[Option<Value>], &mut [Option<Value>]) -> Result<(), BoxError> + Send + Sync,
{
    FnComputation::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.5, Progress::Fraction(0.5))]
    #[case(0.0, Progress::Fraction(0.0))]
    #[case(1.5, Progress::Fraction(1.0))]
    #[case(-0.1, Progress::Indeterminate)]
    #[case(f64::NAN, Progress::Indeterminate)]
    fn test_progress_from_fraction(#[case] input: f64, #[case] expected: Progress) {
        assert_eq!(Progress::from_fraction(input), expected);
    }
}
