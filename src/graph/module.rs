//! Defines `Module`, one instance of a module kind placed (or about to be
//! placed) in a flow.
use super::error::ModuleError;
use super::flow::FlowId;
use super::info::ModuleInfo;
use super::link::Link;
use super::listeners::ListenerList;
use super::slot::{InputSlot, OutputSlot, Slot};
use super::value::Value;
use crate::analysis::compatibility;
use crate::computation::{engine, Computation, ExecutionError, ExecutionPhase, ModuleExecutionListener};
use crate::type_system::{TypeContext, TypeError, TypeExpr, TypeVariableInstantiator};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MODULE: AtomicU64 = AtomicU64::new(1);

/// A process-wide unique identifier for a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub u64);

impl ModuleId {
    fn next() -> Self {
        Self(NEXT_MODULE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A module instance: its shared declaration, its own slots with freshly
/// instantiated types, the computation it runs and its execution listeners.
pub struct Module {
    id: ModuleId,
    info: Arc<ModuleInfo>,
    computation: Arc<dyn Computation>,
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
    configuration: RwLock<Option<Value>>,
    flow: RwLock<Option<FlowId>>,
    listeners: ListenerList<dyn ModuleExecutionListener>,
    phase: Mutex<ExecutionPhase>,
    last_outputs: Mutex<Vec<Option<Value>>>,
}

impl Module {
    /// Creates a standalone module (not yet in any flow).
    ///
    /// Every slot type is registered with a new instantiator before any of
    /// them is instantiated, so a variable shared between slots stays shared
    /// within this instance and is never shared with another instance.
    pub fn new(info: Arc<ModuleInfo>, computation: Arc<dyn Computation>) -> Result<Arc<Self>, TypeError> {
        let mut instantiator = TypeVariableInstantiator::new();
        for slot in info.inputs.iter().chain(&info.outputs) {
            instantiator.register(&slot.ty)?;
        }
        let input_types = info
            .inputs
            .iter()
            .map(|slot| instantiator.instantiate(&slot.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let output_types = info
            .outputs
            .iter()
            .map(|slot| instantiator.instantiate(&slot.ty))
            .collect::<Result<Vec<_>, _>>()?;

        let id = ModuleId::next();
        let output_count = output_types.len();
        let module = Arc::new_cyclic(|this| Self {
            id,
            inputs: input_types
                .into_iter()
                .enumerate()
                .map(|(index, ty)| InputSlot::new(this.clone(), id, index, ty))
                .collect(),
            outputs: output_types
                .into_iter()
                .enumerate()
                .map(|(index, ty)| OutputSlot::new(this.clone(), id, index, ty))
                .collect(),
            info,
            computation,
            configuration: RwLock::new(None),
            flow: RwLock::new(None),
            listeners: ListenerList::new(),
            phase: Mutex::new(ExecutionPhase::Idle),
            last_outputs: Mutex::new(vec![None; output_count]),
        });
        tracing::debug!(module = %module.label(), "module created");
        Ok(module)
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn info(&self) -> &Arc<ModuleInfo> {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The kind name disambiguated by the instance id, e.g. `Identity#7`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.info.name, self.id)
    }

    pub fn computation(&self) -> &Arc<dyn Computation> {
        &self.computation
    }

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&InputSlot> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&OutputSlot> {
        self.outputs.get(index)
    }

    /// Every link attached to this module's slots, incoming first.
    pub fn links(&self) -> Vec<Arc<Link>> {
        let mut links: Vec<Arc<Link>> = self.inputs.iter().filter_map(InputSlot::input_link).collect();
        for slot in &self.outputs {
            for link in slot.output_links() {
                if !links.iter().any(|existing| existing.id() == link.id()) {
                    links.push(link);
                }
            }
        }
        links
    }

    pub fn configuration(&self) -> Option<Value> {
        self.configuration.read().clone()
    }

    /// Sets the opaque configuration. Kinds that declare no configuration
    /// only accept `None`.
    pub fn set_configuration(&self, configuration: Option<Value>) -> Result<(), ModuleError> {
        if configuration.is_some() && !self.computation.accepts_configuration() {
            return Err(ModuleError::UnconfiguredModule { module: self.label() });
        }
        self.store_configuration(configuration);
        Ok(())
    }

    pub(crate) fn store_configuration(&self, configuration: Option<Value>) {
        *self.configuration.write() = configuration;
    }

    /// The flow this module currently belongs to.
    pub fn flow(&self) -> Option<FlowId> {
        *self.flow.read()
    }

    pub(crate) fn set_flow(&self, flow: Option<FlowId>) {
        *self.flow.write() = flow;
    }

    /// Claims the module for `flow` unless another flow already owns it.
    pub(crate) fn claim_flow(&self, flow: FlowId) -> bool {
        let mut current = self.flow.write();
        match *current {
            Some(owner) if owner != flow => false,
            _ => {
                *current = Some(flow);
                true
            }
        }
    }

    pub fn add_execution_listener(&self, listener: Arc<dyn ModuleExecutionListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_execution_listener(&self, listener: &Arc<dyn ModuleExecutionListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub(crate) fn execution_listeners(&self) -> Arc<Vec<Arc<dyn ModuleExecutionListener>>> {
        self.listeners.snapshot()
    }

    pub fn phase(&self) -> ExecutionPhase {
        *self.phase.lock()
    }

    pub(crate) fn set_phase(&self, phase: ExecutionPhase) {
        *self.phase.lock() = phase;
    }

    /// The value output `index` produced in the last successful execution.
    pub fn last_output(&self, index: usize) -> Option<Value> {
        self.last_outputs.lock().get(index).cloned().flatten()
    }

    pub(crate) fn store_outputs(&self, outputs: Vec<Option<Value>>) {
        *self.last_outputs.lock() = outputs;
    }

    /// Runs one pass of the execution protocol: gather inputs, process,
    /// forward outputs. Listeners always see the outcome before it is returned.
    pub fn execute(&self) -> Result<(), ExecutionError> {
        engine::execute(self)
    }

    /// Instance-level compatibility search against the instantiated input types.
    pub fn accepts(&self, cx: &dyn TypeContext, candidates: &[TypeExpr]) -> Option<Vec<usize>> {
        let slots: Vec<&TypeExpr> = self.inputs.iter().map(|slot| slot.expected_type()).collect();
        compatibility::find_assignment(cx, &slots, candidates)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("name", &self.info.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("flow", &self.flow())
            .finish()
    }
}
