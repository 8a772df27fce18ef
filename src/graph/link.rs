//! Defines `Link`, a single-value edge from one output slot to one input slot.
use super::error::{FlowError, SlotDirection};
use super::module::{Module, ModuleId};
use super::slot::{InputSlot, OutputSlot, Slot};
use super::value::Value;
use crate::type_system::{TypeContext, TypeExpr};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

static NEXT_LINK: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Addresses one slot of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotAddress {
    pub module: ModuleId,
    pub index: usize,
}

#[derive(Debug)]
struct Endpoint {
    module: Weak<Module>,
    address: SlotAddress,
}

impl Endpoint {
    fn of(slot: &impl Slot) -> Self {
        Self {
            module: slot.core().module_weak(),
            address: SlotAddress { module: slot.module_id(), index: slot.index() },
        }
    }
}

/// Connects exactly one output slot (source) to exactly one input slot (target).
///
/// A link buffers at most one value: `accept` overwrites whatever has not been
/// read yet. It also keeps a bounded history of accepted values for
/// diagnostics; execution never reads the history.
pub struct Link {
    id: LinkId,
    source: Endpoint,
    target: Endpoint,
    buffer: Mutex<Option<Value>>,
    contents: Mutex<VecDeque<Value>>,
    history_limit: AtomicUsize,
}

impl Link {
    pub fn new(source: &OutputSlot, target: &InputSlot) -> Arc<Self> {
        Arc::new(Self {
            id: LinkId(NEXT_LINK.fetch_add(1, Ordering::Relaxed)),
            source: Endpoint::of(source),
            target: Endpoint::of(target),
            buffer: Mutex::new(None),
            contents: Mutex::new(VecDeque::new()),
            history_limit: AtomicUsize::new(usize::MAX),
        })
    }

    /// Builds a link from slot indices, checking that both slots exist.
    pub fn connect(source: &Module, output: usize, target: &Module, input: usize) -> Result<Arc<Self>, FlowError> {
        let out = source.output(output).ok_or_else(|| FlowError::SlotOutOfRange {
            module: source.label(),
            direction: SlotDirection::Output,
            index: output,
        })?;
        let inp = target.input(input).ok_or_else(|| FlowError::SlotOutOfRange {
            module: target.label(),
            direction: SlotDirection::Input,
            index: input,
        })?;
        Ok(Self::new(out, inp))
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn source(&self) -> SlotAddress {
        self.source.address
    }

    pub fn target(&self) -> SlotAddress {
        self.target.address
    }

    pub fn source_module(&self) -> Option<Arc<Module>> {
        self.source.module.upgrade()
    }

    pub fn target_module(&self) -> Option<Arc<Module>> {
        self.target.module.upgrade()
    }

    pub fn touches(&self, module: ModuleId) -> bool {
        self.source.address.module == module || self.target.address.module == module
    }

    /// The runtime type currently produced by the source slot.
    pub fn source_type(&self) -> Option<TypeExpr> {
        let module = self.source_module()?;
        module.output(self.source.address.index).map(|slot| slot.actual_type())
    }

    /// The declared type the target slot expects.
    pub fn target_type(&self) -> Option<TypeExpr> {
        let module = self.target_module()?;
        module.input(self.target.address.index).map(|slot| slot.expected_type().clone())
    }

    /// Whether the source's actual type is assignable to the target's expected
    /// type. A link with a vanished endpoint is never valid.
    pub fn is_valid(&self, cx: &dyn TypeContext) -> bool {
        match (self.target_type(), self.source_type()) {
            (Some(to), Some(from)) => cx.is_assignable(&to, &from),
            _ => false,
        }
    }

    /// Buffers `value`, replacing any unread value. `None` empties the buffer.
    pub fn accept(&self, value: Option<Value>) {
        tracing::trace!(link = %self.id, present = value.is_some(), "link accepted value");
        if let Some(value) = &value {
            let limit = self.history_limit.load(Ordering::Relaxed);
            let mut contents = self.contents.lock();
            if limit > 0 {
                while contents.len() >= limit {
                    contents.pop_front();
                }
                contents.push_back(value.clone());
            }
        }
        *self.buffer.lock() = value;
    }

    /// The buffered value, if one was ever written. Reading does not consume it.
    pub fn provide(&self) -> Option<Value> {
        self.buffer.lock().clone()
    }

    /// Accepted values, oldest first, up to the history limit.
    pub fn contents(&self) -> Vec<Value> {
        self.contents.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        *self.buffer.lock() = None;
        self.contents.lock().clear();
    }

    /// `None` keeps every accepted value.
    pub(crate) fn set_history_limit(&self, limit: Option<usize>) {
        let limit = limit.unwrap_or(usize::MAX);
        self.history_limit.store(limit, Ordering::Relaxed);
        let mut contents = self.contents.lock();
        while contents.len() > limit {
            contents.pop_front();
        }
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Link {}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("id", &self.id)
            .field("source", &self.source.address)
            .field("target", &self.target.address)
            .finish()
    }
}
