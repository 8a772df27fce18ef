//! Input and output endpoints of a module instance.
use super::link::Link;
use super::module::{Module, ModuleId};
use crate::type_system::TypeExpr;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// State shared by both slot directions.
pub struct SlotCore {
    module: Weak<Module>,
    module_id: ModuleId,
    index: usize,
    /// The instantiated declared type.
    expected: TypeExpr,
    /// The runtime-observed type; starts out equal to `expected`.
    actual: RwLock<TypeExpr>,
}

impl SlotCore {
    fn new(module: Weak<Module>, module_id: ModuleId, index: usize, expected: TypeExpr) -> Self {
        Self {
            module,
            module_id,
            index,
            actual: RwLock::new(expected.clone()),
            expected,
        }
    }

    pub(crate) fn module_weak(&self) -> Weak<Module> {
        self.module.clone()
    }
}

/// Accessors common to input and output slots.
pub trait Slot {
    fn core(&self) -> &SlotCore;

    /// The owning module, if it is still alive.
    fn module(&self) -> Option<Arc<Module>> {
        self.core().module.upgrade()
    }

    fn module_id(&self) -> ModuleId {
        self.core().module_id
    }

    fn index(&self) -> usize {
        self.core().index
    }

    fn expected_type(&self) -> &TypeExpr {
        &self.core().expected
    }

    fn actual_type(&self) -> TypeExpr {
        self.core().actual.read().clone()
    }

    /// Narrows the runtime type of the slot.
    fn set_actual_type(&self, ty: TypeExpr) {
        *self.core().actual.write() = ty;
    }

    fn reset_actual_type(&self) {
        *self.core().actual.write() = self.core().expected.clone();
    }
}

/// A module input. Holds at most one incoming link.
pub struct InputSlot {
    core: SlotCore,
    link: RwLock<Option<Arc<Link>>>,
}

impl InputSlot {
    pub(crate) fn new(module: Weak<Module>, module_id: ModuleId, index: usize, expected: TypeExpr) -> Self {
        Self {
            core: SlotCore::new(module, module_id, index, expected),
            link: RwLock::new(None),
        }
    }

    pub fn input_link(&self) -> Option<Arc<Link>> {
        self.link.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.link.read().is_some()
    }

    /// Replaces the incoming link without detaching the previous one; the flow
    /// removes any existing link first.
    pub(crate) fn set_input_link(&self, link: Option<Arc<Link>>) -> Option<Arc<Link>> {
        std::mem::replace(&mut *self.link.write(), link)
    }

    /// Clears the incoming link only if it is `link`.
    pub(crate) fn clear_input_link(&self, link: &Link) -> bool {
        let mut current = self.link.write();
        if current.as_ref().is_some_and(|existing| existing.id() == link.id()) {
            *current = None;
            true
        } else {
            false
        }
    }
}

impl Slot for InputSlot {
    fn core(&self) -> &SlotCore {
        &self.core
    }
}

/// A module output. Fans out to any number of links.
pub struct OutputSlot {
    core: SlotCore,
    links: RwLock<Vec<Arc<Link>>>,
}

impl OutputSlot {
    pub(crate) fn new(module: Weak<Module>, module_id: ModuleId, index: usize, expected: TypeExpr) -> Self {
        Self {
            core: SlotCore::new(module, module_id, index, expected),
            links: RwLock::new(Vec::new()),
        }
    }

    pub fn output_links(&self) -> Vec<Arc<Link>> {
        self.links.read().clone()
    }

    pub fn fan_out(&self) -> usize {
        self.links.read().len()
    }

    pub(crate) fn add_output_link(&self, link: Arc<Link>) -> bool {
        let mut links = self.links.write();
        if links.iter().any(|existing| existing.id() == link.id()) {
            return false;
        }
        links.push(link);
        true
    }

    pub(crate) fn remove_output_link(&self, link: &Link) -> bool {
        let mut links = self.links.write();
        let before = links.len();
        links.retain(|existing| existing.id() != link.id());
        links.len() != before
    }
}

impl Slot for OutputSlot {
    fn core(&self) -> &SlotCore {
        &self.core
    }
}

impl fmt::Debug for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSlot")
            .field("module", &self.core.module_id)
            .field("index", &self.core.index)
            .field("expected", &self.core.expected)
            .field("link", &self.input_link().map(|link| link.id()))
            .finish()
    }
}

impl fmt::Debug for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let links: Vec<_> = self.links.read().iter().map(|link| link.id()).collect();
        f.debug_struct("OutputSlot")
            .field("module", &self.core.module_id)
            .field("index", &self.core.index)
            .field("expected", &self.core.expected)
            .field("links", &links)
            .finish()
    }
}
