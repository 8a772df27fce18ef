//! Defines `Flow`, the mutable container of modules and links.
//!
//! The flow is the only place where links are attached to or detached from
//! slots and where a module's flow back-reference is set. Structural methods
//! take `&mut self`, so callers are serialized by construction; listener
//! registration only needs `&self`.

use super::error::FlowError;
use super::link::Link;
use super::listeners::ListenerList;
use super::module::{Module, ModuleId};
use crate::config::FlowOptions;
use crate::type_system::{FreeVariableContext, TypeContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_FLOW: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub u64);

/// Receives structural change notifications from a flow.
pub trait FlowListener: Send + Sync {
    fn module_added(&self, _flow: &Flow, _module: &Arc<Module>) {}
    fn module_removed(&self, _flow: &Flow, _module: &Arc<Module>) {}
    fn link_added(&self, _flow: &Flow, _link: &Arc<Link>) {}
    fn link_removed(&self, _flow: &Flow, _link: &Arc<Link>) {}
}

pub struct Flow {
    id: FlowId,
    modules: Vec<Arc<Module>>,
    links: Vec<Arc<Link>>,
    context: Arc<dyn TypeContext>,
    options: FlowOptions,
    listeners: ListenerList<dyn FlowListener>,
}

impl Flow {
    /// An empty flow using the permissive `FreeVariableContext`.
    pub fn new() -> Self {
        Self::with_context(Arc::new(FreeVariableContext::new()))
    }

    pub fn with_context(context: Arc<dyn TypeContext>) -> Self {
        Self {
            id: FlowId(NEXT_FLOW.fetch_add(1, Ordering::Relaxed)),
            modules: Vec::new(),
            links: Vec::new(),
            context,
            options: FlowOptions::default(),
            listeners: ListenerList::new(),
        }
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub fn type_context(&self) -> &dyn TypeContext {
        self.context.as_ref()
    }

    pub fn set_type_context(&mut self, context: Arc<dyn TypeContext>) {
        self.context = context;
    }

    /// Modules in insertion order.
    pub fn modules(&self) -> &[Arc<Module>] {
        &self.modules
    }

    /// Links in insertion order.
    pub fn links(&self) -> &[Arc<Link>] {
        &self.links
    }

    pub fn module(&self, id: ModuleId) -> Option<&Arc<Module>> {
        self.modules.iter().find(|module| module.id() == id)
    }

    pub fn contains_module(&self, module: &Module) -> bool {
        self.modules.iter().any(|existing| existing.id() == module.id())
    }

    pub fn contains_link(&self, link: &Link) -> bool {
        self.links.iter().any(|existing| existing.id() == link.id())
    }

    pub fn add_flow_listener(&self, listener: Arc<dyn FlowListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_flow_listener(&self, listener: &Arc<dyn FlowListener>) -> bool {
        self.listeners.remove(listener)
    }

    fn notify(&self, event: impl Fn(&dyn FlowListener)) {
        for listener in self.listeners.snapshot().iter() {
            event(listener.as_ref());
        }
    }

    /// Adds `module` and sets its flow back-reference.
    ///
    /// Returns `Ok(false)` if the module is already part of this flow.
    pub fn add_module(&mut self, module: Arc<Module>) -> Result<bool, FlowError> {
        if self.contains_module(&module) {
            return Ok(false);
        }
        if !module.claim_flow(self.id) {
            tracing::warn!(module = %module.label(), "rejected module owned by another flow");
            return Err(FlowError::ForeignModule { module: module.label() });
        }
        tracing::debug!(module = %module.label(), "module added");
        self.modules.push(module.clone());
        self.notify(|listener| listener.module_added(self, &module));
        Ok(true)
    }

    /// Removes every link touching `module`, then the module itself.
    ///
    /// Returns false if the module is not part of this flow.
    pub fn remove_module(&mut self, module: &Arc<Module>) -> bool {
        let Some(pos) = self.modules.iter().position(|existing| existing.id() == module.id()) else {
            return false;
        };
        for link in module.links() {
            self.remove_link(&link);
        }
        let module = self.modules.remove(pos);
        module.set_flow(None);
        tracing::debug!(module = %module.label(), "module removed");
        self.notify(|listener| listener.module_removed(self, &module));
        true
    }

    /// Attaches `link` to its endpoint slots.
    ///
    /// Type validity is not checked unless `FlowOptions::validate_links` is
    /// set; see `check_link`. A link already occupying the target input is
    /// removed first. Returns `Ok(false)` if the link is already present.
    pub fn add_link(&mut self, link: Arc<Link>) -> Result<bool, FlowError> {
        if self.contains_link(&link) {
            return Ok(false);
        }
        let source = link.source_module().ok_or(FlowError::DetachedEndpoint { link: link.id() })?;
        let target = link.target_module().ok_or(FlowError::DetachedEndpoint { link: link.id() })?;
        for module in [&source, &target] {
            if !self.contains_module(module) {
                tracing::warn!(link = %link.id(), module = %module.label(), "rejected link to a module outside the flow");
                return Err(FlowError::ModuleNotInFlow { module: module.label(), link: link.id() });
            }
        }
        if self.options.validate_links {
            self.check_link(&link)?;
        }
        let (Some(output), Some(input)) = (source.output(link.source().index), target.input(link.target().index)) else {
            return Err(FlowError::DetachedEndpoint { link: link.id() });
        };

        if let Some(existing) = input.input_link() {
            self.remove_link(&existing);
        }

        link.set_history_limit(self.options.link_history_limit);
        self.links.push(link.clone());
        output.add_output_link(link.clone());
        input.set_input_link(Some(link.clone()));
        tracing::debug!(link = %link.id(), source = %source.label(), target = %target.label(), "link added");
        self.notify(|listener| listener.link_added(self, &link));
        Ok(true)
    }

    /// Detaches `link` from its slots. Returns false if it is not part of this flow.
    pub fn remove_link(&mut self, link: &Arc<Link>) -> bool {
        let Some(pos) = self.links.iter().position(|existing| existing.id() == link.id()) else {
            return false;
        };
        let link = self.links.remove(pos);
        detach(&link);
        tracing::debug!(link = %link.id(), "link removed");
        self.notify(|listener| listener.link_removed(self, &link));
        true
    }

    /// Checks that the link's source type is assignable to its target type
    /// under this flow's context. The flow itself attaches invalid links
    /// unless configured otherwise.
    pub fn check_link(&self, link: &Link) -> Result<(), FlowError> {
        let (Some(expected), Some(actual)) = (link.target_type(), link.source_type()) else {
            return Err(FlowError::DetachedEndpoint { link: link.id() });
        };
        if self.context.is_assignable(&expected, &actual) {
            Ok(())
        } else {
            Err(FlowError::InvalidLink {
                link: link.id(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    /// Links whose endpoints are currently not assignable.
    pub fn invalid_links(&self) -> Vec<Arc<Link>> {
        self.links
            .iter()
            .filter(|link| !link.is_valid(self.context.as_ref()))
            .cloned()
            .collect()
    }

    /// Removes every module (and with them every link).
    pub fn clear(&mut self) {
        while let Some(module) = self.modules.last().cloned() {
            self.remove_module(&module);
        }
    }
}

fn detach(link: &Arc<Link>) {
    if let Some(source) = link.source_module() {
        if let Some(output) = source.output(link.source().index) {
            output.remove_output_link(link);
        }
    }
    if let Some(target) = link.target_module() {
        if let Some(input) = target.input(link.target().index) {
            input.clear_input_link(link);
        }
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Flow {
    fn drop(&mut self) {
        for link in &self.links {
            detach(link);
        }
        for module in &self.modules {
            module.set_flow(None);
        }
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("id", &self.id)
            .field("modules", &self.modules.iter().map(|module| module.label()).collect::<Vec<_>>())
            .field("links", &self.links)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::builtin::{Constant, Identity};
    use crate::graph::slot::Slot;
    use crate::type_system::TypeExpr;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl FlowListener for Recorder {
        fn module_added(&self, _flow: &Flow, module: &Arc<Module>) {
            self.0.lock().push(format!("+module {}", module.name()));
        }
        fn module_removed(&self, _flow: &Flow, module: &Arc<Module>) {
            self.0.lock().push(format!("-module {}", module.name()));
        }
        fn link_added(&self, _flow: &Flow, _link: &Arc<Link>) {
            self.0.lock().push("+link".into());
        }
        fn link_removed(&self, _flow: &Flow, _link: &Arc<Link>) {
            self.0.lock().push("-link".into());
        }
    }

    fn string_source() -> Arc<Module> {
        Constant::module(TypeExpr::concrete("String")).unwrap()
    }

    fn identity() -> Arc<Module> {
        Identity::module().unwrap()
    }

    fn chain() -> (Flow, Arc<Module>, Arc<Module>, Arc<Module>) {
        let mut flow = Flow::new();
        let (a, b, c) = (string_source(), identity(), identity());
        for module in [&a, &b, &c] {
            flow.add_module(module.clone()).unwrap();
        }
        flow.add_link(Link::connect(&a, 0, &b, 0).unwrap()).unwrap();
        flow.add_link(Link::connect(&b, 0, &c, 0).unwrap()).unwrap();
        (flow, a, b, c)
    }

    #[test]
    fn test_add_module_is_idempotent() {
        let mut flow = Flow::new();
        let module = identity();
        assert!(flow.add_module(module.clone()).unwrap());
        assert!(!flow.add_module(module.clone()).unwrap());
        assert_eq!(flow.modules().len(), 1);
        assert_eq!(module.flow(), Some(flow.id()));
    }

    #[test]
    fn test_module_cannot_join_two_flows() {
        let mut first = Flow::new();
        let mut second = Flow::new();
        let module = identity();
        first.add_module(module.clone()).unwrap();
        let err = second.add_module(module.clone()).unwrap_err();
        assert!(matches!(err, FlowError::ForeignModule { .. }));
        assert!(second.modules().is_empty());
    }

    #[test]
    fn test_add_link_attaches_both_endpoints() {
        let (flow, a, b, _) = chain();
        let link = &flow.links()[0];
        assert_eq!(a.outputs()[0].fan_out(), 1);
        assert_eq!(b.inputs()[0].input_link().map(|l| l.id()), Some(link.id()));
    }

    #[test]
    fn test_add_link_replaces_existing_input_link() {
        let (mut flow, a, b, _) = chain();
        let other = string_source();
        flow.add_module(other.clone()).unwrap();
        let old = b.inputs()[0].input_link().unwrap();

        let replacement = Link::connect(&other, 0, &b, 0).unwrap();
        assert!(flow.add_link(replacement.clone()).unwrap());

        assert!(!flow.contains_link(&old));
        assert_eq!(a.outputs()[0].fan_out(), 0);
        assert_eq!(b.inputs()[0].input_link().map(|l| l.id()), Some(replacement.id()));
        assert_eq!(flow.links().len(), 2);
    }

    #[test]
    fn test_add_link_requires_member_modules() {
        let mut flow = Flow::new();
        let (a, b) = (string_source(), identity());
        flow.add_module(a.clone()).unwrap();
        let err = flow.add_link(Link::connect(&a, 0, &b, 0).unwrap()).unwrap_err();
        assert!(matches!(err, FlowError::ModuleNotInFlow { .. }));
        assert!(!b.inputs()[0].is_connected());
    }

    #[test]
    fn test_remove_link_is_idempotent() {
        let (mut flow, _, b, _) = chain();
        let link = b.inputs()[0].input_link().unwrap();
        assert!(flow.remove_link(&link));
        assert!(!flow.remove_link(&link));
        assert!(!b.inputs()[0].is_connected());
        assert_eq!(flow.links().len(), 1);
    }

    #[test]
    fn test_remove_module_cascades_links() {
        let (mut flow, a, b, c) = chain();
        assert!(flow.remove_module(&b));
        assert!(flow.links().is_empty());
        assert_eq!(a.outputs()[0].fan_out(), 0);
        assert!(!c.inputs()[0].is_connected());
        assert!(b.flow().is_none());
        assert!(!flow.remove_module(&b));
    }

    #[test]
    fn test_listener_sees_cascade_before_module_removal() {
        let (mut flow, _, b, _) = chain();
        let recorder = Arc::new(Recorder::default());
        flow.add_flow_listener(recorder.clone());
        flow.remove_module(&b);
        assert_eq!(*recorder.0.lock(), vec!["-link", "-link", "-module Identity"]);
    }

    #[test]
    fn test_strict_options_reject_invalid_links() {
        let options = FlowOptions { validate_links: true, ..FlowOptions::default() };
        let mut flow = Flow::new().with_options(options);
        let source = string_source();
        let sink = Constant::module(TypeExpr::concrete("Integer")).unwrap();
        let consumer = Identity::typed(TypeExpr::concrete("Integer")).unwrap();
        flow.add_module(source.clone()).unwrap();
        flow.add_module(sink.clone()).unwrap();
        flow.add_module(consumer.clone()).unwrap();

        let bad = Link::connect(&source, 0, &consumer, 0).unwrap();
        assert!(matches!(flow.add_link(bad).unwrap_err(), FlowError::InvalidLink { .. }));
        assert!(flow.add_link(Link::connect(&sink, 0, &consumer, 0).unwrap()).unwrap());
    }

    #[test]
    fn test_permissive_flow_reports_invalid_links() {
        let mut flow = Flow::new();
        let source = string_source();
        let consumer = Identity::typed(TypeExpr::concrete("Integer")).unwrap();
        flow.add_module(source.clone()).unwrap();
        flow.add_module(consumer.clone()).unwrap();
        let link = Link::connect(&source, 0, &consumer, 0).unwrap();
        assert!(flow.add_link(link.clone()).unwrap());
        assert!(flow.check_link(&link).is_err());
        assert_eq!(flow.invalid_links().len(), 1);

        source.outputs()[0].set_actual_type(TypeExpr::concrete("Integer"));
        assert!(flow.check_link(&link).is_ok());
    }

    #[test]
    fn test_drop_detaches_members() {
        let (flow, a, b, _) = chain();
        drop(flow);
        assert!(a.flow().is_none());
        assert_eq!(a.outputs()[0].fan_out(), 0);
        assert!(!b.inputs()[0].is_connected());
    }

    #[test]
    fn test_clear() {
        let (mut flow, ..) = chain();
        flow.clear();
        assert!(flow.modules().is_empty());
        assert!(flow.links().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add { source: usize, target: usize },
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize, 0..4usize).prop_map(|(source, target)| Op::Add { source, target }),
            (0..8usize).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_inputs_hold_at_most_one_link(ops in proptest::collection::vec(op(), 0..40)) {
            let mut flow = Flow::new();
            let modules: Vec<Arc<Module>> = (0..4).map(|_| identity()).collect();
            for module in &modules {
                flow.add_module(module.clone()).unwrap();
            }
            for op in ops {
                match op {
                    Op::Add { source, target } => {
                        let link = Link::connect(&modules[source], 0, &modules[target], 0).unwrap();
                        prop_assert!(flow.add_link(link).unwrap());
                    }
                    Op::Remove(i) => {
                        if let Some(link) = flow.links().get(i).cloned() {
                            prop_assert!(flow.remove_link(&link));
                        }
                    }
                }
                for module in &modules {
                    let incoming = flow.links().iter().filter(|l| l.target().module == module.id()).count();
                    prop_assert!(incoming <= 1);
                    prop_assert_eq!(incoming == 1, module.inputs()[0].is_connected());
                    let outgoing = flow.links().iter().filter(|l| l.source().module == module.id()).count();
                    prop_assert_eq!(outgoing, module.outputs()[0].fan_out());
                }
            }
        }
    }
}
