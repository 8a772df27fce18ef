use crate::computation::{AdapterComputation, Computation, Invocable};
use crate::graph::{FlowError, Module, ModuleInfo};
use crate::type_system::{TypeContext, TypeError, TypeExpr};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub type ModuleFactory = Arc<dyn Fn(Arc<ModuleInfo>) -> Result<Arc<Module>, TypeError> + Send + Sync>;

/// A registered module kind: its declaration and how to build instances of it.
#[derive(Clone)]
pub struct ModuleKind {
    info: Arc<ModuleInfo>,
    factory: ModuleFactory,
}

impl ModuleKind {
    /// Every instance shares `computation`.
    pub fn new(info: ModuleInfo, computation: Arc<dyn Computation>) -> Self {
        Self::with_factory(info, move |info| Module::new(info, computation.clone()))
    }

    pub fn with_factory<F>(info: ModuleInfo, factory: F) -> Self
    where
        F: Fn(Arc<ModuleInfo>) -> Result<Arc<Module>, TypeError> + Send + Sync + 'static,
    {
        Self { info: Arc::new(info), factory: Arc::new(factory) }
    }

    pub fn info(&self) -> &Arc<ModuleInfo> {
        &self.info
    }

    pub fn instantiate(&self) -> Result<Arc<Module>, TypeError> {
        (self.factory)(self.info.clone())
    }
}

impl fmt::Debug for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleKind").field("info", &self.info).finish()
    }
}

/// The set of module kinds a host application offers, keyed by `ModuleInfo`.
///
/// Kind names are unique: registering a second kind under a taken name
/// renames it `name_1`, `name_2`, ...
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    kinds: Vec<ModuleKind>,
    by_info: HashMap<Arc<ModuleInfo>, usize>,
    used_names: HashSet<String>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> &[ModuleKind] {
        &self.kinds
    }

    /// Registers a kind whose instances share `computation`. Returns the
    /// declaration as stored, possibly renamed.
    pub fn register(&mut self, info: ModuleInfo, computation: Arc<dyn Computation>) -> Arc<ModuleInfo> {
        let info = self.unique(info);
        self.insert(ModuleKind::new(info, computation))
    }

    /// Registers a kind built by `factory`.
    pub fn register_with<F>(&mut self, info: ModuleInfo, factory: F) -> Arc<ModuleInfo>
    where
        F: Fn(Arc<ModuleInfo>) -> Result<Arc<Module>, TypeError> + Send + Sync + 'static,
    {
        let info = self.unique(info);
        self.insert(ModuleKind::with_factory(info, factory))
    }

    /// Registers an adapter kind for `callable`.
    pub fn register_adapter(&mut self, callable: Arc<dyn Invocable>) -> Arc<ModuleInfo> {
        let adapter = AdapterComputation::new(callable);
        let info = adapter.module_info();
        self.register(info, Arc::new(adapter))
    }

    fn unique(&mut self, mut info: ModuleInfo) -> ModuleInfo {
        let original = info.name.clone();
        let mut candidate = original.clone();
        let mut counter = 1;
        while self.used_names.contains(&candidate) {
            candidate = format!("{}_{}", original, counter);
            counter += 1;
        }
        self.used_names.insert(candidate.clone());
        info.name = candidate;
        info
    }

    fn insert(&mut self, kind: ModuleKind) -> Arc<ModuleInfo> {
        let info = kind.info.clone();
        tracing::debug!(kind = %info.name, "module kind registered");
        self.by_info.insert(info.clone(), self.kinds.len());
        self.kinds.push(kind);
        info
    }

    pub fn find(&self, info: &ModuleInfo) -> Option<&ModuleKind> {
        self.by_info.get(info).map(|&index| &self.kinds[index])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ModuleKind> {
        self.kinds.iter().find(|kind| kind.info.name == name)
    }

    /// Builds an instance of the kind declared by `info`. Declarations that
    /// no longer match exactly (e.g. read back from a snapshot, where type
    /// variables belong to other contexts) fall back to a lookup by name.
    pub fn instantiate(&self, info: &ModuleInfo) -> Result<Arc<Module>, FlowError> {
        let kind = self
            .find(info)
            .or_else(|| self.find_by_name(&info.name))
            .ok_or_else(|| FlowError::UnknownModuleKind { name: info.name.clone() })?;
        Ok(kind.instantiate()?)
    }

    pub fn instantiate_named(&self, name: &str) -> Result<Arc<Module>, FlowError> {
        let kind = self
            .find_by_name(name)
            .ok_or_else(|| FlowError::UnknownModuleKind { name: name.to_string() })?;
        Ok(kind.instantiate()?)
    }

    /// Kinds whose inputs accept `candidates` in some order, with that order.
    pub fn compatible_kinds(&self, cx: &dyn TypeContext, candidates: &[TypeExpr]) -> Vec<(&ModuleKind, Vec<usize>)> {
        self.kinds
            .iter()
            .filter_map(|kind| kind.info.find_input_order(cx, candidates).map(|order| (kind, order)))
            .collect()
    }
}
