//! A serializable record of a flow's structure.
//!
//! Modules are stored by position with their `ModuleInfo`; links refer to
//! modules by that position. Configurations and buffered values are opaque
//! and are not recorded.
use super::error::SnapshotError;
use super::registry::ModuleCatalog;
use crate::graph::{Flow, Link, Module, ModuleId, ModuleInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub key: usize,
    pub info: ModuleInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: usize,
    pub output: usize,
    pub target: usize,
    pub input: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub modules: Vec<ModuleRecord>,
    pub links: Vec<LinkRecord>,
}

impl FlowSnapshot {
    pub fn capture(flow: &Flow) -> Self {
        let keys: HashMap<ModuleId, usize> = flow
            .modules()
            .iter()
            .enumerate()
            .map(|(key, module)| (module.id(), key))
            .collect();
        let modules = flow
            .modules()
            .iter()
            .enumerate()
            .map(|(key, module)| ModuleRecord { key, info: ModuleInfo::clone(module.info()) })
            .collect();
        let links = flow
            .links()
            .iter()
            .filter_map(|link| {
                let (source, target) = (link.source(), link.target());
                Some(LinkRecord {
                    source: *keys.get(&source.module)?,
                    output: source.index,
                    target: *keys.get(&target.module)?,
                    input: target.index,
                })
            })
            .collect();
        Self { modules, links }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a new flow from the snapshot, instantiating every module
    /// through `catalog`.
    pub fn rebuild(&self, catalog: &ModuleCatalog) -> Result<Flow, SnapshotError> {
        let mut flow = Flow::new();
        self.rebuild_into(catalog, &mut flow)?;
        Ok(flow)
    }

    /// Adds the snapshot's modules and links to `flow` using only the regular
    /// structural operations. Returns the new modules keyed by record key.
    pub fn rebuild_into(&self, catalog: &ModuleCatalog, flow: &mut Flow) -> Result<HashMap<usize, Arc<Module>>, SnapshotError> {
        let mut modules = HashMap::with_capacity(self.modules.len());
        for record in &self.modules {
            let module = catalog.instantiate(&record.info)?;
            flow.add_module(module.clone())?;
            modules.insert(record.key, module);
        }
        for record in &self.links {
            let source = modules.get(&record.source).ok_or(SnapshotError::UnknownKey { key: record.source })?;
            let target = modules.get(&record.target).ok_or(SnapshotError::UnknownKey { key: record.target })?;
            flow.add_link(Link::connect(source, record.output, target, record.input)?)?;
        }
        tracing::debug!(modules = modules.len(), links = self.links.len(), "flow rebuilt from snapshot");
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::{Constant, Identity};
    use crate::type_system::TypeExpr;
    use pretty_assertions::assert_eq;

    fn catalog() -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new();
        catalog.register(Identity::module_info(), Arc::new(Identity));
        catalog.register(Constant::module_info(TypeExpr::concrete("String")), Arc::new(Constant));
        catalog
    }

    fn sample_flow(catalog: &ModuleCatalog) -> Flow {
        let mut flow = Flow::new();
        let source = catalog.instantiate_named("Constant").unwrap();
        let a = catalog.instantiate_named("Identity").unwrap();
        let b = catalog.instantiate_named("Identity").unwrap();
        for module in [&source, &a, &b] {
            flow.add_module(module.clone()).unwrap();
        }
        flow.add_link(Link::connect(&source, 0, &a, 0).unwrap()).unwrap();
        flow.add_link(Link::connect(&a, 0, &b, 0).unwrap()).unwrap();
        flow
    }

    #[test]
    fn test_capture_records_positions() {
        let catalog = catalog();
        let snapshot = FlowSnapshot::capture(&sample_flow(&catalog));
        assert_eq!(snapshot.modules.len(), 3);
        assert_eq!(snapshot.modules[0].info.name, "Constant");
        assert_eq!(
            snapshot.links,
            vec![
                LinkRecord { source: 0, output: 0, target: 1, input: 0 },
                LinkRecord { source: 1, output: 0, target: 2, input: 0 },
            ]
        );
    }

    #[test]
    fn test_json_and_rebuild() {
        let catalog = catalog();
        let original = FlowSnapshot::capture(&sample_flow(&catalog));
        let json = original.to_json().unwrap();
        assert!(json.contains("\"type\""));

        let restored = FlowSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, original);

        let flow = restored.rebuild(&catalog).unwrap();
        assert_eq!(flow.modules().len(), 3);
        assert_eq!(flow.links().len(), 2);
        assert_eq!(FlowSnapshot::capture(&flow), original);
    }

    #[test]
    fn test_rebuild_rejects_unknown_key() {
        let catalog = catalog();
        let mut snapshot = FlowSnapshot::capture(&sample_flow(&catalog));
        snapshot.links.push(LinkRecord { source: 9, output: 0, target: 0, input: 0 });
        let err = snapshot.rebuild(&catalog).unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownKey { key: 9 }));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(FlowSnapshot::from_json("{"), Err(SnapshotError::Json(_))));
    }
}
