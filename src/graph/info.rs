//! Declarative metadata shared by every instance of a module kind.
use crate::analysis::compatibility;
use crate::type_system::{TypeContext, TypeExpr};
use serde::{Deserialize, Serialize};

/// Declares one input or output slot of a module kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotInfo {
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl SlotInfo {
    pub fn new(ty: TypeExpr, name: impl Into<String>) -> Self {
        Self { ty, name: name.into(), description: String::new() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The immutable declaration of a module kind: its name, description and the
/// declared (uninstantiated) types of its slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub inputs: Vec<SlotInfo>,
    pub outputs: Vec<SlotInfo>,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input(mut self, slot: SlotInfo) -> Self {
        self.inputs.push(slot);
        self
    }

    pub fn output(mut self, slot: SlotInfo) -> Self {
        self.outputs.push(slot);
        self
    }

    /// Finds the ordering of `candidates` that satisfies this kind's inputs.
    ///
    /// Returns `order` such that `candidates[order[i]]` feeds input slot `i`.
    /// See `analysis::compatibility` for the search and its cost.
    pub fn find_input_order(&self, cx: &dyn TypeContext, candidates: &[TypeExpr]) -> Option<Vec<usize>> {
        let slots: Vec<&TypeExpr> = self.inputs.iter().map(|slot| &slot.ty).collect();
        compatibility::find_assignment(cx, &slots, candidates)
    }

    pub fn is_compatible(&self, cx: &dyn TypeContext, candidates: &[TypeExpr]) -> bool {
        self.find_input_order(cx, candidates).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_system::FreeVariableContext;

    fn number_and_string() -> ModuleInfo {
        ModuleInfo::new("Format")
            .input(SlotInfo::new(TypeExpr::concrete("Number"), "value"))
            .input(SlotInfo::new(TypeExpr::concrete("String"), "pattern"))
            .output(SlotInfo::new(TypeExpr::concrete("String"), "text"))
    }

    #[test]
    fn test_reversed_candidates_match() {
        let cx = FreeVariableContext::new();
        let info = number_and_string();
        let candidates = [TypeExpr::concrete("String"), TypeExpr::concrete("Number")];
        assert!(info.is_compatible(&cx, &candidates));
        assert_eq!(info.find_input_order(&cx, &candidates), Some(vec![1, 0]));
    }

    #[test]
    fn test_unsatisfiable_candidates() {
        let cx = FreeVariableContext::new();
        let candidates = [TypeExpr::concrete("String"), TypeExpr::concrete("String")];
        assert!(!number_and_string().is_compatible(&cx, &candidates));
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(number_and_string(), number_and_string());
        assert_ne!(number_and_string(), number_and_string().with_description("changed"));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(SlotInfo::new(TypeExpr::concrete("Number"), "value")).unwrap();
        assert_eq!(json["type"], serde_json::json!({ "Concrete": "Number" }));
        assert_eq!(json["name"], "value");
    }
}
