//! Defines the error types for the graph module.
use super::link::LinkId;
use crate::type_system::TypeError;
use thiserror::Error;

/// Whether a slot index refers to the input or the output side of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotDirection {
    Input,
    Output,
}

/// Failures of structural flow operations.
///
/// Requests that are already satisfied (adding a present module, removing an
/// absent link) are not errors; those operations return `false` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("module '{module}' already belongs to another flow")]
    ForeignModule { module: String },

    #[error("link {link} touches module '{module}', which is not part of this flow")]
    ModuleNotInFlow { module: String, link: LinkId },

    #[error("link {link} refers to a module that no longer exists")]
    DetachedEndpoint { link: LinkId },

    #[error("module '{module}' has no {direction:?} slot {index}")]
    SlotOutOfRange {
        module: String,
        direction: SlotDirection,
        index: usize,
    },

    #[error("link {link} cannot carry '{actual}' into a slot expecting '{expected}'")]
    InvalidLink {
        link: LinkId,
        expected: String,
        actual: String,
    },

    #[error("cycle detected involving module '{module}'")]
    Cycle { module: String },

    #[error("no module kind named '{name}' is registered")]
    UnknownModuleKind { name: String },

    #[error("module construction failed: {0}")]
    Construction(#[from] TypeError),
}

/// Failures of per-module operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module '{module}' does not accept a configuration")]
    UnconfiguredModule { module: String },
}
