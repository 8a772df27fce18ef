//! Defines the error types for flow persistence.
use crate::graph::FlowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("link refers to unknown module key {key}")]
    UnknownKey { key: usize },

    #[error(transparent)]
    Flow(#[from] FlowError),
}
