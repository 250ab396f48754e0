use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body the simulation backend sends alongside a non-success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendErrorBody {
    pub error: String,
}

impl BackendErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

impl UnknownName {
    pub fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}
