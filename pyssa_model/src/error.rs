//! Model errors.

use crate::builtins::Builtin;
use crate::value::Addr;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// An internal contract between the IR and the model was broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{builtin}: {reason}")]
    ContractViolation {
        builtin: Builtin,
        reason: String,
    },

    #[error("unknown builtin `{0}`")]
    UnknownBuiltin(String),

    #[error("address {0} is not allocated")]
    DanglingAddress(Addr),
}

impl ModelError {
    pub fn contract(builtin: Builtin, reason: impl Into<String>) -> Self {
        ModelError::ContractViolation {
            builtin,
            reason: reason.into(),
        }
    }
}
