//! Translation errors.
//!
//! A [`TranslateError`] is fatal to the procedure it was raised in: no IR for
//! that procedure is produced. Siblings translate independently.

use crate::ir::Scope;
use pyssa_bytecode::Opcode;
use std::sync::Arc;
use thiserror::Error;

/// Result type for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// A structured diagnostic: where translation stopped and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{procedure}: {kind} at offset {offset}{}", describe_opcode(.opcode))]
pub struct TranslateError {
    /// Rendered qualified name of the failing procedure.
    pub procedure: String,
    pub offset: u32,
    /// The instruction being translated, if any.
    pub opcode: Option<Opcode>,
    pub kind: ErrorKind,
}

fn describe_opcode(opcode: &Option<Opcode>) -> String {
    match opcode {
        Some(op) => format!(" ({})", op),
        None => String::new(),
    }
}

/// Why translation of a procedure stopped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("jump to offset {target} which starts no instruction")]
    UnknownJumpTarget { target: u32 },

    #[error("stack underflow: needed {needed} entries, found {depth}")]
    StackUnderflow { needed: usize, depth: usize },

    #[error("stack depth exceeds the limit of {limit}")]
    StackOverflow { limit: usize },

    #[error("no lowering for this operation")]
    UnsupportedOpcode,

    #[error("expected {expected} on the stack, found {found}")]
    UnexpectedStackEntry {
        expected: &'static str,
        found: &'static str,
    },

    #[error("stack shape does not match the established entry of the block at offset {target}")]
    ShapeMismatch { target: u32 },

    #[error("name `{name}` is accessed both as {first:?} and {second:?}")]
    ScopeConflict {
        name: Arc<str>,
        first: Scope,
        second: Scope,
    },

    #[error("name `{name}` has no resolved scope")]
    UnresolvedName { name: Arc<str> },

    #[error("`{name}` is not in the cell table")]
    UnresolvedCell { name: Arc<str> },

    #[error("instruction is missing its {expected} argument")]
    MissingArgument { expected: &'static str },

    #[error("control falls off the end of the instruction stream")]
    FallOffEnd,
}

impl TranslateError {
    pub fn new(
        procedure: impl Into<String>,
        offset: u32,
        opcode: Option<Opcode>,
        kind: ErrorKind,
    ) -> Self {
        Self {
            procedure: procedure.into(),
            offset,
            opcode,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslateError::new(
            "dummy.f",
            12,
            Some(Opcode::PopTop),
            ErrorKind::StackUnderflow {
                needed: 1,
                depth: 0,
            },
        );
        assert_eq!(
            err.to_string(),
            "dummy.f: stack underflow: needed 1 entries, found 0 at offset 12 (POP_TOP)"
        );
    }

    #[test]
    fn test_error_display_without_opcode() {
        let err = TranslateError::new("toplevel", 0, None, ErrorKind::FallOffEnd);
        assert_eq!(
            err.to_string(),
            "toplevel: control falls off the end of the instruction stream at offset 0"
        );
    }
}
