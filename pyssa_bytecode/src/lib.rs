//! Pre-decoded CPython wordcode.
//!
//! This crate is the input contract of the translator: an external
//! disassembler hands over [`CodeObject`]s whose instructions already carry
//! byte offsets, resolved jump targets and resolved names or constants.
//! [`CodeBuilder`] assembles such objects from symbolic labels.

pub mod builder;
pub mod code_object;
pub mod constant;
pub mod instruction;
pub mod opcode;

pub use builder::{BuildError, CodeBuilder, Label};
pub use code_object::{disassemble, CodeFlags, CodeObject};
pub use constant::Constant;
pub use instruction::{ArgValue, Instruction};
pub use opcode::Opcode;
