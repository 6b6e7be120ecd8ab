//! # pyssa compiler
//!
//! Translates pre-decoded CPython wordcode into a control-flow graph of basic
//! blocks in block-parameter SSA form. Each function, lambda, comprehension
//! and class body becomes an independent [`Procedure`](ir::Procedure) with a
//! qualified name.
//!
//! Translation of one code object runs in three phases:
//!
//! 1. **Scope resolution**: every name is classified once per procedure
//! 2. **Block partitioning**: leaders, static successors, predecessor counts
//! 3. **Symbolic simulation**: the operand stack is replayed block by block,
//!    with compiler idioms lowered by [`desugar`] as they are met

pub mod cfg;
pub mod config;
pub mod desugar;
pub mod emitter;
pub mod error;
pub mod ir;
pub mod scope;
pub mod stack;
pub mod translator;

pub use config::TranslateConfig;
pub use emitter::{translate_module, translate_procedure, Translation};
pub use error::{ErrorKind, TranslateError, TranslateResult};
pub use ir::{Module, Procedure, QualName};
pub use translator::{Hoisted, ProcedureTranslator};
