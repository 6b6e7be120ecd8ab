//! Construct-specific lowerings.
//!
//! Each submodule extends [`ProcedureTranslator`](crate::translator::ProcedureTranslator)
//! with the handlers for one family of operations. Control-flow constructs
//! (short-circuit booleans, conditional expressions, loops) need no pattern
//! matching: they fall out of the conditional-jump handlers and the block
//! parameter mechanism.

mod calls;
mod collections;
mod context;
mod control;
mod coroutine;
mod definitions;
mod format;
mod names;
mod operators;
