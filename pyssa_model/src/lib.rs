//! # pyssa model
//!
//! The consumer side of pyssa IR: the fixed set of builtin call targets a
//! symbolic-execution engine gives meaning to, the mapping from IR forms onto
//! them, and a reference abstract-value model implementing their contracts.
//!
//! Semantic uncertainty is never an error here. An unresolved name, a missing
//! key or an unknown dispatch shape yields a fresh unconstrained value; only
//! internal contract violations surface as [`ModelError`].

pub mod builtins;
pub mod error;
pub mod model;
pub mod namespace;
pub mod value;

pub use builtins::Builtin;
pub use error::{ModelError, ModelResult};
pub use model::{CallOutcome, Model};
pub use namespace::{Frame, FrameLocals, ModuleGlobals};
pub use value::{AbstractValue, Addr, Heap};
