//! Scope resolution.

mod binding;
mod resolver;

pub use binding::{Binding, BindingFlags};
pub use resolver::{resolve_scopes, ScopeResolver, ScopeTable};
