//! Abstract values and the heap that owns them.

use crate::error::{ModelError, ModelResult};
use pyssa_compiler::ir::QualName;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// The address of a heap value. Builtins only ever receive addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(pub u32);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The shape of a value as far as the model knows it.
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractValue {
    /// Integer-tagged; `constant` is known when built from a literal.
    Int { constant: Option<i64> },
    None,
    Str(Option<Arc<str>>),
    /// Fixed numeric fields.
    Tuple(Vec<Addr>),
    /// Keys are constant strings.
    Dict(FxHashMap<Arc<str>, Addr>),
    /// A callable paired with its captured cells, in closure order.
    Closure { function: QualName, cells: Vec<Addr> },
    /// An imported module with no translated body.
    ImportPlaceholder { name: Arc<str> },
    /// Something awaitable; `result` is what awaiting it produces, if known.
    Awaitable { result: Option<Addr> },
    Unknown,
}

impl AbstractValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AbstractValue::Int { .. } => "int",
            AbstractValue::None => "None",
            AbstractValue::Str(_) => "str",
            AbstractValue::Tuple(_) => "tuple",
            AbstractValue::Dict(_) => "dict",
            AbstractValue::Closure { .. } => "function",
            AbstractValue::ImportPlaceholder { .. } => "module",
            AbstractValue::Awaitable { .. } => "awaitable",
            AbstractValue::Unknown => "unknown",
        }
    }

    #[inline]
    pub fn as_const_str(&self) -> Option<&Arc<str>> {
        match self {
            AbstractValue::Str(Some(s)) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_const_int(&self) -> Option<i64> {
        match self {
            AbstractValue::Int { constant } => *constant,
            _ => None,
        }
    }
}

/// Append-only store of abstract values.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    values: Vec<AbstractValue>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, value: AbstractValue) -> Addr {
        let addr = Addr(self.values.len() as u32);
        self.values.push(value);
        addr
    }

    /// A fresh unconstrained value.
    #[inline]
    pub fn unknown(&mut self) -> Addr {
        self.alloc(AbstractValue::Unknown)
    }

    pub fn get(&self, addr: Addr) -> ModelResult<&AbstractValue> {
        self.values
            .get(addr.0 as usize)
            .ok_or(ModelError::DanglingAddress(addr))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
