//! Name-keyed mappings: one per module, one per frame.
//!
//! A missing name is not an error; the caller gets a fresh unconstrained
//! value, which is then bound so later loads agree.

use crate::value::{Addr, Heap};
use pyssa_compiler::ir::QualName;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Module-level bindings, shared by every procedure of the module.
#[derive(Debug, Clone, Default)]
pub struct ModuleGlobals {
    bindings: FxHashMap<Arc<str>, Addr>,
}

impl ModuleGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<Addr> {
        self.bindings.get(name).copied()
    }

    #[inline]
    pub fn set(&mut self, name: Arc<str>, value: Addr) {
        self.bindings.insert(name, value);
    }

    #[inline]
    pub fn delete(&mut self, name: &str) -> Option<Addr> {
        self.bindings.remove(name)
    }

    /// Look `name` up, binding a fresh value on a miss.
    pub fn load(&mut self, name: &Arc<str>, heap: &mut Heap) -> Addr {
        *self
            .bindings
            .entry(name.clone())
            .or_insert_with(|| heap.unknown())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Per-call bindings.
#[derive(Debug, Clone, Default)]
pub struct FrameLocals {
    bindings: FxHashMap<Arc<str>, Addr>,
}

impl FrameLocals {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<Addr> {
        self.bindings.get(name).copied()
    }

    #[inline]
    pub fn set(&mut self, name: Arc<str>, value: Addr) {
        self.bindings.insert(name, value);
    }

    pub fn load(&mut self, name: &Arc<str>, heap: &mut Heap) -> Addr {
        *self
            .bindings
            .entry(name.clone())
            .or_insert_with(|| heap.unknown())
    }

    #[inline]
    pub fn delete(&mut self, name: &str) -> Option<Addr> {
        self.bindings.remove(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The model-side state of one procedure invocation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: QualName,
    pub locals: FrameLocals,
    /// Set by `gen_start_coroutine`.
    pub is_coroutine: bool,
}

impl Frame {
    pub fn new(function: QualName) -> Self {
        Self {
            function,
            locals: FrameLocals::new(),
            is_coroutine: false,
        }
    }

    /// Whether this frame runs a module body, whose names are the module's.
    #[inline]
    pub fn is_module(&self) -> bool {
        self.function.is_toplevel()
    }
}
