//! Reference semantics for the builtin call targets.
//!
//! [`Model`] owns the heap and the module-global table; frames are owned by
//! the engine driving it and passed in where a target addresses frame names.

use crate::builtins::Builtin;
use crate::error::{ModelError, ModelResult};
use crate::namespace::{Frame, ModuleGlobals};
use crate::value::{AbstractValue, Addr, Heap};
use log::debug;
use pyssa_bytecode::Constant;
use pyssa_compiler::ir::QualName;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// What a call evaluates to.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Run `function` with `args`; captured cells come first.
    Invoke { function: QualName, args: Vec<Addr> },
    /// The call's result is known without running anything.
    Value(Addr),
}

/// Effects of the allow-listed methods on import placeholders.
#[derive(Debug, Clone, Copy)]
enum PlaceholderEffect {
    /// Await the first argument.
    AwaitArgument,
    /// Await every argument; the result is their tuple.
    AwaitArguments,
    /// A fresh awaitable producing an unknown value.
    FreshAwaitable,
}

fn placeholder_effect(module: &str, method: &str) -> Option<PlaceholderEffect> {
    match (module, method) {
        ("asyncio", "run") => Some(PlaceholderEffect::AwaitArgument),
        ("asyncio", "gather") => Some(PlaceholderEffect::AwaitArguments),
        ("asyncio", "sleep") => Some(PlaceholderEffect::FreshAwaitable),
        _ => None,
    }
}

/// The abstract state shared by every procedure of one module.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub heap: Heap,
    pub globals: ModuleGlobals,
    /// Module bodies the engine has resolved, by import name.
    modules: FxHashMap<Arc<str>, Addr>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `import_name(name)` produce `module` instead of a placeholder.
    pub fn register_module(&mut self, name: impl Into<Arc<str>>, module: Addr) {
        self.modules.insert(name.into(), module);
    }

    fn value(&self, addr: Addr) -> ModelResult<&AbstractValue> {
        self.heap.get(addr)
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// `make_int`: a known constant, or an unconstrained integer.
    pub fn make_int(&mut self, constant: Option<i64>) -> Addr {
        self.heap.alloc(AbstractValue::Int { constant })
    }

    pub fn make_none(&mut self) -> Addr {
        self.heap.alloc(AbstractValue::None)
    }

    pub fn build_tuple(&mut self, items: &[Addr]) -> Addr {
        self.heap.alloc(AbstractValue::Tuple(items.to_vec()))
    }

    /// `make_dictionary`: every key must be a constant string.
    pub fn make_dictionary(&mut self, keys: &[Addr], values: &[Addr]) -> ModelResult<Addr> {
        if keys.len() != values.len() {
            return Err(ModelError::contract(
                Builtin::MakeDictionary,
                format!("{} keys for {} values", keys.len(), values.len()),
            ));
        }
        let mut entries = FxHashMap::default();
        for (&key, &value) in keys.iter().zip(values) {
            let name = match self.value(key)? {
                AbstractValue::Str(Some(s)) => s.clone(),
                other => {
                    return Err(ModelError::contract(
                        Builtin::MakeDictionary,
                        format!("key {} is a {}, not a constant string", key, other.kind()),
                    ))
                }
            };
            entries.insert(name, value);
        }
        Ok(self.heap.alloc(AbstractValue::Dict(entries)))
    }

    /// `make_function`: a callable paired with its captured cells.
    pub fn make_function(&mut self, function: QualName, cells: Vec<Addr>) -> Addr {
        self.heap.alloc(AbstractValue::Closure { function, cells })
    }

    /// Allocate a constant operand.
    pub fn constant(&mut self, constant: &Constant) -> ModelResult<Addr> {
        Ok(match constant {
            Constant::Int(v) => self.make_int(Some(*v)),
            Constant::Bool(b) => self.make_int(Some(i64::from(*b))),
            Constant::None => self.make_none(),
            Constant::Str(s) => self.heap.alloc(AbstractValue::Str(Some(s.clone()))),
            Constant::Tuple(items) => {
                let items = items
                    .iter()
                    .map(|c| self.constant(c))
                    .collect::<ModelResult<Vec<_>>>()?;
                self.build_tuple(&items)
            }
            Constant::Dict(entries) => {
                let mut keys = Vec::with_capacity(entries.len());
                let mut values = Vec::with_capacity(entries.len());
                for (k, v) in entries.iter() {
                    keys.push(self.constant(k)?);
                    values.push(self.constant(v)?);
                }
                self.make_dictionary(&keys, &values)?
            }
            _ => self.heap.unknown(),
        })
    }

    // =========================================================================
    // Names
    // =========================================================================

    pub fn load_global(&mut self, name: &Arc<str>) -> Addr {
        self.globals.load(name, &mut self.heap)
    }

    pub fn store_global(&mut self, name: Arc<str>, value: Addr) {
        self.globals.set(name, value);
    }

    pub fn load_fast(&mut self, frame: &mut Frame, name: &Arc<str>) -> Addr {
        frame.locals.load(name, &mut self.heap)
    }

    pub fn store_fast(&mut self, frame: &mut Frame, name: Arc<str>, value: Addr) {
        frame.locals.set(name, value);
    }

    /// `load_name`: in a module body the frame's names are the module's.
    pub fn load_name(&mut self, frame: &mut Frame, name: &Arc<str>) -> Addr {
        if frame.is_module() {
            self.load_global(name)
        } else {
            self.load_fast(frame, name)
        }
    }

    pub fn store_name(&mut self, frame: &mut Frame, name: Arc<str>, value: Addr) {
        if frame.is_module() {
            self.store_global(name, value);
        } else {
            self.store_fast(frame, name, value);
        }
    }

    /// `nullify_locals`: unbind exactly `names`; other locals survive.
    pub fn nullify_locals(&mut self, frame: &mut Frame, names: &[Arc<str>]) {
        for name in names {
            frame.locals.delete(name);
        }
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// `subscript`: tuples expose fixed numeric fields, dicts their constant
    /// keys. Anything else is unconstrained.
    pub fn subscript(&mut self, value: Addr, index: Addr) -> ModelResult<Addr> {
        let found = match (self.value(value)?, self.value(index)?) {
            (AbstractValue::Tuple(items), idx) => idx.as_const_int().and_then(|i| {
                let i = if i < 0 { i + items.len() as i64 } else { i };
                usize::try_from(i).ok().and_then(|i| items.get(i).copied())
            }),
            (AbstractValue::Dict(entries), key) => {
                key.as_const_str().and_then(|k| entries.get(k).copied())
            }
            _ => None,
        };
        Ok(found.unwrap_or_else(|| self.heap.unknown()))
    }

    // =========================================================================
    // Imports
    // =========================================================================

    pub fn import_name(&mut self, name: &Arc<str>) -> Addr {
        if let Some(&module) = self.modules.get(name) {
            return module;
        }
        self.heap
            .alloc(AbstractValue::ImportPlaceholder { name: name.clone() })
    }

    /// `import_from`: an attribute of a placeholder is a placeholder for the
    /// dotted name.
    pub fn import_from(&mut self, module: Addr, name: &str) -> ModelResult<Addr> {
        let found = match self.value(module)? {
            AbstractValue::ImportPlaceholder { name: parent } => {
                let dotted: Arc<str> = format!("{}.{}", parent, name).into();
                return Ok(self.import_name(&dotted));
            }
            AbstractValue::Dict(entries) => entries.get(name).copied(),
            _ => None,
        };
        Ok(found.unwrap_or_else(|| self.heap.unknown()))
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// `call`: a closure runs its function with its cells before `args`.
    pub fn call(&mut self, callee: Addr, args: &[Addr]) -> ModelResult<CallOutcome> {
        match self.value(callee)? {
            AbstractValue::Closure { function, cells } => {
                let mut full = cells.clone();
                full.extend_from_slice(args);
                Ok(CallOutcome::Invoke {
                    function: function.clone(),
                    args: full,
                })
            }
            other => {
                debug!("call on {} {}: unconstrained result", other.kind(), callee);
                Ok(CallOutcome::Value(self.heap.unknown()))
            }
        }
    }

    /// `call_method`, dispatched on the receiver's shape.
    pub fn call_method(
        &mut self,
        receiver: Addr,
        method: &str,
        args: &[Addr],
    ) -> ModelResult<CallOutcome> {
        let result = match self.value(receiver)? {
            AbstractValue::ImportPlaceholder { name } => {
                match placeholder_effect(name, method) {
                    Some(effect) => self.placeholder_call(effect, args)?,
                    None => {
                        debug!("no model for {}.{}", name, method);
                        self.heap.unknown()
                    }
                }
            }
            other @ (AbstractValue::Int { .. }
            | AbstractValue::None
            | AbstractValue::Str(_)
            | AbstractValue::Tuple(_)
            | AbstractValue::Dict(_)
            | AbstractValue::Closure { .. }
            | AbstractValue::Awaitable { .. }
            | AbstractValue::Unknown) => {
                debug!("no model for method {} on {}", method, other.kind());
                self.heap.unknown()
            }
        };
        Ok(CallOutcome::Value(result))
    }

    fn placeholder_call(&mut self, effect: PlaceholderEffect, args: &[Addr]) -> ModelResult<Addr> {
        Ok(match effect {
            PlaceholderEffect::AwaitArgument => match args.first() {
                Some(&arg) => self.await_value(arg)?,
                None => self.heap.unknown(),
            },
            PlaceholderEffect::AwaitArguments => {
                let results = args
                    .iter()
                    .map(|&arg| self.await_value(arg))
                    .collect::<ModelResult<Vec<_>>>()?;
                let tuple = self.build_tuple(&results);
                self.heap.alloc(AbstractValue::Awaitable {
                    result: Some(tuple),
                })
            }
            PlaceholderEffect::FreshAwaitable => {
                self.heap.alloc(AbstractValue::Awaitable { result: None })
            }
        })
    }

    // =========================================================================
    // Coroutines
    // =========================================================================

    /// `get_awaitable`: awaitables pass through; anything else is wrapped.
    pub fn get_awaitable(&mut self, value: Addr) -> ModelResult<Addr> {
        if let AbstractValue::Awaitable { .. } = self.value(value)? {
            return Ok(value);
        }
        Ok(self.heap.alloc(AbstractValue::Awaitable { result: None }))
    }

    pub fn gen_start_coroutine(&mut self, frame: &mut Frame) -> Addr {
        frame.is_coroutine = true;
        self.make_none()
    }

    /// `yield_from`: the result of awaiting `awaitable`. The sent value only
    /// matters to the delegate, which the model does not run.
    pub fn yield_from(&mut self, awaitable: Addr, _sent: Addr) -> ModelResult<Addr> {
        self.await_value(awaitable)
    }

    fn await_value(&mut self, addr: Addr) -> ModelResult<Addr> {
        match self.value(addr)? {
            AbstractValue::Awaitable {
                result: Some(result),
            } => Ok(*result),
            _ => Ok(self.heap.unknown()),
        }
    }
}
