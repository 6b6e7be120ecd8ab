//! Two-pass scope resolution.
//!
//! Pass one walks the instruction stream and records, per name, every access
//! route it is reached through. Pass two turns each binding into exactly one
//! [`Scope`], and builds the cell table from the procedure's own cell and free
//! variables followed by the free variables of its nested bodies, in
//! first-encounter order. The resulting [`ScopeTable`] is read-only.

use super::binding::{Binding, BindingFlags};
use crate::error::{ErrorKind, TranslateError, TranslateResult};
use crate::ir::{ProcKind, QualName, Scope, ScopedName};
use indexmap::{IndexMap, IndexSet};
use pyssa_bytecode::CodeObject;
use std::sync::Arc;

/// The resolved scope of every name a procedure references.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    names: IndexMap<Arc<str>, Scope>,
    cells: IndexSet<Arc<str>>,
}

impl ScopeTable {
    /// The scope of `name`, if it is referenced.
    #[inline]
    pub fn scope_of(&self, name: &str) -> Option<Scope> {
        self.names.get(name).copied()
    }

    /// `name` paired with its scope.
    pub fn scoped(&self, name: &str) -> Option<ScopedName> {
        let (key, scope) = self.names.get_key_value(name)?;
        Some(ScopedName {
            scope: *scope,
            name: key.clone(),
        })
    }

    /// Index of `name` in the cell table.
    #[inline]
    pub fn cell_index(&self, name: &str) -> Option<u32> {
        self.cells.get_index_of(name).map(|i| i as u32)
    }

    /// The cell table in index order.
    pub fn cells(&self) -> impl Iterator<Item = &Arc<str>> {
        self.cells.iter()
    }

    /// Every resolved name in first-encounter order.
    pub fn names(&self) -> impl Iterator<Item = (&Arc<str>, Scope)> {
        self.names.iter().map(|(n, s)| (n, *s))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolves the scopes of one procedure.
pub struct ScopeResolver<'a> {
    code: &'a CodeObject,
    kind: ProcKind,
    qualname: &'a QualName,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(code: &'a CodeObject, kind: ProcKind, qualname: &'a QualName) -> Self {
        Self {
            code,
            kind,
            qualname,
        }
    }

    /// Run both passes.
    pub fn resolve(self) -> TranslateResult<ScopeTable> {
        let bindings = self.collect_bindings();
        let cells = self.collect_cells();
        self.classify(bindings, cells)
    }

    // =========================================================================
    // Pass 1: bindings
    // =========================================================================

    fn collect_bindings(&self) -> IndexMap<Arc<str>, Binding> {
        let mut bindings: IndexMap<Arc<str>, Binding> = IndexMap::new();
        for inst in &self.code.instructions {
            let Some(flags) = BindingFlags::for_opcode(inst.opcode) else {
                continue;
            };
            let Some(name) = inst.name() else {
                continue;
            };
            bindings
                .entry(name.clone())
                .or_insert_with(|| Binding::new(name.clone(), inst.offset, inst.opcode))
                .record(flags, inst.offset, inst.opcode);
        }
        bindings
    }

    fn collect_cells(&self) -> IndexSet<Arc<str>> {
        let mut cells = IndexSet::new();
        cells.extend(self.code.cellvars.iter().cloned());
        cells.extend(self.code.freevars.iter().cloned());
        for nested in self.code.nested() {
            cells.extend(nested.freevars.iter().cloned());
        }
        cells
    }

    // =========================================================================
    // Pass 2: classification
    // =========================================================================

    fn classify(
        &self,
        bindings: IndexMap<Arc<str>, Binding>,
        cells: IndexSet<Arc<str>>,
    ) -> TranslateResult<ScopeTable> {
        let mut names = IndexMap::with_capacity(bindings.len());
        for (name, binding) in bindings {
            if let Some((offset, opcode)) = binding.conflict {
                let mut routes = Vec::with_capacity(2);
                for route in [
                    BindingFlags::VIA_NAME,
                    BindingFlags::VIA_FAST,
                    BindingFlags::VIA_GLOBAL,
                    BindingFlags::VIA_CELL,
                ] {
                    if !binding.flags.contains(route) {
                        continue;
                    }
                    let scope = self.scope_for_route(route, &name, &cells).ok_or_else(|| {
                        self.error(
                            offset,
                            opcode,
                            ErrorKind::UnresolvedCell { name: name.clone() },
                        )
                    })?;
                    routes.push(scope);
                }
                // A conflict is only recorded once a second route appears.
                if let [first, second, ..] = routes[..] {
                    let kind = ErrorKind::ScopeConflict {
                        name: name.clone(),
                        first,
                        second,
                    };
                    return Err(self.error(offset, opcode, kind));
                }
            }

            let route = binding.flags.intersection(BindingFlags::ROUTES);
            let scope = self.scope_for_route(route, &name, &cells).ok_or_else(|| {
                let (offset, opcode) = binding.first;
                self.error(
                    offset,
                    opcode,
                    ErrorKind::UnresolvedCell { name: name.clone() },
                )
            })?;
            names.insert(name, scope);
        }
        Ok(ScopeTable { names, cells })
    }

    /// The scope an access route selects. `None` for a cell route to a name
    /// missing from the cell table.
    fn scope_for_route(
        &self,
        route: BindingFlags,
        name: &str,
        cells: &IndexSet<Arc<str>>,
    ) -> Option<Scope> {
        if route == BindingFlags::VIA_NAME {
            Some(match self.kind {
                ProcKind::Module => Scope::TopLevel,
                _ => Scope::Local,
            })
        } else if route == BindingFlags::VIA_FAST {
            Some(Scope::Local)
        } else if route == BindingFlags::VIA_GLOBAL {
            Some(Scope::Global)
        } else {
            cells.get_index_of(name).map(|i| Scope::Deref(i as u32))
        }
    }

    fn error(&self, offset: u32, opcode: pyssa_bytecode::Opcode, kind: ErrorKind) -> TranslateError {
        TranslateError::new(self.qualname.to_string(), offset, Some(opcode), kind)
    }
}

/// Resolve the scopes of `code`.
pub fn resolve_scopes(
    code: &CodeObject,
    kind: ProcKind,
    qualname: &QualName,
) -> TranslateResult<ScopeTable> {
    ScopeResolver::new(code, kind, qualname).resolve()
}
