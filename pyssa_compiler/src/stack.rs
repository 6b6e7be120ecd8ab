//! The symbolic operand stack.
//!
//! Entries are either plain values or markers that stand for a pending
//! construct: a bound method awaiting its call, a context manager's exit, the
//! class builder, a code constant, or closure cells. Markers keep their kind
//! across block boundaries; only the operand a marker carries is merged
//! through block parameters.

use crate::error::ErrorKind;
use crate::ir::{Operand, ScopedName};
use pyssa_bytecode::CodeObject;
use smallvec::SmallVec;
use std::sync::Arc;

/// One slot of the symbolic stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEntry {
    Value(Operand),
    /// Result of `LOAD_METHOD`.
    Method { receiver: Operand, name: Arc<str> },
    /// The pending `__exit__` of an entered context manager.
    WithExit { manager: Operand, is_async: bool },
    /// Result of `LOAD_BUILD_CLASS`.
    BuildClass,
    /// A nested code object awaiting `MAKE_FUNCTION`.
    Code(Arc<CodeObject>),
    /// Result of `LOAD_CLOSURE`.
    Cell(ScopedName),
    /// A tuple of cells awaiting `MAKE_FUNCTION`.
    Cells(Vec<ScopedName>),
}

impl StackEntry {
    /// Short description used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            StackEntry::Value(_) => "value",
            StackEntry::Method { .. } => "method",
            StackEntry::WithExit { .. } => "context manager exit",
            StackEntry::BuildClass => "class builder",
            StackEntry::Code(_) => "code object",
            StackEntry::Cell(_) => "closure cell",
            StackEntry::Cells(_) => "closure cell tuple",
        }
    }

    /// The operand this entry carries across a merge, if any.
    pub fn operand(&self) -> Option<&Operand> {
        match self {
            StackEntry::Value(op)
            | StackEntry::Method { receiver: op, .. }
            | StackEntry::WithExit { manager: op, .. } => Some(op),
            _ => None,
        }
    }

    fn operand_mut(&mut self) -> Option<&mut Operand> {
        match self {
            StackEntry::Value(op)
            | StackEntry::Method { receiver: op, .. }
            | StackEntry::WithExit { manager: op, .. } => Some(op),
            _ => None,
        }
    }

    /// Whether two entries have the same kind and static payload.
    pub fn same_shape(&self, other: &StackEntry) -> bool {
        match (self, other) {
            (StackEntry::Value(_), StackEntry::Value(_)) => true,
            (StackEntry::Method { name: a, .. }, StackEntry::Method { name: b, .. }) => a == b,
            (
                StackEntry::WithExit { is_async: a, .. },
                StackEntry::WithExit { is_async: b, .. },
            ) => a == b,
            (StackEntry::BuildClass, StackEntry::BuildClass) => true,
            (StackEntry::Code(a), StackEntry::Code(b)) => Arc::ptr_eq(a, b),
            (StackEntry::Cell(a), StackEntry::Cell(b)) => a == b,
            (StackEntry::Cells(a), StackEntry::Cells(b)) => a == b,
            _ => false,
        }
    }
}

/// The abstract operand stack of the block being simulated.
#[derive(Debug, Clone, Default)]
pub struct SymbolicStack {
    entries: SmallVec<[StackEntry; 8]>,
}

impl SymbolicStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = StackEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    /// Push, failing once the stack would exceed `limit`.
    pub fn push(&mut self, entry: StackEntry, limit: usize) -> Result<(), ErrorKind> {
        if self.entries.len() >= limit {
            return Err(ErrorKind::StackOverflow { limit });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<StackEntry, ErrorKind> {
        self.entries.pop().ok_or(ErrorKind::StackUnderflow {
            needed: 1,
            depth: 0,
        })
    }

    /// Pop `n` entries, returned bottom-first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<StackEntry>, ErrorKind> {
        let depth = self.entries.len();
        if n > depth {
            return Err(ErrorKind::StackUnderflow { needed: n, depth });
        }
        Ok(self.entries.drain(depth - n..).collect())
    }

    /// The entry `depth` slots below the top.
    pub fn peek(&self, depth: usize) -> Result<&StackEntry, ErrorKind> {
        let len = self.entries.len();
        if depth >= len {
            return Err(ErrorKind::StackUnderflow {
                needed: depth + 1,
                depth: len,
            });
        }
        Ok(&self.entries[len - 1 - depth])
    }

    /// Mutable access to the entry `depth` slots below the top.
    pub fn peek_mut(&mut self, depth: usize) -> Result<&mut StackEntry, ErrorKind> {
        let len = self.entries.len();
        if depth >= len {
            return Err(ErrorKind::StackUnderflow {
                needed: depth + 1,
                depth: len,
            });
        }
        Ok(&mut self.entries[len - 1 - depth])
    }

    /// Move the top entry `n - 1` slots down (`ROT_TWO` is `rotate(2)`).
    pub fn rotate(&mut self, n: usize) -> Result<(), ErrorKind> {
        let len = self.entries.len();
        if n > len {
            return Err(ErrorKind::StackUnderflow {
                needed: n,
                depth: len,
            });
        }
        self.entries[len - n..].rotate_right(1);
        Ok(())
    }

    /// Duplicate the top `n` entries in order.
    pub fn dup(&mut self, n: usize, limit: usize) -> Result<(), ErrorKind> {
        let len = self.entries.len();
        if n > len {
            return Err(ErrorKind::StackUnderflow {
                needed: n,
                depth: len,
            });
        }
        for i in len - n..len {
            let entry = self.entries[i].clone();
            self.push(entry, limit)?;
        }
        Ok(())
    }

    /// The operands carried by the stack, bottom-first.
    pub fn operands(&self) -> Vec<Operand> {
        self.entries
            .iter()
            .filter_map(|e| e.operand().cloned())
            .collect()
    }

    /// The operands of plain value entries, bottom-first.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.entries.iter_mut().filter_map(|e| match e {
            StackEntry::Value(op) => Some(op),
            _ => None,
        })
    }

    /// Replace every carried operand, bottom-first, with one produced by `fresh`.
    pub fn rebind_operands(&mut self, mut fresh: impl FnMut() -> Operand) {
        for entry in self.entries.iter_mut() {
            if let Some(op) = entry.operand_mut() {
                *op = fresh();
            }
        }
    }

    /// Whether `other` has the same depth and per-slot shape.
    pub fn same_shape(&self, other: &SymbolicStack) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.same_shape(b))
    }
}
