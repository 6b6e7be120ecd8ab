//! Control-flow-graph IR with block parameters.
//!
//! A [`Module`] holds one [`Procedure`] per translated body. Every procedure
//! is a list of [`Block`]s indexed by [`BlockId`]; block 0 is the entry.
//! Values are single-assignment temporaries ([`Temp`]). Values that merge at
//! a join point arrive as block parameters, supplied positionally by every
//! predecessor's jump.

mod display;
mod expr;

pub use expr::{BinaryOp, CompareOp, Expr, FormatFn, GenKind, UnaryOp};

use pyssa_bytecode::{CodeFlags, Constant};
use std::sync::Arc;

// =============================================================================
// Values
// =============================================================================

/// A single-assignment temporary, rendered `nK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(pub u32);

/// A block identifier, rendered `bN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const ENTRY: BlockId = BlockId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An expression argument: an inlined constant or a temporary.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Const(Constant),
    Temp(Temp),
}

impl Operand {
    #[inline]
    pub fn none() -> Self {
        Operand::Const(Constant::None)
    }

    #[inline]
    pub fn as_const(&self) -> Option<&Constant> {
        match self {
            Operand::Const(c) => Some(c),
            Operand::Temp(_) => None,
        }
    }

    #[inline]
    pub fn as_temp(&self) -> Option<Temp> {
        match self {
            Operand::Temp(t) => Some(*t),
            Operand::Const(_) => None,
        }
    }
}

impl From<Temp> for Operand {
    fn from(t: Temp) -> Self {
        Operand::Temp(t)
    }
}

impl From<Constant> for Operand {
    fn from(c: Constant) -> Self {
        Operand::Const(c)
    }
}

// =============================================================================
// Scopes
// =============================================================================

/// The classification of a name reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A binding made by the module body's own statements.
    TopLevel,
    /// A name accessed through an explicit global operation.
    Global,
    /// A name in the current frame.
    Local,
    /// A closure cell, indexed into the procedure's cell table.
    Deref(u32),
}

/// The storage a scope addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The module-global table shared by every procedure of a module.
    Module,
    /// The per-call frame mapping.
    Frame,
    /// A closure cell.
    Cell(u32),
}

impl Scope {
    /// `TopLevel` and `Global` are two routes into the same module table.
    #[inline]
    pub fn namespace(self) -> Namespace {
        match self {
            Scope::TopLevel | Scope::Global => Namespace::Module,
            Scope::Local => Namespace::Frame,
            Scope::Deref(i) => Namespace::Cell(i),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scope::TopLevel => "TOPLEVEL",
            Scope::Global => "GLOBAL",
            Scope::Local => "LOCAL",
            Scope::Deref(_) => "DEREF",
        }
    }
}

/// A name together with its resolved scope, rendered `SCOPE[name]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedName {
    pub scope: Scope,
    pub name: Arc<str>,
}

impl ScopedName {
    pub fn new(scope: Scope, name: impl Into<Arc<str>>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    /// Whether two references address the same storage.
    #[inline]
    pub fn aliases(&self, other: &ScopedName) -> bool {
        self.scope.namespace() == other.scope.namespace() && self.name == other.name
    }
}

// =============================================================================
// Qualified names
// =============================================================================

/// The lexical path of a procedure inside its module.
///
/// The module body has an empty path and renders as `toplevel`; any nested
/// body renders as `module.outer.inner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualName {
    module: Arc<str>,
    path: Vec<Arc<str>>,
}

impl QualName {
    /// The module body of `module`.
    pub fn toplevel(module: impl Into<Arc<str>>) -> Self {
        Self {
            module: module.into(),
            path: Vec::new(),
        }
    }

    /// The name of a body defined inside this one.
    pub fn child(&self, name: impl Into<Arc<str>>) -> Self {
        let mut path = self.path.clone();
        path.push(name.into());
        Self {
            module: self.module.clone(),
            path,
        }
    }

    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[inline]
    pub fn path(&self) -> &[Arc<str>] {
        &self.path
    }

    #[inline]
    pub fn is_toplevel(&self) -> bool {
        self.path.is_empty()
    }

    /// The innermost local name, or `toplevel`.
    pub fn local_name(&self) -> &str {
        self.path.last().map_or("toplevel", |n| n)
    }
}

// =============================================================================
// Instructions
// =============================================================================

/// A non-terminating instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `lhs <- rhs`; `lhs` is never assigned anywhere else.
    Let { lhs: Temp, rhs: Expr },
    /// `SCOPE[name] <- value`.
    Store { target: ScopedName, value: Operand },
    /// `object.name = value`.
    SetAttr {
        object: Operand,
        name: Arc<str>,
        value: Operand,
    },
    /// `container[index] = value`.
    SetItem {
        container: Operand,
        index: Operand,
        value: Operand,
    },
    /// `del SCOPE[name]`.
    Delete { target: ScopedName },
}

impl Instr {
    /// The temporary this instruction defines, if any.
    #[inline]
    pub fn defines(&self) -> Option<Temp> {
        match self {
            Instr::Let { lhs, .. } => Some(*lhs),
            _ => None,
        }
    }

    /// Every operand this instruction reads.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instr::Let { rhs, .. } => rhs.operands(),
            Instr::Store { value, .. } => vec![value],
            Instr::SetAttr { object, value, .. } => vec![object, value],
            Instr::SetItem {
                container,
                index,
                value,
            } => vec![container, index, value],
            Instr::Delete { .. } => Vec::new(),
        }
    }
}

/// A jump edge with the arguments bound to the target's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpTarget {
    pub block: BlockId,
    pub args: Vec<Operand>,
}

/// The control transfer ending a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Jump(JumpTarget),
    CondJump {
        cond: Operand,
        then: JumpTarget,
        otherwise: JumpTarget,
    },
    Return(Operand),
    /// `raise value`.
    Throw(Operand),
}

impl Terminator {
    /// Outgoing edges in rendering order.
    pub fn targets(&self) -> Vec<&JumpTarget> {
        match self {
            Terminator::Jump(t) => vec![t],
            Terminator::CondJump {
                then, otherwise, ..
            } => vec![then, otherwise],
            Terminator::Return(_) | Terminator::Throw(_) => Vec::new(),
        }
    }

    /// Every operand this terminator reads, jump arguments included.
    pub fn operands(&self) -> Vec<&Operand> {
        let mut ops = match self {
            Terminator::CondJump { cond, .. } => vec![cond],
            Terminator::Return(v) | Terminator::Throw(v) => vec![v],
            Terminator::Jump(_) => Vec::new(),
        };
        for target in self.targets() {
            ops.extend(target.args.iter());
        }
        ops
    }
}

// =============================================================================
// Blocks, procedures, modules
// =============================================================================

/// A basic block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    /// Byte offset of the first bytecode instruction of the block.
    pub offset: u32,
    pub params: Vec<Temp>,
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
}

/// What kind of source construct a procedure was hoisted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcKind {
    Module,
    Function,
    Lambda,
    Comprehension,
    Class,
}

impl ProcKind {
    /// Classify a nested body by its code name.
    pub fn from_code_name(name: &str) -> ProcKind {
        match name {
            "<lambda>" => ProcKind::Lambda,
            "<listcomp>" | "<setcomp>" | "<dictcomp>" | "<genexpr>" => ProcKind::Comprehension,
            _ => ProcKind::Function,
        }
    }
}

/// A translated procedure. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub qualname: QualName,
    pub kind: ProcKind,
    pub flags: CodeFlags,
    pub params: Vec<Arc<str>>,
    /// Cell table; `Scope::Deref(i)` addresses `cells[i]`.
    pub cells: Vec<Arc<str>>,
    /// Blocks indexed by id. `blocks[0]` is the entry.
    pub blocks: Vec<Block>,
}

impl Procedure {
    #[inline]
    pub fn entry(&self) -> BlockId {
        BlockId::ENTRY
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    #[inline]
    pub fn is_generator(&self) -> bool {
        self.flags.contains(CodeFlags::GENERATOR)
    }

    #[inline]
    pub fn is_coroutine(&self) -> bool {
        self.flags.contains(CodeFlags::COROUTINE)
    }

    /// All instructions of the procedure in block order.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.blocks.iter().flat_map(|b| b.instrs.iter())
    }
}

/// A translated module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: Arc<str>,
    /// The module body first, then nested bodies depth-first in definition order.
    pub procedures: Vec<Procedure>,
}

impl Module {
    /// The module body, if it translated.
    pub fn toplevel(&self) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.qualname.is_toplevel())
    }

    /// First procedure whose rendered qualified name is `qualname`.
    pub fn procedure(&self, qualname: &str) -> Option<&Procedure> {
        self.procedures
            .iter()
            .find(|p| p.qualname.to_string() == qualname)
    }
}
