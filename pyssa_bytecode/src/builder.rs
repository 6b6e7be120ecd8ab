//! Code object assembly.
//!
//! The `CodeBuilder` assembles a [`CodeObject`] from opcodes and symbolic
//! labels. It assigns byte offsets, interns names and constants, and resolves
//! every label reference into an absolute [`ArgValue::Target`] when finished.

use crate::code_object::{CodeFlags, CodeObject};
use crate::constant::Constant;
use crate::instruction::{ArgValue, Instruction};
use crate::opcode::Opcode;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A label for jump targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

/// A reference to a label that needs patching.
#[derive(Debug)]
struct ForwardRef {
    /// Instruction index containing the jump.
    instruction_index: usize,
    /// The label being jumped to.
    label: Label,
}

/// Errors raised while finishing a code object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("label {0} is referenced but never bound")]
    UnboundLabel(u32),
    #[error("label {0} is bound more than once")]
    LabelRebound(u32),
}

/// Builder for constructing code objects.
///
/// # Example
/// ```
/// use pyssa_bytecode::{CodeBuilder, Constant, Opcode};
///
/// let mut b = CodeBuilder::new("<module>");
/// b.op_name(Opcode::LoadName, "print");
/// b.op_const(Constant::str("hi"));
/// b.op_arg(Opcode::CallFunction, 1);
/// b.op(Opcode::PopTop);
/// b.op_const(Constant::None);
/// b.op(Opcode::ReturnValue);
/// let code = b.finish().unwrap();
/// assert_eq!(code.instructions.len(), 6);
/// assert_eq!(code.instructions[5].offset, 10);
/// ```
pub struct CodeBuilder {
    code: CodeObject,
    next_label: u32,
    /// Label to instruction index map.
    labels: HashMap<Label, usize>,
    forward_refs: Vec<ForwardRef>,
    rebound: Option<Label>,
}

impl CodeBuilder {
    /// Create a new builder for a body named `name`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            code: CodeObject::new(name, "<input>"),
            next_label: 0,
            labels: HashMap::new(),
            forward_refs: Vec::new(),
            rebound: None,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn set_filename(&mut self, filename: impl Into<Arc<str>>) {
        self.code.filename = filename.into();
    }

    /// Declare positional parameters. They become the first varnames.
    pub fn set_params<S: AsRef<str>>(&mut self, params: &[S]) {
        for p in params {
            self.varname(p.as_ref());
        }
        self.code.arg_count = params.len() as u32;
        self.code.flags |= CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS;
    }

    pub fn set_kwonly_arg_count(&mut self, count: u32) {
        self.code.kwonly_arg_count = count;
    }

    pub fn add_flags(&mut self, flags: CodeFlags) {
        self.code.flags |= flags;
    }

    /// Declare a variable of this body captured by nested bodies.
    pub fn add_cellvar(&mut self, name: impl Into<Arc<str>>) {
        self.code.cellvars.push(name.into());
    }

    /// Declare a variable captured from an enclosing body.
    pub fn add_freevar(&mut self, name: impl Into<Arc<str>>) {
        self.code.freevars.push(name.into());
        self.code.flags |= CodeFlags::NESTED;
    }

    // =========================================================================
    // Name tables
    // =========================================================================

    fn varname(&mut self, name: &str) -> u32 {
        intern(&mut self.code.varnames, name)
    }

    fn global_name(&mut self, name: &str) -> u32 {
        intern(&mut self.code.names, name)
    }

    /// Cell indices cover cellvars first, then freevars.
    fn cell_index(&mut self, name: &str) -> u32 {
        if let Some(i) = self.code.cellvars.iter().position(|n| &**n == name) {
            return i as u32;
        }
        if let Some(i) = self.code.freevars.iter().position(|n| &**n == name) {
            return (self.code.cellvars.len() + i) as u32;
        }
        self.code.cellvars.push(name.into());
        (self.code.cellvars.len() - 1) as u32
    }

    fn constant_index(&mut self, value: &Constant) -> u32 {
        if !matches!(value, Constant::Code(_)) {
            if let Some(i) = self.code.constants.iter().position(|c| c == value) {
                return i as u32;
            }
        }
        self.code.constants.push(value.clone());
        (self.code.constants.len() - 1) as u32
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Create a new label for a jump target.
    pub fn create_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Mark the next emitted instruction as the target of `label`.
    pub fn bind_label(&mut self, label: Label) {
        let index = self.code.instructions.len();
        if self.labels.insert(label, index).is_some() && self.rebound.is_none() {
            self.rebound = Some(label);
        }
    }

    /// Offset the next emitted instruction will receive.
    #[inline]
    pub fn current_offset(&self) -> u32 {
        (self.code.instructions.len() * 2) as u32
    }

    // =========================================================================
    // Instruction Emission
    // =========================================================================

    fn emit(&mut self, opcode: Opcode, arg: u32, argval: ArgValue) -> usize {
        let index = self.code.instructions.len();
        self.code.instructions.push(Instruction {
            offset: (index * 2) as u32,
            opcode,
            arg,
            argval,
        });
        index
    }

    /// Emit an instruction without an argument.
    pub fn op(&mut self, opcode: Opcode) {
        self.emit(opcode, 0, ArgValue::None);
    }

    /// Emit an instruction with a raw count or flag argument.
    pub fn op_arg(&mut self, opcode: Opcode, arg: u32) {
        self.emit(opcode, arg, ArgValue::None);
    }

    /// Emit a name operation, interning `name` into the table the opcode indexes.
    pub fn op_name(&mut self, opcode: Opcode, name: &str) {
        let arg = match opcode {
            Opcode::LoadFast | Opcode::StoreFast | Opcode::DeleteFast => self.varname(name),
            Opcode::LoadDeref
            | Opcode::StoreDeref
            | Opcode::LoadClassDeref
            | Opcode::LoadClosure => self.cell_index(name),
            _ => self.global_name(name),
        };
        self.emit(opcode, arg, ArgValue::Name(name.into()));
    }

    /// Emit `IMPORT_NAME`, `IMPORT_FROM` or another name op with an explicit raw arg.
    pub fn op_name_arg(&mut self, opcode: Opcode, name: &str, arg: u32) {
        self.global_name(name);
        self.emit(opcode, arg, ArgValue::Name(name.into()));
    }

    /// Emit `LOAD_CONST`.
    pub fn op_const(&mut self, value: Constant) {
        let arg = self.constant_index(&value);
        self.emit(Opcode::LoadConst, arg, ArgValue::Const(value));
    }

    /// Emit a jump or `SETUP_*` whose target is patched in [`finish`](Self::finish).
    pub fn op_jump(&mut self, opcode: Opcode, label: Label) {
        let instruction_index = self.emit(opcode, 0, ArgValue::None);
        self.forward_refs.push(ForwardRef {
            instruction_index,
            label,
        });
    }

    /// Finish building and return the code object.
    pub fn finish(mut self) -> Result<CodeObject, BuildError> {
        if let Some(Label(id)) = self.rebound {
            return Err(BuildError::LabelRebound(id));
        }
        for fwd in &self.forward_refs {
            let index = *self
                .labels
                .get(&fwd.label)
                .ok_or(BuildError::UnboundLabel(fwd.label.0))?;
            let target = (index * 2) as u32;
            let inst = &mut self.code.instructions[fwd.instruction_index];
            inst.arg = if is_relative(inst.opcode) {
                target.saturating_sub(inst.next_offset())
            } else {
                target
            };
            inst.argval = ArgValue::Target(target);
        }
        Ok(self.code)
    }
}

/// Jumps whose raw oparg is a delta from the next instruction.
fn is_relative(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::JumpForward
            | Opcode::ForIter
            | Opcode::SetupFinally
            | Opcode::SetupWith
            | Opcode::SetupAsyncWith
    )
}

fn intern(table: &mut Vec<Arc<str>>, name: &str) -> u32 {
    if let Some(i) = table.iter().position(|n| &**n == name) {
        return i as u32;
    }
    table.push(name.into());
    (table.len() - 1) as u32
}
