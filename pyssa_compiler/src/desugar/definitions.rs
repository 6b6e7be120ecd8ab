//! Nested definitions: `def`, `lambda`, comprehensions and class bodies.
//!
//! The nested code object is not translated here. The definition site becomes
//! one `$MakeFunction` carrying the child's qualified name, and the code
//! object is queued as [`Hoisted`] for the emitter.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{Expr, Operand, ProcKind, Scope, ScopedName};
use crate::stack::StackEntry;
use crate::translator::{Hoisted, ProcedureTranslator};
use log::debug;
use pyssa_bytecode::Instruction;

const MF_DEFAULTS: u32 = 0x01;
const MF_KWDEFAULTS: u32 = 0x02;
const MF_ANNOTATIONS: u32 = 0x04;
const MF_CLOSURE: u32 = 0x08;

impl<'a> ProcedureTranslator<'a> {
    /// `MAKE_FUNCTION flags`.
    ///
    /// Stack, top first: qualified name string, code object, then the optional
    /// closure cells, annotations, keyword defaults and defaults selected by
    /// `flags`.
    pub(crate) fn make_function(&mut self, inst: &Instruction) -> TranslateResult<()> {
        // The runtime qualname string is recomputed from the lexical path.
        self.pop_value()?;
        let code = match self.pop_entry()? {
            StackEntry::Code(code) => code,
            other => return Err(self.unexpected("code object", &other)),
        };

        let closure = if inst.arg & MF_CLOSURE != 0 {
            match self.pop_entry()? {
                StackEntry::Cells(cells) => cells,
                StackEntry::Cell(cell) => vec![cell],
                other => return Err(self.unexpected("closure cell tuple", &other)),
            }
        } else {
            Vec::new()
        };
        let annotations = self.pop_flagged(inst.arg, MF_ANNOTATIONS)?;
        let kwdefaults = self.pop_flagged(inst.arg, MF_KWDEFAULTS)?;
        let defaults = self.pop_flagged(inst.arg, MF_DEFAULTS)?;

        let kind = match self.stack.peek(0) {
            Ok(StackEntry::BuildClass) => ProcKind::Class,
            _ => ProcKind::from_code_name(&code.name),
        };
        let qualname = self.qualname.child(code.name.clone());
        debug!("{}: hoisting {} as {:?}", self.qualname, qualname, kind);

        self.hoisted.push(Hoisted {
            qualname: qualname.clone(),
            kind,
            code,
        });
        self.emit_push(Expr::MakeFunction {
            qualname,
            defaults,
            kwdefaults,
            annotations,
            closure,
        })?;
        Ok(())
    }

    fn pop_flagged(&mut self, flags: u32, bit: u32) -> TranslateResult<Option<Operand>> {
        if flags & bit == 0 {
            return Ok(None);
        }
        self.pop_value().map(Some)
    }

    /// `LOAD_CLOSURE name` pushes a reference to the cell itself, resolved
    /// through this procedure's cell table.
    pub(crate) fn load_closure(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let cell = self.scoped_arg(inst)?;
        match cell.scope {
            Scope::Deref(_) => self.push(StackEntry::Cell(cell)),
            _ => Err(self.error(ErrorKind::UnresolvedCell { name: cell.name })),
        }
    }

    /// A cell marker consumed as an ordinary value.
    pub(crate) fn cell_value(&mut self, cell: ScopedName) -> Operand {
        self.emit(Expr::LoadClosure(cell)).into()
    }
}
