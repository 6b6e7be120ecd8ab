//! Constants, scoped names, attributes and imports.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{Expr, Instr, Operand};
use crate::stack::StackEntry;
use crate::translator::ProcedureTranslator;
use pyssa_bytecode::{Constant, Instruction};

impl<'a> ProcedureTranslator<'a> {
    /// Constants travel on the stack; nested code objects become markers.
    pub(crate) fn load_const(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let constant = inst.constant().cloned().ok_or_else(|| {
            self.error(ErrorKind::MissingArgument {
                expected: "constant",
            })
        })?;
        match constant {
            Constant::Code(code) => self.push(StackEntry::Code(code)),
            other => self.push_value(Operand::Const(other)),
        }
    }

    pub(crate) fn load_scoped(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let name = self.scoped_arg(inst)?;
        self.emit_push(Expr::Load(name))?;
        Ok(())
    }

    pub(crate) fn store_scoped(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let target = self.scoped_arg(inst)?;
        let value = self.pop_value()?;
        self.emit_effect(Instr::Store { target, value });
        Ok(())
    }

    pub(crate) fn delete_scoped(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let target = self.scoped_arg(inst)?;
        self.emit_effect(Instr::Delete { target });
        Ok(())
    }

    pub(crate) fn load_attr(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let name = self.name_arg(inst)?;
        let value = self.pop_value()?;
        self.emit_push(Expr::GetAttr { value, name })?;
        Ok(())
    }

    /// `TOS.name = TOS1`.
    pub(crate) fn store_attr(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let name = self.name_arg(inst)?;
        let object = self.pop_value()?;
        let value = self.pop_value()?;
        self.emit_effect(Instr::SetAttr {
            object,
            name,
            value,
        });
        Ok(())
    }

    /// `TOS1[TOS] = TOS2`.
    pub(crate) fn store_subscr(&mut self) -> TranslateResult<()> {
        let index = self.pop_value()?;
        let container = self.pop_value()?;
        let value = self.pop_value()?;
        self.emit_effect(Instr::SetItem {
            container,
            index,
            value,
        });
        Ok(())
    }

    /// Pops the fromlist (TOS) and level (TOS1).
    pub(crate) fn import_name(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let name = self.name_arg(inst)?;
        let fromlist = self.pop_value()?;
        let level = self.pop_value()?;
        self.emit_push(Expr::ImportName {
            name,
            fromlist,
            level,
        })?;
        Ok(())
    }

    /// The module stays on the stack beneath the imported attribute.
    pub(crate) fn import_from(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let name = self.name_arg(inst)?;
        let module = self.peek_value(0)?;
        self.emit_push(Expr::ImportFrom { name, module })?;
        Ok(())
    }
}
