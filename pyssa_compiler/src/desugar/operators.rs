//! Unary, binary and comparison operators, subscripts and slices.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{BinaryOp, CompareOp, Expr, UnaryOp};
use crate::translator::ProcedureTranslator;
use pyssa_bytecode::{Instruction, Opcode};

impl<'a> ProcedureTranslator<'a> {
    pub(crate) fn unary(&mut self, op: UnaryOp) -> TranslateResult<()> {
        let operand = self.pop_value()?;
        self.emit_push(Expr::Unary { op, operand })?;
        Ok(())
    }

    pub(crate) fn binary(&mut self, op: BinaryOp, inplace: bool) -> TranslateResult<()> {
        let rhs = self.pop_value()?;
        let lhs = self.pop_value()?;
        self.emit_push(Expr::Binary {
            op,
            lhs,
            rhs,
            inplace,
        })?;
        Ok(())
    }

    pub(crate) fn subscript(&mut self) -> TranslateResult<()> {
        let index = self.pop_value()?;
        let value = self.pop_value()?;
        self.emit_push(Expr::Subscript { value, index })?;
        Ok(())
    }

    pub(crate) fn compare(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let op = CompareOp::from_arg(inst.arg).ok_or_else(|| self.error(ErrorKind::UnsupportedOpcode))?;
        self.emit_compare(op)
    }

    /// `IS_OP` and `CONTAINS_OP`; an oparg of 1 inverts the test.
    pub(crate) fn identity_or_membership(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let invert = inst.arg == 1;
        let op = match (inst.opcode, invert) {
            (Opcode::IsOp, false) => CompareOp::Is,
            (Opcode::IsOp, true) => CompareOp::IsNot,
            (_, false) => CompareOp::In,
            (_, true) => CompareOp::NotIn,
        };
        self.emit_compare(op)
    }

    fn emit_compare(&mut self, op: CompareOp) -> TranslateResult<()> {
        let rhs = self.pop_value()?;
        let lhs = self.pop_value()?;
        self.emit_push(Expr::Compare { op, lhs, rhs })?;
        Ok(())
    }

    pub(crate) fn build_slice(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let parts = self.pop_values(inst.arg as usize)?;
        self.emit_push(Expr::BuildSlice(parts))?;
        Ok(())
    }
}
