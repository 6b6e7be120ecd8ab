//! Jumps, branches, loops and procedure exits.
//!
//! Short-circuit booleans and conditional expressions need nothing beyond
//! these handlers: the `JUMP_IF_*_OR_POP` forms leave the surviving operand
//! on exactly one edge, and the join block receives it as a parameter.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{Expr, Instr, Terminator};
use crate::stack::StackEntry;
use crate::translator::{Flow, ProcedureTranslator};
use pyssa_bytecode::{Instruction, Opcode};

impl<'a> ProcedureTranslator<'a> {
    /// `JUMP_FORWARD` and `JUMP_ABSOLUTE`.
    pub(crate) fn jump(&mut self, inst: &Instruction) -> TranslateResult<Flow> {
        let target = self.target_arg(inst)?;
        let stack = self.stack.clone();
        let edge = self.edge(target, stack, None)?;
        Ok(Flow::Terminate(Terminator::Jump(edge)))
    }

    /// `POP_JUMP_IF_*` pop the condition on both edges; `JUMP_IF_*_OR_POP`
    /// keep it on the jumping edge only.
    pub(crate) fn cond_jump(&mut self, inst: &Instruction) -> TranslateResult<Flow> {
        let target = self.target_arg(inst)?;
        let next = inst.next_offset();
        let cond = self.pop_value()?;

        let popped = self.stack.clone();
        let mut kept = popped.clone();
        let limit = self.config.max_stack_depth;
        self.lift(kept.push(StackEntry::Value(cond.clone()), limit))?;

        let ((then_off, then_stack), (else_off, else_stack)) = match inst.opcode {
            Opcode::PopJumpIfFalse => ((next, popped.clone()), (target, popped)),
            Opcode::PopJumpIfTrue => ((target, popped.clone()), (next, popped)),
            Opcode::JumpIfFalseOrPop => ((next, popped), (target, kept)),
            _ => ((target, kept), (next, popped)),
        };

        let then = self.edge(then_off, then_stack, None)?;
        let otherwise = self.edge(else_off, else_stack, None)?;
        Ok(Flow::Terminate(Terminator::CondJump {
            cond,
            then,
            otherwise,
        }))
    }

    pub(crate) fn get_iter(&mut self) -> TranslateResult<()> {
        let iterable = self.pop_value()?;
        self.emit_push(Expr::GetIter(iterable))?;
        Ok(())
    }

    /// The loop header: advance, test, then either enter the body (which
    /// projects the element) or leave with the iterator popped.
    pub(crate) fn for_iter(&mut self, inst: &Instruction) -> TranslateResult<Flow> {
        let target = self.target_arg(inst)?;
        let iter = self.peek_value(0)?;
        let step = self.emit(Expr::NextIter(iter));
        let has_next = self.emit(Expr::HasNextIter(step.into()));

        let body_stack = self.stack.clone();
        let mut exit_stack = self.stack.clone();
        self.lift(exit_stack.pop())?;

        let then = self.edge(inst.next_offset(), body_stack, Some(step.into()))?;
        let otherwise = self.edge(target, exit_stack, None)?;
        Ok(Flow::Terminate(Terminator::CondJump {
            cond: has_next.into(),
            then,
            otherwise,
        }))
    }

    pub(crate) fn return_value(&mut self) -> TranslateResult<Flow> {
        let value = self.pop_value()?;
        Ok(Flow::Terminate(Terminator::Return(value)))
    }

    /// `raise exc` and `raise exc from cause`; a bare re-raise has no lowering.
    pub(crate) fn raise(&mut self, inst: &Instruction) -> TranslateResult<Flow> {
        let exc = match inst.arg {
            1 => self.pop_value()?,
            2 => {
                let cause = self.pop_value()?;
                let exc = self.pop_value()?;
                self.emit_effect(Instr::SetAttr {
                    object: exc.clone(),
                    name: "__cause__".into(),
                    value: cause,
                });
                exc
            }
            _ => return Err(self.error(ErrorKind::UnsupportedOpcode)),
        };
        Ok(Flow::Terminate(Terminator::Throw(exc)))
    }
}

