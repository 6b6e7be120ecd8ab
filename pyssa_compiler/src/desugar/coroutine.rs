//! Generators, coroutines and `await`.
//!
//! `await x` is `GET_AWAITABLE` then `YIELD_FROM` fed with `None`; the wait
//! loop `YIELD_FROM` performs by re-executing itself is one `$YieldFrom`.
//! An async body otherwise has the same entry and exit shape as a plain one.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{Expr, GenKind};
use crate::translator::ProcedureTranslator;
use pyssa_bytecode::Instruction;

impl<'a> ProcedureTranslator<'a> {
    /// `GEN_START k` marks the start of a resumable body; nothing is popped.
    pub(crate) fn gen_start(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let kind = match inst.arg {
            0 => GenKind::Generator,
            1 => GenKind::Coroutine,
            2 => GenKind::AsyncGenerator,
            _ => return Err(self.error(ErrorKind::UnsupportedOpcode)),
        };
        self.emit(Expr::GenStart(kind));
        Ok(())
    }

    pub(crate) fn get_awaitable(&mut self) -> TranslateResult<()> {
        let value = self.pop_value()?;
        self.emit_push(Expr::GetAwaitable(value))?;
        Ok(())
    }

    pub(crate) fn get_yield_from_iter(&mut self) -> TranslateResult<()> {
        let value = self.pop_value()?;
        self.emit_push(Expr::GetYieldFromIter(value))?;
        Ok(())
    }

    /// Pops the sent value (TOS) and the delegate (TOS1).
    pub(crate) fn yield_from(&mut self) -> TranslateResult<()> {
        let value = self.pop_value()?;
        let iter = self.pop_value()?;
        self.emit_push(Expr::YieldFrom { iter, value })?;
        Ok(())
    }

    pub(crate) fn yield_value(&mut self) -> TranslateResult<()> {
        let value = self.pop_value()?;
        self.emit_push(Expr::Yield(value))?;
        Ok(())
    }
}
