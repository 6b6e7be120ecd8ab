//! Calls, method calls and keyword calls.
//!
//! A keyword call keeps call-site order: positional values, then keyword
//! values, then one constant tuple of keyword names. Values and names are
//! joined only by position.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{Expr, Operand};
use crate::stack::StackEntry;
use crate::translator::ProcedureTranslator;
use pyssa_bytecode::{Constant, Instruction};

impl<'a> ProcedureTranslator<'a> {
    pub(crate) fn call_function(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let args = self.pop_values(inst.arg as usize)?;
        let callee = self.pop_entry()?;
        let expr = self.call_expr(callee, args)?;
        self.emit_push(expr)?;
        Ok(())
    }

    pub(crate) fn call_function_kw(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let names = self.pop_value()?;
        if !matches!(names, Operand::Const(Constant::Tuple(_))) {
            return Err(self.error(ErrorKind::UnexpectedStackEntry {
                expected: "constant keyword names",
                found: "value",
            }));
        }
        let mut args = self.pop_values(inst.arg as usize)?;
        args.push(names);
        let callee = self.pop_entry()?;
        let expr = self.call_expr(callee, args)?;
        self.emit_push(expr)?;
        Ok(())
    }

    /// `f(*args)` and `f(*args, **kwargs)`.
    pub(crate) fn call_function_ex(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let kwargs = if inst.arg & 0x01 != 0 {
            Some(self.pop_value()?)
        } else {
            None
        };
        let args = self.pop_value()?;
        let func = self.pop_value()?;
        self.emit_push(Expr::CallEx { func, args, kwargs })?;
        Ok(())
    }

    pub(crate) fn load_method(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let name = self.name_arg(inst)?;
        let receiver = self.pop_value()?;
        self.push(StackEntry::Method { receiver, name })
    }

    pub(crate) fn call_method(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let args = self.pop_values(inst.arg as usize)?;
        match self.pop_entry()? {
            StackEntry::Method { receiver, name } => {
                self.emit_push(Expr::CallMethod {
                    receiver,
                    name,
                    args,
                })?;
                Ok(())
            }
            other => Err(self.unexpected("method", &other)),
        }
    }

    /// The call a callee entry turns into. The with-exit marker is only ever
    /// called by the compiler's exit sequence, the class builder only by a
    /// class statement.
    fn call_expr(&self, callee: StackEntry, args: Vec<Operand>) -> TranslateResult<Expr> {
        Ok(match callee {
            StackEntry::Value(func) => Expr::Call { func, args },
            StackEntry::WithExit { manager, is_async } => Expr::CallMethod {
                receiver: manager,
                name: exit_method(is_async).into(),
                args,
            },
            StackEntry::BuildClass => Expr::BuildClass(args),
            other => return Err(self.unexpected("callable", &other)),
        })
    }
}

pub(crate) fn enter_method(is_async: bool) -> &'static str {
    if is_async {
        "__aenter__"
    } else {
        "__enter__"
    }
}

pub(crate) fn exit_method(is_async: bool) -> &'static str {
    if is_async {
        "__aexit__"
    } else {
        "__exit__"
    }
}
