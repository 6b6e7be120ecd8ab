//! `with` and `async with`.
//!
//! Entering a manager emits its enter call and leaves an exit marker below
//! the entered value. The bytecode repeats the exit sequence on every edge
//! leaving the protected region (fallthrough, `break`, `continue`, `return`),
//! so each of those paths calls the marker once per manager, innermost
//! first. Exception edges are not modelled.

use super::calls::enter_method;
use crate::error::TranslateResult;
use crate::ir::Expr;
use crate::stack::StackEntry;
use crate::translator::ProcedureTranslator;

impl<'a> ProcedureTranslator<'a> {
    /// `SETUP_WITH` and `BEFORE_ASYNC_WITH`.
    pub(crate) fn enter_context(&mut self, is_async: bool) -> TranslateResult<()> {
        let manager = self.pop_value()?;
        let entered = self.emit(Expr::CallMethod {
            receiver: manager.clone(),
            name: enter_method(is_async).into(),
            args: Vec::new(),
        });
        self.push(StackEntry::WithExit { manager, is_async })?;
        self.push_value(entered)
    }
}
