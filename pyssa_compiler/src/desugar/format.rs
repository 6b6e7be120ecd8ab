//! f-strings.
//!
//! Every replacement field becomes an optional conversion (`$FormatFn`)
//! followed by a `$Format` with its spec; the literal as a whole becomes one
//! `$Concat` over literal fragments and formatted fields.

use crate::error::TranslateResult;
use crate::ir::{Expr, FormatFn, Operand};
use crate::translator::ProcedureTranslator;
use pyssa_bytecode::Instruction;

const FVC_MASK: u32 = 0x03;
const FVC_STR: u32 = 0x01;
const FVC_REPR: u32 = 0x02;
const FVC_ASCII: u32 = 0x03;
const FVS_HAVE_SPEC: u32 = 0x04;

impl<'a> ProcedureTranslator<'a> {
    pub(crate) fn format_value(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let spec = if inst.arg & FVS_HAVE_SPEC != 0 {
            self.pop_value()?
        } else {
            Operand::none()
        };
        let mut value = self.pop_value()?;

        let conversion = match inst.arg & FVC_MASK {
            FVC_STR => Some(FormatFn::Str),
            FVC_REPR => Some(FormatFn::Repr),
            FVC_ASCII => Some(FormatFn::Ascii),
            _ => None,
        };
        if let Some(func) = conversion {
            value = self.emit(Expr::FormatFn { func, value }).into();
        }

        self.emit_push(Expr::Format { value, spec })?;
        Ok(())
    }

    pub(crate) fn build_string(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let parts = self.pop_values(inst.arg as usize)?;
        self.emit_push(Expr::Concat(parts))?;
        Ok(())
    }
}
