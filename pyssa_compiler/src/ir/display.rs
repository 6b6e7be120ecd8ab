//! Textual snapshot format.
//!
//! ```text
//! module dummy:
//!
//!   function toplevel():
//!     b0:
//!       n0 <- TOPLEVEL[print]
//!       n1 <- $Call(n0, "hi")
//!       return None
//! ```

use super::{
    BinaryOp, Block, BlockId, CompareOp, Expr, FormatFn, GenKind, Instr, JumpTarget, Module,
    Operand, Procedure, QualName, ScopedName, Temp, Terminator, UnaryOp,
};
use std::fmt::{self, Display, Formatter};

/// Write `items` separated by `, `.
fn comma_list<T: Display>(f: &mut Formatter<'_>, items: impl IntoIterator<Item = T>) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Temp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(c) => write!(f, "{}", c),
            Operand::Temp(t) => write!(f, "{}", t),
        }
    }
}

impl Display for ScopedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.scope.label(), self.name)
    }
}

impl Display for QualName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str("toplevel");
        }
        f.write_str(&self.module)?;
        for part in &self.path {
            write!(f, ".{}", part)?;
        }
        Ok(())
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Positive => "Positive",
            UnaryOp::Negative => "Negative",
            UnaryOp::Not => "Not",
            UnaryOp::Invert => "Invert",
        })
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "Add",
            BinaryOp::Subtract => "Subtract",
            BinaryOp::Multiply => "Multiply",
            BinaryOp::MatrixMultiply => "MatrixMultiply",
            BinaryOp::TrueDivide => "TrueDivide",
            BinaryOp::FloorDivide => "FloorDivide",
            BinaryOp::Modulo => "Modulo",
            BinaryOp::Power => "Power",
            BinaryOp::LShift => "LShift",
            BinaryOp::RShift => "RShift",
            BinaryOp::And => "And",
            BinaryOp::Xor => "Xor",
            BinaryOp::Or => "Or",
        })
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Lt => "Lt",
            CompareOp::Le => "Le",
            CompareOp::Eq => "Eq",
            CompareOp::NotEq => "NotEq",
            CompareOp::Gt => "Gt",
            CompareOp::Ge => "Ge",
            CompareOp::In => "In",
            CompareOp::NotIn => "NotIn",
            CompareOp::Is => "Is",
            CompareOp::IsNot => "IsNot",
        })
    }
}

impl Display for FormatFn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormatFn::Str => "str",
            FormatFn::Repr => "repr",
            FormatFn::Ascii => "ascii",
        })
    }
}

impl Display for GenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenKind::Generator => "Generator",
            GenKind::Coroutine => "Coroutine",
            GenKind::AsyncGenerator => "AsyncGenerator",
        })
    }
}

/// `$Name(args)`.
fn call_form<'a>(
    f: &mut Formatter<'_>,
    name: &str,
    args: impl IntoIterator<Item = &'a Operand>,
) -> fmt::Result {
    write!(f, "${}(", name)?;
    comma_list(f, args)?;
    f.write_str(")")
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Load(name) => write!(f, "{}", name),
            Expr::LoadClosure(cell) => write!(f, "$LoadClosure[{}]", cell.name),
            Expr::Call { .. } => call_form(f, "Call", self.operands()),
            Expr::CallEx { .. } => call_form(f, "CallEx", self.operands()),
            Expr::CallMethod {
                receiver,
                name,
                args,
            } => {
                write!(f, "$CallMethod[{}](", name)?;
                comma_list(f, std::iter::once(receiver).chain(args))?;
                f.write_str(")")
            }
            Expr::MakeFunction {
                qualname,
                defaults,
                kwdefaults,
                annotations,
                closure,
            } => {
                write!(f, "$MakeFunction[{}](", qualname)?;
                let mut fields: Vec<String> = Vec::new();
                if let Some(d) = defaults {
                    fields.push(format!("defaults={}", d));
                }
                if let Some(k) = kwdefaults {
                    fields.push(format!("kwdefaults={}", k));
                }
                if let Some(a) = annotations {
                    fields.push(format!("annotations={}", a));
                }
                if !closure.is_empty() {
                    let cells: Vec<String> = closure.iter().map(ToString::to_string).collect();
                    fields.push(format!("closure=[{}]", cells.join(", ")));
                }
                comma_list(f, fields)?;
                f.write_str(")")
            }
            Expr::BuildClass(args) => call_form(f, "BuildClass", args),
            Expr::Unary { op, operand } => write!(f, "$Unary.{}({})", op, operand),
            Expr::Binary {
                op,
                lhs,
                rhs,
                inplace,
            } => {
                let family = if *inplace { "Inplace" } else { "Binary" };
                write!(f, "${}.{}({}, {})", family, op, lhs, rhs)
            }
            Expr::Compare { op, lhs, rhs } => write!(f, "$Compare.{}({}, {})", op, lhs, rhs),
            Expr::BuildTuple(args) => call_form(f, "BuildTuple", args),
            Expr::BuildList(args) => call_form(f, "BuildList", args),
            Expr::BuildSet(args) => call_form(f, "BuildSet", args),
            Expr::BuildMap(_) => call_form(f, "BuildMap", self.operands()),
            Expr::BuildSlice(args) => call_form(f, "BuildSlice", args),
            Expr::ListToTuple(_) => call_form(f, "ListToTuple", self.operands()),
            Expr::ListAppend { .. } => call_form(f, "ListAppend", self.operands()),
            Expr::ListExtend { .. } => call_form(f, "ListExtend", self.operands()),
            Expr::SetAdd { .. } => call_form(f, "SetAdd", self.operands()),
            Expr::SetUpdate { .. } => call_form(f, "SetUpdate", self.operands()),
            Expr::DictSetItem { .. } => call_form(f, "DictSetItem", self.operands()),
            Expr::DictUpdate { .. } => call_form(f, "DictUpdate", self.operands()),
            Expr::GetIter(_) => call_form(f, "GetIter", self.operands()),
            Expr::NextIter(_) => call_form(f, "NextIter", self.operands()),
            Expr::HasNextIter(_) => call_form(f, "HasNextIter", self.operands()),
            Expr::IterData(_) => call_form(f, "IterData", self.operands()),
            Expr::GetAwaitable(_) => call_form(f, "GetAwaitable", self.operands()),
            Expr::GetYieldFromIter(_) => call_form(f, "GetYieldFromIter", self.operands()),
            Expr::YieldFrom { .. } => call_form(f, "YieldFrom", self.operands()),
            Expr::Yield(_) => call_form(f, "Yield", self.operands()),
            Expr::GenStart(kind) => write!(f, "$GenStart{}()", kind),
            Expr::FormatFn { func, value } => write!(f, "$FormatFn.{}({})", func, value),
            Expr::Format { .. } => call_form(f, "Format", self.operands()),
            Expr::Concat(args) => call_form(f, "Concat", args),
            Expr::Subscript { .. } => call_form(f, "Subscript", self.operands()),
            Expr::GetAttr { value, name } => write!(f, "$GetAttr[{}]({})", name, value),
            Expr::ImportName {
                name,
                fromlist,
                level,
            } => write!(f, "$ImportName[{}]({}, {})", name, fromlist, level),
            Expr::ImportFrom { name, module } => write!(f, "$ImportFrom[{}]({})", name, module),
        }
    }
}

impl Display for Instr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Let { lhs, rhs } => write!(f, "{} <- {}", lhs, rhs),
            Instr::Store { target, value } => write!(f, "{} <- {}", target, value),
            Instr::SetAttr {
                object,
                name,
                value,
            } => write!(f, "$SetAttr[{}]({}, {})", name, object, value),
            Instr::SetItem {
                container,
                index,
                value,
            } => write!(f, "$SetItem({}, {}, {})", container, index, value),
            Instr::Delete { target } => write!(f, "$Delete({})", target),
        }
    }
}

impl Display for JumpTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            comma_list(f, &self.args)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(target) => write!(f, "jmp {}", target),
            Terminator::CondJump {
                cond,
                then,
                otherwise,
            } => write!(f, "if {} then jmp {} else jmp {}", cond, then, otherwise),
            Terminator::Return(value) => write!(f, "return {}", value),
            Terminator::Throw(value) => write!(f, "throw {}", value),
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.params.is_empty() {
            f.write_str("(")?;
            comma_list(f, &self.params)?;
            f.write_str(")")?;
        }
        f.write_str(":\n")?;
        for instr in &self.instrs {
            writeln!(f, "  {}", instr)?;
        }
        writeln!(f, "  {}", self.terminator)
    }
}

/// Write `text` with every non-empty line indented by `indent` spaces.
fn write_indented(f: &mut Formatter<'_>, text: &str, indent: usize) -> fmt::Result {
    for line in text.lines() {
        if line.is_empty() {
            f.write_str("\n")?;
        } else {
            writeln!(f, "{:indent$}{}", "", line, indent = indent)?;
        }
    }
    Ok(())
}

impl Display for Procedure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.qualname)?;
        comma_list(f, &self.params)?;
        f.write_str("):\n")?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write_indented(f, &block.to_string(), 2)?;
        }
        Ok(())
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}:", self.name)?;
        for procedure in &self.procedures {
            f.write_str("\n")?;
            write_indented(f, &procedure.to_string(), 2)?;
        }
        Ok(())
    }
}
