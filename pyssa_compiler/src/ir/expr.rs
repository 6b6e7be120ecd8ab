//! Expressions assigned to temporaries.

use super::{Operand, QualName, ScopedName};
use std::sync::Arc;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
    Invert,
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    MatrixMultiply,
    TrueDivide,
    FloorDivide,
    Modulo,
    Power,
    LShift,
    RShift,
    And,
    Xor,
    Or,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    NotEq,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    /// Decode the `COMPARE_OP` oparg.
    pub fn from_arg(arg: u32) -> Option<CompareOp> {
        Some(match arg {
            0 => CompareOp::Lt,
            1 => CompareOp::Le,
            2 => CompareOp::Eq,
            3 => CompareOp::NotEq,
            4 => CompareOp::Gt,
            5 => CompareOp::Ge,
            _ => return None,
        })
    }
}

/// Conversion applied to an f-string replacement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFn {
    Str,
    Repr,
    Ascii,
}

/// The flavour of a resumable body, from `GEN_START`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenKind {
    Generator,
    Coroutine,
    AsyncGenerator,
}

/// The right-hand side of a `Let`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Load(ScopedName),
    /// A raw closure cell escaping into a value position.
    LoadClosure(ScopedName),

    Call {
        func: Operand,
        args: Vec<Operand>,
    },
    CallEx {
        func: Operand,
        args: Operand,
        kwargs: Option<Operand>,
    },
    CallMethod {
        receiver: Operand,
        name: Arc<str>,
        args: Vec<Operand>,
    },
    MakeFunction {
        qualname: QualName,
        defaults: Option<Operand>,
        kwdefaults: Option<Operand>,
        annotations: Option<Operand>,
        closure: Vec<ScopedName>,
    },
    /// Class construction: body function, name, then bases and keywords.
    BuildClass(Vec<Operand>),

    Unary {
        op: UnaryOp,
        operand: Operand,
    },
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
        inplace: bool,
    },
    Compare {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    },

    BuildTuple(Vec<Operand>),
    BuildList(Vec<Operand>),
    BuildSet(Vec<Operand>),
    BuildMap(Vec<(Operand, Operand)>),
    BuildSlice(Vec<Operand>),
    ListToTuple(Operand),
    ListAppend {
        list: Operand,
        value: Operand,
    },
    ListExtend {
        list: Operand,
        iterable: Operand,
    },
    SetAdd {
        set: Operand,
        value: Operand,
    },
    SetUpdate {
        set: Operand,
        iterable: Operand,
    },
    DictSetItem {
        dict: Operand,
        key: Operand,
        value: Operand,
    },
    DictUpdate {
        dict: Operand,
        other: Operand,
    },

    GetIter(Operand),
    NextIter(Operand),
    HasNextIter(Operand),
    IterData(Operand),

    GetAwaitable(Operand),
    GetYieldFromIter(Operand),
    YieldFrom {
        iter: Operand,
        value: Operand,
    },
    Yield(Operand),
    GenStart(GenKind),

    FormatFn {
        func: FormatFn,
        value: Operand,
    },
    Format {
        value: Operand,
        spec: Operand,
    },
    Concat(Vec<Operand>),

    Subscript {
        value: Operand,
        index: Operand,
    },
    GetAttr {
        value: Operand,
        name: Arc<str>,
    },

    ImportName {
        name: Arc<str>,
        fromlist: Operand,
        level: Operand,
    },
    ImportFrom {
        name: Arc<str>,
        module: Operand,
    },
}

impl Expr {
    /// Every operand this expression reads, in rendering order.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Expr::Load(_) | Expr::LoadClosure(_) | Expr::GenStart(_) => Vec::new(),
            Expr::Call { func, args } => std::iter::once(func).chain(args).collect(),
            Expr::CallEx { func, args, kwargs } => {
                std::iter::once(func).chain(Some(args)).chain(kwargs).collect()
            }
            Expr::CallMethod { receiver, args, .. } => {
                std::iter::once(receiver).chain(args).collect()
            }
            Expr::MakeFunction {
                defaults,
                kwdefaults,
                annotations,
                ..
            } => defaults
                .iter()
                .chain(kwdefaults)
                .chain(annotations)
                .collect(),
            Expr::BuildClass(args)
            | Expr::BuildTuple(args)
            | Expr::BuildList(args)
            | Expr::BuildSet(args)
            | Expr::BuildSlice(args)
            | Expr::Concat(args) => args.iter().collect(),
            Expr::BuildMap(pairs) => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
            Expr::Unary { operand, .. } => vec![operand],
            Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::ListToTuple(v)
            | Expr::GetIter(v)
            | Expr::NextIter(v)
            | Expr::HasNextIter(v)
            | Expr::IterData(v)
            | Expr::GetAwaitable(v)
            | Expr::GetYieldFromIter(v)
            | Expr::Yield(v) => vec![v],
            Expr::ListAppend { list, value } => vec![list, value],
            Expr::ListExtend { list, iterable } => vec![list, iterable],
            Expr::SetAdd { set, value } => vec![set, value],
            Expr::SetUpdate { set, iterable } => vec![set, iterable],
            Expr::DictSetItem { dict, key, value } => vec![dict, key, value],
            Expr::DictUpdate { dict, other } => vec![dict, other],
            Expr::YieldFrom { iter, value } => vec![iter, value],
            Expr::FormatFn { value, .. } => vec![value],
            Expr::Format { value, spec } => vec![value, spec],
            Expr::Subscript { value, index } => vec![value, index],
            Expr::GetAttr { value, .. } => vec![value],
            Expr::ImportName {
                fromlist, level, ..
            } => vec![fromlist, level],
            Expr::ImportFrom { module, .. } => vec![module],
        }
    }
}
