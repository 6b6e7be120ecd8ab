//! The builtin call targets and the IR forms that lower onto them.

use crate::error::ModelError;
use pyssa_bytecode::Constant;
use pyssa_compiler::ir::{Expr, GenKind, Scope, ScopedName};
use std::fmt;
use std::str::FromStr;

macro_rules! builtins {
    ($($variant:ident => $name:literal,)*) => {
        /// A call target with fixed dynamic meaning.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $($variant,)*
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $name,)*
                }
            }
        }

        impl FromStr for Builtin {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Builtin::$variant),)*
                    _ => Err(ModelError::UnknownBuiltin(s.to_string())),
                }
            }
        }
    };
}

builtins! {
    Call => "call",
    CallMethod => "call_method",
    BuildTuple => "build_tuple",
    ImportName => "import_name",
    ImportFrom => "import_from",
    LoadFast => "load_fast",
    LoadGlobal => "load_global",
    LoadName => "load_name",
    StoreFast => "store_fast",
    StoreGlobal => "store_global",
    StoreName => "store_name",
    MakeDictionary => "make_dictionary",
    MakeFunction => "make_function",
    MakeInt => "make_int",
    MakeNone => "make_none",
    NullifyLocals => "nullify_locals",
    Subscript => "subscript",
    GetAwaitable => "get_awaitable",
    GenStartCoroutine => "gen_start_coroutine",
    YieldFrom => "yield_from",
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Builtin {
    /// The target an expression lowers onto, if it has one. Forms without a
    /// target evaluate to a fresh unconstrained value.
    pub fn for_expr(expr: &Expr) -> Option<Builtin> {
        Some(match expr {
            Expr::Load(name) => match name.scope {
                Scope::TopLevel => Builtin::LoadName,
                Scope::Global => Builtin::LoadGlobal,
                Scope::Local => Builtin::LoadFast,
                Scope::Deref(_) => return None,
            },
            Expr::Call { .. } | Expr::CallEx { .. } | Expr::BuildClass(_) => Builtin::Call,
            Expr::CallMethod { .. } => Builtin::CallMethod,
            Expr::BuildTuple(_) | Expr::ListToTuple(_) => Builtin::BuildTuple,
            Expr::BuildMap(_) => Builtin::MakeDictionary,
            Expr::MakeFunction { .. } => Builtin::MakeFunction,
            Expr::ImportName { .. } => Builtin::ImportName,
            Expr::ImportFrom { .. } => Builtin::ImportFrom,
            Expr::Subscript { .. } => Builtin::Subscript,
            Expr::GetAwaitable(_) => Builtin::GetAwaitable,
            Expr::GenStart(GenKind::Coroutine) => Builtin::GenStartCoroutine,
            Expr::YieldFrom { .. } => Builtin::YieldFrom,
            _ => return None,
        })
    }

    pub fn for_store(target: &ScopedName) -> Option<Builtin> {
        match target.scope {
            Scope::TopLevel => Some(Builtin::StoreName),
            Scope::Global => Some(Builtin::StoreGlobal),
            Scope::Local => Some(Builtin::StoreFast),
            Scope::Deref(_) => None,
        }
    }

    /// Deleting a frame name unbinds that one name; module names have no target.
    pub fn for_delete(target: &ScopedName) -> Option<Builtin> {
        match target.scope {
            Scope::Local => Some(Builtin::NullifyLocals),
            _ => None,
        }
    }

    /// The constructor for a constant operand.
    pub fn for_constant(constant: &Constant) -> Option<Builtin> {
        match constant {
            Constant::Int(_) | Constant::Bool(_) => Some(Builtin::MakeInt),
            Constant::None => Some(Builtin::MakeNone),
            Constant::Tuple(_) => Some(Builtin::BuildTuple),
            Constant::Dict(_) => Some(Builtin::MakeDictionary),
            _ => None,
        }
    }
}
