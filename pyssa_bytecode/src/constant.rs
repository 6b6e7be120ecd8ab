//! Constant pool values.
//!
//! Besides what a CPython constant pool can hold, `List`, `Set` and `Dict`
//! appear when the translator folds a literal collection whose elements are
//! all statically known.

use crate::code_object::CodeObject;
use std::fmt;
use std::sync::Arc;

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Ellipsis,
    Tuple(Arc<[Constant]>),
    FrozenSet(Arc<[Constant]>),
    List(Arc<[Constant]>),
    Set(Arc<[Constant]>),
    /// Key/value pairs in insertion order.
    Dict(Arc<[(Constant, Constant)]>),
    /// A nested code object (function, lambda, comprehension or class body).
    Code(Arc<CodeObject>),
}

impl Constant {
    /// Build a string constant.
    #[inline]
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Constant::Str(s.into())
    }

    /// Build a tuple constant.
    pub fn tuple(items: impl IntoIterator<Item = Constant>) -> Self {
        Constant::Tuple(items.into_iter().collect())
    }

    /// Build a tuple of string constants, as used for keyword-name tuples.
    pub fn str_tuple<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> Self {
        Constant::Tuple(
            items
                .into_iter()
                .map(|s| Constant::Str(Arc::from(s.as_ref())))
                .collect(),
        )
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int(v) => Some(*v),
            Constant::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_code(&self) -> Option<&Arc<CodeObject>> {
        match self {
            Constant::Code(code) => Some(code),
            _ => None,
        }
    }

    /// The elements of a tuple or frozenset constant.
    pub fn as_sequence(&self) -> Option<&[Constant]> {
        match self {
            Constant::Tuple(items)
            | Constant::FrozenSet(items)
            | Constant::List(items)
            | Constant::Set(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Constant::None)
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Constant]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Renders the constant as a Python literal.
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("None"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Constant::Float(v) if v.is_nan() => f.write_str("nan"),
            Constant::Float(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "inf" } else { "-inf" })
            }
            Constant::Float(v) => write!(f, "{}", v),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Bytes(b) => {
                f.write_str("b\"")?;
                for byte in b.iter() {
                    write!(f, "{}", std::ascii::escape_default(*byte))?;
                }
                f.write_str("\"")
            }
            Constant::Ellipsis => f.write_str("..."),
            Constant::Tuple(items) => {
                f.write_str("(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Constant::List(items) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
            Constant::Set(items) if items.is_empty() => f.write_str("set()"),
            Constant::Set(items) => {
                f.write_str("{")?;
                write_seq(f, items)?;
                f.write_str("}")
            }
            Constant::FrozenSet(items) => {
                f.write_str("frozenset({")?;
                write_seq(f, items)?;
                f.write_str("})")
            }
            Constant::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Constant::Code(code) => write!(f, "<code {}>", code.name),
        }
    }
}
