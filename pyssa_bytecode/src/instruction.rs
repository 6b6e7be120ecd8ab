//! Pre-decoded instructions.

use crate::constant::Constant;
use crate::opcode::Opcode;
use std::fmt;
use std::sync::Arc;

/// The resolved argument of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    None,
    /// An identifier for name, attribute, method and import operations.
    Name(Arc<str>),
    /// The constant loaded by `LOAD_CONST`.
    Const(Constant),
    /// An absolute byte offset for jumps and `SETUP_*`.
    Target(u32),
}

/// One wordcode instruction with its argument already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset (two bytes per instruction).
    pub offset: u32,
    pub opcode: Opcode,
    /// The raw oparg; carries counts and flags.
    pub arg: u32,
    pub argval: ArgValue,
}

impl Instruction {
    /// Create an instruction without a resolved argument.
    pub fn new(offset: u32, opcode: Opcode, arg: u32) -> Self {
        Self {
            offset,
            opcode,
            arg,
            argval: ArgValue::None,
        }
    }

    /// Offset of the next instruction in the stream.
    #[inline]
    pub fn next_offset(&self) -> u32 {
        self.offset + 2
    }

    #[inline]
    pub fn target(&self) -> Option<u32> {
        match self.argval {
            ArgValue::Target(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&Arc<str>> {
        match &self.argval {
            ArgValue::Name(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn constant(&self) -> Option<&Constant> {
        match &self.argval {
            ArgValue::Const(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4} {:<22}", self.offset, self.opcode.name())?;
        match &self.argval {
            ArgValue::None => write!(f, "{}", self.arg),
            ArgValue::Name(n) => write!(f, "{} ({})", self.arg, n),
            ArgValue::Const(c) => write!(f, "{} ({})", self.arg, c),
            ArgValue::Target(t) => write!(f, "{} (to {})", self.arg, t),
        }
    }
}
