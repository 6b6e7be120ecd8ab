//! Code object representation for one procedure body.
//!
//! A `CodeObject` carries the decoded instruction stream of a module body,
//! function, lambda, comprehension or class body, plus the name tables the
//! translator needs to classify scopes. Nested bodies appear in the constant
//! pool as [`Constant::Code`].

use crate::constant::Constant;
use crate::instruction::Instruction;
use std::fmt::{self, Write};
use std::sync::Arc;

/// A decoded code object.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeObject {
    /// Local name (`<module>`, `f`, `<lambda>`, `<listcomp>`, a class name, ...).
    pub name: Arc<str>,

    /// Filename where this code was defined.
    pub filename: Arc<str>,

    /// First line number in source.
    pub first_lineno: u32,

    /// Number of positional parameters (including positional-only).
    pub arg_count: u32,

    /// Number of positional-only parameters.
    pub posonly_arg_count: u32,

    /// Number of keyword-only parameters.
    pub kwonly_arg_count: u32,

    /// Local variable names, parameters first.
    pub varnames: Vec<Arc<str>>,

    /// Global, attribute and import names.
    pub names: Vec<Arc<str>>,

    /// Variables of this body captured by nested bodies.
    pub cellvars: Vec<Arc<str>>,

    /// Variables captured from enclosing bodies.
    pub freevars: Vec<Arc<str>>,

    pub flags: CodeFlags,

    /// Constant pool.
    pub constants: Vec<Constant>,

    /// Instructions in offset order.
    pub instructions: Vec<Instruction>,
}

/// Code object flags, using CPython's bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CodeFlags(u32);

impl CodeFlags {
    pub const NONE: CodeFlags = CodeFlags(0);
    pub const OPTIMIZED: CodeFlags = CodeFlags(0x0001);
    pub const NEWLOCALS: CodeFlags = CodeFlags(0x0002);
    pub const VARARGS: CodeFlags = CodeFlags(0x0004);
    pub const VARKEYWORDS: CodeFlags = CodeFlags(0x0008);
    pub const NESTED: CodeFlags = CodeFlags(0x0010);
    pub const GENERATOR: CodeFlags = CodeFlags(0x0020);
    pub const COROUTINE: CodeFlags = CodeFlags(0x0080);
    pub const ASYNC_GENERATOR: CodeFlags = CodeFlags(0x0200);

    /// Build flags from raw CPython bits.
    #[inline]
    pub const fn from_bits(bits: u32) -> CodeFlags {
        CodeFlags(bits)
    }

    #[inline]
    pub const fn contains(self, other: CodeFlags) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn union(self, other: CodeFlags) -> CodeFlags {
        CodeFlags(self.0 | other.0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for CodeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for CodeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl CodeObject {
    /// Create an empty code object.
    pub fn new(name: impl Into<Arc<str>>, filename: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            first_lineno: 1,
            arg_count: 0,
            posonly_arg_count: 0,
            kwonly_arg_count: 0,
            varnames: Vec::new(),
            names: Vec::new(),
            cellvars: Vec::new(),
            freevars: Vec::new(),
            flags: CodeFlags::NONE,
            constants: Vec::new(),
            instructions: Vec::new(),
        }
    }

    #[inline]
    pub fn is_generator(&self) -> bool {
        self.flags.contains(CodeFlags::GENERATOR)
    }

    #[inline]
    pub fn is_coroutine(&self) -> bool {
        self.flags.contains(CodeFlags::COROUTINE)
    }

    #[inline]
    pub fn is_async_generator(&self) -> bool {
        self.flags.contains(CodeFlags::ASYNC_GENERATOR)
    }

    /// Number of named parameters, counting `*args` and `**kwargs`.
    pub fn total_params(&self) -> usize {
        let mut n = (self.arg_count + self.kwonly_arg_count) as usize;
        if self.flags.contains(CodeFlags::VARARGS) {
            n += 1;
        }
        if self.flags.contains(CodeFlags::VARKEYWORDS) {
            n += 1;
        }
        n
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> &[Arc<str>] {
        let n = self.total_params().min(self.varnames.len());
        &self.varnames[..n]
    }

    /// Nested code objects in constant-pool order.
    pub fn nested(&self) -> impl Iterator<Item = &Arc<CodeObject>> {
        self.constants.iter().filter_map(Constant::as_code)
    }

    /// Index of the instruction at `offset`, if one starts there.
    pub fn index_of(&self, offset: u32) -> Option<usize> {
        self.instructions
            .binary_search_by_key(&offset, |inst| inst.offset)
            .ok()
    }
}

/// Disassemble a code object to a string.
pub fn disassemble(code: &CodeObject) -> String {
    let mut output = String::new();
    // Writing to a String cannot fail.
    let _ = write_disassembly(&mut output, code);
    output
}

fn write_disassembly(out: &mut String, code: &CodeObject) -> fmt::Result {
    writeln!(out, "Code object: {}", code.name)?;
    writeln!(out, "  File: {}", code.filename)?;
    writeln!(out, "  First line: {}", code.first_lineno)?;
    writeln!(
        out,
        "  Args: {} (pos-only: {}, kw-only: {})",
        code.arg_count, code.posonly_arg_count, code.kwonly_arg_count
    )?;
    writeln!(out, "  Flags: {:08x}", code.flags.bits())?;

    let tables: [(&str, &[Arc<str>]); 4] = [
        ("Names", code.names.as_slice()),
        ("Varnames", code.varnames.as_slice()),
        ("Cellvars", code.cellvars.as_slice()),
        ("Freevars", code.freevars.as_slice()),
    ];
    for (title, table) in tables {
        if !table.is_empty() {
            writeln!(out, "\n{}:", title)?;
            for (i, n) in table.iter().enumerate() {
                writeln!(out, "  {:4}: {}", i, n)?;
            }
        }
    }

    if !code.constants.is_empty() {
        writeln!(out, "\nConstants:")?;
        for (i, c) in code.constants.iter().enumerate() {
            writeln!(out, "  {:4}: {}", i, c)?;
        }
    }

    writeln!(out, "\nDisassembly:")?;
    for inst in &code.instructions {
        writeln!(out, "  {}", inst)?;
    }
    Ok(())
}
