//! CPython 3.9/3.10 wordcode operations.
//!
//! Only the operations the translator understands are listed. The external
//! disassembler maps anything else to [`Opcode::Unknown`] so the translator
//! can report it with its offset instead of the adapter failing early.

use std::fmt;

/// Declares the opcode enum together with its CPython mnemonic table.
macro_rules! opcodes {
    ($($variant:ident => $name:literal,)*) => {
        /// A decoded bytecode operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
            /// An operation the disassembler could not map.
            Unknown(u8),
        }

        impl Opcode {
            /// The CPython mnemonic, e.g. `LOAD_FAST`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                    Opcode::Unknown(_) => "<unknown>",
                }
            }

            /// Look an opcode up by its CPython mnemonic.
            pub fn from_name(name: &str) -> Option<Opcode> {
                match name {
                    $($name => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    // Stack manipulation
    Nop => "NOP",
    PopTop => "POP_TOP",
    RotTwo => "ROT_TWO",
    RotThree => "ROT_THREE",
    RotFour => "ROT_FOUR",
    DupTop => "DUP_TOP",
    DupTopTwo => "DUP_TOP_TWO",

    // Unary operators
    UnaryPositive => "UNARY_POSITIVE",
    UnaryNegative => "UNARY_NEGATIVE",
    UnaryNot => "UNARY_NOT",
    UnaryInvert => "UNARY_INVERT",

    // Binary operators
    BinaryPower => "BINARY_POWER",
    BinaryMultiply => "BINARY_MULTIPLY",
    BinaryMatrixMultiply => "BINARY_MATRIX_MULTIPLY",
    BinaryFloorDivide => "BINARY_FLOOR_DIVIDE",
    BinaryTrueDivide => "BINARY_TRUE_DIVIDE",
    BinaryModulo => "BINARY_MODULO",
    BinaryAdd => "BINARY_ADD",
    BinarySubtract => "BINARY_SUBTRACT",
    BinaryLshift => "BINARY_LSHIFT",
    BinaryRshift => "BINARY_RSHIFT",
    BinaryAnd => "BINARY_AND",
    BinaryXor => "BINARY_XOR",
    BinaryOr => "BINARY_OR",
    BinarySubscr => "BINARY_SUBSCR",

    // In-place operators
    InplacePower => "INPLACE_POWER",
    InplaceMultiply => "INPLACE_MULTIPLY",
    InplaceMatrixMultiply => "INPLACE_MATRIX_MULTIPLY",
    InplaceFloorDivide => "INPLACE_FLOOR_DIVIDE",
    InplaceTrueDivide => "INPLACE_TRUE_DIVIDE",
    InplaceModulo => "INPLACE_MODULO",
    InplaceAdd => "INPLACE_ADD",
    InplaceSubtract => "INPLACE_SUBTRACT",
    InplaceLshift => "INPLACE_LSHIFT",
    InplaceRshift => "INPLACE_RSHIFT",
    InplaceAnd => "INPLACE_AND",
    InplaceXor => "INPLACE_XOR",
    InplaceOr => "INPLACE_OR",

    // Comparisons
    CompareOp => "COMPARE_OP",
    IsOp => "IS_OP",
    ContainsOp => "CONTAINS_OP",

    // Name access
    LoadConst => "LOAD_CONST",
    LoadName => "LOAD_NAME",
    StoreName => "STORE_NAME",
    DeleteName => "DELETE_NAME",
    LoadGlobal => "LOAD_GLOBAL",
    StoreGlobal => "STORE_GLOBAL",
    DeleteGlobal => "DELETE_GLOBAL",
    LoadFast => "LOAD_FAST",
    StoreFast => "STORE_FAST",
    DeleteFast => "DELETE_FAST",
    LoadDeref => "LOAD_DEREF",
    StoreDeref => "STORE_DEREF",
    LoadClassDeref => "LOAD_CLASSDEREF",
    LoadClosure => "LOAD_CLOSURE",

    // Attributes and subscripts
    LoadAttr => "LOAD_ATTR",
    StoreAttr => "STORE_ATTR",
    StoreSubscr => "STORE_SUBSCR",
    BuildSlice => "BUILD_SLICE",

    // Calls
    CallFunction => "CALL_FUNCTION",
    CallFunctionKw => "CALL_FUNCTION_KW",
    CallFunctionEx => "CALL_FUNCTION_EX",
    LoadMethod => "LOAD_METHOD",
    CallMethod => "CALL_METHOD",

    // Collections
    BuildTuple => "BUILD_TUPLE",
    BuildList => "BUILD_LIST",
    BuildSet => "BUILD_SET",
    BuildMap => "BUILD_MAP",
    BuildConstKeyMap => "BUILD_CONST_KEY_MAP",
    ListAppend => "LIST_APPEND",
    SetAdd => "SET_ADD",
    MapAdd => "MAP_ADD",
    ListExtend => "LIST_EXTEND",
    SetUpdate => "SET_UPDATE",
    DictUpdate => "DICT_UPDATE",
    DictMerge => "DICT_MERGE",
    ListToTuple => "LIST_TO_TUPLE",
    UnpackSequence => "UNPACK_SEQUENCE",

    // Strings
    FormatValue => "FORMAT_VALUE",
    BuildString => "BUILD_STRING",

    // Control flow
    JumpForward => "JUMP_FORWARD",
    JumpAbsolute => "JUMP_ABSOLUTE",
    PopJumpIfFalse => "POP_JUMP_IF_FALSE",
    PopJumpIfTrue => "POP_JUMP_IF_TRUE",
    JumpIfFalseOrPop => "JUMP_IF_FALSE_OR_POP",
    JumpIfTrueOrPop => "JUMP_IF_TRUE_OR_POP",
    JumpIfNotExcMatch => "JUMP_IF_NOT_EXC_MATCH",
    GetIter => "GET_ITER",
    ForIter => "FOR_ITER",
    ReturnValue => "RETURN_VALUE",
    RaiseVarargs => "RAISE_VARARGS",
    Reraise => "RERAISE",

    // Definitions and imports
    MakeFunction => "MAKE_FUNCTION",
    LoadBuildClass => "LOAD_BUILD_CLASS",
    ImportName => "IMPORT_NAME",
    ImportFrom => "IMPORT_FROM",

    // Blocks and context managers
    SetupFinally => "SETUP_FINALLY",
    SetupWith => "SETUP_WITH",
    BeforeAsyncWith => "BEFORE_ASYNC_WITH",
    SetupAsyncWith => "SETUP_ASYNC_WITH",
    PopBlock => "POP_BLOCK",
    PopExcept => "POP_EXCEPT",
    WithExceptStart => "WITH_EXCEPT_START",

    // Generators and coroutines
    GenStart => "GEN_START",
    GetAwaitable => "GET_AWAITABLE",
    GetYieldFromIter => "GET_YIELD_FROM_ITER",
    YieldFrom => "YIELD_FROM",
    YieldValue => "YIELD_VALUE",
}

impl Opcode {
    /// Unconditional transfer to the instruction's target.
    #[inline]
    pub fn is_unconditional_jump(self) -> bool {
        matches!(self, Opcode::JumpForward | Opcode::JumpAbsolute)
    }

    /// Two-way transfer: falls through or goes to the target.
    #[inline]
    pub fn is_conditional_jump(self) -> bool {
        matches!(
            self,
            Opcode::PopJumpIfFalse
                | Opcode::PopJumpIfTrue
                | Opcode::JumpIfFalseOrPop
                | Opcode::JumpIfTrueOrPop
                | Opcode::JumpIfNotExcMatch
                | Opcode::ForIter
        )
    }

    /// Any control transfer that names a target.
    #[inline]
    pub fn is_jump(self) -> bool {
        self.is_unconditional_jump() || self.is_conditional_jump()
    }

    /// Registers an exception handler at its target without transferring control.
    #[inline]
    pub fn is_handler_setup(self) -> bool {
        matches!(
            self,
            Opcode::SetupFinally | Opcode::SetupWith | Opcode::SetupAsyncWith
        )
    }

    /// Leaves the procedure; nothing falls through.
    #[inline]
    pub fn is_exit(self) -> bool {
        matches!(
            self,
            Opcode::ReturnValue | Opcode::RaiseVarargs | Opcode::Reraise
        )
    }

    /// The instruction's argval is an absolute offset.
    #[inline]
    pub fn has_target(self) -> bool {
        self.is_jump() || self.is_handler_setup()
    }

    /// The instruction's argval is an identifier.
    #[inline]
    pub fn has_name(self) -> bool {
        matches!(
            self,
            Opcode::LoadName
                | Opcode::StoreName
                | Opcode::DeleteName
                | Opcode::LoadGlobal
                | Opcode::StoreGlobal
                | Opcode::DeleteGlobal
                | Opcode::LoadFast
                | Opcode::StoreFast
                | Opcode::DeleteFast
                | Opcode::LoadDeref
                | Opcode::StoreDeref
                | Opcode::LoadClassDeref
                | Opcode::LoadClosure
                | Opcode::LoadAttr
                | Opcode::StoreAttr
                | Opcode::LoadMethod
                | Opcode::ImportName
                | Opcode::ImportFrom
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Unknown(raw) => write!(f, "<unknown {}>", raw),
            other => f.write_str(other.name()),
        }
    }
}
