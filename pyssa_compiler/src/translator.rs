//! Symbolic stack simulation of one procedure.
//!
//! Blocks are simulated in increasing id (offset) order among those already
//! reached. A block with exactly one incoming edge inherits the exit stack of
//! its predecessor. Any other block rebinds every operand-carrying slot of the
//! first stack that reached it to a fresh parameter, and every predecessor's
//! jump passes its own operands positionally. Later edges must agree with that
//! established shape.
//!
//! Construct-specific lowerings live in [`crate::desugar`] as further
//! `impl ProcedureTranslator` blocks.

use crate::cfg::Cfg;
use crate::config::TranslateConfig;
use crate::error::{ErrorKind, TranslateError, TranslateResult};
use crate::ir::{
    BinaryOp, Block, BlockId, Expr, Instr, JumpTarget, Operand, ProcKind, Procedure, QualName,
    ScopedName, Temp, Terminator, UnaryOp,
};
use crate::scope::{resolve_scopes, ScopeTable};
use crate::stack::{StackEntry, SymbolicStack};
use log::{debug, trace};
use pyssa_bytecode::{CodeObject, Instruction, Opcode};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A nested body discovered at a definition site, translated after its parent.
#[derive(Debug, Clone)]
pub struct Hoisted {
    pub qualname: QualName,
    pub kind: ProcKind,
    pub code: Arc<CodeObject>,
}

/// What the stack looks like on entry to a block.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntryState {
    pub(crate) stack: SymbolicStack,
    /// Iterator step whose element is projected at block start (loop bodies).
    pub(crate) iter_item: Option<Operand>,
}

/// Whether simulation continues within the block.
pub(crate) enum Flow {
    Continue,
    Terminate(Terminator),
}

/// Translates one code object into one [`Procedure`].
pub struct ProcedureTranslator<'a> {
    pub(crate) code: &'a CodeObject,
    pub(crate) config: &'a TranslateConfig,
    pub(crate) qualname: QualName,
    pub(crate) kind: ProcKind,
    pub(crate) scopes: ScopeTable,
    pub(crate) cfg: Cfg,

    /// Next temporary number; never reused within the procedure.
    next_temp: u32,
    entries: Vec<Option<EntryState>>,
    blocks: Vec<Option<Block>>,
    worklist: BTreeSet<BlockId>,

    /// State of the block being simulated.
    pub(crate) stack: SymbolicStack,
    instrs: Vec<Instr>,
    location: (u32, Option<Opcode>),

    pub(crate) hoisted: Vec<Hoisted>,
}

impl<'a> ProcedureTranslator<'a> {
    /// Resolve scopes and partition blocks; nothing is simulated yet.
    pub fn new(
        code: &'a CodeObject,
        qualname: QualName,
        kind: ProcKind,
        config: &'a TranslateConfig,
    ) -> TranslateResult<Self> {
        let scopes = resolve_scopes(code, kind, &qualname)?;
        let cfg = Cfg::build(code, &qualname)?;
        let count = cfg.len();
        Ok(Self {
            code,
            config,
            qualname,
            kind,
            scopes,
            cfg,
            next_temp: 0,
            entries: vec![None; count],
            blocks: vec![None; count],
            worklist: BTreeSet::new(),
            stack: SymbolicStack::new(),
            instrs: Vec::new(),
            location: (0, None),
            hoisted: Vec::new(),
        })
    }

    /// Simulate every reachable block and freeze the procedure.
    pub fn translate(mut self) -> TranslateResult<(Procedure, Vec<Hoisted>)> {
        debug!(
            "translating {} ({} blocks, {} names)",
            self.qualname,
            self.cfg.len(),
            self.scopes.len()
        );

        self.entries[BlockId::ENTRY.index()] = Some(EntryState::default());
        self.worklist.insert(BlockId::ENTRY);
        while let Some(id) = self.worklist.pop_first() {
            self.simulate_block(id)?;
        }

        let blocks: Vec<Block> = self.blocks.into_iter().flatten().collect();
        debug!(
            "translated {}: {} blocks, {} temporaries, {} nested",
            self.qualname,
            blocks.len(),
            self.next_temp,
            self.hoisted.len()
        );

        let procedure = Procedure {
            params: self.code.params().to_vec(),
            cells: self.scopes.cells().cloned().collect(),
            qualname: self.qualname,
            kind: self.kind,
            flags: self.code.flags,
            blocks,
        };
        Ok((procedure, self.hoisted))
    }

    // =========================================================================
    // Blocks and edges
    // =========================================================================

    fn simulate_block(&mut self, id: BlockId) -> TranslateResult<()> {
        let info = self.cfg.block(id).clone();
        let Some(entry) = self.entries[id.index()].clone() else {
            return Ok(());
        };
        trace!("{}: simulating {} at offset {}", self.qualname, id, info.offset);

        self.stack = entry.stack;
        self.instrs = Vec::new();
        let mut params = Vec::new();
        if info.is_merge() {
            self.stack.rebind_operands(|| {
                let t = Temp(self.next_temp);
                self.next_temp += 1;
                params.push(t);
                Operand::Temp(t)
            });
        } else if let Some(item) = entry.iter_item {
            let elem = self.emit(Expr::IterData(item));
            self.push_value(elem)?;
        }

        let code = self.code;
        let mut terminator = None;
        for inst in &code.instructions[info.range.clone()] {
            self.location = (inst.offset, Some(inst.opcode));
            if let Flow::Terminate(t) = self.step(inst)? {
                terminator = Some(t);
                break;
            }
        }

        let terminator = match terminator {
            Some(t) => t,
            None => {
                let last = &code.instructions[info.range.end - 1];
                let stack = self.stack.clone();
                Terminator::Jump(self.edge(last.next_offset(), stack, None)?)
            }
        };

        self.blocks[id.index()] = Some(Block {
            id,
            offset: info.offset,
            params,
            instrs: std::mem::take(&mut self.instrs),
            terminator,
        });
        Ok(())
    }

    /// Create the edge to the block at `target`, leaving with `stack`.
    ///
    /// The first edge reaching a block fixes its entry shape; the jump carries
    /// arguments only when the target is a merge block.
    pub(crate) fn edge(
        &mut self,
        target: u32,
        mut stack: SymbolicStack,
        mut iter_item: Option<Operand>,
    ) -> TranslateResult<JumpTarget> {
        let id = self
            .cfg
            .block_at(target)
            .ok_or_else(|| self.error(ErrorKind::UnknownJumpTarget { target }))?;
        let merge = self.cfg.block(id).is_merge();

        if merge {
            self.materialize_stack(&mut stack);
            if let Some(item) = iter_item.take() {
                let elem = self.emit(Expr::IterData(item));
                let limit = self.config.max_stack_depth;
                self.lift(stack.push(StackEntry::Value(elem.into()), limit))?;
            }
        }

        match &self.entries[id.index()] {
            Some(existing) => {
                if !existing.stack.same_shape(&stack)
                    || existing.iter_item.is_some() != iter_item.is_some()
                {
                    return Err(self.error(ErrorKind::ShapeMismatch { target }));
                }
            }
            None => {
                self.entries[id.index()] = Some(EntryState {
                    stack: stack.clone(),
                    iter_item,
                });
                self.worklist.insert(id);
            }
        }

        let args = if merge { stack.operands() } else { Vec::new() };
        Ok(JumpTarget { block: id, args })
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn step(&mut self, inst: &Instruction) -> TranslateResult<Flow> {
        use Opcode::*;

        let op = inst.opcode;
        match op {
            Nop | SetupFinally | SetupAsyncWith | PopBlock => {}

            PopTop => {
                self.pop_entry()?;
            }
            RotTwo => self.rotate(2)?,
            RotThree => self.rotate(3)?,
            RotFour => self.rotate(4)?,
            DupTop => self.dup(1)?,
            DupTopTwo => self.dup(2)?,

            UnaryPositive => self.unary(UnaryOp::Positive)?,
            UnaryNegative => self.unary(UnaryOp::Negative)?,
            UnaryNot => self.unary(UnaryOp::Not)?,
            UnaryInvert => self.unary(UnaryOp::Invert)?,

            BinaryPower | BinaryMultiply | BinaryMatrixMultiply | BinaryFloorDivide
            | BinaryTrueDivide | BinaryModulo | BinaryAdd | BinarySubtract | BinaryLshift
            | BinaryRshift | BinaryAnd | BinaryXor | BinaryOr => {
                self.binary(binary_op(op), false)?
            }
            InplacePower | InplaceMultiply | InplaceMatrixMultiply | InplaceFloorDivide
            | InplaceTrueDivide | InplaceModulo | InplaceAdd | InplaceSubtract | InplaceLshift
            | InplaceRshift | InplaceAnd | InplaceXor | InplaceOr => {
                self.binary(binary_op(op), true)?
            }
            BinarySubscr => self.subscript()?,
            CompareOp => self.compare(inst)?,
            IsOp | ContainsOp => self.identity_or_membership(inst)?,

            LoadConst => self.load_const(inst)?,
            LoadName | LoadGlobal | LoadFast | LoadDeref | LoadClassDeref => {
                self.load_scoped(inst)?
            }
            StoreName | StoreGlobal | StoreFast | StoreDeref => self.store_scoped(inst)?,
            DeleteName | DeleteGlobal | DeleteFast => self.delete_scoped(inst)?,
            LoadClosure => self.load_closure(inst)?,

            LoadAttr => self.load_attr(inst)?,
            StoreAttr => self.store_attr(inst)?,
            StoreSubscr => self.store_subscr()?,
            BuildSlice => self.build_slice(inst)?,

            CallFunction => self.call_function(inst)?,
            CallFunctionKw => self.call_function_kw(inst)?,
            CallFunctionEx => self.call_function_ex(inst)?,
            LoadMethod => self.load_method(inst)?,
            CallMethod => self.call_method(inst)?,

            BuildTuple | BuildList | BuildSet => self.build_sequence(inst)?,
            BuildMap => self.build_map(inst)?,
            BuildConstKeyMap => self.build_const_key_map(inst)?,
            ListAppend | SetAdd | MapAdd => self.accumulate(inst)?,
            ListExtend | SetUpdate | DictUpdate | DictMerge => self.extend(inst)?,
            ListToTuple => self.list_to_tuple()?,
            UnpackSequence => self.unpack_sequence(inst)?,

            FormatValue => self.format_value(inst)?,
            BuildString => self.build_string(inst)?,

            JumpForward | JumpAbsolute => return self.jump(inst),
            PopJumpIfFalse | PopJumpIfTrue | JumpIfFalseOrPop | JumpIfTrueOrPop => {
                return self.cond_jump(inst)
            }
            GetIter => self.get_iter()?,
            ForIter => return self.for_iter(inst),
            ReturnValue => return self.return_value(),
            RaiseVarargs => return self.raise(inst),

            MakeFunction => self.make_function(inst)?,
            LoadBuildClass => self.push(StackEntry::BuildClass)?,
            ImportName => self.import_name(inst)?,
            ImportFrom => self.import_from(inst)?,

            SetupWith => self.enter_context(false)?,
            BeforeAsyncWith => self.enter_context(true)?,

            GenStart => self.gen_start(inst)?,
            GetAwaitable => self.get_awaitable()?,
            GetYieldFromIter => self.get_yield_from_iter()?,
            YieldFrom => self.yield_from()?,
            YieldValue => self.yield_value()?,

            JumpIfNotExcMatch | Reraise | PopExcept | WithExceptStart | Unknown(_) => {
                return Err(self.error(ErrorKind::UnsupportedOpcode))
            }
        }
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    #[inline]
    pub(crate) fn fresh(&mut self) -> Temp {
        let t = Temp(self.next_temp);
        self.next_temp += 1;
        t
    }

    /// Assign `rhs` to a fresh temporary.
    pub(crate) fn emit(&mut self, rhs: Expr) -> Temp {
        let lhs = self.fresh();
        self.instrs.push(Instr::Let { lhs, rhs });
        lhs
    }

    /// Emit an instruction that defines nothing.
    pub(crate) fn emit_effect(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    /// Emit `rhs` and push its result.
    pub(crate) fn emit_push(&mut self, rhs: Expr) -> TranslateResult<Temp> {
        let t = self.emit(rhs);
        self.push_value(t)?;
        Ok(t)
    }

    // =========================================================================
    // Stack helpers
    // =========================================================================

    pub(crate) fn error(&self, kind: ErrorKind) -> TranslateError {
        TranslateError::new(
            self.qualname.to_string(),
            self.location.0,
            self.location.1,
            kind,
        )
    }

    /// Attach the current location to a stack error.
    #[inline]
    pub(crate) fn lift<T>(&self, result: Result<T, ErrorKind>) -> TranslateResult<T> {
        result.map_err(|kind| self.error(kind))
    }

    pub(crate) fn push(&mut self, entry: StackEntry) -> TranslateResult<()> {
        let limit = self.config.max_stack_depth;
        let result = self.stack.push(entry, limit);
        self.lift(result)
    }

    pub(crate) fn push_value(&mut self, value: impl Into<Operand>) -> TranslateResult<()> {
        self.push(StackEntry::Value(value.into()))
    }

    pub(crate) fn pop_entry(&mut self) -> TranslateResult<StackEntry> {
        let result = self.stack.pop();
        self.lift(result)
    }

    /// Pop one value. A closure cell consumed as a value is loaded first.
    pub(crate) fn pop_value(&mut self) -> TranslateResult<Operand> {
        match self.pop_entry()? {
            StackEntry::Cell(cell) => Ok(self.cell_value(cell)),
            entry => self.expect_value(entry),
        }
    }

    /// Pop `n` values, bottom-first.
    pub(crate) fn pop_values(&mut self, n: usize) -> TranslateResult<Vec<Operand>> {
        let result = self.stack.pop_n(n);
        let entries = self.lift(result)?;
        entries
            .into_iter()
            .map(|entry| match entry {
                StackEntry::Cell(cell) => Ok(self.cell_value(cell)),
                entry => self.expect_value(entry),
            })
            .collect()
    }

    pub(crate) fn peek_value(&self, depth: usize) -> TranslateResult<Operand> {
        let entry = self.lift(self.stack.peek(depth))?;
        match entry {
            StackEntry::Value(op) => Ok(op.clone()),
            other => Err(self.unexpected("value", other)),
        }
    }

    pub(crate) fn expect_value(&self, entry: StackEntry) -> TranslateResult<Operand> {
        match entry {
            StackEntry::Value(op) => Ok(op),
            other => Err(self.unexpected("value", &other)),
        }
    }

    pub(crate) fn unexpected(&self, expected: &'static str, found: &StackEntry) -> TranslateError {
        self.error(ErrorKind::UnexpectedStackEntry {
            expected,
            found: found.describe(),
        })
    }

    fn rotate(&mut self, n: usize) -> TranslateResult<()> {
        let result = self.stack.rotate(n);
        self.lift(result)
    }

    /// Duplicating a folded mutable collection would split one object in two,
    /// so such entries are built explicitly first.
    fn dup(&mut self, n: usize) -> TranslateResult<()> {
        for depth in 0..n {
            self.materialize_slot(depth)?;
        }
        let limit = self.config.max_stack_depth;
        let result = self.stack.dup(n, limit);
        self.lift(result)
    }

    // =========================================================================
    // Argument helpers
    // =========================================================================

    pub(crate) fn name_arg(&self, inst: &Instruction) -> TranslateResult<Arc<str>> {
        inst.name()
            .cloned()
            .ok_or_else(|| self.error(ErrorKind::MissingArgument { expected: "name" }))
    }

    /// The name of `inst` with its resolved scope.
    pub(crate) fn scoped_arg(&self, inst: &Instruction) -> TranslateResult<ScopedName> {
        let name = self.name_arg(inst)?;
        self.scopes
            .scoped(&name)
            .ok_or_else(|| self.error(ErrorKind::UnresolvedName { name }))
    }

    pub(crate) fn target_arg(&self, inst: &Instruction) -> TranslateResult<u32> {
        inst.target().ok_or_else(|| {
            self.error(ErrorKind::MissingArgument {
                expected: "jump target",
            })
        })
    }
}

fn binary_op(op: Opcode) -> BinaryOp {
    use Opcode::*;
    match op {
        BinaryPower | InplacePower => BinaryOp::Power,
        BinaryMultiply | InplaceMultiply => BinaryOp::Multiply,
        BinaryMatrixMultiply | InplaceMatrixMultiply => BinaryOp::MatrixMultiply,
        BinaryFloorDivide | InplaceFloorDivide => BinaryOp::FloorDivide,
        BinaryTrueDivide | InplaceTrueDivide => BinaryOp::TrueDivide,
        BinaryModulo | InplaceModulo => BinaryOp::Modulo,
        BinarySubtract | InplaceSubtract => BinaryOp::Subtract,
        BinaryLshift | InplaceLshift => BinaryOp::LShift,
        BinaryRshift | InplaceRshift => BinaryOp::RShift,
        BinaryAnd | InplaceAnd => BinaryOp::And,
        BinaryXor | InplaceXor => BinaryOp::Xor,
        BinaryOr | InplaceOr => BinaryOp::Or,
        _ => BinaryOp::Add,
    }
}
