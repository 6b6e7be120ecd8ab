//! Basic-block partitioning of an instruction stream.
//!
//! Leaders are offset 0, every jump and `SETUP_*` target, and every offset
//! following a jump, return or raise. Exception-handler targets start blocks
//! but are never successors: exception edges are not modelled, so handler
//! code is only kept if normal control flow reaches it.
//!
//! Only blocks reachable from the entry are numbered. Ids follow increasing
//! offset order, so block 0 is always the entry.

use crate::error::{ErrorKind, TranslateError, TranslateResult};
use crate::ir::{BlockId, QualName};
use pyssa_bytecode::{CodeObject, Instruction};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::ops::Range;

// =============================================================================
// Basic Block
// =============================================================================

/// A reachable basic block of the input stream.
#[derive(Debug, Clone)]
pub struct CfgBlock {
    pub id: BlockId,
    /// Offset of the leader.
    pub offset: u32,
    /// Instruction indices covered by the block.
    pub range: Range<usize>,
    /// Static successors; fallthrough first for conditional jumps.
    pub successors: SmallVec<[BlockId; 2]>,
    /// Number of incoming edges. The entry counts one extra for the caller.
    pub pred_count: usize,
}

impl CfgBlock {
    /// Whether values entering this block must arrive as block parameters.
    #[inline]
    pub fn is_merge(&self) -> bool {
        self.pred_count != 1
    }
}

/// One leader-delimited span before reachability is known.
struct Span {
    offset: u32,
    range: Range<usize>,
    /// Successor offsets.
    successors: SmallVec<[u32; 2]>,
    /// Control continues past the last instruction of the stream.
    falls_off: bool,
}

// =============================================================================
// Control Flow Graph
// =============================================================================

/// The block partition of one procedure.
#[derive(Debug, Clone)]
pub struct Cfg {
    blocks: Vec<CfgBlock>,
    by_offset: FxHashMap<u32, BlockId>,
}

impl Cfg {
    /// Partition `code` into blocks.
    pub fn build(code: &CodeObject, procedure: &QualName) -> TranslateResult<Cfg> {
        let error = |inst: Option<&Instruction>, kind: ErrorKind| {
            TranslateError::new(
                procedure.to_string(),
                inst.map_or(0, |i| i.offset),
                inst.map(|i| i.opcode),
                kind,
            )
        };

        let insts = &code.instructions;
        if insts.is_empty() {
            return Err(error(None, ErrorKind::FallOffEnd));
        }

        let leaders = Self::find_leaders(code).map_err(|(i, kind)| error(Some(&insts[i]), kind))?;
        let spans = Self::partition(code, &leaders);
        let reached = Self::reachable(&spans);

        let mut by_offset = FxHashMap::default();
        for (id, &span) in reached.iter().enumerate() {
            by_offset.insert(spans[span].offset, BlockId(id as u32));
        }

        let mut blocks = Vec::with_capacity(reached.len());
        for (id, &span_index) in reached.iter().enumerate() {
            let span = &spans[span_index];
            if span.falls_off {
                let last = &insts[span.range.end - 1];
                return Err(error(Some(last), ErrorKind::FallOffEnd));
            }
            let successors = span
                .successors
                .iter()
                .filter_map(|off| by_offset.get(off).copied())
                .collect();
            blocks.push(CfgBlock {
                id: BlockId(id as u32),
                offset: span.offset,
                range: span.range.clone(),
                successors,
                pred_count: usize::from(id == 0),
            });
        }

        for i in 0..blocks.len() {
            let succs = blocks[i].successors.clone();
            for succ in succs {
                blocks[succ.index()].pred_count += 1;
            }
        }

        Ok(Cfg { blocks, by_offset })
    }

    /// Collect leader offsets, validating every jump target.
    fn find_leaders(code: &CodeObject) -> Result<BTreeSet<u32>, (usize, ErrorKind)> {
        let insts = &code.instructions;
        let mut leaders = BTreeSet::new();
        leaders.insert(insts[0].offset);

        for (i, inst) in insts.iter().enumerate() {
            if inst.opcode.has_target() {
                let target = inst.target().ok_or((
                    i,
                    ErrorKind::MissingArgument {
                        expected: "jump target",
                    },
                ))?;
                if code.index_of(target).is_none() {
                    return Err((i, ErrorKind::UnknownJumpTarget { target }));
                }
                leaders.insert(target);
            }
            if (inst.opcode.is_jump() || inst.opcode.is_exit()) && i + 1 < insts.len() {
                leaders.insert(insts[i + 1].offset);
            }
        }
        Ok(leaders)
    }

    fn partition(code: &CodeObject, leaders: &BTreeSet<u32>) -> Vec<Span> {
        let insts = &code.instructions;
        let starts: Vec<usize> = leaders
            .iter()
            .filter_map(|&off| code.index_of(off))
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(insts.len());
                let last = &insts[end - 1];
                let next = insts.get(end).map(|i| i.offset);
                let mut successors = SmallVec::new();
                let mut falls_off = false;

                let op = last.opcode;
                if op.is_exit() {
                    // no successors
                } else if op.is_unconditional_jump() {
                    successors.extend(last.target());
                } else {
                    match next {
                        Some(off) => successors.push(off),
                        None => falls_off = true,
                    }
                    if op.is_conditional_jump() {
                        successors.extend(last.target());
                    }
                }

                Span {
                    offset: insts[start].offset,
                    range: start..end,
                    successors,
                    falls_off,
                }
            })
            .collect()
    }

    /// Indices of spans reachable from the first, in offset order.
    fn reachable(spans: &[Span]) -> Vec<usize> {
        let index_of: FxHashMap<u32, usize> =
            spans.iter().enumerate().map(|(i, s)| (s.offset, i)).collect();
        let mut seen = vec![false; spans.len()];
        let mut stack = vec![0usize];
        seen[0] = true;
        while let Some(i) = stack.pop() {
            for off in &spans[i].successors {
                if let Some(&j) = index_of.get(off) {
                    if !seen[j] {
                        seen[j] = true;
                        stack.push(j);
                    }
                }
            }
        }
        (0..spans.len()).filter(|&i| seen[i]).collect()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[inline]
    pub fn block(&self, id: BlockId) -> &CfgBlock {
        &self.blocks[id.index()]
    }

    /// The reachable block starting at `offset`.
    #[inline]
    pub fn block_at(&self, offset: u32) -> Option<BlockId> {
        self.by_offset.get(&offset).copied()
    }

    pub fn blocks(&self) -> &[CfgBlock] {
        &self.blocks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
