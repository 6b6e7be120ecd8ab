//! Literal collections, accumulators and sequence unpacking.
//!
//! With folding enabled, a literal whose elements are all constants becomes
//! one constant. A folded list, set or dict is mutable at runtime, so it is
//! built explicitly as soon as it is mutated, duplicated, or carried into a
//! merge block.

use crate::error::{ErrorKind, TranslateResult};
use crate::ir::{Expr, Operand};
use crate::stack::{StackEntry, SymbolicStack};
use crate::translator::ProcedureTranslator;
use pyssa_bytecode::{Constant, Instruction, Opcode};
use std::sync::Arc;

impl<'a> ProcedureTranslator<'a> {
    // =========================================================================
    // Literals
    // =========================================================================

    /// `BUILD_TUPLE`, `BUILD_LIST` and `BUILD_SET`. A tuple of closure cells
    /// becomes the cell list of the next `MAKE_FUNCTION`.
    pub(crate) fn build_sequence(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let n = inst.arg as usize;
        let result = self.stack.pop_n(n);
        let entries = self.lift(result)?;

        if inst.opcode == Opcode::BuildTuple
            && n > 0
            && entries.iter().all(|e| matches!(e, StackEntry::Cell(_)))
        {
            let cells = entries
                .into_iter()
                .filter_map(|e| match e {
                    StackEntry::Cell(cell) => Some(cell),
                    _ => None,
                })
                .collect();
            return self.push(StackEntry::Cells(cells));
        }

        let values = entries
            .into_iter()
            .map(|e| self.expect_value(e))
            .collect::<TranslateResult<Vec<_>>>()?;

        if let Some(items) = self.foldable(&values) {
            let items: Arc<[Constant]> = items.into();
            let folded = match inst.opcode {
                Opcode::BuildTuple => Constant::Tuple(items),
                Opcode::BuildList => Constant::List(items),
                _ => Constant::Set(dedup(items.to_vec()).into()),
            };
            return self.push_value(folded);
        }

        let expr = match inst.opcode {
            Opcode::BuildTuple => Expr::BuildTuple(values),
            Opcode::BuildList => Expr::BuildList(values),
            _ => Expr::BuildSet(values),
        };
        self.emit_push(expr)?;
        Ok(())
    }

    /// `BUILD_MAP n`: keys and values alternate, bottom-first.
    pub(crate) fn build_map(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let flat = self.pop_values(2 * inst.arg as usize)?;
        let pairs: Vec<(Operand, Operand)> = flat
            .chunks(2)
            .map(|kv| (kv[0].clone(), kv[1].clone()))
            .collect();
        self.finish_map(pairs)
    }

    /// `BUILD_CONST_KEY_MAP n`: a constant key tuple on top of `n` values.
    pub(crate) fn build_const_key_map(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let keys = self.pop_value()?;
        let keys: Vec<Constant> = match keys.as_const().and_then(Constant::as_sequence) {
            Some(keys) if keys.len() == inst.arg as usize => keys.to_vec(),
            _ => {
                return Err(self.error(ErrorKind::UnexpectedStackEntry {
                    expected: "constant key tuple",
                    found: "value",
                }))
            }
        };
        let values = self.pop_values(inst.arg as usize)?;
        let pairs = keys.into_iter().map(Operand::Const).zip(values).collect();
        self.finish_map(pairs)
    }

    fn finish_map(&mut self, pairs: Vec<(Operand, Operand)>) -> TranslateResult<()> {
        if self.config.fold_constants {
            let folded: Option<Vec<(Constant, Constant)>> = pairs
                .iter()
                .map(|(k, v)| Some((k.as_const()?.clone(), v.as_const()?.clone())))
                .collect();
            if let Some(entries) = folded {
                return self.push_value(Constant::Dict(merge_dict(Vec::new(), entries).into()));
            }
        }
        self.emit_push(Expr::BuildMap(pairs))?;
        Ok(())
    }

    /// Every value as a constant, when folding applies.
    fn foldable(&self, values: &[Operand]) -> Option<Vec<Constant>> {
        if !self.config.fold_constants {
            return None;
        }
        values.iter().map(|v| v.as_const().cloned()).collect()
    }

    // =========================================================================
    // Accumulators
    // =========================================================================

    /// `LIST_APPEND i`, `SET_ADD i`, `MAP_ADD i`: the collection sits `i`
    /// slots below the popped operands.
    pub(crate) fn accumulate(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let depth = (inst.arg as usize).saturating_sub(1);
        let value = self.pop_value()?;
        let key = match inst.opcode {
            Opcode::MapAdd => Some(self.pop_value()?),
            _ => None,
        };
        self.materialize_slot(depth)?;
        let collection = self.peek_value(depth)?;

        let expr = match (inst.opcode, key) {
            (Opcode::ListAppend, _) => Expr::ListAppend {
                list: collection,
                value,
            },
            (Opcode::SetAdd, _) => Expr::SetAdd {
                set: collection,
                value,
            },
            (_, key) => Expr::DictSetItem {
                dict: collection,
                key: key.unwrap_or_else(Operand::none),
                value,
            },
        };
        self.emit(expr);
        Ok(())
    }

    /// `LIST_EXTEND`, `SET_UPDATE`, `DICT_UPDATE`, `DICT_MERGE`.
    pub(crate) fn extend(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let depth = (inst.arg as usize).saturating_sub(1);
        let other = self.pop_value()?;

        if self.config.fold_constants {
            let target = self.peek_value(depth)?;
            if let (Some(target), Some(other)) = (target.as_const(), other.as_const()) {
                if let Some(merged) = fold_extend(target, other) {
                    if let Ok(slot) = self.stack.peek_mut(depth) {
                        *slot = StackEntry::Value(Operand::Const(merged));
                    }
                    return Ok(());
                }
            }
        }

        self.materialize_slot(depth)?;
        let target = self.peek_value(depth)?;
        let expr = match inst.opcode {
            Opcode::ListExtend => Expr::ListExtend {
                list: target,
                iterable: other,
            },
            Opcode::SetUpdate => Expr::SetUpdate {
                set: target,
                iterable: other,
            },
            _ => Expr::DictUpdate {
                dict: target,
                other,
            },
        };
        self.emit(expr);
        Ok(())
    }

    pub(crate) fn list_to_tuple(&mut self) -> TranslateResult<()> {
        let value = self.pop_value()?;
        if let Some(Constant::List(items)) = value.as_const() {
            return self.push_value(Constant::Tuple(items.clone()));
        }
        self.emit_push(Expr::ListToTuple(value))?;
        Ok(())
    }

    /// `UNPACK_SEQUENCE n`: one evaluation, `n` indexed projections, element 0
    /// ends on top.
    pub(crate) fn unpack_sequence(&mut self, inst: &Instruction) -> TranslateResult<()> {
        let n = inst.arg as usize;
        let seq = self.pop_value()?;
        let items: Vec<_> = (0..n)
            .map(|i| {
                self.emit(Expr::Subscript {
                    value: seq.clone(),
                    index: Operand::Const(Constant::Int(i as i64)),
                })
            })
            .collect();
        for item in items.into_iter().rev() {
            self.push_value(item)?;
        }
        Ok(())
    }

    // =========================================================================
    // Materialization
    // =========================================================================

    /// Build a folded mutable collection explicitly; other operands pass through.
    pub(crate) fn materialize(&mut self, op: Operand) -> Operand {
        let expr = match &op {
            Operand::Const(Constant::List(items)) => {
                Expr::BuildList(items.iter().cloned().map(Operand::Const).collect())
            }
            Operand::Const(Constant::Set(items)) => {
                Expr::BuildSet(items.iter().cloned().map(Operand::Const).collect())
            }
            Operand::Const(Constant::Dict(entries)) => Expr::BuildMap(
                entries
                    .iter()
                    .map(|(k, v)| (Operand::Const(k.clone()), Operand::Const(v.clone())))
                    .collect(),
            ),
            _ => return op,
        };
        Operand::Temp(self.emit(expr))
    }

    /// Materialize the stack slot `depth` below the top in place.
    pub(crate) fn materialize_slot(&mut self, depth: usize) -> TranslateResult<()> {
        let op = match self.lift(self.stack.peek(depth))? {
            StackEntry::Value(op) if is_mutable_const(op) => op.clone(),
            _ => return Ok(()),
        };
        let built = self.materialize(op);
        if let Ok(slot) = self.stack.peek_mut(depth) {
            *slot = StackEntry::Value(built);
        }
        Ok(())
    }

    /// Materialize every slot of a stack leaving through a merge edge.
    pub(crate) fn materialize_stack(&mut self, stack: &mut SymbolicStack) {
        for op in stack.values_mut() {
            if is_mutable_const(op) {
                let folded = op.clone();
                *op = self.materialize(folded);
            }
        }
    }
}

fn is_mutable_const(op: &Operand) -> bool {
    matches!(
        op,
        Operand::Const(Constant::List(_) | Constant::Set(_) | Constant::Dict(_))
    )
}

/// Fold `target.extend(other)` when both are constants of compatible kinds.
fn fold_extend(target: &Constant, other: &Constant) -> Option<Constant> {
    match (target, other) {
        (Constant::List(a), b) => {
            let mut items = a.to_vec();
            items.extend_from_slice(b.as_sequence()?);
            Some(Constant::List(items.into()))
        }
        (Constant::Set(a), b) => {
            let mut items = a.to_vec();
            items.extend_from_slice(b.as_sequence()?);
            Some(Constant::Set(dedup(items).into()))
        }
        (Constant::Dict(a), Constant::Dict(b)) => {
            Some(Constant::Dict(merge_dict(a.to_vec(), b.to_vec()).into()))
        }
        _ => None,
    }
}

fn dedup(items: Vec<Constant>) -> Vec<Constant> {
    let mut out: Vec<Constant> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Insert `entries` into `base`; a repeated key keeps its first position and
/// takes the latest value.
fn merge_dict(
    mut base: Vec<(Constant, Constant)>,
    entries: Vec<(Constant, Constant)>,
) -> Vec<(Constant, Constant)> {
    for (k, v) in entries {
        match base.iter_mut().find(|(existing, _)| *existing == k) {
            Some(slot) => slot.1 = v,
            None => base.push((k, v)),
        }
    }
    base
}
