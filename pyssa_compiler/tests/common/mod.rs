//! Shared helpers for the translation tests.

#![allow(dead_code)]

use pyssa_bytecode::{CodeBuilder, CodeObject, Constant, Opcode};
use pyssa_compiler::ir::{Block, BlockId, Expr, Instr, Operand, Procedure, Temp, Terminator};
use pyssa_compiler::{translate_module, Module, TranslateConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// =============================================================================
// Assembling
// =============================================================================

/// A module body.
pub fn module(build: impl FnOnce(&mut CodeBuilder)) -> CodeObject {
    let mut b = CodeBuilder::new("<module>");
    build(&mut b);
    b.finish().expect("module assembles")
}

/// A function body with positional `params`.
pub fn function(name: &str, params: &[&str], build: impl FnOnce(&mut CodeBuilder)) -> CodeObject {
    let mut b = CodeBuilder::new(name);
    b.set_params(params);
    build(&mut b);
    b.finish().expect("function assembles")
}

/// `LOAD_CONST code; LOAD_CONST qualname; MAKE_FUNCTION 0`.
pub fn make_function(b: &mut CodeBuilder, code: CodeObject, qualname: &str) {
    b.op_const(Constant::Code(Arc::new(code)));
    b.op_const(Constant::str(qualname));
    b.op_arg(Opcode::MakeFunction, 0);
}

pub fn return_none(b: &mut CodeBuilder) {
    b.op_const(Constant::None);
    b.op(Opcode::ReturnValue);
}

/// The exit sequence the compiler emits when leaving a `with` block normally.
pub fn with_exit(b: &mut CodeBuilder) {
    b.op(Opcode::PopBlock);
    b.op_const(Constant::None);
    b.op(Opcode::DupTop);
    b.op(Opcode::DupTop);
    b.op_arg(Opcode::CallFunction, 3);
}

// =============================================================================
// Translating
// =============================================================================

pub fn translate(code: &CodeObject) -> Module {
    translate_with(code, &TranslateConfig::default())
}

/// Translate and run every structural check on the result.
pub fn translate_with(code: &CodeObject, config: &TranslateConfig) -> Module {
    let module = translate_module(code, config)
        .into_result()
        .expect("module translates");
    for procedure in &module.procedures {
        check_procedure(procedure);
    }
    module
}

pub fn procedure<'m>(module: &'m Module, qualname: &str) -> &'m Procedure {
    module
        .procedure(qualname)
        .unwrap_or_else(|| panic!("no procedure {}", qualname))
}

/// Every right-hand side in the procedure, in block order.
pub fn exprs(procedure: &Procedure) -> Vec<&Expr> {
    procedure
        .instrs()
        .filter_map(|i| match i {
            Instr::Let { rhs, .. } => Some(rhs),
            _ => None,
        })
        .collect()
}

pub fn exit_calls(block: &Block) -> Vec<String> {
    block
        .instrs
        .iter()
        .filter_map(|i| match i {
            Instr::Let {
                rhs: rhs @ Expr::CallMethod { name, .. },
                ..
            } if name.starts_with("__") && name.ends_with("exit__") => Some(rhs.to_string()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Structural checks
// =============================================================================

pub fn check_procedure(procedure: &Procedure) {
    check_block_ids(procedure);
    check_jump_arity(procedure);
    check_single_assignment(procedure);
    check_uses_dominated(procedure);
}

pub fn check_block_ids(procedure: &Procedure) {
    for (i, block) in procedure.blocks.iter().enumerate() {
        assert_eq!(block.id, BlockId(i as u32), "{}: block order", procedure.qualname);
    }
}

/// Every jump passes exactly as many arguments as its target declares.
pub fn check_jump_arity(procedure: &Procedure) {
    for block in &procedure.blocks {
        for target in block.terminator.targets() {
            let declared = procedure
                .block(target.block)
                .map(|b| b.params.len())
                .unwrap_or_else(|| panic!("{}: jump to missing {}", procedure.qualname, target.block));
            assert_eq!(
                target.args.len(),
                declared,
                "{}: {} jumps to {} with the wrong arity",
                procedure.qualname,
                block.id,
                target.block
            );
        }
    }
}

/// Each temporary is defined exactly once, by a block parameter or a `Let`.
pub fn check_single_assignment(procedure: &Procedure) {
    let mut seen = BTreeSet::new();
    for (temp, _) in definitions(procedure) {
        assert!(
            seen.insert(temp),
            "{}: {} defined twice",
            procedure.qualname,
            temp
        );
    }
}

/// Each use refers to a definition earlier in the same block or in a
/// dominating block.
pub fn check_uses_dominated(procedure: &Procedure) {
    let doms = dominators(procedure);
    let defined_in: BTreeMap<Temp, BlockId> = definitions(procedure).collect();

    for block in &procedure.blocks {
        let mut local: BTreeSet<Temp> = block.params.iter().copied().collect();
        let check = |op: &Operand, local: &BTreeSet<Temp>| {
            let Some(t) = op.as_temp() else { return };
            if local.contains(&t) {
                return;
            }
            let def = defined_in
                .get(&t)
                .unwrap_or_else(|| panic!("{}: {} used but never defined", procedure.qualname, t));
            assert!(
                *def != block.id && doms[block.id.index()].contains(def),
                "{}: {} used in {} is not dominated by its definition in {}",
                procedure.qualname,
                t,
                block.id,
                def
            );
        };
        for instr in &block.instrs {
            for op in instr.operands() {
                check(op, &local);
            }
            if let Some(t) = instr.defines() {
                local.insert(t);
            }
        }
        for op in block.terminator.operands() {
            check(op, &local);
        }
    }
}

fn definitions(procedure: &Procedure) -> impl Iterator<Item = (Temp, BlockId)> + '_ {
    procedure.blocks.iter().flat_map(|b| {
        b.params
            .iter()
            .copied()
            .chain(b.instrs.iter().filter_map(Instr::defines))
            .map(move |t| (t, b.id))
    })
}

fn dominators(procedure: &Procedure) -> Vec<BTreeSet<BlockId>> {
    let n = procedure.blocks.len();
    let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); n];
    for block in &procedure.blocks {
        for target in block.terminator.targets() {
            preds[target.block.index()].push(block.id);
        }
    }

    let all: BTreeSet<BlockId> = procedure.blocks.iter().map(|b| b.id).collect();
    let mut doms = vec![all; n];
    doms[0] = BTreeSet::from([BlockId::ENTRY]);
    let mut changed = true;
    while changed {
        changed = false;
        for i in 1..n {
            let mut next: Option<BTreeSet<BlockId>> = None;
            for p in &preds[i] {
                next = Some(match next {
                    None => doms[p.index()].clone(),
                    Some(acc) => acc.intersection(&doms[p.index()]).copied().collect(),
                });
            }
            let mut next = next.unwrap_or_default();
            next.insert(BlockId(i as u32));
            if next != doms[i] {
                doms[i] = next;
                changed = true;
            }
        }
    }
    doms
}

/// Whether a terminator leaves the procedure.
pub fn is_exit(terminator: &Terminator) -> bool {
    matches!(terminator, Terminator::Return(_) | Terminator::Throw(_))
}
