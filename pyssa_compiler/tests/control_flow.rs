//! Blocks, merges, loops and context managers.

mod common;

use common::*;
use pyssa_bytecode::{Constant, Opcode};
use pyssa_compiler::ir::Terminator;

// =============================================================================
// Loops
// =============================================================================

#[test]
fn test_for_loop_blocks() {
    // for x in range(10): print(x)
    let code = module(|b| {
        let head = b.create_label();
        let done = b.create_label();
        b.op_name(Opcode::LoadName, "range");
        b.op_const(Constant::Int(10));
        b.op_arg(Opcode::CallFunction, 1);
        b.op(Opcode::GetIter);
        b.bind_label(head);
        b.op_jump(Opcode::ForIter, done);
        b.op_name(Opcode::StoreName, "x");
        b.op_name(Opcode::LoadName, "print");
        b.op_name(Opcode::LoadName, "x");
        b.op_arg(Opcode::CallFunction, 1);
        b.op(Opcode::PopTop);
        b.op_jump(Opcode::JumpAbsolute, head);
        b.bind_label(done);
        return_none(b);
    });

    let module = translate(&code);
    let offsets: Vec<u32> = module.procedures[0].blocks.iter().map(|b| b.offset).collect();
    assert_eq!(offsets, [0, 8, 10, 22]);

    insta::assert_snapshot!(module.to_string(), @r###"
module dummy:

  function toplevel():
    b0:
      n0 <- TOPLEVEL[range]
      n1 <- $Call(n0, 10)
      n2 <- $GetIter(n1)
      jmp b1(n2)

    b1(n3):
      n4 <- $NextIter(n3)
      n5 <- $HasNextIter(n4)
      if n5 then jmp b2 else jmp b3

    b2:
      n6 <- $IterData(n4)
      TOPLEVEL[x] <- n6
      n7 <- TOPLEVEL[print]
      n8 <- TOPLEVEL[x]
      n9 <- $Call(n7, n8)
      jmp b1(n3)

    b3:
      return None
"###);
}

#[test]
fn test_while_loop_header_is_merge() {
    // while n: n = n - 1
    let code = module(|b| {
        let head = b.create_label();
        let done = b.create_label();
        b.bind_label(head);
        b.op_name(Opcode::LoadName, "n");
        b.op_jump(Opcode::PopJumpIfFalse, done);
        b.op_name(Opcode::LoadName, "n");
        b.op_const(Constant::Int(1));
        b.op(Opcode::BinarySubtract);
        b.op_name(Opcode::StoreName, "n");
        b.op_jump(Opcode::JumpAbsolute, head);
        b.bind_label(done);
        return_none(b);
    });

    let module = translate(&code);
    let top = &module.procedures[0];
    assert_eq!(top.blocks.len(), 3);
    // Block 0 is a back-edge target: it declares parameters for an empty stack.
    assert!(top.blocks[0].params.is_empty());
    match &top.blocks[1].terminator {
        Terminator::Jump(target) => assert_eq!(target.block, top.entry()),
        other => panic!("expected a back edge, got {}", other),
    }
}

// =============================================================================
// Short-circuit evaluation
// =============================================================================

#[test]
fn test_short_circuit_merge_parameter() {
    // r = x and y or z and t
    let code = module(|b| {
        let rhs = b.create_label();
        let join = b.create_label();
        b.op_name(Opcode::LoadName, "x");
        b.op_jump(Opcode::PopJumpIfFalse, rhs);
        b.op_name(Opcode::LoadName, "y");
        b.op_jump(Opcode::JumpIfTrueOrPop, join);
        b.bind_label(rhs);
        b.op_name(Opcode::LoadName, "z");
        b.op_jump(Opcode::JumpIfFalseOrPop, join);
        b.op_name(Opcode::LoadName, "t");
        b.bind_label(join);
        b.op_name(Opcode::StoreName, "r");
        return_none(b);
    });

    let module = translate(&code);
    let top = &module.procedures[0];
    assert_eq!(top.blocks.len(), 5);
    assert_eq!(top.blocks[4].params.len(), 1);

    insta::assert_snapshot!(top.to_string(), @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[x]
    if n0 then jmp b1 else jmp b2

  b1:
    n1 <- TOPLEVEL[y]
    if n1 then jmp b4(n1) else jmp b2

  b2:
    n2 <- TOPLEVEL[z]
    if n2 then jmp b3 else jmp b4(n2)

  b3:
    n3 <- TOPLEVEL[t]
    jmp b4(n3)

  b4(n4):
    TOPLEVEL[r] <- n4
    return None
"###);
}

#[test]
fn test_conditional_expression() {
    // r = a if c else b
    let code = module(|b| {
        let orelse = b.create_label();
        let join = b.create_label();
        b.op_name(Opcode::LoadName, "c");
        b.op_jump(Opcode::PopJumpIfFalse, orelse);
        b.op_name(Opcode::LoadName, "a");
        b.op_jump(Opcode::JumpForward, join);
        b.bind_label(orelse);
        b.op_name(Opcode::LoadName, "b");
        b.bind_label(join);
        b.op_name(Opcode::StoreName, "r");
        return_none(b);
    });

    let module = translate(&code);
    let top = &module.procedures[0];
    let join = &top.blocks[3];
    assert_eq!(join.params.len(), 1);
    assert_eq!(top.blocks[1].terminator.to_string(), "jmp b3(n1)");
    assert_eq!(top.blocks[2].terminator.to_string(), "jmp b3(n2)");
}

#[test]
fn test_unreachable_code_is_elided() {
    let code = module(|b| {
        return_none(b);
        b.op_name(Opcode::LoadName, "dead");
        b.op(Opcode::ReturnValue);
    });

    let module = translate(&code);
    let top = &module.procedures[0];
    assert_eq!(top.blocks.len(), 1);
    assert!(exprs(top).is_empty());
}

// =============================================================================
// Context managers
// =============================================================================

#[test]
fn test_nested_with_exits_innermost_first() {
    // with a as x:
    //     with b as y:
    //         pass
    let code = module(|b| {
        let outer = b.create_label();
        let inner = b.create_label();
        b.op_name(Opcode::LoadName, "a");
        b.op_jump(Opcode::SetupWith, outer);
        b.op_name(Opcode::StoreName, "x");
        b.op_name(Opcode::LoadName, "b");
        b.op_jump(Opcode::SetupWith, inner);
        b.op_name(Opcode::StoreName, "y");
        with_exit(b);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::PopTop);
        return_none(b);
        b.bind_label(inner);
        b.op(Opcode::WithExceptStart);
        b.op(Opcode::Reraise);
        b.bind_label(outer);
        b.op(Opcode::WithExceptStart);
        b.op(Opcode::Reraise);
    });

    let module = translate(&code);
    let top = &module.procedures[0];
    // Handlers are not modelled, so only the protected path remains.
    assert_eq!(top.blocks.len(), 1);

    insta::assert_snapshot!(top.to_string(), @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[a]
    n1 <- $CallMethod[__enter__](n0)
    TOPLEVEL[x] <- n1
    n2 <- TOPLEVEL[b]
    n3 <- $CallMethod[__enter__](n2)
    TOPLEVEL[y] <- n3
    n4 <- $CallMethod[__exit__](n2, None, None, None)
    n5 <- $CallMethod[__exit__](n0, None, None, None)
    return None
"###);
}

#[test]
fn test_with_exit_on_every_return_path() {
    // def f(c):
    //     with a:
    //         if c:
    //             return 1
    //         g()
    let f = function("f", &["c"], |b| {
        let handler = b.create_label();
        let rest = b.create_label();
        b.op_name(Opcode::LoadGlobal, "a");
        b.op_jump(Opcode::SetupWith, handler);
        b.op(Opcode::PopTop);
        b.op_name(Opcode::LoadFast, "c");
        b.op_jump(Opcode::PopJumpIfFalse, rest);
        with_exit(b);
        b.op(Opcode::PopTop);
        b.op_const(Constant::Int(1));
        b.op(Opcode::ReturnValue);
        b.bind_label(rest);
        b.op_name(Opcode::LoadGlobal, "g");
        b.op_arg(Opcode::CallFunction, 0);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::PopTop);
        return_none(b);
        b.bind_label(handler);
        b.op(Opcode::WithExceptStart);
        b.op(Opcode::Reraise);
    });
    let code = module(|b| {
        make_function(b, f, "f");
        b.op_name(Opcode::StoreName, "f");
        return_none(b);
    });

    let module = translate(&code);
    let f = procedure(&module, "dummy.f");
    let exits: Vec<_> = f.blocks.iter().filter(|b| is_exit(&b.terminator)).collect();
    assert_eq!(exits.len(), 2);
    for block in exits {
        assert_eq!(
            exit_calls(block),
            ["$CallMethod[__exit__](n0, None, None, None)"]
        );
    }
}

#[test]
fn test_with_return_value_rotated_past_exit() {
    // def f(x):
    //     with a:
    //         return x
    let f = function("f", &["x"], |b| {
        let handler = b.create_label();
        b.op_name(Opcode::LoadGlobal, "a");
        b.op_jump(Opcode::SetupWith, handler);
        b.op(Opcode::PopTop);
        b.op_name(Opcode::LoadFast, "x");
        b.op(Opcode::RotTwo);
        with_exit(b);
        b.op(Opcode::PopTop);
        b.op(Opcode::ReturnValue);
        b.bind_label(handler);
        b.op(Opcode::WithExceptStart);
        b.op(Opcode::Reraise);
    });
    let code = module(|b| {
        make_function(b, f, "f");
        b.op_name(Opcode::StoreName, "f");
        return_none(b);
    });

    let module = translate(&code);
    insta::assert_snapshot!(procedure(&module, "dummy.f").to_string(), @r###"
function dummy.f(x):
  b0:
    n0 <- GLOBAL[a]
    n1 <- $CallMethod[__enter__](n0)
    n2 <- LOCAL[x]
    n3 <- $CallMethod[__exit__](n0, None, None, None)
    return n2
"###);
}

#[test]
fn test_nested_with_in_loop_exits_on_break_and_continue() {
    // for i in xs:
    //     with a:
    //         with b:
    //             if c:
    //                 break
    //             if d:
    //                 continue
    //             f()
    let code = module(|b| {
        let head = b.create_label();
        let done = b.create_label();
        let outer = b.create_label();
        let inner = b.create_label();
        let test_d = b.create_label();
        let call_f = b.create_label();
        b.op_name(Opcode::LoadName, "xs");
        b.op(Opcode::GetIter);
        b.bind_label(head);
        b.op_jump(Opcode::ForIter, done);
        b.op_name(Opcode::StoreName, "i");
        b.op_name(Opcode::LoadName, "a");
        b.op_jump(Opcode::SetupWith, outer);
        b.op(Opcode::PopTop);
        b.op_name(Opcode::LoadName, "b");
        b.op_jump(Opcode::SetupWith, inner);
        b.op(Opcode::PopTop);
        b.op_name(Opcode::LoadName, "c");
        b.op_jump(Opcode::PopJumpIfFalse, test_d);
        // break
        with_exit(b);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::PopTop);
        b.op(Opcode::PopTop);
        b.op_jump(Opcode::JumpAbsolute, done);
        // continue
        b.bind_label(test_d);
        b.op_name(Opcode::LoadName, "d");
        b.op_jump(Opcode::PopJumpIfFalse, call_f);
        with_exit(b);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::PopTop);
        b.op_jump(Opcode::JumpAbsolute, head);
        // fallthrough
        b.bind_label(call_f);
        b.op_name(Opcode::LoadName, "f");
        b.op_arg(Opcode::CallFunction, 0);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::PopTop);
        b.op_jump(Opcode::JumpAbsolute, head);
        b.bind_label(inner);
        b.op(Opcode::WithExceptStart);
        b.op(Opcode::Reraise);
        b.bind_label(outer);
        b.op(Opcode::WithExceptStart);
        b.op(Opcode::Reraise);
        b.bind_label(done);
        return_none(b);
    });

    let module = translate(&code);
    let top = &module.procedures[0];
    let expected = [
        "$CallMethod[__exit__](n8, None, None, None)",
        "$CallMethod[__exit__](n6, None, None, None)",
    ];
    // break, continue and fallthrough edges respectively
    for id in [3, 5, 6] {
        assert_eq!(exit_calls(&top.blocks[id]), expected, "b{}", id);
    }
    for id in [0, 1, 2, 4, 7] {
        assert!(exit_calls(&top.blocks[id]).is_empty(), "b{}", id);
    }

    insta::assert_snapshot!(top.to_string(), @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[xs]
    n1 <- $GetIter(n0)
    jmp b1(n1)

  b1(n2):
    n3 <- $NextIter(n2)
    n4 <- $HasNextIter(n3)
    if n4 then jmp b2 else jmp b7

  b2:
    n5 <- $IterData(n3)
    TOPLEVEL[i] <- n5
    n6 <- TOPLEVEL[a]
    n7 <- $CallMethod[__enter__](n6)
    n8 <- TOPLEVEL[b]
    n9 <- $CallMethod[__enter__](n8)
    n10 <- TOPLEVEL[c]
    if n10 then jmp b3 else jmp b4

  b3:
    n11 <- $CallMethod[__exit__](n8, None, None, None)
    n12 <- $CallMethod[__exit__](n6, None, None, None)
    jmp b7

  b4:
    n13 <- TOPLEVEL[d]
    if n13 then jmp b5 else jmp b6

  b5:
    n14 <- $CallMethod[__exit__](n8, None, None, None)
    n15 <- $CallMethod[__exit__](n6, None, None, None)
    jmp b1(n2)

  b6:
    n16 <- TOPLEVEL[f]
    n17 <- $Call(n16)
    n18 <- $CallMethod[__exit__](n8, None, None, None)
    n19 <- $CallMethod[__exit__](n6, None, None, None)
    jmp b1(n2)

  b7:
    return None
"###);
}

// =============================================================================
// Exits
// =============================================================================

#[test]
fn test_raise_from_sets_cause() {
    let code = module(|b| {
        b.op_name(Opcode::LoadName, "E");
        b.op_name(Opcode::LoadName, "cause");
        b.op_arg(Opcode::RaiseVarargs, 2);
    });

    let module = translate(&code);
    insta::assert_snapshot!(module.procedures[0].to_string(), @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[E]
    n1 <- TOPLEVEL[cause]
    $SetAttr[__cause__](n0, n1)
    throw n0
"###);
}
