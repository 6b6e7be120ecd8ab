//! Literals, folding, strings, imports and coroutines.

mod common;

use common::*;
use pyssa_bytecode::{CodeFlags, CodeObject, Constant, Opcode};
use pyssa_compiler::TranslateConfig;

fn rendered(code: &CodeObject, config: &TranslateConfig) -> String {
    translate_with(code, config).procedures[0].to_string()
}

// =============================================================================
// Constant folding
// =============================================================================

fn list_literal() -> CodeObject {
    // x = [1, 2, 3]
    module(|b| {
        b.op_arg(Opcode::BuildList, 0);
        b.op_const(Constant::tuple([
            Constant::Int(1),
            Constant::Int(2),
            Constant::Int(3),
        ]));
        b.op_arg(Opcode::ListExtend, 1);
        b.op_name(Opcode::StoreName, "x");
        return_none(b);
    })
}

#[test]
fn test_list_literal_folds() {
    let text = rendered(&list_literal(), &TranslateConfig::default());
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    TOPLEVEL[x] <- [1, 2, 3]
    return None
"###);
}

#[test]
fn test_list_literal_without_folding() {
    let config = TranslateConfig::default().with_fold_constants(false);
    let text = rendered(&list_literal(), &config);
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    n0 <- $BuildList()
    n1 <- $ListExtend(n0, (1, 2, 3))
    TOPLEVEL[x] <- n0
    return None
"###);
}

#[test]
fn test_folded_list_materialized_before_mutation() {
    // x = [y]  (as BUILD_LIST 0; LIST_APPEND)
    let code = module(|b| {
        b.op_arg(Opcode::BuildList, 0);
        b.op_name(Opcode::LoadName, "y");
        b.op_arg(Opcode::ListAppend, 1);
        b.op_name(Opcode::StoreName, "x");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[y]
    n1 <- $BuildList()
    n2 <- $ListAppend(n1, n0)
    TOPLEVEL[x] <- n1
    return None
"###);
}

#[test]
fn test_folded_list_materialized_before_dup() {
    // a = b = []
    let code = module(|b| {
        b.op_arg(Opcode::BuildList, 0);
        b.op(Opcode::DupTop);
        b.op_name(Opcode::StoreName, "a");
        b.op_name(Opcode::StoreName, "b");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    assert!(text.contains("n0 <- $BuildList()"));
    assert!(text.contains("TOPLEVEL[a] <- n0"));
    assert!(text.contains("TOPLEVEL[b] <- n0"));
}

#[test]
fn test_const_key_map() {
    // d = {"a": x, "b": 2}; e = {"a": 1}
    let code = module(|b| {
        b.op_name(Opcode::LoadName, "x");
        b.op_const(Constant::Int(2));
        b.op_const(Constant::str_tuple(["a", "b"]));
        b.op_arg(Opcode::BuildConstKeyMap, 2);
        b.op_name(Opcode::StoreName, "d");
        b.op_const(Constant::str("a"));
        b.op_const(Constant::Int(1));
        b.op_arg(Opcode::BuildMap, 1);
        b.op_name(Opcode::StoreName, "e");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[x]
    n1 <- $BuildMap("a", n0, "b", 2)
    TOPLEVEL[d] <- n1
    TOPLEVEL[e] <- {"a": 1}
    return None
"###);
}

#[test]
fn test_set_literal_dedups_when_folded() {
    let code = module(|b| {
        b.op_const(Constant::Int(1));
        b.op_const(Constant::Int(1));
        b.op_const(Constant::Int(2));
        b.op_arg(Opcode::BuildSet, 3);
        b.op_name(Opcode::StoreName, "s");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    assert!(text.contains("TOPLEVEL[s] <- {1, 2}"));
}

// =============================================================================
// Sequences and subscripts
// =============================================================================

#[test]
fn test_unpack_sequence() {
    // a, b = t
    let code = module(|b| {
        b.op_name(Opcode::LoadName, "t");
        b.op_arg(Opcode::UnpackSequence, 2);
        b.op_name(Opcode::StoreName, "a");
        b.op_name(Opcode::StoreName, "b");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[t]
    n1 <- $Subscript(n0, 0)
    n2 <- $Subscript(n0, 1)
    TOPLEVEL[a] <- n1
    TOPLEVEL[b] <- n2
    return None
"###);
}

#[test]
fn test_store_subscript_and_attribute() {
    // d[k] = v; o.attr = v
    let code = module(|b| {
        b.op_name(Opcode::LoadName, "v");
        b.op_name(Opcode::LoadName, "d");
        b.op_name(Opcode::LoadName, "k");
        b.op(Opcode::StoreSubscr);
        b.op_name(Opcode::LoadName, "v");
        b.op_name(Opcode::LoadName, "o");
        b.op_name(Opcode::StoreAttr, "attr");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    assert!(text.contains("$SetItem(n1, n2, n0)"));
    assert!(text.contains("$SetAttr[attr](n4, n3)"));
}

// =============================================================================
// Strings
// =============================================================================

#[test]
fn test_fstring_conversion_and_spec() {
    // f"a{x!r:>10}b"
    let code = module(|b| {
        b.op_const(Constant::str("a"));
        b.op_name(Opcode::LoadName, "x");
        b.op_const(Constant::str(">10"));
        b.op_arg(Opcode::FormatValue, 0x02 | 0x04);
        b.op_const(Constant::str("b"));
        b.op_arg(Opcode::BuildString, 3);
        b.op_name(Opcode::StoreName, "s");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    n0 <- TOPLEVEL[x]
    n1 <- $FormatFn.repr(n0)
    n2 <- $Format(n1, ">10")
    n3 <- $Concat("a", n2, "b")
    TOPLEVEL[s] <- n3
    return None
"###);
}

#[test]
fn test_fstring_plain_field() {
    let code = module(|b| {
        b.op_name(Opcode::LoadName, "x");
        b.op_arg(Opcode::FormatValue, 0);
        b.op_name(Opcode::StoreName, "s");
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    assert!(text.contains("n1 <- $Format(n0, None)"));
    assert!(!text.contains("$FormatFn"));
}

// =============================================================================
// Imports
// =============================================================================

#[test]
fn test_from_import() {
    // from os import path
    let code = module(|b| {
        b.op_const(Constant::Int(0));
        b.op_const(Constant::str_tuple(["path"]));
        b.op_name(Opcode::ImportName, "os");
        b.op_name(Opcode::ImportFrom, "path");
        b.op_name(Opcode::StoreName, "path");
        b.op(Opcode::PopTop);
        return_none(b);
    });
    let text = rendered(&code, &TranslateConfig::default());
    insta::assert_snapshot!(text, @r###"
function toplevel():
  b0:
    n0 <- $ImportName[os](("path",), 0)
    n1 <- $ImportFrom[path](n0)
    TOPLEVEL[path] <- n1
    return None
"###);
}

// =============================================================================
// Coroutines
// =============================================================================

#[test]
fn test_await_in_coroutine() {
    // async def main(): await asyncio.sleep(1)
    let main = function("main", &[], |b| {
        b.add_flags(CodeFlags::COROUTINE);
        b.op_arg(Opcode::GenStart, 1);
        b.op_name(Opcode::LoadGlobal, "asyncio");
        b.op_name(Opcode::LoadMethod, "sleep");
        b.op_const(Constant::Int(1));
        b.op_arg(Opcode::CallMethod, 1);
        b.op(Opcode::GetAwaitable);
        b.op_const(Constant::None);
        b.op(Opcode::YieldFrom);
        b.op(Opcode::PopTop);
        return_none(b);
    });
    let code = module(|b| {
        make_function(b, main, "main");
        b.op_name(Opcode::StoreName, "main");
        return_none(b);
    });

    let module = translate(&code);
    let main = procedure(&module, "dummy.main");
    assert!(main.is_coroutine());
    insta::assert_snapshot!(main.to_string(), @r###"
function dummy.main():
  b0:
    n0 <- $GenStartCoroutine()
    n1 <- GLOBAL[asyncio]
    n2 <- $CallMethod[sleep](n1, 1)
    n3 <- $GetAwaitable(n2)
    n4 <- $YieldFrom(n3, None)
    return None
"###);
}

#[test]
fn test_async_with_awaits_enter_and_exit() {
    // async def f():
    //     async with m:
    //         pass
    let f = function("f", &[], |b| {
        let handler = b.create_label();
        b.add_flags(CodeFlags::COROUTINE);
        b.op_name(Opcode::LoadGlobal, "m");
        b.op(Opcode::BeforeAsyncWith);
        b.op(Opcode::GetAwaitable);
        b.op_const(Constant::None);
        b.op(Opcode::YieldFrom);
        b.op_jump(Opcode::SetupAsyncWith, handler);
        b.op(Opcode::PopTop);
        with_exit(b);
        b.op(Opcode::GetAwaitable);
        b.op_const(Constant::None);
        b.op(Opcode::YieldFrom);
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
    insta::assert_snapshot!(procedure(&module, "dummy.f").to_string(), @r###"
function dummy.f():
  b0:
    n0 <- GLOBAL[m]
    n1 <- $CallMethod[__aenter__](n0)
    n2 <- $GetAwaitable(n1)
    n3 <- $YieldFrom(n2, None)
    n4 <- $CallMethod[__aexit__](n0, None, None, None)
    n5 <- $GetAwaitable(n4)
    n6 <- $YieldFrom(n5, None)
    return None
"###);
}

#[test]
fn test_generator_yield() {
    let gen = function("gen", &["x"], |b| {
        b.add_flags(CodeFlags::GENERATOR);
        b.op_arg(Opcode::GenStart, 0);
        b.op_name(Opcode::LoadFast, "x");
        b.op(Opcode::YieldValue);
        b.op(Opcode::PopTop);
        return_none(b);
    });
    let code = module(|b| {
        make_function(b, gen, "gen");
        b.op_name(Opcode::StoreName, "gen");
        return_none(b);
    });

    let module = translate(&code);
    let gen = procedure(&module, "dummy.gen");
    assert!(gen.is_generator());
    let text = gen.to_string();
    assert!(text.contains("n0 <- $GenStartGenerator()"));
    assert!(text.contains("n2 <- $Yield(n1)"));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_translation_is_deterministic() {
    let code = module(|b| {
        let head = b.create_label();
        let done = b.create_label();
        b.op_arg(Opcode::BuildList, 0);
        b.op_name(Opcode::LoadName, "xs");
        b.op(Opcode::GetIter);
        b.bind_label(head);
        b.op_jump(Opcode::ForIter, done);
        b.op_name(Opcode::StoreName, "v");
        b.op_name(Opcode::LoadName, "v");
        b.op_arg(Opcode::ListAppend, 2);
        b.op_jump(Opcode::JumpAbsolute, head);
        b.bind_label(done);
        b.op_name(Opcode::StoreName, "r");
        return_none(b);
    });
    let first = translate(&code).to_string();
    let second = translate(&code).to_string();
    assert_eq!(first, second);
}
