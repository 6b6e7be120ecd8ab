//! Lowering translated IR onto builtin targets.

use pyssa_bytecode::{CodeBuilder, CodeObject, Constant, Opcode};
use pyssa_compiler::ir::{Instr, Operand, Procedure};
use pyssa_compiler::{translate_module, TranslateConfig};
use pyssa_model::{Builtin, CallOutcome, Frame, Model};
use std::sync::Arc;

fn targets(procedure: &Procedure) -> Vec<&'static str> {
    procedure
        .instrs()
        .filter_map(|instr| match instr {
            Instr::Let { rhs, .. } => Builtin::for_expr(rhs),
            Instr::Store { target, .. } => Builtin::for_store(target),
            Instr::Delete { target } => Builtin::for_delete(target),
            Instr::SetAttr { .. } | Instr::SetItem { .. } => None,
        })
        .map(Builtin::name)
        .collect()
}

fn assemble(name: &str, params: &[&str], build: impl FnOnce(&mut CodeBuilder)) -> CodeObject {
    let mut b = CodeBuilder::new(name);
    b.set_params(params);
    build(&mut b);
    b.finish().expect("code assembles")
}

#[test]
fn test_module_body_targets() {
    // import asyncio
    // asyncio.run(main())
    let code = assemble("<module>", &[], |b| {
        b.op_const(Constant::Int(0));
        b.op_const(Constant::None);
        b.op_name(Opcode::ImportName, "asyncio");
        b.op_name(Opcode::StoreName, "asyncio");
        b.op_name(Opcode::LoadName, "asyncio");
        b.op_name(Opcode::LoadMethod, "run");
        b.op_name(Opcode::LoadName, "main");
        b.op_arg(Opcode::CallFunction, 0);
        b.op_arg(Opcode::CallMethod, 1);
        b.op(Opcode::PopTop);
        b.op_const(Constant::None);
        b.op(Opcode::ReturnValue);
    });

    let module = translate_module(&code, &TranslateConfig::default())
        .into_result()
        .expect("module translates");
    assert_eq!(
        targets(&module.procedures[0]),
        [
            "import_name",
            "store_name",
            "load_name",
            "load_name",
            "call",
            "call_method"
        ]
    );
}

#[test]
fn test_function_body_targets() {
    // def f():
    //     x = 1
    //     del x
    let f = assemble("f", &[], |b| {
        b.op_const(Constant::Int(1));
        b.op_name(Opcode::StoreFast, "x");
        b.op_name(Opcode::DeleteFast, "x");
        b.op_const(Constant::None);
        b.op(Opcode::ReturnValue);
    });
    let code = assemble("<module>", &[], |b| {
        b.op_const(Constant::Code(Arc::new(f)));
        b.op_const(Constant::str("f"));
        b.op_arg(Opcode::MakeFunction, 0);
        b.op_name(Opcode::StoreName, "f");
        b.op_const(Constant::None);
        b.op(Opcode::ReturnValue);
    });

    let module = translate_module(&code, &TranslateConfig::default())
        .into_result()
        .expect("module translates");
    let toplevel = module.procedure("toplevel").expect("module body");
    assert_eq!(targets(toplevel), ["make_function", "store_name"]);
    let f = module.procedure("dummy.f").expect("function body");
    assert_eq!(targets(f), ["store_fast", "nullify_locals"]);
}

#[test]
fn test_delete_unbinds_only_that_local() {
    // def f():
    //     x = 1
    //     y = 2
    //     del x
    let f = assemble("f", &[], |b| {
        b.op_const(Constant::Int(1));
        b.op_name(Opcode::StoreFast, "x");
        b.op_const(Constant::Int(2));
        b.op_name(Opcode::StoreFast, "y");
        b.op_name(Opcode::DeleteFast, "x");
        b.op_const(Constant::None);
        b.op(Opcode::ReturnValue);
    });
    let code = assemble("<module>", &[], |b| {
        b.op_const(Constant::Code(Arc::new(f)));
        b.op_const(Constant::str("f"));
        b.op_arg(Opcode::MakeFunction, 0);
        b.op_name(Opcode::StoreName, "f");
        b.op_const(Constant::None);
        b.op(Opcode::ReturnValue);
    });
    let module = translate_module(&code, &TranslateConfig::default())
        .into_result()
        .expect("module translates");
    let procedure = module.procedure("dummy.f").expect("function body");

    let mut model = Model::new();
    let mut frame = Frame::new(procedure.qualname.clone());
    for instr in procedure.instrs() {
        match instr {
            Instr::Store {
                target,
                value: Operand::Const(constant),
            } => {
                assert_eq!(Builtin::for_store(target), Some(Builtin::StoreFast));
                let value = model.constant(constant).unwrap();
                model.store_fast(&mut frame, target.name.clone(), value);
            }
            Instr::Delete { target } => {
                assert_eq!(Builtin::for_delete(target), Some(Builtin::NullifyLocals));
                model.nullify_locals(&mut frame, &[target.name.clone()]);
            }
            other => panic!("unexpected instruction {:?}", other),
        }
    }

    assert_eq!(frame.locals.get("x"), None);
    let y = frame.locals.get("y").expect("y survives del x");
    assert_eq!(model.heap.get(y).unwrap().as_const_int(), Some(2));
}

#[test]
fn test_every_target_name_parses_back() {
    for builtin in Builtin::ALL {
        assert_eq!(builtin.name().parse::<Builtin>().unwrap(), *builtin);
    }
    assert!("load_attr".parse::<Builtin>().is_err());
}

#[test]
fn test_module_frame_shares_globals() {
    let mut model = Model::new();
    let top = pyssa_compiler::QualName::toplevel("dummy");
    let mut frame = Frame::new(top.clone());

    // def f(): ...; f()
    let f = model.make_function(top.child("f"), Vec::new());
    model.store_name(&mut frame, "f".into(), f);
    let callee = model.load_global(&"f".into());
    assert_eq!(
        model.call(callee, &[]).unwrap(),
        CallOutcome::Invoke {
            function: top.child("f"),
            args: Vec::new(),
        }
    );
}
