use super::*;
use crate::ast::Ast;
use crate::lexer::JackLexer;
use crate::parser::Parser;

fn parse(source: &str) -> Ast {
    Parser::new(JackLexer::new(source), "test.jack".to_string())
        .parse_class()
        .expect("expected the source to parse")
}

fn lower(source: &str) -> Module {
    let mut builder = IRBuilder::new("test");
    builder.codegen(&parse(source)).expect("codegen failed");
    builder.finish().expect("deferred resolution failed")
}

fn instructions(func: &Function) -> impl Iterator<Item = &Instruction> {
    func.blocks.iter().flat_map(|b| b.instructions.iter())
}

fn ret_count(func: &Function) -> usize {
    func.blocks
        .iter()
        .filter(|b| matches!(b.terminator, Some(Terminator::Ret { .. })))
        .count()
}

#[test]
fn functions_are_emitted_under_mangled_names() {
    let module = lower("class Main { function int main() { return 10; } }");
    let main = module.function("__Main__main").expect("missing symbol");
    assert_eq!(main.return_type, IRType::I32);
    assert!(!main.is_external);
    assert_eq!(main.blocks[0].label, "entry");
    assert!(matches!(
        &main.blocks[0].terminator,
        Some(Terminator::Ret {
            value: Some(Value::Constant(Constant::I32(10)))
        })
    ));
}

#[test]
fn statics_become_zero_initialized_globals() {
    let module = lower(
        "class Counter { static int count; \
         function int get() { return count; } }",
    );
    let global = module.global("__Counter__count").expect("missing static");
    assert_eq!(global.ty, IRType::I32);

    // The use resolves to the mangled global.
    let get = module.function("__Counter__get").unwrap();
    assert!(instructions(get).any(|i| matches!(
        i,
        Instruction::Load { ptr: Value::Global(name), .. } if name == "__Counter__count"
    )));
}

#[test]
fn class_struct_is_laid_out_in_field_order() {
    let module = lower(
        "class Point { field int x, y; field char tag; \
         method int getx() { return x; } }",
    );
    let st = module.struct_type("Point").expect("missing struct type");
    assert_eq!(st.fields, vec![IRType::I32, IRType::I32, IRType::I8]);
}

#[test]
fn methods_take_this_as_their_first_parameter() {
    let module = lower("class Point { field int x; method int getx() { return x; } }");
    let getx = module.function("__Point__getx").unwrap();
    assert_eq!(getx.params.len(), 1);
    assert_eq!(getx.params[0].0, "this");
    assert_eq!(
        getx.params[0].1,
        IRType::Struct {
            name: "Point".to_string()
        }
    );

    // Field access goes through this + the field index.
    assert!(instructions(getx).any(|i| matches!(
        i,
        Instruction::FieldPtr { struct_name, index: 0, .. } if struct_name == "Point"
    )));
}

#[test]
fn constructor_allocates_the_class_struct() {
    let module = lower(
        "class Point { field int x; \
         constructor Point new() { let x = 5; return this; } }",
    );
    let ctor = module.function("__Point__new").unwrap();
    assert!(ctor.blocks[0].instructions.iter().any(|i| matches!(
        i,
        Instruction::Alloca { ty: IRType::Struct { name }, .. } if name == "Point"
    )));
    assert_eq!(
        ctor.return_type,
        IRType::Struct {
            name: "Point".to_string()
        }
    );
}

#[test]
fn parameters_are_materialized_into_stack_slots() {
    let module = lower("class C { function int id(int a) { return a; } }");
    let id = module.function("__C__id").unwrap();
    let entry = &id.blocks[0];
    assert!(matches!(entry.instructions[0], Instruction::Alloca { .. }));
    assert!(matches!(
        &entry.instructions[1],
        Instruction::Store { value: Value::Argument(name), .. } if name == "a"
    ));
}

#[test]
fn if_compares_the_condition_to_true() {
    let module = lower(
        "class C { function int f(int x) { \
           if (x = 0) { return 1; } else { return 2; } \
         } }",
    );
    let f = module.function("__C__f").unwrap();
    // One compare for `x = 0`, then the explicit compare-to-true.
    let compares: Vec<_> = instructions(f)
        .filter(|i| matches!(i, Instruction::ICmp { .. }))
        .collect();
    assert_eq!(compares.len(), 2);
    assert!(matches!(
        compares[1],
        Instruction::ICmp {
            cond: ICmpCond::Eq,
            rhs: Value::Constant(Constant::Bool(true)),
            ..
        }
    ));

    let labels: Vec<&str> = f.blocks.iter().map(|b| b.label.as_str()).collect();
    assert!(labels.iter().any(|l| l.starts_with("then")));
    assert!(labels.iter().any(|l| l.starts_with("else")));
}

#[test]
fn dangling_join_block_is_dropped_when_both_arms_return() {
    let module = lower(
        "class C { function int f(int x) { \
           if (x = 0) { return 1; } else { return 2; } \
         } }",
    );
    let f = module.function("__C__f").unwrap();
    // No empty unreferenced ifcont block survives; normalization then
    // leaves a single trailing return block.
    assert!(f
        .blocks
        .iter()
        .all(|b| !b.instructions.is_empty() || b.terminator.is_some()));
    assert_eq!(ret_count(f), 1);
}

#[test]
fn while_reevaluates_its_condition_in_the_preheader() {
    let module = lower(
        "class C { function int f() { var int x; let x = 0; \
           while (x < 10) { let x = x + 1; } return x; } }",
    );
    let f = module.function("__C__f").unwrap();
    let pre = f
        .blocks
        .iter()
        .find(|b| b.label.starts_with("preheader"))
        .expect("missing preheader");
    assert!(pre
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::ICmp { cond: ICmpCond::Slt, .. })));
    assert!(matches!(&pre.terminator, Some(Terminator::CondBr { .. })));

    // The body branches back to the preheader.
    let body = f
        .blocks
        .iter()
        .find(|b| b.label.starts_with("loop"))
        .expect("missing loop block");
    assert!(matches!(
        &body.terminator,
        Some(Terminator::Br { label }) if label.starts_with("preheader")
    ));
}

#[test]
fn multi_return_functions_are_normalized_to_a_single_return() {
    let module = lower(
        "class C { function int f(int x) { \
           if (x = 0) { return 1; } \
           return 2; } }",
    );
    let f = module.function("__C__f").unwrap();
    assert_eq!(ret_count(f), 1);
    assert!(f.blocks.last().unwrap().label.starts_with("ret"));
    // The value travels through a slot allocated in the entry block.
    assert!(matches!(
        f.blocks[0].instructions[0],
        Instruction::Alloca { ty: IRType::I32, .. }
    ));
}

#[test]
fn single_return_functions_are_left_untouched() {
    let module = lower("class C { function int f() { return 1; } }");
    let f = module.function("__C__f").unwrap();
    assert_eq!(f.blocks.len(), 1);
    assert_eq!(ret_count(f), 1);
}

#[test]
fn return_coerces_integer_widths() {
    let module = lower("class C { function char f() { return 65; } }");
    let f = module.function("__C__f").unwrap();
    assert!(instructions(f).any(|i| matches!(
        i,
        Instruction::Trunc {
            from_ty: IRType::I32,
            to_ty: IRType::I8,
            ..
        }
    )));
}

#[test]
fn string_literals_lower_through_ptrtostr() {
    let mut builder = IRBuilder::new("test");
    builder
        .codegen(&parse(
            "class C { function int f() { var String s; let s = \"hi\"; return 0; } }",
        ))
        .expect("codegen failed");
    let module = builder.module();

    assert_eq!(
        module.global_strings,
        vec![("str_0".to_string(), "hi".to_string())]
    );
    let f = module.function("__C__f").unwrap();
    assert!(instructions(f).any(|i| matches!(
        i,
        Instruction::Call { func, .. } if func == "__String__ptrtostr"
    )));
}

#[test]
fn forward_references_resolve_to_the_real_function() {
    let module = lower(
        "class Main { \
           function int main() { return Main.late(); } \
           function int late() { return 42; } }",
    );
    assert!(module
        .functions
        .iter()
        .all(|f| !f.name.starts_with("__unresolved__")));
    let main = module.function("__Main__main").unwrap();
    assert!(instructions(main).any(|i| matches!(
        i,
        Instruction::Call { func, .. } if func == "__Main__late"
    )));
}

#[test]
fn mismatched_forward_reference_casts_at_the_use_site() {
    // The call site assumes int (the assignee's type); the function turns
    // out to return char.
    let module = lower(
        "class Main { \
           function int main() { var int x; let x = Main.late(); return x; } \
           function char late() { return 65; } }",
    );
    let main = module.function("__Main__main").unwrap();
    let all: Vec<_> = instructions(main).collect();
    let call_at = all
        .iter()
        .position(|i| matches!(i, Instruction::Call { func, ty, .. }
            if func == "__Main__late" && *ty == IRType::I8))
        .expect("missing resolved call");
    assert!(matches!(
        all[call_at + 1],
        Instruction::SExt {
            from_ty: IRType::I8,
            to_ty: IRType::I32,
            ..
        }
    ));
}

#[test]
fn unresolved_forward_reference_is_an_internal_error() {
    let mut builder = IRBuilder::new("test");
    builder
        .codegen(&parse(
            "class Main { function int main() { return Missing.f(); } }",
        ))
        .expect("codegen failed");
    let err = builder.finish().unwrap_err();
    assert!(err.message.contains("Missing"), "{}", err.message);
    assert!(!err.module_dump.is_empty());
}

#[test]
fn index_expressions_walk_the_data_pointer() {
    let module = lower(
        "class C { function int f() { var Array a; let a[2] = 7; return a[2]; } }",
    );
    let f = module.function("__C__f").unwrap();
    // GEP to field zero, load the data pointer, GEP by the index.
    assert!(instructions(f).any(|i| matches!(
        i,
        Instruction::FieldPtr { struct_name, index: 0, .. } if struct_name == "Array"
    )));
    assert!(instructions(f).any(|i| matches!(
        i,
        Instruction::ElemPtr { elem_ty: IRType::I32, .. }
    )));
}

#[test]
fn method_calls_prepend_the_loaded_receiver() {
    let module = lower(
        "class Point { \
           field int x; \
           constructor Point new() { let x = 3; return this; } \
           method int getx() { return x; } \
           function int probe() { var Point p; let p = Point.new(); return p.getx(); } }",
    );
    let probe = module.function("__Point__probe").unwrap();
    let call = instructions(probe)
        .find_map(|i| match i {
            Instruction::Call { func, args, .. } if func == "__Point__getx" => Some(args),
            _ => None,
        })
        .expect("missing method call");
    assert_eq!(call.len(), 1);
    assert!(matches!(call[0], Value::Register(_)));
}

#[test]
fn builtin_wrappers_call_through_an_embedded_address() {
    let mut module = Module::new("test");
    let rt = std::ptr::null_mut();
    crate::runtime::builtins::register(&mut module, rt);

    let st = module.struct_type("String").expect("missing bridge struct");
    assert_eq!(st.fields, vec![IRType::Ptr]);

    let wrapper = module.function("__String__charAt").expect("missing wrapper");
    assert_eq!(wrapper.return_type, IRType::I8);
    let body = &wrapper.blocks[0];
    // Formals forwarded through slots, then one indirect call.
    assert!(body
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::Store { value: Value::Argument(_), .. })));
    assert!(body.instructions.iter().any(|i| matches!(
        i,
        Instruction::CallPtr { sig: IRType::Function { .. }, .. }
    )));

    // The runtime flavor carries the hidden context argument.
    let println = module.function("__Output__println").expect("missing wrapper");
    let Some(Instruction::CallPtr { args, .. }) = println.blocks[0]
        .instructions
        .iter()
        .find(|i| matches!(i, Instruction::CallPtr { .. }))
    else {
        panic!("expected an indirect call");
    };
    assert_eq!(args.len(), 1);
}

#[test]
fn codegen_twice_reuses_the_module() {
    let mut builder = IRBuilder::new("test");
    builder
        .codegen(&parse("class A { function int a() { return 1; } }"))
        .expect("codegen failed");
    builder
        .codegen(&parse("class B { function int b() { return A.a(); } }"))
        .expect("codegen failed");
    let module = builder.finish().expect("resolution failed");
    assert!(module.function("__A__a").is_some());
    assert!(module.function("__B__b").is_some());
}
