use super::*;
use crate::ast::{pretty, Ast, BinOp, Expr, FunctionKind, Place, Stmt};
use crate::lexer::JackLexer;

fn parse(source: &str) -> Result<Ast, SyntaxError> {
    Parser::new(JackLexer::new(source), "test.jack".to_string()).parse_class()
}

fn parse_ok(source: &str) -> Ast {
    parse(source).expect("expected the source to parse")
}

#[test]
fn single_function_class() {
    let ast = parse_ok("class C { function int f() { return 10; } }");
    assert_eq!(ast.class.name, "C");
    assert_eq!(ast.class.functions.len(), 1);
    assert!(ast.class.methods.is_empty());

    let f = ast.function(ast.class.functions[0]);
    assert_eq!(f.name, "f");
    assert_eq!(f.return_type, "int");
    assert_eq!(f.kind, FunctionKind::Function);
    assert!(f.params.is_empty());
    assert_eq!(f.body.stmts, vec![Stmt::Return(Expr::IntConst(10))]);
}

#[test]
fn fields_and_statics_keep_declaration_order() {
    let ast = parse_ok(
        "class C { field int x, y; static boolean flag; field char z; \
         function void f() { return; } }",
    );
    let names: Vec<&str> = ast.class.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y", "z"]);
    assert_eq!(ast.class.field_index("y"), Some(1));
    assert_eq!(ast.class.field_index("z"), Some(2));
    assert_eq!(ast.class.statics.len(), 1);
    assert_eq!(ast.class.table.lookup("flag").map(|v| v.ty.as_str()), Some("boolean"));
}

#[test]
fn method_gets_a_synthetic_this_parameter() {
    let ast = parse_ok("class Point { field int x; method int getx() { return x; } }");
    let m = ast.function(ast.class.methods[0]);
    assert_eq!(m.params[0].name, "this");
    assert_eq!(m.params[0].ty, "Point");
    assert_eq!(m.table.lookup("this").map(|v| v.ty.as_str()), Some("Point"));
}

#[test]
fn constructor_is_kept_with_the_functions() {
    let ast = parse_ok("class Point { constructor Point new() { return this; } }");
    assert_eq!(ast.class.functions.len(), 1);
    let ctor = ast.function(ast.class.functions[0]);
    assert_eq!(ctor.kind, FunctionKind::Constructor);
    assert_eq!(ctor.return_type, "Point");
    assert!(ctor.params.is_empty());
}

#[test]
fn named_values_carry_their_enclosing_function() {
    let ast = parse_ok("class C { function int f(int a) { var int b; let b = a; return b; } }");
    let f = ast.function(ast.class.functions[0]);

    let Stmt::Let { place, expr } = &f.body.stmts[1] else {
        panic!("expected a let statement");
    };
    let Place::Var(assignee) = place else {
        panic!("expected a plain assignee");
    };
    assert_eq!(assignee.semantic_type(&ast), Some("int"));

    let Expr::RValue(inner) = expr else {
        panic!("expected a loaded value on the right-hand side");
    };
    let Expr::Place(Place::Var(used)) = inner.as_ref() else {
        panic!("expected an identifier use");
    };
    assert_eq!(used.name, "a");
    assert_eq!(used.semantic_type(&ast), Some("int"));
}

#[test]
fn field_names_resolve_through_the_class_scope() {
    let ast = parse_ok("class C { field int total; method int get() { return total; } }");
    let m = ast.function(ast.class.methods[0]);
    let Stmt::Return(Expr::RValue(inner)) = &m.body.stmts[0] else {
        panic!("expected return of a loaded value");
    };
    let Expr::Place(Place::Var(value)) = inner.as_ref() else {
        panic!("expected an identifier use");
    };
    assert_eq!(value.semantic_type(&ast), Some("int"));
}

#[test]
fn undefined_identifier_is_a_syntax_error() {
    let err = parse("class C { function int f() { return x; } }").unwrap_err();
    assert!(err.message.contains("Undefined identifier x"), "{}", err.message);
    assert_eq!(err.file, "test.jack");
}

#[test]
fn missing_semicolon_is_reported_with_position() {
    let err = parse("class C { function int f() {\n  return 10 }\n}").unwrap_err();
    assert!(err.message.contains("Expected Symbol: ;"), "{}", err.message);
    assert_eq!(err.line, 2);
}

#[test]
fn expected_token_message_names_the_actual_token() {
    let err = parse("class 5 { }").unwrap_err();
    assert!(err.message.contains("IntegerConstant: 5"), "{}", err.message);
}

#[test]
fn call_disambiguation() {
    let ast = parse_ok(
        "class C { \
           method void m() { return; } \
           method void s() { do m(); return; } \
           function void f() { var C c; let c = C.create(); do c.m(); do Other.go(); return; } \
         }",
    );
    let f = ast.function(ast.class.functions[0]);

    // `C` is not in scope, so `C.create()` is a class-qualified call.
    let Stmt::Let { expr, .. } = &f.body.stmts[1] else {
        panic!("expected a let statement");
    };
    let Expr::FunctionCall(create) = expr else {
        panic!("expected a function call, got {:?}", expr);
    };
    assert_eq!((create.class.as_str(), create.name.as_str()), ("C", "create"));

    // `c` is in scope, so `c.m()` is a method call with a bound callee.
    let Stmt::Do(Expr::MethodCall(on_c)) = &f.body.stmts[2] else {
        panic!("expected a method call");
    };
    assert!(matches!(&on_c.callee, Some(Place::Var(v)) if v.name == "c"));

    // `Other` is not in scope.
    let Stmt::Do(Expr::FunctionCall(other)) = &f.body.stmts[3] else {
        panic!("expected a function call");
    };
    assert_eq!(other.class, "Other");

    // A bare name is a call on the current object.
    let s = ast.function(ast.class.methods[1]);
    let Stmt::Do(Expr::MethodCall(bare)) = &s.body.stmts[0] else {
        panic!("expected a method call");
    };
    assert!(bare.callee.is_none());
    assert_eq!(bare.name, "m");
}

#[test]
fn let_into_an_array_element() {
    let ast = parse_ok(
        "class C { function void f() { var Array a; let a[1] = 2; return; } }",
    );
    let f = ast.function(ast.class.functions[0]);
    let Stmt::Let { place, expr } = &f.body.stmts[1] else {
        panic!("expected a let statement");
    };
    let Place::Index(index) = place else {
        panic!("expected an indexed assignee");
    };
    assert_eq!(index.array.name, "a");
    assert_eq!(*index.index, Expr::IntConst(1));
    assert_eq!(*expr, Expr::IntConst(2));
}

#[test]
fn operators_reduce_left_to_right() {
    let ast = parse_ok("class C { function int f() { return 1 + 2 * 3; } }");
    let f = ast.function(ast.class.functions[0]);
    let Stmt::Return(Expr::Binary { op, lhs, .. }) = &f.body.stmts[0] else {
        panic!("expected a binary return");
    };
    // ((1 + 2) * 3): the outermost node is the last operator.
    assert_eq!(*op, BinOp::Mul);
    assert!(matches!(lhs.as_ref(), Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn unary_and_keyword_terms() {
    let ast = parse_ok(
        "class C { function int f() { var boolean b; let b = true; return ~10; } }",
    );
    let f = ast.function(ast.class.functions[0]);
    assert!(matches!(&f.body.stmts[1], Stmt::Let { expr: Expr::True, .. }));
    let Stmt::Return(Expr::Unary { op, operand }) = &f.body.stmts[2] else {
        panic!("expected a unary return");
    };
    assert_eq!(*op, crate::ast::UnOp::Not);
    assert_eq!(**operand, Expr::IntConst(10));
}

#[test]
fn null_parses_as_integer_zero() {
    let ast = parse_ok("class C { function int f() { return null; } }");
    let f = ast.function(ast.class.functions[0]);
    assert_eq!(f.body.stmts[0], Stmt::Return(Expr::IntConst(0)));
}

#[test]
fn string_constant_argument() {
    let ast = parse_ok("class C { function void f() { do Output.printString(\"hi\"); return; } }");
    let f = ast.function(ast.class.functions[0]);
    let Stmt::Do(Expr::FunctionCall(call)) = &f.body.stmts[0] else {
        panic!("expected a function call");
    };
    assert_eq!(call.args, vec![Expr::StrConst("hi".to_string())]);
}

#[test]
fn if_with_else_and_while() {
    let ast = parse_ok(
        "class C { function int f() { var int x; let x = 0; \
           while (x < 10) { let x = x + 1; } \
           if (x = 10) { return 1; } else { return 0; } \
         } }",
    );
    let f = ast.function(ast.class.functions[0]);
    assert!(matches!(&f.body.stmts[2], Stmt::While { .. }));
    let Stmt::If { else_branch, .. } = &f.body.stmts[3] else {
        panic!("expected an if statement");
    };
    assert!(else_branch.is_some());
}

#[test]
fn pretty_print_is_stable() {
    let ast = parse_ok(
        "class C { field int x; method int get() { return x; } \
         function int f() { return 1 + 2; } }",
    );
    let first = pretty::print(&ast);
    assert_eq!(first, pretty::print(&ast));
    assert!(first.contains("Class: C"));
    assert!(first.contains("MethodDecl: int get"));
    assert!(first.contains("StaticDecl: int f"));
}
