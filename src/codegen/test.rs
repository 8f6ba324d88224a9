use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use inkwell::context::Context;

use crate::codegen::jit::Jit;
use crate::codegen::LlvmCodegen;
use crate::lexer::JackLexer;
use crate::parser::Parser;
use crate::runtime::{Inspected, Runtime};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn run_sources(sources: &[&str], input: &str) -> (i32, String, Box<Runtime>) {
    let out = SharedBuf::default();
    let mut runtime = Runtime::new(
        Box::new(io::Cursor::new(input.as_bytes().to_vec())),
        Box::new(out.clone()),
    );
    for (i, source) in sources.iter().enumerate() {
        let ast = Parser::new(JackLexer::new(source), format!("test{}.jack", i))
            .parse_class()
            .expect("expected the source to parse");
        runtime.add_unit(ast);
    }
    let module = runtime.codegen().expect("codegen failed");

    let context = Context::create();
    let mut backend = LlvmCodegen::new(&context, "jack-test");
    backend.generate_module(&module).expect("lowering failed");
    let jit = Jit::new(backend.module()).expect("jit setup failed");
    let result = jit.run_main().expect("running Main.main failed");
    (result, out.contents(), runtime)
}

fn run_main_body(body: &str) -> i32 {
    let source = format!("class Main {{ function int main() {{ {} }} }}", body);
    run_sources(&[&source], "").0
}

#[test]
fn addition() {
    assert_eq!(run_main_body("return 5 + 15;"), 20);
}

#[test]
fn multiplication() {
    assert_eq!(run_main_body("return 5 * 15;"), 75);
}

#[test]
fn division_truncates() {
    assert_eq!(run_main_body("return 15 / 4;"), 3);
}

#[test]
fn negation() {
    assert_eq!(run_main_body("return -10;"), -10);
}

#[test]
fn bitwise_not() {
    assert_eq!(run_main_body("return ~10;"), -11);
}

#[test]
fn bitwise_and_or() {
    assert_eq!(run_main_body("return 2 | 1;"), 3);
    assert_eq!(run_main_body("return 3 & 1;"), 1);
}

#[test]
fn operators_evaluate_left_to_right() {
    assert_eq!(run_main_body("return 5 + 3 * 10;"), 80);
    assert_eq!(run_main_body("return 2 + 3 * 4 + 5;"), 25);
}

#[test]
fn let_and_return_a_local() {
    assert_eq!(run_main_body("var int x; let x = 150; return x;"), 150);
}

#[test]
fn while_counts_up() {
    assert_eq!(
        run_main_body(
            "var int x; let x = 100; while (x < 150) { let x = x + 1; } return x;"
        ),
        150
    );
}

#[test]
fn if_takes_the_then_branch() {
    assert_eq!(
        run_main_body(
            "var int x; if (0 = 0) { let x = 150; } else { let x = 100; } return x;"
        ),
        150
    );
}

#[test]
fn if_takes_the_else_branch() {
    assert_eq!(
        run_main_body(
            "var int x; if (0 = 1) { let x = 150; } else { let x = 100; } return x;"
        ),
        100
    );
}

#[test]
fn early_returns() {
    let source = "class Main { \
        function int pick(int x) { if (x = 0) { return 1; } return 2; } \
        function int main() { return Main.pick(0) * 10 + Main.pick(1); } }";
    assert_eq!(run_sources(&[source], "").0, 12);
}

#[test]
fn function_arguments() {
    let source = "class Main { \
        function int add(int a, int b, int c) { return c + a + b; } \
        function int main() { return Main.add(3, 4, 3); } }";
    assert_eq!(run_sources(&[source], "").0, 10);
}

#[test]
fn forward_referenced_function_runs() {
    let source = "class Main { \
        function int main() { return Main.late(); } \
        function int late() { return 42; } }";
    assert_eq!(run_sources(&[source], "").0, 42);
}

#[test]
fn forward_reference_across_units() {
    let main = "class Main { function int main() { return Helper.seven(); } }";
    let helper = "class Helper { function int seven() { return 7; } }";
    assert_eq!(run_sources(&[main, helper], "").0, 7);
}

#[test]
fn statics_are_shared_across_calls() {
    let source = "class Main { \
        static int counter; \
        function int bump() { let counter = counter + 1; return counter; } \
        function int main() { do Main.bump(); do Main.bump(); return Main.bump(); } }";
    assert_eq!(run_sources(&[source], "").0, 3);
}

#[test]
fn constructor_and_method_dispatch() {
    let source = "class Main { \
        field int member; \
        constructor Main new() { let member = 100; return this; } \
        method int callable() { return member; } \
        method int wrapper() { return callable(); } \
        function int main() { var Main inst; let inst = Main.new(); return inst.wrapper(); } }";
    assert_eq!(run_sources(&[source], "").0, 100);
}

#[test]
fn array_elements_store_and_load() {
    let source = "class Main { function int main() { \
        var Array arr; \
        let arr = Array.new(10); \
        let arr[5] = 10; \
        let arr[2 + 3] = arr[5] + 40; \
        return arr[5]; } }";
    assert_eq!(run_sources(&[source], "").0, 50);
}

#[test]
fn string_set_char_at_round_trips() {
    let source = "class Main { function int main() { \
        var String s; var String t; var char c; \
        let s = \"abc\"; \
        let c = s.charAt(0); \
        let t = \"xyz\"; \
        do t.setCharAt(2, c); \
        return t.charAt(2); } }";
    assert_eq!(run_sources(&[source], "").0, 97);
}

#[test]
fn string_append_and_erase() {
    let source = "class Main { function int main() { \
        var String s; var String a; \
        let s = String.new(5); \
        let a = \"x\"; \
        do s.appendChar(a.charAt(0)); \
        do s.appendChar(a.charAt(0)); \
        do s.eraseLastChar(); \
        return s.length(); } }";
    assert_eq!(run_sources(&[source], "").0, 1);
}

#[test]
fn output_print_string_is_captured() {
    let source = "class Main { function int main() { \
        do Output.printString(\"hi\"); return 0; } }";
    let (result, output, _) = run_sources(&[source], "");
    assert_eq!(result, 0);
    assert_eq!(output, "hi");
}

#[test]
fn output_print_int_and_println() {
    let source = "class Main { function int main() { \
        do Output.printInt(11020); do Output.println(); return 0; } }";
    let (_, output, _) = run_sources(&[source], "");
    assert_eq!(output, "11020\n");
}

#[test]
fn output_print_char() {
    let source = "class Main { function int main() { \
        var String a; let a = \"q\"; \
        do Output.printChar(a.charAt(0)); return 0; } }";
    let (_, output, _) = run_sources(&[source], "");
    assert_eq!(output, "q");
}

#[test]
fn keyboard_read_int() {
    let source = "class Main { function int main() { \
        var int v; \
        let v = Keyboard.readInt(\"prompt: \"); \
        return v; } }";
    let (result, output, _) = run_sources(&[source], "1245");
    assert_eq!(result, 1245);
    assert_eq!(output, "prompt: ");
}

#[test]
fn keyboard_read_line_reaches_the_inspector() {
    let source = "class Main { function int main() { \
        var String line; \
        let line = Keyboard.readLine(\"say: \"); \
        do Test.inspectStr(line); \
        return 0; } }";
    let (_, output, runtime) = run_sources(&[source], "The input");
    assert_eq!(output, "say: ");
    assert_eq!(
        runtime.inspected(),
        Some(&Inspected::Str("The input".to_string()))
    );
}

#[test]
fn test_inspectors_capture_values() {
    let source = "class Main { function int main() { \
        do Test.inspectInt(41); \
        do Test.inspectBool(true); \
        return 0; } }";
    let (_, _, runtime) = run_sources(&[source], "");
    assert_eq!(runtime.inspected(), Some(&Inspected::Bool(true)));
}

#[test]
fn ast_root_pretty_prints_through_the_builtin() {
    let source = "class Main { function int main() { \
        do ASTNode.print(ASTNode.getRoot()); return 0; } }";
    let (_, output, _) = run_sources(&[source], "");
    assert!(output.contains("Class: Main"));
    assert!(output.contains("StaticDecl: int main"));
}

#[test]
fn running_main_twice_yields_the_same_result() {
    let source = "class Main { function int main() { return 3 * 4 + 5; } }";
    let out = SharedBuf::default();
    let mut runtime = Runtime::new(
        Box::new(io::Cursor::new(Vec::new())),
        Box::new(out.clone()),
    );
    let ast = Parser::new(JackLexer::new(source), "test.jack".to_string())
        .parse_class()
        .expect("expected the source to parse");
    runtime.add_unit(ast);
    let module = runtime.codegen().expect("codegen failed");

    let context = Context::create();
    let mut backend = LlvmCodegen::new(&context, "jack-test");
    backend.generate_module(&module).expect("lowering failed");
    let jit = Jit::new(backend.module()).expect("jit setup failed");
    let first = jit.run_main().expect("running Main.main failed");
    let second = jit.run_main().expect("running Main.main failed");
    assert_eq!(first, second);
    assert_eq!(first, 17);
}
