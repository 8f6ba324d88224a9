use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use ariadne::Source;
use inkwell::context::Context;
use yansi::Paint;

use jackc::ast::Ast;
use jackc::codegen::jit::Jit;
use jackc::codegen::LlvmCodegen;
use jackc::lexer::{self, JackLexer};
use jackc::parser::{Parser, SyntaxError};
use jackc::runtime::Runtime;

fn position(source: &str, offset: usize) -> (u32, u32) {
    let (mut line, mut column) = (1, 1);
    for c in source[..offset.min(source.len())].chars() {
        match c {
            '\n' => {
                line += 1;
                column = 1;
            }
            '\t' => column += 2,
            _ => column += 1,
        }
    }
    (line, column)
}

fn compile_file(path: &Path) -> Result<Ast, SyntaxError> {
    let file = path.display().to_string();
    println!("{} {} ...", "Compiling".green().bold(), file);

    let source = fs::read_to_string(path).map_err(|e| SyntaxError {
        file: file.clone(),
        line: 1,
        column: 1,
        message: format!("Cannot read file: {}", e),
        span: 0..0,
    })?;

    // Refuse a unit containing characters the lexer does not accept.
    if let Some(span) = lexer::first_invalid_span(&source) {
        let (line, column) = position(&source, span.start);
        return Err(SyntaxError {
            file,
            line,
            column,
            message: format!("Unrecognized character {:?}", &source[span.clone()]),
            span,
        });
    }

    Parser::new(JackLexer::new(&source), file).parse_class()
}

fn report(err: &SyntaxError, path: &Path) {
    eprintln!("{}", err);
    if let Ok(source) = fs::read_to_string(path) {
        let _ = err
            .report()
            .eprint((err.file.clone(), Source::from(source)));
    }
}

fn main() -> ExitCode {
    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        eprintln!("Usage: jackc <file-or-dir> [<file-or-dir> ...]");
        return ExitCode::FAILURE;
    }

    // Named files compile regardless of extension; directories are scanned
    // non-recursively for .jack files.
    let mut files: Vec<PathBuf> = Vec::new();
    for input in &inputs {
        let path = PathBuf::from(input);
        if path.is_dir() {
            println!("{} directory {} ...", "Compiling".green().bold(), input);
            let entries = match fs::read_dir(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("Cannot read directory {}: {}", input, e);
                    return ExitCode::FAILURE;
                }
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| {
                    p.is_file() && p.extension().map(|ext| ext == "jack").unwrap_or(false)
                })
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path);
        } else {
            eprintln!("Unknown path {}", input);
            return ExitCode::FAILURE;
        }
    }

    // One compile task per unit; results are collected in input order.
    let results: Vec<Result<Ast, SyntaxError>> = thread::scope(|s| {
        let handles: Vec<_> = files
            .iter()
            .map(|path| s.spawn(move || compile_file(path)))
            .collect();
        handles
            .into_iter()
            .zip(&files)
            .map(|(handle, path)| {
                handle.join().unwrap_or_else(|_| {
                    Err(SyntaxError {
                        file: path.display().to_string(),
                        line: 1,
                        column: 1,
                        message: "Compile task panicked".to_string(),
                        span: 0..0,
                    })
                })
            })
            .collect()
    });

    let mut runtime = Runtime::new(Box::new(io::stdin().lock()), Box::new(io::stdout()));
    let mut had_error = false;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(ast) => runtime.add_unit(ast),
            Err(err) => {
                report(&err, path);
                had_error = true;
            }
        }
    }
    if had_error {
        return ExitCode::FAILURE;
    }

    let module = match runtime.codegen() {
        Ok(module) => module,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let context = Context::create();
    let mut backend = LlvmCodegen::new(&context, "jack");
    if let Err(err) = backend.generate_module(&module) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    let jit = match Jit::new(backend.module()) {
        Ok(jit) => jit,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    println!("{} Main.main ...", "Running".green().bold());
    match jit.run_main() {
        Ok(result) => {
            println!("Main.main returned {}", result);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
