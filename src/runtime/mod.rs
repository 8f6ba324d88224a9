use std::io::{BufRead, Write};

use crate::ast::Ast;
use crate::ir::{IRBuilder, InternalError, Module};

pub mod builtins;

/// Value captured by the `Test` built-ins for harness assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum Inspected {
    Str(String),
    Int(i32),
    Char(u8),
    Bool(bool),
}

/// The compile-and-run context: the input/output streams built-in classes
/// talk to, the compiled units, and the inspection slot.
///
/// Built-in wrappers reach back into this object through a literal pointer
/// embedded in their IR, so a `Runtime` is heap-pinned at construction and
/// must outlive the JITed program.
pub struct Runtime {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    units: Vec<Ast>,
    inspected: Option<Inspected>,
}

impl Runtime {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Box<Runtime> {
        Box::new(Runtime {
            input,
            output,
            units: Vec::new(),
            inspected: None,
        })
    }

    pub fn add_unit(&mut self, ast: Ast) {
        self.units.push(ast);
    }

    pub fn unit(&self, idx: usize) -> Option<&Ast> {
        self.units.get(idx)
    }

    pub fn inspected(&self) -> Option<&Inspected> {
        self.inspected.as_ref()
    }

    /// Register the built-in classes, lower every unit, resolve forward
    /// references, and yield the finished module. Ownership of the module
    /// moves to the caller (and from there to the backend host).
    pub fn codegen(&mut self) -> Result<Module, InternalError> {
        let mut builder = IRBuilder::new("jack");
        let context: *mut Runtime = self;
        builtins::register(builder.module_mut(), context);
        for ast in &self.units {
            builder.codegen(ast)?;
        }
        builder.finish()
    }

    // -- stream access for the built-in host functions ---------------------

    pub(crate) fn out(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    pub(crate) fn set_inspected(&mut self, value: Inspected) {
        self.inspected = Some(value);
    }

    /// The remaining input as whitespace-separated words joined by single
    /// spaces.
    pub(crate) fn read_words(&mut self) -> String {
        let mut buf = String::new();
        let _ = self.input.read_to_string(&mut buf);
        buf.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// The next whitespace-delimited token; the rest of the stream is left
    /// in place.
    pub(crate) fn read_token(&mut self) -> String {
        let mut token = String::new();
        loop {
            let buf = match self.input.fill_buf() {
                Ok(buf) if !buf.is_empty() => buf,
                _ => break,
            };
            let mut consumed = 0;
            let mut done = false;
            for &byte in buf {
                if byte.is_ascii_whitespace() {
                    if token.is_empty() {
                        consumed += 1;
                        continue;
                    }
                    done = true;
                    break;
                }
                consumed += 1;
                token.push(byte as char);
            }
            self.input.consume(consumed);
            if done {
                break;
            }
        }
        token
    }
}
