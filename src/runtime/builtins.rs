//! The built-ins bridge: host-implemented classes exposed to compiled code
//! through IR wrapper functions.
//!
//! Each wrapper carries the mangled `__<Class>__<Name>` symbol, forwards
//! its formals through stack slots, and performs a single indirect call
//! through the host function's address embedded as an integer literal. The
//! runtime flavor prepends a hidden first argument bound to a literal
//! pointer to the [`Runtime`] context, which is how host functions reach
//! the streams and the compiled ASTs without any global state.
//!
//! Bridge classes are `{ ptr }` structs marshalled by value: one field
//! holding the host implementation pointer. User code treats them opaquely
//! but can address field zero; for `Array` that field is the element
//! storage itself, which index expressions walk directly.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::io::Write;

use crate::ast::{pretty, Ast};
use crate::ir::{
    mangle, BasicBlock, Constant, Function, IRType, Instruction, Module, StructType, Terminator,
    Value,
};
use crate::runtime::{Inspected, Runtime};

/// Register the six host classes into the module, ahead of any user code.
pub(crate) fn register(module: &mut Module, rt: *mut Runtime) {
    register_test(module, rt);
    register_array(module);
    register_string(module);
    register_output(module, rt);
    register_astnode(module, rt);
    register_keyboard(module, rt);
}

fn class_ty(name: &str) -> IRType {
    IRType::Struct {
        name: name.to_string(),
    }
}

// -- host object layout ----------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ArrayObj {
    data: *mut i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct StringObj {
    data: *mut String,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct AstNodeObj {
    node: *const Ast,
}

// -- Array -----------------------------------------------------------------

// Element storage carries a hidden length prefix so dispose can free
// exactly what new allocated.
extern "C" fn array_new(size: i32) -> ArrayObj {
    let len = size.max(0) as usize;
    let layout = Layout::array::<i32>(len + 1).expect("array size overflow");
    let base = unsafe { alloc_zeroed(layout) } as *mut i32;
    unsafe { *base = len as i32 };
    ArrayObj {
        data: unsafe { base.add(1) },
    }
}

extern "C" fn array_dispose(arr: ArrayObj) {
    unsafe {
        let base = arr.data.sub(1);
        let len = *base as usize;
        dealloc(
            base as *mut u8,
            Layout::array::<i32>(len + 1).expect("array size overflow"),
        );
    }
}

fn register_array(module: &mut Module) {
    let mut cls = BuiltinClass::new(module, "Array");
    cls.add_function("new", &[IRType::I32], class_ty("Array"), array_new as usize);
    cls.add_function(
        "dispose",
        &[class_ty("Array")],
        IRType::Void,
        array_dispose as usize,
    );
}

// -- String ----------------------------------------------------------------

extern "C" fn string_new(size: i32) -> StringObj {
    StringObj {
        data: Box::into_raw(Box::new(String::with_capacity(size.max(0) as usize))),
    }
}

extern "C" fn string_dispose(str_: StringObj) {
    unsafe {
        drop(Box::from_raw(str_.data));
    }
}

extern "C" fn string_length(str_: StringObj) -> i32 {
    unsafe { (*str_.data).len() as i32 }
}

extern "C" fn string_char_at(str_: StringObj, idx: i32) -> u8 {
    unsafe {
        (*str_.data)
            .as_bytes()
            .get(idx as usize)
            .copied()
            .unwrap_or(0)
    }
}

extern "C" fn string_set_char_at(str_: StringObj, idx: i32, c: u8) {
    unsafe {
        let string = &mut *str_.data;
        let idx = idx as usize;
        if idx < string.len() {
            string.as_mut_vec()[idx] = c;
        }
    }
}

extern "C" fn string_append_char(str_: StringObj, c: u8) -> StringObj {
    unsafe {
        (*str_.data).push(c as char);
    }
    str_
}

extern "C" fn string_erase_last_char(str_: StringObj) {
    unsafe {
        (*str_.data).pop();
    }
}

// Conversion from a NUL-terminated literal; string constants in compiled
// code are materialized through this.
extern "C" fn string_ptrtostr(chars: *const u8) -> StringObj {
    let mut text = String::new();
    let mut p = chars;
    unsafe {
        while *p != 0 {
            text.push(*p as char);
            p = p.add(1);
        }
    }
    StringObj {
        data: Box::into_raw(Box::new(text)),
    }
}

fn register_string(module: &mut Module) {
    let string = class_ty("String");
    let mut cls = BuiltinClass::new(module, "String");
    cls.add_function("new", &[IRType::I32], string.clone(), string_new as usize);
    cls.add_function(
        "dispose",
        &[string.clone()],
        IRType::Void,
        string_dispose as usize,
    );
    cls.add_function(
        "length",
        &[string.clone()],
        IRType::I32,
        string_length as usize,
    );
    cls.add_function(
        "charAt",
        &[string.clone(), IRType::I32],
        IRType::I8,
        string_char_at as usize,
    );
    cls.add_function(
        "setCharAt",
        &[string.clone(), IRType::I32, IRType::I8],
        IRType::Void,
        string_set_char_at as usize,
    );
    cls.add_function(
        "appendChar",
        &[string.clone(), IRType::I8],
        string.clone(),
        string_append_char as usize,
    );
    cls.add_function(
        "eraseLastChar",
        &[string.clone()],
        IRType::Void,
        string_erase_last_char as usize,
    );
    cls.add_function(
        "ptrtostr",
        &[IRType::Ptr],
        string,
        string_ptrtostr as usize,
    );
}

// -- Output ----------------------------------------------------------------

extern "C" fn output_print_char(rt: *mut Runtime, c: u8) {
    let rt = unsafe { &mut *rt };
    let _ = write!(rt.out(), "{}", c as char);
}

extern "C" fn output_print_string(rt: *mut Runtime, str_: StringObj) {
    let rt = unsafe { &mut *rt };
    let text = unsafe { &*str_.data };
    let _ = write!(rt.out(), "{}", text);
}

extern "C" fn output_print_int(rt: *mut Runtime, i: i32) {
    let rt = unsafe { &mut *rt };
    let _ = write!(rt.out(), "{}", i);
}

extern "C" fn output_println(rt: *mut Runtime) {
    let rt = unsafe { &mut *rt };
    let _ = writeln!(rt.out());
}

fn register_output(module: &mut Module, rt: *mut Runtime) {
    let mut cls = BuiltinClass::new(module, "Output");
    cls.add_runtime_function(
        rt,
        "printChar",
        &[IRType::I8],
        IRType::Void,
        output_print_char as usize,
    );
    cls.add_runtime_function(
        rt,
        "printString",
        &[class_ty("String")],
        IRType::Void,
        output_print_string as usize,
    );
    cls.add_runtime_function(
        rt,
        "printInt",
        &[IRType::I32],
        IRType::Void,
        output_print_int as usize,
    );
    cls.add_runtime_function(rt, "println", &[], IRType::Void, output_println as usize);
}

// -- Keyboard --------------------------------------------------------------

extern "C" fn keyboard_read_line(rt: *mut Runtime, msg: StringObj) -> StringObj {
    let rt = unsafe { &mut *rt };
    let prompt = unsafe { &*msg.data };
    let _ = write!(rt.out(), "{}", prompt);
    let line = rt.read_words();
    StringObj {
        data: Box::into_raw(Box::new(line)),
    }
}

extern "C" fn keyboard_read_int(rt: *mut Runtime, msg: StringObj) -> i32 {
    let rt = unsafe { &mut *rt };
    let prompt = unsafe { &*msg.data };
    let _ = write!(rt.out(), "{}", prompt);
    rt.read_token().parse().unwrap_or(0)
}

fn register_keyboard(module: &mut Module, rt: *mut Runtime) {
    let string = class_ty("String");
    let mut cls = BuiltinClass::new(module, "Keyboard");
    cls.add_runtime_function(
        rt,
        "readLine",
        &[string.clone()],
        string.clone(),
        keyboard_read_line as usize,
    );
    cls.add_runtime_function(
        rt,
        "readInt",
        &[string],
        IRType::I32,
        keyboard_read_int as usize,
    );
}

// -- ASTNode ---------------------------------------------------------------

extern "C" fn astnode_get_root(rt: *mut Runtime) -> AstNodeObj {
    let rt = unsafe { &mut *rt };
    let node = match rt.unit(0) {
        Some(ast) => ast as *const Ast,
        None => std::ptr::null(),
    };
    AstNodeObj { node }
}

extern "C" fn astnode_print(rt: *mut Runtime, node: AstNodeObj) {
    let rt = unsafe { &mut *rt };
    if node.node.is_null() {
        return;
    }
    let text = pretty::print(unsafe { &*node.node });
    let _ = write!(rt.out(), "{}", text);
}

fn register_astnode(module: &mut Module, rt: *mut Runtime) {
    let node = class_ty("ASTNode");
    let mut cls = BuiltinClass::new(module, "ASTNode");
    cls.add_runtime_function(rt, "getRoot", &[], node.clone(), astnode_get_root as usize);
    cls.add_runtime_function(rt, "print", &[node], IRType::Void, astnode_print as usize);
}

// -- Test ------------------------------------------------------------------

extern "C" fn test_inspect_str(rt: *mut Runtime, str_: StringObj) {
    let rt = unsafe { &mut *rt };
    let text = unsafe { (*str_.data).clone() };
    rt.set_inspected(Inspected::Str(text));
}

extern "C" fn test_inspect_int(rt: *mut Runtime, value: i32) {
    let rt = unsafe { &mut *rt };
    rt.set_inspected(Inspected::Int(value));
}

extern "C" fn test_inspect_char(rt: *mut Runtime, value: u8) {
    let rt = unsafe { &mut *rt };
    rt.set_inspected(Inspected::Char(value));
}

extern "C" fn test_inspect_bool(rt: *mut Runtime, value: bool) {
    let rt = unsafe { &mut *rt };
    rt.set_inspected(Inspected::Bool(value));
}

fn register_test(module: &mut Module, rt: *mut Runtime) {
    let mut cls = BuiltinClass::new(module, "Test");
    cls.add_runtime_function(
        rt,
        "inspectStr",
        &[class_ty("String")],
        IRType::Void,
        test_inspect_str as usize,
    );
    cls.add_runtime_function(
        rt,
        "inspectInt",
        &[IRType::I32],
        IRType::Void,
        test_inspect_int as usize,
    );
    cls.add_runtime_function(
        rt,
        "inspectChar",
        &[IRType::I8],
        IRType::Void,
        test_inspect_char as usize,
    );
    cls.add_runtime_function(
        rt,
        "inspectBool",
        &[IRType::I1],
        IRType::Void,
        test_inspect_bool as usize,
    );
}

// -- wrapper emission ------------------------------------------------------

/// Emits one host class: its `{ ptr }` struct type plus a wrapper function
/// per registered host entry point.
struct BuiltinClass<'m> {
    module: &'m mut Module,
    class: &'static str,
}

impl<'m> BuiltinClass<'m> {
    fn new(module: &'m mut Module, class: &'static str) -> Self {
        match module.struct_types.iter_mut().find(|s| s.name == class) {
            Some(existing) => existing.fields = vec![IRType::Ptr],
            None => module.struct_types.push(StructType {
                name: class.to_string(),
                fields: vec![IRType::Ptr],
            }),
        }
        BuiltinClass { module, class }
    }

    fn add_function(&mut self, name: &str, params: &[IRType], ret: IRType, addr: usize) {
        self.emit(name, params, ret, addr, None);
    }

    /// Same wrapper with a hidden first argument: a literal pointer to the
    /// runtime context.
    fn add_runtime_function(
        &mut self,
        rt: *mut Runtime,
        name: &str,
        params: &[IRType],
        ret: IRType,
        addr: usize,
    ) {
        self.emit(name, params, ret, addr, Some(rt as usize));
    }

    fn emit(
        &mut self,
        name: &str,
        params: &[IRType],
        ret: IRType,
        addr: usize,
        context: Option<usize>,
    ) {
        let mut block = BasicBlock::new("entry".to_string());
        let mut counter = 0usize;
        let mut next = move || {
            counter += 1;
            format!("%{}", counter)
        };

        let mut args: Vec<Value> = Vec::new();
        let mut host_params: Vec<IRType> = Vec::new();

        if let Some(ctx) = context {
            let dest = next();
            block.instructions.push(Instruction::IntToPtr {
                dest: dest.clone(),
                value: Value::Constant(Constant::I64(ctx as i64)),
            });
            args.push(Value::Register(dest));
            host_params.push(IRType::Ptr);
        }

        // Materialize each formal into a stack slot and reload it, pinning
        // down the calling convention before the indirect call.
        let formals: Vec<(String, IRType)> = params
            .iter()
            .enumerate()
            .map(|(i, ty)| (format!("p{}", i), ty.clone()))
            .collect();
        for (formal, ty) in &formals {
            let slot = next();
            block.instructions.push(Instruction::Alloca {
                dest: slot.clone(),
                ty: ty.clone(),
            });
            block.instructions.push(Instruction::Store {
                value: Value::Argument(formal.clone()),
                ptr: Value::Register(slot.clone()),
            });
            let loaded = next();
            block.instructions.push(Instruction::Load {
                dest: loaded.clone(),
                ptr: Value::Register(slot),
                ty: ty.clone(),
            });
            args.push(Value::Register(loaded));
            host_params.push(ty.clone());
        }

        // The host function's address as an integer literal, cast to a
        // function pointer of the inferred type.
        let fptr = next();
        block.instructions.push(Instruction::IntToPtr {
            dest: fptr.clone(),
            value: Value::Constant(Constant::I64(addr as i64)),
        });
        let sig = IRType::Function {
            params: host_params,
            return_type: Box::new(ret.clone()),
        };
        let dest = (ret != IRType::Void).then(&mut next);
        block.instructions.push(Instruction::CallPtr {
            dest: dest.clone(),
            ptr: Value::Register(fptr),
            sig,
            args,
        });
        block.terminator = Some(Terminator::Ret {
            value: dest.map(Value::Register),
        });

        self.module.functions.push(Function {
            name: mangle(self.class, name),
            params: formals,
            return_type: ret,
            blocks: vec![block],
            is_external: false,
        });
    }
}
