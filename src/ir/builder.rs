use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use super::{
    mangle, BasicBlock, Constant, Function, GlobalVar, ICmpCond, IRType, Instruction, Module,
    StructType, Terminator, Value,
};
use crate::ast::{Ast, BinOp, Block, Expr, FunctionId, FunctionKind, Place, Stmt, UnOp};

/// A violated generator invariant: an identifier that escaped the front
/// end unresolved, or a forward reference that never materialized. These
/// indicate a front-end bug; the driver prints the dump and exits.
#[derive(Debug)]
pub struct InternalError {
    pub message: String,
    pub function_dump: Option<String>,
    pub module_dump: String,
}

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Internal Error] Invalid IR: {}", self.message)?;
        writeln!(f, "Function:")?;
        match &self.function_dump {
            Some(dump) => writeln!(f, "{}", dump)?,
            None => writeln!(f, "Not found")?,
        }
        writeln!(f, "Module:")?;
        write!(f, "{}", self.module_dump)
    }
}

impl std::error::Error for InternalError {}

/// A call emitted against a function whose IR did not exist yet. Once all
/// user code is in the module, each placeholder is swapped for the real
/// symbol and deleted.
struct UnresolvedCall {
    class: String,
    name: String,
    placeholder: String,
}

/// Lowers class ASTs into the shared target module.
///
/// Holds one insertion cursor (current function + current block), the
/// per-function local value map (name to stack slot and pointee type), the
/// expected-type slot that types placeholder returns, and the worklist of
/// unresolved forward references.
pub struct IRBuilder {
    module: Module,
    current_function: Option<usize>,
    current_block: Option<usize>,
    register_counter: usize,
    label_counter: usize,
    string_counter: usize,
    unresolved_counter: usize,
    value_map: HashMap<String, (Value, IRType)>,
    expected_type: IRType,
    unresolved: Vec<UnresolvedCall>,
}

impl IRBuilder {
    pub fn new(module_name: impl Into<String>) -> Self {
        IRBuilder {
            module: Module::new(module_name),
            current_function: None,
            current_block: None,
            register_counter: 0,
            label_counter: 0,
            string_counter: 0,
            unresolved_counter: 0,
            value_map: HashMap::new(),
            expected_type: IRType::Void,
            unresolved: Vec::new(),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The builtins bridge emits its wrappers straight into the module.
    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    /// Lower one class: its struct type, its statics as module globals,
    /// then methods and functions.
    pub fn codegen(&mut self, ast: &Ast) -> Result<(), InternalError> {
        let class = &ast.class;

        let field_tys: Vec<IRType> = class
            .fields
            .iter()
            .map(|field| self.type_by_name(&field.ty))
            .collect();
        match self
            .module
            .struct_types
            .iter_mut()
            .find(|s| s.name == class.name)
        {
            Some(existing) => existing.fields = field_tys,
            None => self.module.struct_types.push(StructType {
                name: class.name.clone(),
                fields: field_tys,
            }),
        }

        for var in &class.statics {
            let ty = self.type_by_name(&var.ty);
            let name = mangle(&class.name, &var.name);
            if self.module.global(&name).is_none() {
                self.module.globals.push(GlobalVar { name, ty });
            }
        }

        for &id in &class.methods {
            self.codegen_function(ast, id)?;
        }
        for &id in &class.functions {
            self.codegen_function(ast, id)?;
        }

        Ok(())
    }

    /// Resolve every deferred forward reference, then hand the module over.
    pub fn finish(mut self) -> Result<Module, InternalError> {
        let worklist = std::mem::take(&mut self.unresolved);
        for entry in worklist {
            self.resolve(entry)?;
        }
        Ok(self.module)
    }

    fn resolve(&mut self, entry: UnresolvedCall) -> Result<(), InternalError> {
        let symbol = mangle(&entry.class, &entry.name);
        let Some(resolved) = self.module.function(&symbol) else {
            return Err(self.internal_error(format!("Missing {}.{}", entry.class, entry.name)));
        };
        let resolved_ret = resolved.return_type.clone();
        let placeholder_ret = self
            .module
            .function(&entry.placeholder)
            .map(|f| f.return_type.clone())
            .unwrap_or(IRType::Void);

        let mismatch = placeholder_ret != resolved_ret;
        if mismatch && !(placeholder_ret.is_integer() && resolved_ret.is_integer()) {
            // A used non-integer mismatch cannot be papered over with a
            // cast; only tolerable when every call site drops the result.
            let any_used = self.module.functions.iter().any(|f| {
                f.blocks.iter().any(|b| {
                    b.instructions.iter().any(|i| {
                        matches!(i, Instruction::Call { dest: Some(_), func, .. }
                                     if *func == entry.placeholder)
                    })
                })
            });
            if any_used {
                return Err(self.internal_error(format!(
                    "Return type of {}.{} does not match its forward reference",
                    entry.class, entry.name
                )));
            }
        }

        for func in &mut self.module.functions {
            for block in &mut func.blocks {
                let mut i = 0;
                while i < block.instructions.len() {
                    let retyped = match &mut block.instructions[i] {
                        Instruction::Call {
                            dest,
                            func: callee,
                            ty,
                            ..
                        } if *callee == entry.placeholder => {
                            *callee = symbol.clone();
                            *ty = resolved_ret.clone();
                            match dest {
                                Some(d) if mismatch => {
                                    // The placeholder's type was chosen from
                                    // the surrounding IR; cast back at the
                                    // use site so those constraints hold.
                                    let raw = format!("{}.raw", d);
                                    let assumed = std::mem::replace(d, raw.clone());
                                    Some((assumed, raw))
                                }
                                _ => None,
                            }
                        }
                        _ => None,
                    };

                    if let Some((assumed, raw)) = retyped {
                        let narrowing =
                            resolved_ret.bit_width() > placeholder_ret.bit_width();
                        let cast = if narrowing {
                            Instruction::Trunc {
                                dest: assumed,
                                value: Value::Register(raw),
                                from_ty: resolved_ret.clone(),
                                to_ty: placeholder_ret.clone(),
                            }
                        } else {
                            Instruction::SExt {
                                dest: assumed,
                                value: Value::Register(raw),
                                from_ty: resolved_ret.clone(),
                                to_ty: placeholder_ret.clone(),
                            }
                        };
                        block.instructions.insert(i + 1, cast);
                        i += 1;
                    }
                    i += 1;
                }
            }
        }

        self.module.functions.retain(|f| f.name != entry.placeholder);
        Ok(())
    }

    // -- function lowering -------------------------------------------------

    fn codegen_function(&mut self, ast: &Ast, id: FunctionId) -> Result<(), InternalError> {
        let func = ast.function(id);
        let params: Vec<(String, IRType)> = func
            .params
            .iter()
            .map(|p| (p.name.clone(), self.type_by_name(&p.ty)))
            .collect();
        let return_type = self.type_by_name(&func.return_type);

        self.module.functions.push(Function {
            name: mangle(&ast.class.name, &func.name),
            params: params.clone(),
            return_type,
            blocks: Vec::new(),
            is_external: false,
        });
        let func_idx = self.module.functions.len() - 1;
        self.current_function = Some(func_idx);

        let entry = self.create_block("entry".to_string());
        self.set_current_block(entry);
        self.value_map.clear();

        // Materialize every parameter into a stack slot; the value map
        // binds names to slots from here on.
        for (name, ty) in params {
            let slot = self.new_register();
            self.add_instruction(Instruction::Alloca {
                dest: slot.clone(),
                ty: ty.clone(),
            });
            self.add_instruction(Instruction::Store {
                value: Value::Argument(name.clone()),
                ptr: Value::Register(slot.clone()),
            });
            self.value_map.insert(name, (Value::Register(slot), ty));
        }

        // A constructor allocates a value of the class's struct type in its
        // entry block and binds `this` to that allocation before the body.
        if func.kind == FunctionKind::Constructor {
            let struct_ty = self.type_by_name(&ast.class.name);
            let object = self.new_register();
            self.add_instruction(Instruction::Alloca {
                dest: object.clone(),
                ty: struct_ty.clone(),
            });
            self.value_map
                .insert("this".to_string(), (Value::Register(object), struct_ty));
        }

        self.codegen_block(ast, &func.body)?;
        self.normalize_returns(func_idx);

        self.current_function = None;
        self.current_block = None;
        Ok(())
    }

    /// Rewrite a multi-return body into single-return form: one trailing
    /// return block, fed through a slot when the function yields a value.
    /// Zero- and one-return functions are left untouched.
    fn normalize_returns(&mut self, func_idx: usize) {
        let returns = self.module.functions[func_idx]
            .blocks
            .iter()
            .filter(|b| matches!(b.terminator, Some(Terminator::Ret { .. })))
            .count();
        if returns <= 1 {
            return;
        }

        let ret_label = self.new_label("ret");
        let slot = self.new_register();
        let loaded = self.new_register();

        let func = &mut self.module.functions[func_idx];
        let ret_ty = func.return_type.clone();
        let has_value = ret_ty != IRType::Void;

        for block in &mut func.blocks {
            if let Some(Terminator::Ret { value }) = &block.terminator {
                if has_value {
                    if let Some(value) = value {
                        block.instructions.push(Instruction::Store {
                            value: value.clone(),
                            ptr: Value::Register(slot.clone()),
                        });
                    }
                }
                block.terminator = Some(Terminator::Br {
                    label: ret_label.clone(),
                });
            }
        }

        let mut ret_block = BasicBlock::new(ret_label);
        if has_value {
            func.blocks[0].instructions.insert(
                0,
                Instruction::Alloca {
                    dest: slot.clone(),
                    ty: ret_ty.clone(),
                },
            );
            ret_block.instructions.push(Instruction::Load {
                dest: loaded.clone(),
                ptr: Value::Register(slot),
                ty: ret_ty,
            });
            ret_block.terminator = Some(Terminator::Ret {
                value: Some(Value::Register(loaded)),
            });
        } else {
            ret_block.terminator = Some(Terminator::Ret { value: None });
        }
        func.blocks.push(ret_block);
    }

    // -- statement lowering ------------------------------------------------

    fn codegen_block(&mut self, ast: &Ast, block: &Block) -> Result<(), InternalError> {
        for stmt in &block.stmts {
            self.codegen_stmt(ast, stmt)?;
        }
        self.drop_dead_current_block();
        Ok(())
    }

    fn codegen_stmt(&mut self, ast: &Ast, stmt: &Stmt) -> Result<(), InternalError> {
        match stmt {
            Stmt::Var(decl) => {
                let ty = self.type_by_name(&decl.ty);
                let slot = self.new_register();
                self.add_instruction(Instruction::Alloca {
                    dest: slot.clone(),
                    ty: ty.clone(),
                });
                self.value_map
                    .insert(decl.name.clone(), (Value::Register(slot), ty));
                Ok(())
            }
            Stmt::Let { place, expr } => {
                let (ptr, _) = self.codegen_place(ast, place)?;
                let (value, _) = self.codegen_expr(ast, expr)?;
                self.add_instruction(Instruction::Store { value, ptr });
                Ok(())
            }
            Stmt::Do(call) => {
                // The result, if any, is dropped; a placeholder synthesized
                // here assumes a void return.
                self.expected_type = IRType::Void;
                self.codegen_expr(ast, call)?;
                Ok(())
            }
            Stmt::Return(expr) => self.codegen_return(ast, expr),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (cond_v, _) = self.codegen_expr(ast, cond)?;
                // Explicit even though the condition is already 1-bit.
                let cmp = self.new_register();
                self.add_instruction(Instruction::ICmp {
                    dest: cmp.clone(),
                    cond: ICmpCond::Eq,
                    lhs: cond_v,
                    rhs: Value::Constant(Constant::Bool(true)),
                });

                let then_label = self.new_label("then");
                let else_label = else_branch.as_ref().map(|_| self.new_label("else"));
                let cont_label = self.new_label("ifcont");

                self.set_terminator(Terminator::CondBr {
                    cond: Value::Register(cmp),
                    then_label: then_label.clone(),
                    else_label: else_label.clone().unwrap_or_else(|| cont_label.clone()),
                });

                let then_idx = self.create_block(then_label);
                self.set_current_block(then_idx);
                self.codegen_block(ast, then_branch)?;
                self.branch_to(&cont_label);

                if let (Some(label), Some(branch)) = (else_label, else_branch) {
                    let else_idx = self.create_block(label);
                    self.set_current_block(else_idx);
                    self.codegen_block(ast, branch)?;
                    self.branch_to(&cont_label);
                }

                let cont_idx = self.create_block(cont_label);
                self.set_current_block(cont_idx);
                Ok(())
            }
            Stmt::While { cond, body } => {
                let pre_label = self.new_label("preheader");
                let loop_label = self.new_label("loop");
                let end_label = self.new_label("endloop");

                self.set_terminator(Terminator::Br {
                    label: pre_label.clone(),
                });
                let pre_idx = self.create_block(pre_label.clone());
                self.set_current_block(pre_idx);

                // Re-evaluated on every iteration.
                let (cond_v, _) = self.codegen_expr(ast, cond)?;
                let cmp = self.new_register();
                self.add_instruction(Instruction::ICmp {
                    dest: cmp.clone(),
                    cond: ICmpCond::Eq,
                    lhs: cond_v,
                    rhs: Value::Constant(Constant::Bool(true)),
                });
                self.set_terminator(Terminator::CondBr {
                    cond: Value::Register(cmp),
                    then_label: loop_label.clone(),
                    else_label: end_label.clone(),
                });

                let loop_idx = self.create_block(loop_label);
                self.set_current_block(loop_idx);
                self.codegen_block(ast, body)?;
                self.branch_to(&pre_label);

                let end_idx = self.create_block(end_label);
                self.set_current_block(end_idx);
                Ok(())
            }
        }
    }

    fn codegen_return(&mut self, ast: &Ast, expr: &Expr) -> Result<(), InternalError> {
        let ret_ty = self
            .current_function
            .map(|i| self.module.functions[i].return_type.clone())
            .unwrap_or(IRType::Void);
        self.expected_type = ret_ty.clone();

        if *expr == Expr::Empty {
            self.set_terminator(Terminator::Ret { value: None });
            return Ok(());
        }

        let (mut value, vty) = self.codegen_expr(ast, expr)?;
        if vty != ret_ty && vty.is_integer() && ret_ty.is_integer() {
            let dest = self.new_register();
            let cast = if vty.bit_width() < ret_ty.bit_width() {
                Instruction::SExt {
                    dest: dest.clone(),
                    value,
                    from_ty: vty,
                    to_ty: ret_ty,
                }
            } else {
                Instruction::Trunc {
                    dest: dest.clone(),
                    value,
                    from_ty: vty,
                    to_ty: ret_ty,
                }
            };
            self.add_instruction(cast);
            value = Value::Register(dest);
        }
        self.set_terminator(Terminator::Ret { value: Some(value) });
        Ok(())
    }

    // -- expression lowering -----------------------------------------------

    /// Lower an assignable location to (address, pointee type). Also sets
    /// the expected type to the pointee.
    fn codegen_place(&mut self, ast: &Ast, place: &Place) -> Result<(Value, IRType), InternalError> {
        let resolved = match place {
            Place::Var(value) => self.resolve_identifier(ast, &value.name)?,
            Place::Index(index) => {
                // Array layout: a struct whose first field points at the
                // element storage. The array name as an lvalue is a pointer
                // to that struct.
                let (index_v, _) = self.codegen_expr(ast, &index.index)?;
                let (object, _) = self.resolve_identifier(ast, &index.array.name)?;
                let struct_name = index
                    .array
                    .semantic_type(ast)
                    .unwrap_or("Array")
                    .to_string();

                let data_slot = self.new_register();
                self.add_instruction(Instruction::FieldPtr {
                    dest: data_slot.clone(),
                    base: object,
                    struct_name,
                    index: 0,
                });
                let data = self.new_register();
                self.add_instruction(Instruction::Load {
                    dest: data.clone(),
                    ptr: Value::Register(data_slot),
                    ty: IRType::Ptr,
                });
                let element = self.new_register();
                self.add_instruction(Instruction::ElemPtr {
                    dest: element.clone(),
                    base: Value::Register(data),
                    elem_ty: IRType::I32,
                    index: index_v,
                });
                (Value::Register(element), IRType::I32)
            }
        };
        self.expected_type = resolved.1.clone();
        Ok(resolved)
    }

    /// Search order: local value map (locals, parameters), the class's
    /// fields through `this`, then module globals under the mangled static
    /// name. Yields an address.
    fn resolve_identifier(
        &mut self,
        ast: &Ast,
        name: &str,
    ) -> Result<(Value, IRType), InternalError> {
        if let Some(entry) = self.value_map.get(name) {
            return Ok(entry.clone());
        }

        if let Some((this_ptr, _)) = self.value_map.get("this").cloned() {
            if let Some(index) = ast.class.field_index(name) {
                let field = self.new_register();
                self.add_instruction(Instruction::FieldPtr {
                    dest: field.clone(),
                    base: this_ptr,
                    struct_name: ast.class.name.clone(),
                    index,
                });
                let field_ty = self.type_by_name(&ast.class.fields[index].ty);
                return Ok((Value::Register(field), field_ty));
            }
        }

        let symbol = mangle(&ast.class.name, name);
        if let Some(global) = self.module.global(&symbol) {
            return Ok((Value::Global(symbol), global.ty.clone()));
        }

        Err(self.internal_error(format!(
            "Undefined identifier {} reached the generator",
            name
        )))
    }

    fn codegen_expr(&mut self, ast: &Ast, expr: &Expr) -> Result<(Value, IRType), InternalError> {
        let result = match expr {
            Expr::IntConst(i) => (Value::Constant(Constant::I32(*i as i32)), IRType::I32),
            Expr::CharConst(c) => (Value::Constant(Constant::I8(*c)), IRType::I8),
            Expr::True => (Value::Constant(Constant::Bool(true)), IRType::I1),
            Expr::False => (Value::Constant(Constant::Bool(false)), IRType::I1),
            Expr::This => self.this_entry()?,
            Expr::Empty => {
                return Err(self.internal_error("Empty expression has no value".to_string()))
            }
            Expr::Place(place) => self.codegen_place(ast, place)?,
            Expr::RValue(inner) => {
                let (ptr, pointee) = match inner.as_ref() {
                    Expr::This => self.this_entry()?,
                    Expr::Place(place) => self.codegen_place(ast, place)?,
                    other => self.codegen_expr(ast, other)?,
                };
                let dest = self.new_register();
                self.add_instruction(Instruction::Load {
                    dest: dest.clone(),
                    ptr,
                    ty: pointee.clone(),
                });
                (Value::Register(dest), pointee)
            }
            Expr::StrConst(text) => self.codegen_string(text),
            Expr::Unary { op, operand } => {
                let (operand, ty) = self.codegen_expr(ast, operand)?;
                let dest = self.new_register();
                let instr = match op {
                    UnOp::Neg => Instruction::Neg {
                        dest: dest.clone(),
                        operand,
                        ty: ty.clone(),
                    },
                    UnOp::Not => Instruction::Not {
                        dest: dest.clone(),
                        operand,
                        ty: ty.clone(),
                    },
                };
                self.add_instruction(instr);
                (Value::Register(dest), ty)
            }
            Expr::Binary { op, lhs, rhs } => {
                let (lhs, lty) = self.codegen_expr(ast, lhs)?;
                let (rhs, _) = self.codegen_expr(ast, rhs)?;
                let dest = self.new_register();
                let (instr, ty) = match op {
                    BinOp::Add => (
                        Instruction::Add {
                            dest: dest.clone(),
                            lhs,
                            rhs,
                            ty: lty.clone(),
                        },
                        lty,
                    ),
                    BinOp::Sub => (
                        Instruction::Sub {
                            dest: dest.clone(),
                            lhs,
                            rhs,
                            ty: lty.clone(),
                        },
                        lty,
                    ),
                    BinOp::Mul => (
                        Instruction::Mul {
                            dest: dest.clone(),
                            lhs,
                            rhs,
                            ty: lty.clone(),
                        },
                        lty,
                    ),
                    BinOp::Div => (
                        Instruction::SDiv {
                            dest: dest.clone(),
                            lhs,
                            rhs,
                            ty: lty.clone(),
                        },
                        lty,
                    ),
                    BinOp::And => (
                        Instruction::And {
                            dest: dest.clone(),
                            lhs,
                            rhs,
                            ty: lty.clone(),
                        },
                        lty,
                    ),
                    BinOp::Or => (
                        Instruction::Or {
                            dest: dest.clone(),
                            lhs,
                            rhs,
                            ty: lty.clone(),
                        },
                        lty,
                    ),
                    BinOp::Gt => (
                        Instruction::ICmp {
                            dest: dest.clone(),
                            cond: ICmpCond::Sgt,
                            lhs,
                            rhs,
                        },
                        IRType::I1,
                    ),
                    BinOp::Lt => (
                        Instruction::ICmp {
                            dest: dest.clone(),
                            cond: ICmpCond::Slt,
                            lhs,
                            rhs,
                        },
                        IRType::I1,
                    ),
                    BinOp::Eq => (
                        Instruction::ICmp {
                            dest: dest.clone(),
                            cond: ICmpCond::Eq,
                            lhs,
                            rhs,
                        },
                        IRType::I1,
                    ),
                };
                self.add_instruction(instr);
                (Value::Register(dest), ty)
            }
            Expr::FunctionCall(call) => {
                self.codegen_call(ast, &call.class, &call.name, None, &call.args)?
            }
            Expr::MethodCall(call) => {
                let (receiver, receiver_ty, class_name) = match &call.callee {
                    None => {
                        // A bare call dispatches on the current class; the
                        // receiver is this function's first parameter.
                        let first = self
                            .current_function
                            .and_then(|i| self.module.functions[i].params.first())
                            .cloned();
                        let Some((first, first_ty)) = first else {
                            return Err(self.internal_error(format!(
                                "Method {} called without a receiver",
                                call.name
                            )));
                        };
                        (Value::Argument(first), first_ty, ast.class.name.clone())
                    }
                    Some(callee) => {
                        let class = callee
                            .named()
                            .semantic_type(ast)
                            .map(str::to_string)
                            .ok_or_else(|| {
                                self.internal_error(format!(
                                    "Undefined identifier {} reached the generator",
                                    callee.named().name
                                ))
                            })?;
                        let (ptr, pointee) = self.codegen_place(ast, callee)?;
                        let receiver = self.new_register();
                        self.add_instruction(Instruction::Load {
                            dest: receiver.clone(),
                            ptr,
                            ty: pointee.clone(),
                        });
                        (Value::Register(receiver), pointee, class)
                    }
                };
                self.codegen_call(
                    ast,
                    &class_name,
                    &call.name,
                    Some((receiver, receiver_ty)),
                    &call.args,
                )?
            }
        };
        self.expected_type = result.1.clone();
        Ok(result)
    }

    /// A string literal becomes a NUL-terminated global, converted through
    /// the built-in `ptrtostr` into a String allocated on the stack, then
    /// loaded back out as a String value.
    fn codegen_string(&mut self, text: &str) -> (Value, IRType) {
        let global = format!("str_{}", self.string_counter);
        self.string_counter += 1;
        self.module
            .global_strings
            .push((global.clone(), text.to_string()));

        let string_ty = self.type_by_name("String");
        let slot = self.new_register();
        self.add_instruction(Instruction::Alloca {
            dest: slot.clone(),
            ty: string_ty.clone(),
        });
        let object = self.new_register();
        self.add_instruction(Instruction::Call {
            dest: Some(object.clone()),
            func: mangle("String", "ptrtostr"),
            args: vec![Value::Global(global)],
            ty: string_ty.clone(),
        });
        self.add_instruction(Instruction::Store {
            value: Value::Register(object),
            ptr: Value::Register(slot.clone()),
        });
        let loaded = self.new_register();
        self.add_instruction(Instruction::Load {
            dest: loaded.clone(),
            ptr: Value::Register(slot),
            ty: string_ty.clone(),
        });
        (Value::Register(loaded), string_ty)
    }

    /// Shared tail of both call forms. When the mangled symbol is not in
    /// the module yet, a placeholder external function is synthesized,
    /// typed from the actual arguments and the current expected type, and
    /// queued for deferred resolution.
    fn codegen_call(
        &mut self,
        ast: &Ast,
        class: &str,
        name: &str,
        receiver: Option<(Value, IRType)>,
        arg_exprs: &[Expr],
    ) -> Result<(Value, IRType), InternalError> {
        let assumed_ret = self.expected_type.clone();

        let mut args = Vec::new();
        let mut arg_tys = Vec::new();
        if let Some((receiver, receiver_ty)) = receiver {
            args.push(receiver);
            arg_tys.push(receiver_ty);
        }
        for expr in arg_exprs {
            let (value, ty) = self.codegen_expr(ast, expr)?;
            args.push(value);
            arg_tys.push(ty);
        }

        let symbol = mangle(class, name);
        let (target, ret_ty) = match self.module.function(&symbol) {
            Some(func) => (symbol, func.return_type.clone()),
            None => {
                let placeholder = format!("__unresolved__{}", self.unresolved_counter);
                self.unresolved_counter += 1;
                self.module.functions.push(Function {
                    name: placeholder.clone(),
                    params: arg_tys
                        .iter()
                        .enumerate()
                        .map(|(i, ty)| (format!("arg{}", i), ty.clone()))
                        .collect(),
                    return_type: assumed_ret.clone(),
                    blocks: Vec::new(),
                    is_external: true,
                });
                self.unresolved.push(UnresolvedCall {
                    class: class.to_string(),
                    name: name.to_string(),
                    placeholder: placeholder.clone(),
                });
                (placeholder, assumed_ret)
            }
        };

        let dest = (ret_ty != IRType::Void).then(|| self.new_register());
        self.add_instruction(Instruction::Call {
            dest: dest.clone(),
            func: target,
            args,
            ty: ret_ty.clone(),
        });
        let value = dest
            .map(Value::Register)
            .unwrap_or(Value::Constant(Constant::Null));
        Ok((value, ret_ty))
    }

    fn this_entry(&self) -> Result<(Value, IRType), InternalError> {
        self.value_map
            .get("this")
            .cloned()
            .ok_or_else(|| self.internal_error("this is not bound in this function".to_string()))
    }

    // -- types -------------------------------------------------------------

    /// `int`/`char`/`boolean`/`void` map to their integer widths; any other
    /// name is a class whose struct type is created on first sight. An
    /// identifier of class type is a stack allocation of that struct, so
    /// its use as an lvalue yields a pointer to the struct.
    fn type_by_name(&mut self, name: &str) -> IRType {
        match name {
            "int" => IRType::I32,
            "char" => IRType::I8,
            "boolean" => IRType::I1,
            "void" => IRType::Void,
            class => {
                if self.module.struct_type(class).is_none() {
                    self.module.struct_types.push(StructType {
                        name: class.to_string(),
                        fields: Vec::new(),
                    });
                }
                IRType::Struct {
                    name: class.to_string(),
                }
            }
        }
    }

    // -- cursor helpers ----------------------------------------------------

    fn new_register(&mut self) -> String {
        self.register_counter += 1;
        format!("%{}", self.register_counter)
    }

    fn new_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", prefix, self.label_counter)
    }

    fn add_instruction(&mut self, instruction: Instruction) {
        if let (Some(func_idx), Some(block_idx)) = (self.current_function, self.current_block) {
            self.module.functions[func_idx].blocks[block_idx]
                .instructions
                .push(instruction);
        }
    }

    fn set_terminator(&mut self, terminator: Terminator) {
        if let (Some(func_idx), Some(block_idx)) = (self.current_function, self.current_block) {
            self.module.functions[func_idx].blocks[block_idx].terminator = Some(terminator);
        }
    }

    /// Branch to `label` unless the current block already ended (an arm
    /// whose last statement was a return keeps its return).
    fn branch_to(&mut self, label: &str) {
        if let (Some(func_idx), Some(block_idx)) = (self.current_function, self.current_block) {
            let block = &mut self.module.functions[func_idx].blocks[block_idx];
            if block.terminator.is_none() {
                block.terminator = Some(Terminator::Br {
                    label: label.to_string(),
                });
            }
        }
    }

    fn create_block(&mut self, label: String) -> usize {
        let func_idx = self
            .current_function
            .expect("blocks are only created inside a function");
        self.module.functions[func_idx]
            .blocks
            .push(BasicBlock::new(label));
        self.module.functions[func_idx].blocks.len() - 1
    }

    fn set_current_block(&mut self, block_idx: usize) {
        self.current_block = Some(block_idx);
    }

    /// Cleanup of dead fall-through: a block left empty, unterminated, and
    /// unreferenced at the end of a statement list is dropped.
    fn drop_dead_current_block(&mut self) {
        let (Some(func_idx), Some(block_idx)) = (self.current_function, self.current_block) else {
            return;
        };
        let func = &self.module.functions[func_idx];
        let block = &func.blocks[block_idx];
        if !block.instructions.is_empty() || block.terminator.is_some() {
            return;
        }
        let label = block.label.clone();
        let referenced = func.blocks.iter().any(|b| match &b.terminator {
            Some(Terminator::Br { label: l }) => *l == label,
            Some(Terminator::CondBr {
                then_label,
                else_label,
                ..
            }) => *then_label == label || *else_label == label,
            _ => false,
        });
        if !referenced {
            self.module.functions[func_idx].blocks.remove(block_idx);
            self.current_block = None;
        }
    }

    fn internal_error(&self, message: String) -> InternalError {
        InternalError {
            message,
            function_dump: self
                .current_function
                .map(|i| self.module.functions[i].to_string()),
            module_dump: self.module.to_string(),
        }
    }
}
