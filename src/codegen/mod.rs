use std::collections::HashMap;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module as LlvmModule};
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::AddressSpace;

use crate::ir;
use crate::ir::InternalError;

pub mod function;
pub mod instruction;
pub mod jit;

#[cfg(test)]
pub mod test;

/// Lowers the finished IR module to LLVM. Two passes over the functions:
/// declare everything first so direct calls always find their symbol, then
/// emit bodies.
pub struct LlvmCodegen<'ctx> {
    context: &'ctx Context,
    module: LlvmModule<'ctx>,
    builder: Builder<'ctx>,
    function_value_map: HashMap<String, FunctionValue<'ctx>>,
    value_map: HashMap<String, BasicValueEnum<'ctx>>,
}

impl<'ctx> LlvmCodegen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        LlvmCodegen {
            context,
            module,
            builder,
            function_value_map: HashMap::new(),
            value_map: HashMap::new(),
        }
    }

    pub fn generate_module(&mut self, ir_module: &ir::Module) -> Result<(), InternalError> {
        // Struct types in two passes so bodies can refer to each other.
        for struct_type in &ir_module.struct_types {
            if self.module.get_struct_type(&struct_type.name).is_none() {
                self.context.opaque_struct_type(&struct_type.name);
            }
        }
        for struct_type in &ir_module.struct_types {
            let st = self
                .module
                .get_struct_type(&struct_type.name)
                .unwrap_or_else(|| panic!("Struct type {} not declared", struct_type.name));
            let field_types: Vec<BasicTypeEnum> = struct_type
                .fields
                .iter()
                .map(|field| self.get_llvm_type(field))
                .collect();
            st.set_body(&field_types, false);
        }

        for (name, content) in &ir_module.global_strings {
            let string_val = self.context.const_string(content.as_bytes(), true);
            let global = self.module.add_global(string_val.get_type(), None, name);
            global.set_initializer(&string_val);
            global.set_linkage(Linkage::Private);
            global.set_unnamed_addr(true);
        }

        for var in &ir_module.globals {
            let ty = self.get_llvm_type(&var.ty);
            let global = self.module.add_global(ty, None, &var.name);
            global.set_initializer(&ty.const_zero());
        }

        for function in &ir_module.functions {
            self.declare_function(function);
        }

        for function in &ir_module.functions {
            if !function.is_external {
                self.codegen_function(function)?;
            }
        }

        Ok(())
    }

    pub fn get_llvm_type(&self, ir_type: &ir::IRType) -> BasicTypeEnum<'ctx> {
        use ir::IRType::*;
        match ir_type {
            I1 => self.context.bool_type().as_basic_type_enum(),
            I8 => self.context.i8_type().as_basic_type_enum(),
            I32 => self.context.i32_type().as_basic_type_enum(),
            I64 => self.context.i64_type().as_basic_type_enum(),
            Ptr => self
                .context
                .ptr_type(AddressSpace::default())
                .as_basic_type_enum(),
            Struct { name } => {
                let struct_ty = self
                    .module
                    .get_struct_type(name)
                    .unwrap_or_else(|| self.context.opaque_struct_type(name));
                struct_ty.as_basic_type_enum()
            }
            Function { .. } => self
                .context
                .ptr_type(AddressSpace::default())
                .as_basic_type_enum(),
            Void => panic!("Void type cannot be converted to BasicTypeEnum"),
        }
    }

    /// Translate an IR function signature into an LLVM function type.
    pub fn get_fn_type(
        &self,
        params: &[ir::IRType],
        return_type: &ir::IRType,
    ) -> FunctionType<'ctx> {
        let param_types: Vec<BasicMetadataTypeEnum> = params
            .iter()
            .map(|ty| self.get_llvm_type(ty).into())
            .collect();
        if matches!(return_type, ir::IRType::Void) {
            self.context.void_type().fn_type(&param_types, false)
        } else {
            self.get_llvm_type(return_type).fn_type(&param_types, false)
        }
    }

    pub fn declare_function(&mut self, function: &ir::Function) -> FunctionValue<'ctx> {
        if let Some(f) = self.module.get_function(&function.name) {
            self.function_value_map.insert(function.name.clone(), f);
            return f;
        }

        let param_types: Vec<ir::IRType> =
            function.params.iter().map(|(_, ty)| ty.clone()).collect();
        let fn_type = self.get_fn_type(&param_types, &function.return_type);
        let fn_val = self.module.add_function(&function.name, fn_type, None);
        self.function_value_map
            .insert(function.name.clone(), fn_val);
        fn_val
    }

    fn store_value(&mut self, name: String, value: BasicValueEnum<'ctx>) {
        self.value_map.insert(name, value);
    }

    pub fn codegen_value(&mut self, val: &ir::Value) -> BasicValueEnum<'ctx> {
        match val {
            ir::Value::Constant(c) => self.codegen_constant(c),
            ir::Value::Register(name) => self
                .value_map
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("Register {} not found", name)),
            ir::Value::Argument(name) => self
                .value_map
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("Function argument {} not found", name)),
            ir::Value::Global(name) => {
                if let Some(global) = self.module.get_global(name) {
                    global.as_pointer_value().into()
                } else if let Some(func) = self.function_value_map.get(name) {
                    func.as_global_value().as_pointer_value().into()
                } else {
                    panic!("Global {} not found", name)
                }
            }
        }
    }

    fn codegen_constant(&self, constant: &ir::Constant) -> BasicValueEnum<'ctx> {
        match constant {
            ir::Constant::Bool(b) => {
                self.context.bool_type().const_int(*b as u64, false).into()
            }
            ir::Constant::I8(c) => self.context.i8_type().const_int(*c as u64, false).into(),
            ir::Constant::I32(i) => {
                self.context.i32_type().const_int(*i as u64, true).into()
            }
            ir::Constant::I64(i) => {
                self.context.i64_type().const_int(*i as u64, true).into()
            }
            ir::Constant::Null => self
                .context
                .ptr_type(AddressSpace::default())
                .const_null()
                .into(),
        }
    }

    pub fn module(&self) -> &LlvmModule<'ctx> {
        &self.module
    }

    pub(crate) fn internal_error(
        &self,
        message: String,
        function: Option<FunctionValue<'ctx>>,
    ) -> InternalError {
        InternalError {
            message,
            function_dump: function.map(|f| f.print_to_string().to_string()),
            module_dump: self.module.print_to_string().to_string(),
        }
    }
}
