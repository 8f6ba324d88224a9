use inkwell::values::{BasicMetadataValueEnum, CallSiteValue};
use inkwell::AddressSpace;

use crate::codegen::LlvmCodegen;
use crate::ir;

impl<'ctx> LlvmCodegen<'ctx> {
    pub fn codegen_instruction(&mut self, instr: &ir::Instruction) {
        use ir::Instruction::*;
        match instr {
            Alloca { dest, ty } => {
                let alloca_type = self.get_llvm_type(ty);
                let alloca = self.builder.build_alloca(alloca_type, dest).unwrap();
                self.store_value(dest.clone(), alloca.into());
            }

            Load { dest, ptr, ty } => {
                let ptr_val = self.codegen_value(ptr);
                let load_type = self.get_llvm_type(ty);
                let loaded = self
                    .builder
                    .build_load(load_type, ptr_val.into_pointer_value(), dest)
                    .unwrap();
                self.store_value(dest.clone(), loaded);
            }

            Store { value, ptr } => {
                let val = self.codegen_value(value);
                let ptr_val = self.codegen_value(ptr);
                self.builder
                    .build_store(ptr_val.into_pointer_value(), val)
                    .unwrap();
            }

            Add { dest, lhs, rhs, .. } => {
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self.builder.build_int_add(lhs_val, rhs_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Sub { dest, lhs, rhs, .. } => {
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self.builder.build_int_sub(lhs_val, rhs_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Mul { dest, lhs, rhs, .. } => {
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self.builder.build_int_mul(lhs_val, rhs_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            SDiv { dest, lhs, rhs, .. } => {
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self
                    .builder
                    .build_int_signed_div(lhs_val, rhs_val, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            And { dest, lhs, rhs, .. } => {
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self.builder.build_and(lhs_val, rhs_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Or { dest, lhs, rhs, .. } => {
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self.builder.build_or(lhs_val, rhs_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Neg { dest, operand, .. } => {
                let operand_val = self.codegen_value(operand).into_int_value();
                let res = self.builder.build_int_neg(operand_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Not { dest, operand, .. } => {
                let operand_val = self.codegen_value(operand).into_int_value();
                let res = self.builder.build_not(operand_val, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            ICmp {
                dest,
                cond,
                lhs,
                rhs,
            } => {
                let predicate = match cond {
                    ir::ICmpCond::Eq => inkwell::IntPredicate::EQ,
                    ir::ICmpCond::Sgt => inkwell::IntPredicate::SGT,
                    ir::ICmpCond::Slt => inkwell::IntPredicate::SLT,
                };
                let lhs_val = self.codegen_value(lhs).into_int_value();
                let rhs_val = self.codegen_value(rhs).into_int_value();
                let res = self
                    .builder
                    .build_int_compare(predicate, lhs_val, rhs_val, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Call {
                dest, func, args, ..
            } => {
                let func_val = *self
                    .function_value_map
                    .get(func)
                    .unwrap_or_else(|| panic!("Function {} not declared", func));
                let llvm_args: Vec<BasicMetadataValueEnum> = args
                    .iter()
                    .map(|arg| self.codegen_value(arg).into())
                    .collect();
                let call_site = self
                    .builder
                    .build_call(func_val, &llvm_args, dest.as_deref().unwrap_or(""))
                    .unwrap();
                self.store_call_result(dest, call_site);
            }

            CallPtr {
                dest,
                ptr,
                sig,
                args,
            } => {
                let ir::IRType::Function {
                    params,
                    return_type,
                } = sig
                else {
                    panic!("CallPtr without a function signature")
                };
                let fn_type = self.get_fn_type(params, return_type);
                let callee = self.codegen_value(ptr).into_pointer_value();
                let llvm_args: Vec<BasicMetadataValueEnum> = args
                    .iter()
                    .map(|arg| self.codegen_value(arg).into())
                    .collect();
                let call_site = self
                    .builder
                    .build_indirect_call(fn_type, callee, &llvm_args, dest.as_deref().unwrap_or(""))
                    .unwrap();
                self.store_call_result(dest, call_site);
            }

            IntToPtr { dest, value } => {
                let int_val = self.codegen_value(value).into_int_value();
                let ptr_type = self.context.ptr_type(AddressSpace::default());
                let res = self
                    .builder
                    .build_int_to_ptr(int_val, ptr_type, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            SExt {
                dest, value, to_ty, ..
            } => {
                let int_val = self.codegen_value(value).into_int_value();
                let to = self.get_llvm_type(to_ty).into_int_type();
                let res = self.builder.build_int_s_extend(int_val, to, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            Trunc {
                dest, value, to_ty, ..
            } => {
                let int_val = self.codegen_value(value).into_int_value();
                let to = self.get_llvm_type(to_ty).into_int_type();
                let res = self.builder.build_int_truncate(int_val, to, dest).unwrap();
                self.store_value(dest.clone(), res.into());
            }

            FieldPtr {
                dest,
                base,
                struct_name,
                index,
            } => {
                let struct_ty = self
                    .module
                    .get_struct_type(struct_name)
                    .unwrap_or_else(|| panic!("Struct type {} not found", struct_name));
                let base_val = self.codegen_value(base).into_pointer_value();
                let res = self
                    .builder
                    .build_struct_gep(struct_ty, base_val, *index as u32, dest)
                    .unwrap();
                self.store_value(dest.clone(), res.into());
            }

            ElemPtr {
                dest,
                base,
                elem_ty,
                index,
            } => {
                let pointee = self.get_llvm_type(elem_ty);
                let base_val = self.codegen_value(base).into_pointer_value();
                let index_val = self.codegen_value(index).into_int_value();
                let res = unsafe {
                    self.builder
                        .build_gep(pointee, base_val, &[index_val], dest)
                        .unwrap()
                };
                self.store_value(dest.clone(), res.into());
            }
        }
    }

    fn store_call_result(&mut self, dest: &Option<String>, call_site: CallSiteValue<'ctx>) {
        if let Some(dest_name) = dest {
            if let Some(return_value) = call_site.try_as_basic_value().left() {
                self.store_value(dest_name.clone(), return_value);
            }
        }
    }
}
