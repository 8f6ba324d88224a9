use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;

use crate::codegen::LlvmCodegen;
use crate::ir;
use crate::ir::InternalError;

impl<'ctx> LlvmCodegen<'ctx> {
    pub fn codegen_function(&mut self, function: &ir::Function) -> Result<(), InternalError> {
        let llvm_function = self.declare_function(function);

        self.value_map.clear();
        for (i, (param_name, _param_type)) in function.params.iter().enumerate() {
            if let Some(param_value) = llvm_function.get_nth_param(i as u32) {
                param_value.set_name(param_name);
                self.value_map.insert(param_name.clone(), param_value);
            }
        }

        // Create every block first; terminators can branch forward.
        let mut block_map: HashMap<String, BasicBlock<'ctx>> = HashMap::new();
        for ir_block in &function.blocks {
            let bb = self
                .context
                .append_basic_block(llvm_function, &ir_block.label);
            block_map.insert(ir_block.label.clone(), bb);
        }

        for ir_block in &function.blocks {
            let bb = block_map[&ir_block.label];
            self.builder.position_at_end(bb);

            for instr in &ir_block.instructions {
                self.codegen_instruction(instr);
            }

            if let Some(term) = &ir_block.terminator {
                self.codegen_terminator(term, &block_map);
            }
        }

        if !llvm_function.verify(true) {
            return Err(self.internal_error(
                format!("Function {} failed verification", function.name),
                Some(llvm_function),
            ));
        }

        Ok(())
    }

    pub fn codegen_terminator(
        &mut self,
        term: &ir::Terminator,
        block_map: &HashMap<String, BasicBlock<'ctx>>,
    ) {
        use ir::Terminator::*;
        match term {
            Ret { value: Some(val) } => {
                let ret_val = self.codegen_value(val);
                self.builder.build_return(Some(&ret_val)).unwrap();
            }
            Ret { value: None } => {
                self.builder.build_return(None).unwrap();
            }
            Br { label } => {
                let target_bb = block_map
                    .get(label)
                    .unwrap_or_else(|| panic!("Label block {} not found", label));
                self.builder.build_unconditional_branch(*target_bb).unwrap();
            }
            CondBr {
                cond,
                then_label,
                else_label,
            } => {
                let cond_val = self.codegen_value(cond);
                let then_bb = block_map
                    .get(then_label)
                    .unwrap_or_else(|| panic!("Then block {} not found", then_label));
                let else_bb = block_map
                    .get(else_label)
                    .unwrap_or_else(|| panic!("Else block {} not found", else_label));
                self.builder
                    .build_conditional_branch(cond_val.into_int_value(), *then_bb, *else_bb)
                    .unwrap();
            }
        }
    }
}
