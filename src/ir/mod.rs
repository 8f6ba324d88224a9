use std::fmt::{self, Display, Formatter};

pub mod builder;

pub use builder::{IRBuilder, InternalError};

#[cfg(test)]
pub mod test;

/// Combine a class and member name into the unique module-level symbol.
/// Every user and built-in function, and every static, lives under this
/// pattern; redefining a mangled name is an error caught by the backend.
pub fn mangle(class: &str, member: &str) -> String {
    format!("__{}__{}", class, member)
}

#[derive(Debug, Clone, PartialEq)]
pub enum IRType {
    Void,
    I1,  // boolean
    I8,  // char
    I32, // int
    I64, // host addresses
    Ptr, // pointer, opaque
    /// Reference to a named struct type; the layout lives in the module's
    /// struct table, so two references are equal when the names are.
    Struct {
        name: String,
    },
    Function {
        params: Vec<IRType>,
        return_type: Box<IRType>,
    },
}

impl IRType {
    pub fn is_integer(&self) -> bool {
        matches!(self, IRType::I1 | IRType::I8 | IRType::I32 | IRType::I64)
    }

    /// Bit width of an integer type; integer return-type coercion compares
    /// these to pick sign-extension or truncation.
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            IRType::I1 => Some(1),
            IRType::I8 => Some(8),
            IRType::I32 => Some(32),
            IRType::I64 => Some(64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    I8(u8),
    I32(i32),
    I64(i64),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(Constant),
    Register(String),
    Argument(String),
    Global(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ICmpCond {
    Eq,
    Sgt,
    Slt,
}

#[derive(Debug, Clone)]
pub enum Instruction {
    // Memory
    Alloca {
        dest: String,
        ty: IRType,
    },
    Load {
        dest: String,
        ptr: Value,
        ty: IRType,
    },
    Store {
        value: Value,
        ptr: Value,
    },

    // Arithmetic
    Add {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
    },
    Sub {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
    },
    Mul {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
    },
    SDiv {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
    },
    And {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
    },
    Or {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
    },
    Neg {
        dest: String,
        operand: Value,
        ty: IRType,
    },
    Not {
        dest: String,
        operand: Value,
        ty: IRType,
    },

    ICmp {
        dest: String,
        cond: ICmpCond,
        lhs: Value,
        rhs: Value,
    },

    /// Direct call on a module-level symbol.
    Call {
        dest: Option<String>,
        func: String,
        args: Vec<Value>,
        ty: IRType,
    },
    /// Call through a function-pointer value; the builtins bridge calls
    /// host functions this way.
    CallPtr {
        dest: Option<String>,
        ptr: Value,
        sig: IRType,
        args: Vec<Value>,
    },

    // Casts
    IntToPtr {
        dest: String,
        value: Value,
    },
    SExt {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
    },
    Trunc {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
    },

    /// Address of field `index` of the named struct behind `base`.
    FieldPtr {
        dest: String,
        base: Value,
        struct_name: String,
        index: usize,
    },
    /// Address of element `index` in a run of `elem_ty` behind `base`.
    ElemPtr {
        dest: String,
        base: Value,
        elem_ty: IRType,
        index: Value,
    },
}

#[derive(Debug, Clone)]
pub enum Terminator {
    Ret { value: Option<Value> },
    Br { label: String },
    CondBr {
        cond: Value,
        then_label: String,
        else_label: String,
    },
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(label: String) -> Self {
        BasicBlock {
            label,
            instructions: Vec::new(),
            terminator: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IRType)>,
    pub return_type: IRType,
    pub blocks: Vec<BasicBlock>,
    pub is_external: bool,
}

#[derive(Debug, Clone)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<IRType>,
}

#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: String,
    pub ty: IRType,
}

/// The compilation target: one module per program, shared by every unit
/// and by the builtins bridge, then transferred to the backend host.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub struct_types: Vec<StructType>,
    pub globals: Vec<GlobalVar>,
    /// NUL-terminated C-string globals backing string literals.
    pub global_strings: Vec<(String, String)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn struct_type(&self, name: &str) -> Option<&StructType> {
        self.struct_types.iter().find(|s| s.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVar> {
        self.globals.iter().find(|g| g.name == name)
    }
}

// Display implementations; the textual form is LLVM-flavored and is what
// internal-error dumps print.

impl Display for IRType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IRType::Void => write!(f, "void"),
            IRType::I1 => write!(f, "i1"),
            IRType::I8 => write!(f, "i8"),
            IRType::I32 => write!(f, "i32"),
            IRType::I64 => write!(f, "i64"),
            IRType::Ptr => write!(f, "ptr"),
            IRType::Struct { name } => write!(f, "%{}", name),
            IRType::Function {
                params,
                return_type,
            } => {
                write!(f, "{} (", return_type)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Constant::I8(c) => write!(f, "{}", c),
            Constant::I32(i) => write!(f, "{}", i),
            Constant::I64(i) => write!(f, "{}", i),
            Constant::Null => write!(f, "null"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(c) => write!(f, "{}", c),
            Value::Register(name) => write!(f, "{}", name),
            Value::Argument(name) => write!(f, "%{}", name),
            Value::Global(name) => write!(f, "@{}", name),
        }
    }
}

impl Display for ICmpCond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ICmpCond::Eq => "eq",
            ICmpCond::Sgt => "sgt",
            ICmpCond::Slt => "slt",
        };
        write!(f, "{}", s)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match self {
            Alloca { dest, ty } => write!(f, "  {} = alloca {}", dest, ty),
            Load { dest, ptr, ty } => write!(f, "  {} = load {}, ptr {}", dest, ty, ptr),
            Store { value, ptr } => write!(f, "  store {}, ptr {}", value, ptr),
            Add { dest, lhs, rhs, ty } => write!(f, "  {} = add {} {}, {}", dest, ty, lhs, rhs),
            Sub { dest, lhs, rhs, ty } => write!(f, "  {} = sub {} {}, {}", dest, ty, lhs, rhs),
            Mul { dest, lhs, rhs, ty } => write!(f, "  {} = mul {} {}, {}", dest, ty, lhs, rhs),
            SDiv { dest, lhs, rhs, ty } => {
                write!(f, "  {} = sdiv {} {}, {}", dest, ty, lhs, rhs)
            }
            And { dest, lhs, rhs, ty } => write!(f, "  {} = and {} {}, {}", dest, ty, lhs, rhs),
            Or { dest, lhs, rhs, ty } => write!(f, "  {} = or {} {}, {}", dest, ty, lhs, rhs),
            Neg { dest, operand, ty } => write!(f, "  {} = neg {} {}", dest, ty, operand),
            Not { dest, operand, ty } => write!(f, "  {} = not {} {}", dest, ty, operand),
            ICmp {
                dest,
                cond,
                lhs,
                rhs,
            } => write!(f, "  {} = icmp {} {}, {}", dest, cond, lhs, rhs),
            Call {
                dest,
                func,
                args,
                ty,
            } => {
                write!(f, "  ")?;
                if let Some(d) = dest {
                    write!(f, "{} = ", d)?;
                }
                write!(f, "call {} @{}(", ty, func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            CallPtr {
                dest,
                ptr,
                sig,
                args,
            } => {
                write!(f, "  ")?;
                if let Some(d) = dest {
                    write!(f, "{} = ", d)?;
                }
                write!(f, "call {} {}(", sig, ptr)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            IntToPtr { dest, value } => write!(f, "  {} = inttoptr {} to ptr", dest, value),
            SExt {
                dest,
                value,
                from_ty,
                to_ty,
            } => write!(f, "  {} = sext {} {} to {}", dest, from_ty, value, to_ty),
            Trunc {
                dest,
                value,
                from_ty,
                to_ty,
            } => write!(f, "  {} = trunc {} {} to {}", dest, from_ty, value, to_ty),
            FieldPtr {
                dest,
                base,
                struct_name,
                index,
            } => write!(
                f,
                "  {} = getelementptr %{}, ptr {}, 0, {}",
                dest, struct_name, base, index
            ),
            ElemPtr {
                dest,
                base,
                elem_ty,
                index,
            } => write!(
                f,
                "  {} = getelementptr {}, ptr {}, {}",
                dest, elem_ty, base, index
            ),
        }
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret { value: Some(val) } => write!(f, "  ret {}", val),
            Terminator::Ret { value: None } => write!(f, "  ret void"),
            Terminator::Br { label } => write!(f, "  br label %{}", label),
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
            } => write!(
                f,
                "  br i1 {}, label %{}, label %{}",
                cond, then_label, else_label
            ),
        }
    }
}

impl Display for BasicBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        if let Some(term) = &self.terminator {
            writeln!(f, "{}", term)?;
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_external {
            write!(f, "declare {} @{}(", self.return_type, self.name)?;
        } else {
            write!(f, "define {} @{}(", self.return_type, self.name)?;
        }
        for (i, (param_name, param_type)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", param_type, param_name)?;
        }
        if self.is_external {
            writeln!(f, ")")?;
        } else {
            writeln!(f, ") {{")?;
            for block in &self.blocks {
                write!(f, "{}", block)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl Display for StructType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "%{} = type {{ ", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, " }}")
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; Module: {}", self.name)?;
        writeln!(f)?;

        if !self.global_strings.is_empty() {
            writeln!(f, "; String literals")?;
            for (name, value) in &self.global_strings {
                writeln!(
                    f,
                    "@{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                    name,
                    value.len() + 1,
                    value.escape_default()
                )?;
            }
            writeln!(f)?;
        }

        if !self.struct_types.is_empty() {
            writeln!(f, "; Struct types")?;
            for struct_type in &self.struct_types {
                writeln!(f, "{}", struct_type)?;
            }
            writeln!(f)?;
        }

        if !self.globals.is_empty() {
            writeln!(f, "; Globals")?;
            for global in &self.globals {
                writeln!(f, "@{} = global {} zeroinitializer", global.name, global.ty)?;
            }
            writeln!(f)?;
        }

        for function in &self.functions {
            writeln!(f, "{}", function)?;
        }

        Ok(())
    }
}
