use crate::symbols::Table;

pub mod pretty;

/// Handle to a subroutine in its unit's arena. Named values carry one as
/// the back-reference to their enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: String,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        VarDecl {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    And,
    Or,
}

impl BinOp {
    pub fn as_char(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Lt => '<',
            BinOp::Gt => '>',
            BinOp::Eq => '=',
            BinOp::And => '&',
            BinOp::Or => '|',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn as_char(self) -> char {
        match self {
            UnOp::Neg => '-',
            UnOp::Not => '~',
        }
    }
}

/// A use of a name, bound to the function it occurs in. The back-reference
/// is what later scope lookups run through; it never mutates the function.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub owner: FunctionId,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, owner: FunctionId) -> Self {
        NamedValue {
            name: name.into(),
            owner,
        }
    }

    /// The declared type of the named variable: function scope first, then
    /// the class scope. Exactly these two levels exist in Jack.
    pub fn semantic_type<'a>(&self, ast: &'a Ast) -> Option<&'a str> {
        let func = ast.function(self.owner);
        func.table
            .lookup(&self.name)
            .or_else(|| ast.class.table.lookup(&self.name))
            .map(|decl| decl.ty.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub array: NamedValue,
    pub index: Box<Expr>,
}

/// An assignable location: a plain variable or an element of an array.
/// Also the shape of a method-call callee.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Var(NamedValue),
    Index(IndexExpr),
}

impl Place {
    pub fn named(&self) -> &NamedValue {
        match self {
            Place::Var(value) => value,
            Place::Index(index) => &index.array,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub class: String,
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Absent for a bare call, whose receiver is the current `this`.
    pub callee: Option<Place>,
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntConst(i64),
    CharConst(u8),
    StrConst(String),
    True,
    False,
    This,
    Empty,
    Place(Place),
    /// Marks that the wrapped location should be loaded rather than
    /// yielded as an address.
    RValue(Box<Expr>),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    FunctionCall(FunctionCall),
    MethodCall(MethodCall),
}

impl Expr {
    pub fn rvalue(inner: Expr) -> Expr {
        Expr::RValue(Box::new(inner))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Let { place: Place, expr: Expr },
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    While { cond: Expr, body: Block },
    Do(Expr),
    /// `Expr::Empty` when the return carries no value.
    Return(Expr),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// A static function: no implicit receiver.
    Function,
    Method,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: String,
    pub kind: FunctionKind,
    pub params: Vec<VarDecl>,
    pub body: Block,
    pub table: Table,
}

impl FunctionDecl {
    /// A method's parameter list is silently prefixed with `this`; its type
    /// is filled in when the class adopts the method.
    pub fn new(
        kind: FunctionKind,
        name: impl Into<String>,
        return_type: impl Into<String>,
        mut params: Vec<VarDecl>,
    ) -> Self {
        let name = name.into();
        if kind == FunctionKind::Method {
            params.insert(0, VarDecl::new("this", ""));
        }
        let mut table = Table::new(name.clone());
        for param in &params {
            table.insert(param.clone());
        }
        FunctionDecl {
            name,
            return_type: return_type.into(),
            kind,
            params,
            body: Block::default(),
            table,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub fields: Vec<VarDecl>,
    pub statics: Vec<VarDecl>,
    /// Static functions and constructors, in declaration order.
    pub functions: Vec<FunctionId>,
    pub methods: Vec<FunctionId>,
    pub table: Table,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        ClassDecl {
            table: Table::new(name.clone()),
            name,
            fields: vec![],
            statics: vec![],
            functions: vec![],
            methods: vec![],
        }
    }

    pub fn add_field(&mut self, decl: VarDecl) -> bool {
        let fresh = self.table.insert(decl.clone());
        self.fields.push(decl);
        fresh
    }

    pub fn add_static(&mut self, decl: VarDecl) -> bool {
        let fresh = self.table.insert(decl.clone());
        self.statics.push(decl);
        fresh
    }

    /// Field indices follow declaration order and are stable for the
    /// class's lifetime.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// One compilation unit: the single class a `.jack` file declares, plus the
/// arena that owns its subroutines. `FunctionId`s index into the arena, so
/// the class/function/named-value reference cycle needs no pointers; the
/// arena outlives every consumer of the unit.
#[derive(Debug, Clone)]
pub struct Ast {
    pub class: ClassDecl,
    functions: Vec<FunctionDecl>,
}

impl Ast {
    pub fn new(class_name: impl Into<String>) -> Self {
        Ast {
            class: ClassDecl::new(class_name),
            functions: vec![],
        }
    }

    pub fn new_function(&mut self, decl: FunctionDecl) -> FunctionId {
        self.functions.push(decl);
        FunctionId(self.functions.len() - 1)
    }

    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut FunctionDecl {
        &mut self.functions[id.0]
    }

    /// Attach a parsed subroutine to the class. Methods additionally get
    /// the type of their synthetic `this` parameter filled in here.
    pub fn adopt(&mut self, id: FunctionId) {
        let class_name = self.class.name.clone();
        let func = &mut self.functions[id.0];
        match func.kind {
            FunctionKind::Method => {
                func.params[0].ty = class_name.clone();
                func.table.set_type("this", class_name);
                self.class.methods.push(id);
            }
            FunctionKind::Function | FunctionKind::Constructor => {
                self.class.functions.push(id);
            }
        }
    }
}
