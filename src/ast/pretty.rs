//! Indented textual rendering of a compilation unit. A debugging aid: it is
//! stable across invocations but is not meant to be re-parsed.

use super::{Ast, Block, Expr, FunctionDecl, FunctionId, FunctionKind, Place, Stmt, VarDecl};

pub fn print(ast: &Ast) -> String {
    let mut printer = PrettyPrinter {
        ast,
        out: String::new(),
        offset: 0,
    };
    printer.class();
    printer.out
}

struct PrettyPrinter<'a> {
    ast: &'a Ast,
    out: String,
    offset: usize,
}

impl PrettyPrinter<'_> {
    fn pad(&self) -> String {
        " ".repeat(self.offset * 2)
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(&self.pad());
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.offset += 1;
        f(self);
        self.offset -= 1;
    }

    fn class(&mut self) {
        let class = &self.ast.class;
        self.nested(|p| {
            p.line(&format!("Class: {}", class.name));
            p.line("Fields: ");
            for field in &class.fields {
                p.var_decl(field);
            }
            p.line("Statics: ");
            for var in &class.statics {
                p.var_decl(var);
            }
            p.line("Functions: ");
            for &id in &class.functions {
                p.function(id);
            }
            p.line("Methods: ");
            for &id in &class.methods {
                p.function(id);
            }
        });
    }

    fn function(&mut self, id: FunctionId) {
        let func: &FunctionDecl = self.ast.function(id);
        let label = match func.kind {
            FunctionKind::Function => "StaticDecl",
            FunctionKind::Method => "MethodDecl",
            FunctionKind::Constructor => "ConstructorDecl",
        };
        self.nested(|p| {
            p.line(&format!("{}: {} {}", label, func.return_type, func.name));
            p.line("Params: ");
            for param in &func.params {
                p.var_decl(param);
            }
            p.block(&func.body);
        });
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.nested(|p| p.line(&format!("VarDecl: {} {}", decl.ty, decl.name)));
    }

    fn block(&mut self, block: &Block) {
        self.nested(|p| {
            p.line("Block: {");
            for stmt in &block.stmts {
                p.stmt(stmt);
            }
            p.line("}");
        });
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => self.var_decl(decl),
            Stmt::Let { place, expr } => self.nested(|p| {
                p.line("LetStmt: ");
                p.place(place);
                p.expr(expr);
            }),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.nested(|p| {
                p.line("IfStmt: ");
                p.expr(cond);
                p.block(then_branch);
                if let Some(branch) = else_branch {
                    p.block(branch);
                }
            }),
            Stmt::While { cond, body } => self.nested(|p| {
                p.line("WhileStmt: ");
                p.expr(cond);
                p.line("{");
                p.block(body);
                p.line("}");
            }),
            Stmt::Do(call) => self.expr(call),
            Stmt::Return(expr) => self.nested(|p| {
                p.line("ReturnStmt: ");
                p.expr(expr);
            }),
        }
    }

    fn place(&mut self, place: &Place) {
        match place {
            Place::Var(value) => {
                self.nested(|p| p.line(&format!("Identifier: {}", value.name)));
            }
            Place::Index(index) => self.nested(|p| {
                p.line(&format!("IndexExpr:{}", index.array.name));
                p.line("[");
                p.expr(&index.index);
                p.line("]");
            }),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntConst(i) => self.nested(|p| p.line(&format!("IntConst: {}", i))),
            Expr::CharConst(c) => self.nested(|p| p.line(&format!("CharConst: {}", c))),
            Expr::StrConst(s) => self.nested(|p| p.line(&format!("StrConst: {}", s))),
            Expr::True => self.nested(|p| p.line("true")),
            Expr::False => self.nested(|p| p.line("false")),
            Expr::This => self.nested(|p| p.line("this")),
            Expr::Empty => {}
            Expr::Place(place) => self.place(place),
            Expr::RValue(inner) => self.nested(|p| {
                p.line("RValue (");
                p.expr(inner);
                p.line(")");
            }),
            Expr::Unary { op, operand } => self.nested(|p| {
                p.line(&format!("UnaryExpr: {}", op.as_char()));
                p.expr(operand);
            }),
            Expr::Binary { op, lhs, rhs } => self.nested(|p| {
                p.line(&op.as_char().to_string());
                p.expr(lhs);
                p.expr(rhs);
            }),
            Expr::FunctionCall(call) => self.nested(|p| {
                p.line(&format!("FunctionCall: {}.{}", call.class, call.name));
                p.line("Args:");
                for arg in &call.args {
                    p.expr(arg);
                }
            }),
            Expr::MethodCall(call) => self.nested(|p| {
                p.line(&format!("MethodCall: {}", call.name));
                if let Some(callee) = &call.callee {
                    p.place(callee);
                }
                p.line("Args:");
                for arg in &call.args {
                    p.expr(arg);
                }
            }),
        }
    }
}
