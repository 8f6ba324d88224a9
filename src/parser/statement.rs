use super::{Parser, SyntaxError};
use crate::ast::{Block, Expr, FunctionCall, IndexExpr, MethodCall, Place, Stmt, VarDecl};
use crate::lexer::{Keyword, Symbol, Token};

impl Parser<'_> {
    /// body := '{' varDec* statement* '}'
    pub(crate) fn parse_body(&mut self) -> Result<Block, SyntaxError> {
        let mut block = Block::default();
        self.expect_symbol(Symbol::LCurly)?;

        while matches!(self.tokens.peek(), Token::Keyword(Keyword::Var)) {
            self.parse_var_dec(&mut block)?;
        }

        loop {
            let kw = match self.tokens.peek() {
                Token::Keyword(kw) => *kw,
                _ => break,
            };
            match kw {
                Keyword::Let => block.push(self.parse_let()?),
                Keyword::If => block.push(self.parse_if()?),
                Keyword::While => block.push(self.parse_while()?),
                Keyword::Do => block.push(self.parse_do()?),
                Keyword::Return => block.push(self.parse_return()?),
                _ => return Err(self.expected("a statement")),
            }
        }

        self.expect_symbol(Symbol::RCurly)?;
        Ok(block)
    }

    /// varDec := 'var' type Ident (',' Ident)* ';'
    ///
    /// Each declared name enters the function scope here, before the rest
    /// of the body is parsed.
    fn parse_var_dec(&mut self, block: &mut Block) -> Result<(), SyntaxError> {
        self.expect_keyword(Keyword::Var)?;
        let ty = self.parse_type()?;

        loop {
            let name = self.expect_identifier()?;
            let decl = VarDecl::new(name, ty.clone());
            let owner = self.current_function();
            self.ast.function_mut(owner).table.insert(decl.clone());
            block.push(Stmt::Var(decl));
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }

        self.expect_symbol(Symbol::Semicolon)
    }

    /// let := 'let' Ident ('[' expr ']')? '=' expr ';'
    fn parse_let(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.expect_identifier()?;

        let place = if self.eat_symbol(Symbol::LBracket) {
            let index = self.parse_expression()?;
            self.expect_symbol(Symbol::RBracket)?;
            Place::Index(IndexExpr {
                array: self.named_value(name)?,
                index: Box::new(index),
            })
        } else {
            Place::Var(self.named_value(name)?)
        };

        self.expect_symbol(Symbol::Eq)?;
        let expr = self.parse_expression()?;
        self.expect_symbol(Symbol::Semicolon)?;

        Ok(Stmt::Let { place, expr })
    }

    /// if := 'if' '(' expr ')' body ('else' body)?
    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect_keyword(Keyword::If)?;
        self.expect_symbol(Symbol::LParen)?;
        let cond = self.parse_expression()?;
        self.expect_symbol(Symbol::RParen)?;
        let then_branch = self.parse_body()?;

        let else_branch = if matches!(self.tokens.peek(), Token::Keyword(Keyword::Else)) {
            self.tokens.advance();
            Some(self.parse_body()?)
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    /// while := 'while' '(' expr ')' body
    fn parse_while(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect_keyword(Keyword::While)?;
        self.expect_symbol(Symbol::LParen)?;
        let cond = self.parse_expression()?;
        self.expect_symbol(Symbol::RParen)?;
        let body = self.parse_body()?;
        Ok(Stmt::While { cond, body })
    }

    /// do := 'do' subroutineCall ';'
    ///
    /// The grammar admits both a method call on a value and a static call
    /// on a class name; an identifier that resolves in scope is a callee,
    /// one that does not is taken as a class name.
    fn parse_do(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect_keyword(Keyword::Do)?;
        let identifier = self.expect_identifier()?;

        let callee = if self.eat_symbol(Symbol::LBracket) {
            let index = self.parse_expression()?;
            self.expect_symbol(Symbol::RBracket)?;
            Some(Place::Index(IndexExpr {
                array: self.named_value(identifier.clone())?,
                index: Box::new(index),
            }))
        } else if self.in_scope(&identifier) {
            Some(Place::Var(self.named_value(identifier.clone())?))
        } else {
            None
        };

        let call = if self.eat_symbol(Symbol::Period) {
            let routine = self.expect_identifier()?;
            let args = self.parse_call_arguments()?;
            match callee {
                Some(callee) => Expr::MethodCall(MethodCall {
                    callee: Some(callee),
                    name: routine,
                    args,
                }),
                None => Expr::FunctionCall(FunctionCall {
                    class: identifier,
                    name: routine,
                    args,
                }),
            }
        } else {
            // A bare name is a call on the current object.
            let args = self.parse_call_arguments()?;
            Expr::MethodCall(MethodCall {
                callee: None,
                name: identifier,
                args,
            })
        };

        self.expect_symbol(Symbol::Semicolon)?;
        Ok(Stmt::Do(call))
    }

    /// return := 'return' expr? ';'
    fn parse_return(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect_keyword(Keyword::Return)?;
        let expr = if matches!(self.tokens.peek(), Token::Symbol(Symbol::Semicolon)) {
            Expr::Empty
        } else {
            self.parse_expression()?
        };
        self.expect_symbol(Symbol::Semicolon)?;
        Ok(Stmt::Return(expr))
    }
}
