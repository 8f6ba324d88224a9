use super::{Parser, SyntaxError};
use crate::ast::{BinOp, Expr, FunctionCall, IndexExpr, MethodCall, Place, UnOp};
use crate::lexer::{Keyword, Symbol, Token};

fn binop_from(sym: Symbol) -> Option<BinOp> {
    match sym {
        Symbol::Plus => Some(BinOp::Add),
        Symbol::Minus => Some(BinOp::Sub),
        Symbol::Mul => Some(BinOp::Mul),
        Symbol::Div => Some(BinOp::Div),
        Symbol::Lt => Some(BinOp::Lt),
        Symbol::Gt => Some(BinOp::Gt),
        Symbol::Eq => Some(BinOp::Eq),
        Symbol::And => Some(BinOp::And),
        Symbol::Or => Some(BinOp::Or),
        _ => None,
    }
}

impl Parser<'_> {
    /// expr := term (op term)*
    ///
    /// All operators share one precedence level and reduce left-to-right,
    /// producing a left-leaning tree.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_term()?;

        loop {
            let op = match self.tokens.peek() {
                Token::Symbol(sym) => match binop_from(*sym) {
                    Some(op) => op,
                    None => break,
                },
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.parse_term()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }

        Ok(expr)
    }

    /// term := IntLit | StrLit | KeywordConst | Ident('['expr']')?
    ///       | subroutineCall | '(' expr ')' | ('-'|'~') term
    pub(crate) fn parse_term(&mut self) -> Result<Expr, SyntaxError> {
        match self.tokens.peek().clone() {
            Token::Identifier(identifier) => {
                self.tokens.advance();
                self.parse_term_identifier(identifier)
            }
            Token::Symbol(Symbol::LParen) => {
                self.tokens.advance();
                let expr = self.parse_expression()?;
                self.expect_symbol(Symbol::RParen)?;
                Ok(expr)
            }
            Token::Symbol(Symbol::Minus) => {
                self.tokens.advance();
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(self.parse_term()?),
                })
            }
            Token::Symbol(Symbol::Not) => {
                self.tokens.advance();
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(self.parse_term()?),
                })
            }
            Token::IntConst(value) => {
                self.tokens.advance();
                Ok(Expr::IntConst(value))
            }
            Token::StrConst(value) => {
                self.tokens.advance();
                Ok(Expr::StrConst(value))
            }
            Token::Keyword(Keyword::True) => {
                self.tokens.advance();
                Ok(Expr::True)
            }
            Token::Keyword(Keyword::False) => {
                self.tokens.advance();
                Ok(Expr::False)
            }
            // null is the integer zero
            Token::Keyword(Keyword::Null) => {
                self.tokens.advance();
                Ok(Expr::IntConst(0))
            }
            Token::Keyword(Keyword::This) => {
                self.tokens.advance();
                Ok(Expr::rvalue(Expr::This))
            }
            _ => Err(self.expected("a term")),
        }
    }

    /// An identifier term is a variable use, an array access, or one of the
    /// two call forms. An in-scope identifier before `.` is a method-call
    /// callee; an out-of-scope one is a class name.
    fn parse_term_identifier(&mut self, identifier: String) -> Result<Expr, SyntaxError> {
        let place = if self.eat_symbol(Symbol::LBracket) {
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

        if self.eat_symbol(Symbol::Period) {
            let routine = self.expect_identifier()?;
            let args = self.parse_call_arguments()?;
            return Ok(match place {
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
            });
        }

        if matches!(self.tokens.peek(), Token::Symbol(Symbol::LParen)) {
            // A bare call names a method of the current object.
            let args = self.parse_call_arguments()?;
            return Ok(Expr::MethodCall(MethodCall {
                callee: None,
                name: identifier,
                args,
            }));
        }

        match place {
            Some(place) => Ok(Expr::rvalue(Expr::Place(place))),
            None => Err(self.error(format!("Undefined identifier {}", identifier))),
        }
    }

    /// '(' (expr (',' expr)*)? ')'
    pub(crate) fn parse_call_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect_symbol(Symbol::LParen)?;
        let mut args = vec![];
        if !matches!(self.tokens.peek(), Token::Symbol(Symbol::RParen)) {
            args.push(self.parse_expression()?);
            while !matches!(self.tokens.peek(), Token::Symbol(Symbol::RParen)) {
                self.expect_symbol(Symbol::Comma)?;
                args.push(self.parse_expression()?);
            }
        }
        self.expect_symbol(Symbol::RParen)?;
        Ok(args)
    }
}
