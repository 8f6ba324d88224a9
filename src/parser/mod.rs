use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind};

use crate::ast::{Ast, FunctionDecl, FunctionId, FunctionKind, NamedValue, VarDecl};
use crate::lexer::{JackLexer, Keyword, Symbol, Token};
use crate::symbols::Kind;

pub mod expression;
pub mod statement;

#[cfg(test)]
pub mod test;

/// A structured parse diagnostic: where it happened and what was expected.
/// `Display` renders the canonical single-line form; `report` builds a
/// source-labelled report for terminal output.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub span: Range<usize>,
}

impl SyntaxError {
    pub fn report(&self) -> Report<'static, (String, Range<usize>)> {
        Report::build(ReportKind::Error, (self.file.clone(), self.span.clone()))
            .with_message(self.message.clone())
            .with_label(
                Label::new((self.file.clone(), self.span.clone()))
                    .with_message(self.message.clone())
                    .with_color(Color::Red),
            )
            .finish()
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[error: {}: {}:{}] {}",
            self.file, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Recursive-descent parser over the one-token-lookahead lexer cursor.
/// Produces the unit's AST while inserting every declaration into its
/// scope at the point of declaration, so that uses inside bodies resolve.
/// No backtracking, no recovery: the first mismatch is returned.
pub struct Parser<'a> {
    tokens: JackLexer<'a>,
    file: String,
    ast: Ast,
    current_fn: Option<FunctionId>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: JackLexer<'a>, file: String) -> Self {
        Parser {
            tokens,
            file,
            ast: Ast::new(String::new()),
            current_fn: None,
        }
    }

    /// class := 'class' Ident '{' classVarDec* subroutineDec* '}'
    pub fn parse_class(mut self) -> Result<Ast, SyntaxError> {
        self.expect_keyword(Keyword::Class)?;
        let name = self.expect_identifier()?;
        self.ast = Ast::new(name);
        self.expect_symbol(Symbol::LCurly)?;

        while matches!(
            self.tokens.peek(),
            Token::Keyword(Keyword::Static | Keyword::Field)
        ) {
            self.parse_class_var_dec()?;
        }

        while matches!(
            self.tokens.peek(),
            Token::Keyword(Keyword::Constructor | Keyword::Function | Keyword::Method)
        ) {
            self.parse_subroutine_dec()?;
        }

        self.expect_symbol(Symbol::RCurly)?;
        Ok(self.ast)
    }

    /// classVarDec := ('static'|'field') type Ident (',' Ident)* ';'
    fn parse_class_var_dec(&mut self) -> Result<(), SyntaxError> {
        let kind = match self.tokens.consume() {
            Token::Keyword(Keyword::Static) => Kind::Static,
            Token::Keyword(Keyword::Field) => Kind::Field,
            _ => unreachable!("caller checked the lookahead"),
        };
        let ty = self.parse_type()?;

        loop {
            let name = self.expect_identifier()?;
            let decl = VarDecl::new(name, ty.clone());
            match kind {
                Kind::Static => self.ast.class.add_static(decl),
                _ => self.ast.class.add_field(decl),
            };
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }

        self.expect_symbol(Symbol::Semicolon)
    }

    /// subDec := ('constructor'|'function'|'method') (type|'void')
    ///               Ident '(' paramList ')' body
    fn parse_subroutine_dec(&mut self) -> Result<(), SyntaxError> {
        let kind = match self.tokens.consume() {
            Token::Keyword(Keyword::Constructor) => FunctionKind::Constructor,
            Token::Keyword(Keyword::Function) => FunctionKind::Function,
            Token::Keyword(Keyword::Method) => FunctionKind::Method,
            _ => unreachable!("caller checked the lookahead"),
        };
        let return_type = self.parse_type()?;
        let name = self.expect_identifier()?;

        self.expect_symbol(Symbol::LParen)?;
        let params = self.parse_parameter_list()?;
        self.expect_symbol(Symbol::RParen)?;

        // The declaration enters the arena before its body is parsed so
        // that self-references resolve.
        let id = self
            .ast
            .new_function(FunctionDecl::new(kind, name, return_type, params));
        self.current_fn = Some(id);
        let body = self.parse_body()?;
        self.ast.function_mut(id).body = body;
        self.ast.adopt(id);
        self.current_fn = None;
        Ok(())
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<VarDecl>, SyntaxError> {
        let mut params = vec![];
        if matches!(self.tokens.peek(), Token::Symbol(Symbol::RParen)) {
            return Ok(params);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            params.push(VarDecl::new(name, ty));
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }
        Ok(params)
    }

    /// A type is a built-in keyword (`int`, `char`, `boolean`, `void`) or a
    /// class name.
    fn parse_type(&mut self) -> Result<String, SyntaxError> {
        match self.tokens.peek() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.tokens.advance();
                Ok(name)
            }
            Token::Keyword(
                kw @ (Keyword::Int | Keyword::Char | Keyword::Boolean | Keyword::Void),
            ) => {
                let name = kw.as_str().to_string();
                self.tokens.advance();
                Ok(name)
            }
            _ => Err(self.expected("a type name")),
        }
    }

    // -- token helpers ----------------------------------------------------

    fn expect_symbol(&mut self, sym: Symbol) -> Result<(), SyntaxError> {
        if matches!(self.tokens.peek(), Token::Symbol(s) if *s == sym) {
            self.tokens.advance();
            Ok(())
        } else {
            Err(self.expected(&format!("Symbol: {}", sym)))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), SyntaxError> {
        if matches!(self.tokens.peek(), Token::Keyword(k) if *k == kw) {
            self.tokens.advance();
            Ok(())
        } else {
            Err(self.expected(&format!("Keyword: {}", kw)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, SyntaxError> {
        match self.tokens.peek() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.tokens.advance();
                Ok(name)
            }
            _ => Err(self.expected("an identifier")),
        }
    }

    fn eat_symbol(&mut self, sym: Symbol) -> bool {
        if matches!(self.tokens.peek(), Token::Symbol(s) if *s == sym) {
            self.tokens.advance();
            true
        } else {
            false
        }
    }

    // -- scope helpers ----------------------------------------------------

    pub(crate) fn current_function(&self) -> FunctionId {
        self.current_fn
            .expect("statements and expressions only occur inside a subroutine body")
    }

    fn in_scope(&self, name: &str) -> bool {
        let func = self.ast.function(self.current_function());
        func.table.lookup(name).is_some() || self.ast.class.table.lookup(name).is_some()
    }

    /// Bind a use of `name` to the enclosing function, checking that the
    /// name resolves in the function scope or the class scope.
    fn named_value(&mut self, name: String) -> Result<NamedValue, SyntaxError> {
        if !self.in_scope(&name) {
            return Err(self.error(format!("Undefined identifier {}", name)));
        }
        Ok(NamedValue::new(name, self.current_function()))
    }

    // -- diagnostics ------------------------------------------------------

    fn error(&self, message: String) -> SyntaxError {
        SyntaxError {
            file: self.file.clone(),
            line: self.tokens.line(),
            column: self.tokens.column(),
            message,
            span: self.tokens.span(),
        }
    }

    fn expected(&self, what: &str) -> SyntaxError {
        self.error(format!("Expected {} but found {}", what, self.tokens.peek()))
    }
}
