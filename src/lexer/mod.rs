use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use logos::{Filter, Lexer, Logos, Skip, SpannedIter};

#[cfg(test)]
pub mod test;

/// The reserved words of Jack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Class => "class",
            Keyword::Constructor => "constructor",
            Keyword::Function => "function",
            Keyword::Method => "method",
            Keyword::Field => "field",
            Keyword::Static => "static",
            Keyword::Var => "var",
            Keyword::Int => "int",
            Keyword::Char => "char",
            Keyword::Boolean => "boolean",
            Keyword::Void => "void",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::This => "this",
            Keyword::Let => "let",
            Keyword::Do => "do",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Return => "return",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 19 punctuation characters of Jack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Plus,
    Minus,
    Mul,
    Div,
    Eq,
    Lt,
    Gt,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LCurly,
    RCurly,
    And,
    Or,
    Semicolon,
    Comma,
    Not,
    Period,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Plus => '+',
            Symbol::Minus => '-',
            Symbol::Mul => '*',
            Symbol::Div => '/',
            Symbol::Eq => '=',
            Symbol::Lt => '<',
            Symbol::Gt => '>',
            Symbol::LParen => '(',
            Symbol::RParen => ')',
            Symbol::LBracket => '[',
            Symbol::RBracket => ']',
            Symbol::LCurly => '{',
            Symbol::RCurly => '}',
            Symbol::And => '&',
            Symbol::Or => '|',
            Symbol::Semicolon => ';',
            Symbol::Comma => ',',
            Symbol::Not => '~',
            Symbol::Period => '.',
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\x0c]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("class", |_| Keyword::Class)]
    #[token("constructor", |_| Keyword::Constructor)]
    #[token("function", |_| Keyword::Function)]
    #[token("method", |_| Keyword::Method)]
    #[token("field", |_| Keyword::Field)]
    #[token("static", |_| Keyword::Static)]
    #[token("var", |_| Keyword::Var)]
    #[token("int", |_| Keyword::Int)]
    #[token("char", |_| Keyword::Char)]
    #[token("boolean", |_| Keyword::Boolean)]
    #[token("void", |_| Keyword::Void)]
    #[token("true", |_| Keyword::True)]
    #[token("false", |_| Keyword::False)]
    #[token("null", |_| Keyword::Null)]
    #[token("this", |_| Keyword::This)]
    #[token("let", |_| Keyword::Let)]
    #[token("do", |_| Keyword::Do)]
    #[token("if", |_| Keyword::If)]
    #[token("else", |_| Keyword::Else)]
    #[token("while", |_| Keyword::While)]
    #[token("return", |_| Keyword::Return)]
    Keyword(Keyword),

    #[token("+", |_| Symbol::Plus)]
    #[token("-", |_| Symbol::Minus)]
    #[token("*", |_| Symbol::Mul)]
    #[token("/", |_| Symbol::Div)]
    #[token("=", |_| Symbol::Eq)]
    #[token("<", |_| Symbol::Lt)]
    #[token(">", |_| Symbol::Gt)]
    #[token("(", |_| Symbol::LParen)]
    #[token(")", |_| Symbol::RParen)]
    #[token("[", |_| Symbol::LBracket)]
    #[token("]", |_| Symbol::RBracket)]
    #[token("{", |_| Symbol::LCurly)]
    #[token("}", |_| Symbol::RCurly)]
    #[token("&", |_| Symbol::And)]
    #[token("|", |_| Symbol::Or)]
    #[token(";", |_| Symbol::Semicolon)]
    #[token(",", |_| Symbol::Comma)]
    #[token("~", |_| Symbol::Not)]
    #[token(".", |_| Symbol::Period)]
    Symbol(Symbol),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntConst(i64),

    #[token("\"", lex_string)]
    StrConst(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Never produced by the derive: block comments are skipped by the
    // callback (an unterminated one swallows the rest of the stream), and
    // the cursor reports `End` once the token iterator is exhausted.
    #[token("/*", lex_block_comment)]
    End,
}

// Strings are taken verbatim up to the closing quote; there are no escape
// sequences in Jack. A missing close quote ends the stream.
fn lex_string(lex: &mut Lexer<Token>) -> Filter<String> {
    let rest = lex.remainder();
    match rest.find('"') {
        Some(close) => {
            let content = rest[..close].to_string();
            lex.bump(close + 1);
            Filter::Emit(content)
        }
        None => {
            lex.bump(rest.len());
            Filter::Skip
        }
    }
}

// Scan for the exact two-character close; nesting is not supported.
fn lex_block_comment(lex: &mut Lexer<Token>) -> Skip {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(close) => lex.bump(close + 2),
        None => lex.bump(rest.len()),
    }
    Skip
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "Keyword: {}", k),
            Token::Symbol(s) => write!(f, "Symbol: {}", s),
            Token::IntConst(i) => write!(f, "IntegerConstant: {}", i),
            Token::StrConst(s) => write!(f, "StringConstant: {}", s),
            Token::Identifier(i) => write!(f, "Identifier: {}", i),
            Token::End => write!(f, "end of file"),
        }
    }
}

/// Byte span of the first character the token rules do not accept, if any.
/// The driver refuses to parse a unit containing one.
pub fn first_invalid_span(source: &str) -> Option<Range<usize>> {
    let mut tokens = Token::lexer(source).spanned();
    tokens.find_map(|(tok, span)| tok.is_err().then_some(span))
}

/// One-token-lookahead cursor over a Jack source.
///
/// `peek` never fails; once the underlying stream is exhausted it yields
/// [`Token::End`]. `line`/`column` are 1-based and refer to the first
/// character of the current token; a tab advances the column by 2.
pub struct JackLexer<'a> {
    source: &'a str,
    tokens: SpannedIter<'a, Token>,
    current: Token,
    span: Range<usize>,
    scanned: usize,
    line: u32,
    column: u32,
    tok_line: u32,
    tok_column: u32,
}

impl<'a> JackLexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = JackLexer {
            source,
            tokens: Token::lexer(source).spanned(),
            current: Token::End,
            span: 0..0,
            scanned: 0,
            line: 1,
            column: 1,
            tok_line: 1,
            tok_column: 1,
        };
        lexer.advance();
        lexer
    }

    pub fn peek(&self) -> &Token {
        &self.current
    }

    /// Take the current token and move the cursor past it.
    pub fn consume(&mut self) -> Token {
        let tok = self.current.clone();
        self.advance();
        tok
    }

    pub fn advance(&mut self) {
        loop {
            match self.tokens.next() {
                Some((Ok(tok), span)) => {
                    self.track(span.start);
                    self.current = tok;
                    self.span = span;
                    return;
                }
                // Unrecognized character; the driver pre-scan reports it.
                Some((Err(()), _)) => continue,
                None => {
                    self.track(self.source.len());
                    self.current = Token::End;
                    self.span = self.source.len()..self.source.len();
                    return;
                }
            }
        }
    }

    pub fn line(&self) -> u32 {
        self.tok_line
    }

    pub fn column(&self) -> u32 {
        self.tok_column
    }

    /// Byte span of the current token, for source-labelled diagnostics.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn get_int(&self) -> Option<i64> {
        match self.current {
            Token::IntConst(i) => Some(i),
            _ => None,
        }
    }

    pub fn get_string(&self) -> Option<&str> {
        match &self.current {
            Token::StrConst(s) => Some(s),
            _ => None,
        }
    }

    fn track(&mut self, upto: usize) {
        for c in self.source[self.scanned..upto].chars() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.column = 1;
                }
                '\t' => self.column += 2,
                _ => self.column += 1,
            }
        }
        self.scanned = upto;
        self.tok_line = self.line;
        self.tok_column = self.column;
    }
}
