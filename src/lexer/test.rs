use super::*;

fn tokens(input: &str) -> Vec<Token> {
    let mut lexer = JackLexer::new(input);
    let mut out = vec![];
    loop {
        let tok = lexer.consume();
        let done = tok == Token::End;
        out.push(tok);
        if done {
            break;
        }
    }
    out
}

#[test]
fn quotes_are_parsed_out_of_string_constants() {
    let mut lexer = JackLexer::new("\"StringConstant\"");
    assert_eq!(lexer.consume(), Token::StrConst("StringConstant".into()));
    assert_eq!(*lexer.peek(), Token::End);

    let mut lexer = JackLexer::new("\"String\" \"Constant\"");
    assert_eq!(lexer.consume(), Token::StrConst("String".into()));
    assert_eq!(lexer.consume(), Token::StrConst("Constant".into()));
    assert_eq!(*lexer.peek(), Token::End);
}

#[test]
fn string_constants_can_contain_non_alphabetic_characters() {
    let input = "\"String Constant, with a class keyword and the number 420\"";
    let mut lexer = JackLexer::new(input);
    assert_eq!(
        lexer.consume(),
        Token::StrConst("String Constant, with a class keyword and the number 420".into())
    );
    assert_eq!(*lexer.peek(), Token::End);
}

#[test]
fn unterminated_string_ends_the_stream() {
    let mut lexer = JackLexer::new("\"no close quote");
    assert_eq!(*lexer.peek(), Token::End);
}

#[test]
fn trailing_and_extra_whitespace_is_removed() {
    assert_eq!(
        tokens("  identifier1 \t identifier2 \n \t"),
        vec![
            Token::Identifier("identifier1".into()),
            Token::Identifier("identifier2".into()),
            Token::End,
        ]
    );
}

#[test]
fn whitespace_only_input_is_end() {
    assert_eq!(*JackLexer::new("  \n\t  ").peek(), Token::End);
    assert_eq!(*JackLexer::new("").peek(), Token::End);
}

#[test]
fn single_and_multiline_comments_are_skipped() {
    assert_eq!(
        *JackLexer::new("// Some misc words that should not be processed\n").peek(),
        Token::End
    );
    assert_eq!(
        *JackLexer::new("/* Some misc words that should not be processed */\n").peek(),
        Token::End
    );
    assert_eq!(
        *JackLexer::new("/* Some misc \n words that \n should * / not be processed */\n").peek(),
        Token::End
    );
    assert_eq!(
        *JackLexer::new("// Some misc \n /// words // that should not be processed\n").peek(),
        Token::End
    );
    // Unterminated block comment swallows the rest of the stream.
    assert_eq!(*JackLexer::new("/* never closed").peek(), Token::End);
}

#[test]
fn division_is_not_a_comment() {
    assert_eq!(
        tokens("10 / 2"),
        vec![
            Token::IntConst(10),
            Token::Symbol(Symbol::Div),
            Token::IntConst(2),
            Token::End,
        ]
    );
}

#[test]
fn correctly_identify_symbols() {
    assert_eq!(
        tokens(",+-"),
        vec![
            Token::Symbol(Symbol::Comma),
            Token::Symbol(Symbol::Plus),
            Token::Symbol(Symbol::Minus),
            Token::End,
        ]
    );
}

#[test]
fn correctly_identify_all_jack_keywords() {
    use Keyword::*;
    let input = "class constructor function method field static var int char \
                 boolean void true false null this let do if else while return";
    let expected = [
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
    ];
    let mut lexer = JackLexer::new(input);
    for keyword in expected {
        assert_eq!(lexer.consume(), Token::Keyword(keyword));
    }
    assert_eq!(*lexer.peek(), Token::End);
}

#[test]
fn identify_integer_constants() {
    assert_eq!(
        tokens("420 069 23"),
        vec![
            Token::IntConst(420),
            Token::IntConst(69),
            Token::IntConst(23),
            Token::End,
        ]
    );
}

#[test]
fn handles_symbols_without_whitespace() {
    assert_eq!(
        tokens("let x=x+y;"),
        vec![
            Token::Keyword(Keyword::Let),
            Token::Identifier("x".into()),
            Token::Symbol(Symbol::Eq),
            Token::Identifier("x".into()),
            Token::Symbol(Symbol::Plus),
            Token::Identifier("y".into()),
            Token::Symbol(Symbol::Semicolon),
            Token::End,
        ]
    );
}

#[test]
fn tracks_line_and_column() {
    let mut lexer = JackLexer::new("class Main {\n\tvar int x;\n}");
    assert_eq!((lexer.line(), lexer.column()), (1, 1)); // class
    lexer.advance();
    assert_eq!((lexer.line(), lexer.column()), (1, 7)); // Main
    lexer.advance();
    assert_eq!((lexer.line(), lexer.column()), (1, 12)); // {
    lexer.advance();
    // tab advances the column by two
    assert_eq!((lexer.line(), lexer.column()), (2, 3)); // var
}

#[test]
fn invalid_characters_are_found_by_the_prescan() {
    assert_eq!(first_invalid_span("let @ x = 5;"), Some(4..5));
    assert_eq!(first_invalid_span("let x = 5;"), None);
}

#[test]
fn lexer_public_api() {
    let mut lexer = JackLexer::new(
        "class ClassName {\n  var int value;\n  function int foo() {\n    return 10;  }\n}",
    );
    assert_eq!(*lexer.peek(), Token::Keyword(Keyword::Class));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Identifier("ClassName".into()));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::LCurly));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Keyword(Keyword::Var));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Keyword(Keyword::Int));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Identifier("value".into()));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::Semicolon));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Keyword(Keyword::Function));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Keyword(Keyword::Int));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Identifier("foo".into()));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::LParen));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::RParen));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::LCurly));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Keyword(Keyword::Return));
    lexer.advance();
    assert_eq!(lexer.get_int(), Some(10));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::Semicolon));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::RCurly));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::Symbol(Symbol::RCurly));
    lexer.advance();
    assert_eq!(*lexer.peek(), Token::End);
}
