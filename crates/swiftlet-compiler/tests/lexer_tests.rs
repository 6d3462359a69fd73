use swiftlet_compiler::frontend::lexer::{tokenize, Lexer, Token, TokenKind, TokenSource};
use swiftlet_compiler::{compile_program, CompilerConfig, CompilerError, SourceLocation, Type};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn test_lexer_operators() {
    assert_eq!(
        kinds("+ - * / = == != < > <= >= ! ?? -> ( ) { } : ,"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::Bang,
            TokenKind::QuestionQuestion,
            TokenKind::Arrow,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lexer_declaration() {
    assert_eq!(
        kinds("var price: Double? = 2.5"),
        vec![
            TokenKind::Var,
            TokenKind::Identifier("price".to_string()),
            TokenKind::Colon,
            TokenKind::TypeName(Type::OptionalDouble),
            TokenKind::Equal,
            TokenKind::DoubleLiteral(2.5),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lexer_unwrap_after_identifier() {
    assert_eq!(
        kinds("a! != nil"),
        vec![
            TokenKind::Identifier("a".to_string()),
            TokenKind::Bang,
            TokenKind::BangEqual,
            TokenKind::Nil,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lexer_errors_are_lexical() {
    for source in ["let x = 1.", "\"abc", "let @", "/* open", "\"\\x\""] {
        let error = tokenize(source).unwrap_err();
        assert_eq!(error.exit_code(), 1, "{}", source);
    }
}

/// 事前に用意したトークン列を返す供給源
struct VecSource {
    tokens: Vec<Token>,
    position: usize,
}

impl VecSource {
    fn new(kinds: Vec<(TokenKind, bool)>) -> Self {
        let tokens = kinds
            .into_iter()
            .enumerate()
            .map(|(i, (kind, eol))| Token::new(kind, SourceLocation::new(1, i + 1), eol))
            .collect();
        Self { tokens, position: 0 }
    }
}

impl TokenSource for VecSource {
    fn next_token(&mut self) -> Result<Token, CompilerError> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, SourceLocation::new(1, self.position + 1), false));
        self.position += 1;
        Ok(token)
    }
}

#[test]
fn test_parser_accepts_any_token_source() {
    // let x = 1
    // write(x)
    let source = VecSource::new(vec![
        (TokenKind::Let, false),
        (TokenKind::Identifier("x".to_string()), false),
        (TokenKind::Equal, false),
        (TokenKind::IntLiteral(1), false),
        (TokenKind::Identifier("write".to_string()), true),
        (TokenKind::LeftParen, false),
        (TokenKind::Identifier("x".to_string()), false),
        (TokenKind::RightParen, false),
    ]);

    let program = compile_program(source, &CompilerConfig::default()).unwrap();
    assert_eq!(program.calls.len(), 1);
}

#[test]
fn test_lexer_and_token_source_agree() {
    let source = "let a = 1\nlet b = a";
    let mut lexer = Lexer::new(source);
    for expected in tokenize(source).unwrap() {
        assert_eq!(lexer.next_token().unwrap(), expected);
    }
}
