//! # レキサー（字句解析器）
//!
//! swiftlet言語のソースコードを字句解析し、1回の呼び出しにつき1つのトークンを返す
//! モジュールです。空白とコメントは読み飛ばされ、連続する改行はトークンの
//! `preceded_by_eol` フラグ1つにまとめられます。入力の終端では何度呼んでも
//! `Eof` トークンを返します。

use std::iter::Peekable;
use std::str::Chars;

use crate::frontend::error::{CompilerError, Result, SourceLocation};

pub mod token;

pub use self::token::{lookup_keyword, Token, TokenKind};

/// トークン供給源
///
/// パーサーはこのトレイトを通してのみトークンを受け取ります。
pub trait TokenSource {
    /// 次のトークンを取得
    fn next_token(&mut self) -> Result<Token>;
}

/// レキサー
pub struct Lexer<'a> {
    /// 文字イテレータ
    chars: Peekable<Chars<'a>>,
    /// 現在の行番号（1から始まる）
    line: usize,
    /// 現在の列番号（1から始まる）
    column: usize,
    /// 現在のトークンの開始行
    start_line: usize,
    /// 現在のトークンの開始列
    start_column: usize,
}

impl<'a> Lexer<'a> {
    /// 新しいレキサーを作成
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// 次のトークンを解析
    fn scan_token(&mut self) -> Result<Token> {
        // 空白文字とコメントをスキップ
        let preceded_by_eol = self.skip_trivia()?;

        // 現在位置を保存
        self.start_line = self.line;
        self.start_column = self.column;

        // ファイル終端チェック
        let c = match self.chars.peek() {
            Some(&c) => c,
            None => return Ok(self.make_token(TokenKind::Eof, preceded_by_eol)),
        };
        self.advance();

        // 識別子、キーワード
        if is_alpha(c) {
            let kind = self.identifier(c);
            return Ok(self.make_token(kind, preceded_by_eol));
        }

        // 数値
        if c.is_ascii_digit() {
            let kind = self.number(c)?;
            return Ok(self.make_token(kind, preceded_by_eol));
        }

        let kind = match c {
            // 単一文字トークン
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,

            // 複合トークン
            '-' => {
                if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '?' => {
                if self.match_char('?') {
                    TokenKind::QuestionQuestion
                } else {
                    return Err(CompilerError::lexical_error(
                        "単独の '?' は使用できません",
                        self.start_location(),
                    ));
                }
            }

            // 文字列リテラル
            '"' => self.string()?,

            // 不明な文字
            _ => {
                return Err(CompilerError::lexical_error(
                    format!("不明な文字です: '{}'", c),
                    self.start_location(),
                ))
            }
        };

        Ok(self.make_token(kind, preceded_by_eol))
    }

    /// 識別子またはキーワードの解析
    fn identifier(&mut self, first: char) -> TokenKind {
        let mut ident = first.to_string();

        while let Some(&c) = self.chars.peek() {
            if is_alpha(c) || c.is_ascii_digit() {
                ident.push(self.advance());
            } else {
                break;
            }
        }

        let kind = lookup_keyword(&ident);

        // 型名の直後の '?' はオプショナル型（'??' 演算子は除く）
        if let TokenKind::TypeName(ty) = kind {
            if self.chars.peek() == Some(&'?') && self.chars.clone().nth(1) != Some('?') {
                self.advance();
                return TokenKind::TypeName(ty.optional());
            }
        }

        kind
    }

    /// 数値リテラルの解析
    fn number(&mut self, first: char) -> Result<TokenKind> {
        let mut number = first.to_string();
        let mut is_float = false;

        // 整数部分
        self.digits(&mut number);

        // 小数部分
        if self.chars.peek() == Some(&'.') {
            is_float = true;
            number.push(self.advance());
            if !self.digits(&mut number) {
                return Err(CompilerError::lexical_error(
                    "小数点の後に数字がありません",
                    self.start_location(),
                ));
            }
        }

        // 指数部分 (1e10, 1.5e-3 など)
        if let Some(&c) = self.chars.peek() {
            if c == 'e' || c == 'E' {
                is_float = true;
                number.push(self.advance());

                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        number.push(self.advance());
                    }
                }

                if !self.digits(&mut number) {
                    return Err(CompilerError::lexical_error(
                        "指数部分に数字がありません",
                        self.start_location(),
                    ));
                }
            }
        }

        // 数値の直後に識別子文字が続くのは不正
        if let Some(&c) = self.chars.peek() {
            if is_alpha(c) {
                return Err(CompilerError::lexical_error(
                    format!("数値リテラルの後に不正な文字 '{}' があります", c),
                    self.start_location(),
                ));
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(TokenKind::DoubleLiteral)
                .map_err(|_| CompilerError::lexical_error(
                    format!("不正な浮動小数点リテラルです: {}", number),
                    self.start_location(),
                ))
        } else {
            number
                .parse::<i64>()
                .map(TokenKind::IntLiteral)
                .map_err(|_| CompilerError::lexical_error(
                    format!("整数リテラルが範囲外です: {}", number),
                    self.start_location(),
                ))
        }
    }

    /// 10進数字の並びを読み取る（1文字以上読めたらtrue）
    fn digits(&mut self, buffer: &mut String) -> bool {
        let mut has_digit = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                buffer.push(self.advance());
                has_digit = true;
            } else {
                break;
            }
        }
        has_digit
    }

    /// 文字列リテラルの解析（開始の '"' は消費済み）
    fn string(&mut self) -> Result<TokenKind> {
        // 空文字列 "" と複数行文字列 """ の区別
        if self.chars.peek() == Some(&'"') {
            self.advance();
            if self.match_char('"') {
                return self.multiline_string();
            }
            return Ok(TokenKind::StringLiteral(String::new()));
        }

        let mut raw = String::new();
        loop {
            match self.chars.peek() {
                None | Some('\n') => {
                    return Err(CompilerError::lexical_error(
                        "文字列リテラルが閉じられていません",
                        self.start_location(),
                    ));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    // エスケープ対象の文字ごと生のまま保持する
                    raw.push(self.advance());
                    if let Some(&next) = self.chars.peek() {
                        if next != '\n' {
                            raw.push(self.advance());
                        }
                    }
                }
                Some(_) => raw.push(self.advance()),
            }
        }

        let value = decode_escapes(&raw, self.start_location())?;
        Ok(TokenKind::StringLiteral(value))
    }

    /// 複数行文字列リテラルの解析（開始の '"""' は消費済み）
    ///
    /// 閉じの '"""' は単独の行に置かれ、その字下げが各行から取り除かれます。
    fn multiline_string(&mut self) -> Result<TokenKind> {
        // 開始デリミタの後は改行のみ許可
        while let Some(&c) = self.chars.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }
        if !self.match_char('\n') {
            return Err(CompilerError::lexical_error(
                "複数行文字列の開始 '\"\"\"' の後には改行が必要です",
                self.start_location(),
            ));
        }

        let mut lines: Vec<String> = Vec::new();
        let indentation = loop {
            if self.chars.peek().is_none() {
                return Err(CompilerError::lexical_error(
                    "複数行文字列リテラルが閉じられていません",
                    self.start_location(),
                ));
            }

            let mut line = String::new();
            while let Some(&c) = self.chars.peek() {
                if c == '\n' {
                    break;
                }
                line.push(self.advance());
            }

            let trimmed = line.trim_start_matches([' ', '\t']);
            if trimmed == "\"\"\"" {
                break line[..line.len() - trimmed.len()].to_string();
            }

            // 改行を消費して次の行へ
            self.advance();
            lines.push(line);
        };

        let mut content = Vec::with_capacity(lines.len());
        for line in &lines {
            let stripped = match line.strip_prefix(indentation.as_str()) {
                Some(rest) => rest,
                None if line.trim().is_empty() => "",
                None => {
                    return Err(CompilerError::lexical_error(
                        "複数行文字列の行の字下げが閉じの '\"\"\"' より浅いです",
                        self.start_location(),
                    ));
                }
            };
            content.push(decode_escapes(stripped.trim_end_matches('\r'), self.start_location())?);
        }

        Ok(TokenKind::StringLiteral(content.join("\n")))
    }

    /// 空白文字とコメントをスキップし、その間に改行があったかどうかを返す
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut saw_newline = false;

        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                saw_newline = true;
                self.advance();
            } else if c.is_whitespace() {
                self.advance();
            } else if c == '/' {
                match self.chars.clone().nth(1) {
                    Some('/') => self.line_comment(),
                    Some('*') => saw_newline |= self.block_comment()?,
                    _ => break,
                }
            } else {
                break;
            }
        }

        Ok(saw_newline)
    }

    /// 行コメントを読み飛ばす（改行は消費しない）
    fn line_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// ブロックコメント（入れ子可）を読み飛ばし、改行を含んでいたかを返す
    fn block_comment(&mut self) -> Result<bool> {
        let location = SourceLocation::new(self.line, self.column);
        self.advance();
        self.advance();

        let mut nesting = 1;
        let mut saw_newline = false;

        while nesting > 0 {
            let c = match self.chars.next() {
                Some(c) => {
                    self.bump_position(c);
                    c
                }
                None => {
                    return Err(CompilerError::lexical_error(
                        "ブロックコメントが閉じられていません",
                        location,
                    ));
                }
            };

            if c == '\n' {
                saw_newline = true;
            } else if c == '/' && self.match_char('*') {
                nesting += 1;
            } else if c == '*' && self.match_char('/') {
                nesting -= 1;
            }
        }

        Ok(saw_newline)
    }

    /// 指定した文字とマッチするか確認し、マッチすれば消費する
    fn match_char(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.advance();
            return true;
        }
        false
    }

    /// 次の文字を取得して進める
    fn advance(&mut self) -> char {
        match self.chars.next() {
            Some(c) => {
                self.bump_position(c);
                c
            }
            None => '\0',
        }
    }

    /// 行・列番号を更新
    fn bump_position(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// 現在のトークンの開始位置
    fn start_location(&self) -> SourceLocation {
        SourceLocation::new(self.start_line, self.start_column)
    }

    /// トークンを作成
    fn make_token(&self, kind: TokenKind, preceded_by_eol: bool) -> Token {
        Token::new(kind, self.start_location(), preceded_by_eol)
    }
}

impl<'a> TokenSource for Lexer<'a> {
    fn next_token(&mut self) -> Result<Token> {
        let token = self.scan_token()?;
        log::trace!("トークン: {}", token);
        Ok(token)
    }
}

/// エスケープシーケンスを解決する
///
/// 使用できるのは `\n` `\t` `\r` `\"` `\\` `\u{XXXX}`（1〜8桁の16進数）のみです。
pub fn decode_escapes(raw: &str, location: SourceLocation) -> Result<String> {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('"') => '"',
            Some('\\') => '\\',
            Some('u') => {
                if chars.next() != Some('{') {
                    return Err(CompilerError::lexical_error(
                        "Unicodeエスケープには '{' が必要です",
                        location,
                    ));
                }

                let mut hex = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(h) if h.is_ascii_hexdigit() && hex.len() < 8 => hex.push(h),
                        _ => {
                            return Err(CompilerError::lexical_error(
                                "不正なUnicodeエスケープシーケンスです",
                                location,
                            ));
                        }
                    }
                }

                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| CompilerError::lexical_error(
                        format!("不正なUnicodeスカラー値です: \\u{{{}}}", hex),
                        location,
                    ))?
            }
            Some(other) => {
                return Err(CompilerError::lexical_error(
                    format!("無効なエスケープシーケンスです: \\{}", other),
                    location,
                ));
            }
            None => {
                return Err(CompilerError::lexical_error("無効なエスケープシーケンスです", location));
            }
        };
        result.push(escaped);
    }

    Ok(result)
}

/// ソースコードをトークン列に変換する（終端の `Eof` を含む）
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

// ユーティリティ関数

/// 文字がASCIIアルファベットまたはアンダースコアかどうか
fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::semantic::types::Type;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_keywords() {
        let source = "let var func if else while return nil _";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Let,
                TokenKind::Var,
                TokenKind::Func,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Return,
                TokenKind::Nil,
                TokenKind::Underscore,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_optional_types() {
        let source = "Int Int? Double? String x ?? y";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::TypeName(Type::Int),
                TokenKind::TypeName(Type::OptionalInt),
                TokenKind::TypeName(Type::OptionalDouble),
                TokenKind::TypeName(Type::String),
                TokenKind::Identifier("x".to_string()),
                TokenKind::QuestionQuestion,
                TokenKind::Identifier("y".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            kinds("42 3.5 1e3 2.5E-1"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::DoubleLiteral(3.5),
                TokenKind::DoubleLiteral(1000.0),
                TokenKind::DoubleLiteral(0.25),
                TokenKind::Eof,
            ]
        );
        assert!(tokenize("1.").is_err());
        assert!(tokenize("1e+").is_err());
        assert!(tokenize("12abc").is_err());
    }

    #[test]
    fn test_tokenize_escapes() {
        assert_eq!(
            kinds(r#""a\n\t\"\\\u{41}""#),
            vec![TokenKind::StringLiteral("a\n\t\"\\A".to_string()), TokenKind::Eof]
        );
        assert!(tokenize(r#""\q""#).is_err());
        assert!(tokenize(r#""\u{110000}""#).is_err());
        assert!(tokenize("\"unterminated").is_err());
    }

    #[test]
    fn test_multiline_string_strips_indentation() {
        let source = "let s = \"\"\"\n    first\n      second\n    \"\"\"\n";
        let tokens = kinds(source);
        assert_eq!(tokens[3], TokenKind::StringLiteral("first\n  second".to_string()));
    }

    #[test]
    fn test_eol_flag_is_coalesced() {
        let tokens = tokenize("a\n\n\n  b c // x\n/* multi\nline */ d").unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.preceded_by_eol).collect();
        assert_eq!(flags, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_nested_block_comment() {
        assert_eq!(kinds("/* a /* b */ c */ x"), vec![TokenKind::Identifier("x".to_string()), TokenKind::Eof]);
        assert!(tokenize("/* /* */").is_err());
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut lexer = Lexer::new("x");
        assert!(lexer.next_token().unwrap().is(&TokenKind::Identifier(String::new())));
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_with_locations() {
        let tokens = tokenize("let x = 5\n  x").unwrap();
        assert_eq!(tokens[0].location, SourceLocation::new(1, 1));
        assert_eq!(tokens[1].location, SourceLocation::new(1, 5));
        assert_eq!(tokens[3].location, SourceLocation::new(1, 9));
        assert_eq!(tokens[4].location, SourceLocation::new(2, 3));
    }

    #[test]
    fn test_lone_question_mark_is_error() {
        let error = tokenize("x ? y").unwrap_err();
        assert_eq!(error.exit_code(), 1);
    }
}
