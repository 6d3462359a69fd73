//! # トークン定義
//!
//! swiftlet言語のレキサーが生成するトークンの定義を提供します。
//! トークンの種類、位置情報、リテラル値、直前の改行の有無が含まれています。

use std::fmt;

use crate::frontend::error::SourceLocation;
use crate::frontend::semantic::types::Type;

/// トークンの種類
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // 識別子とリテラル
    /// 識別子
    Identifier(String),
    /// 整数リテラル
    IntLiteral(i64),
    /// 浮動小数点リテラル
    DoubleLiteral(f64),
    /// 文字列リテラル（エスケープ解決済み）
    StringLiteral(String),
    /// 型名（`Int`、`Double?` など）
    TypeName(Type),

    // キーワード
    /// else キーワード
    Else,
    /// func キーワード
    Func,
    /// if キーワード
    If,
    /// let キーワード
    Let,
    /// nil キーワード
    Nil,
    /// return キーワード
    Return,
    /// var キーワード
    Var,
    /// while キーワード
    While,
    /// アンダースコア _
    Underscore,

    // 演算子
    /// プラス +
    Plus,
    /// マイナス -
    Minus,
    /// アスタリスク *
    Star,
    /// スラッシュ /
    Slash,
    /// 等号 =
    Equal,
    /// イコールイコール ==
    EqualEqual,
    /// バングイコール !=
    BangEqual,
    /// 小なり <
    Less,
    /// 大なり >
    Greater,
    /// 小なりイコール <=
    LessEqual,
    /// 大なりイコール >=
    GreaterEqual,
    /// 感嘆符 !（後置の強制アンラップ）
    Bang,
    /// 疑問符疑問符 ??
    QuestionQuestion,

    // 区切り記号
    /// 左括弧 (
    LeftParen,
    /// 右括弧 )
    RightParen,
    /// 左波括弧 {
    LeftBrace,
    /// 右波括弧 }
    RightBrace,
    /// コロン :
    Colon,
    /// コンマ ,
    Comma,
    /// アロー ->
    Arrow,

    /// ファイルの終端
    Eof,
}

impl TokenKind {
    /// 関数呼び出しの引数として使える項かどうか
    pub fn is_term(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::IntLiteral(_)
                | TokenKind::DoubleLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::Nil
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        match self {
            Identifier(name) => write!(f, "識別子 '{}'", name),
            IntLiteral(value) => write!(f, "整数リテラル {}", value),
            DoubleLiteral(value) => write!(f, "浮動小数点リテラル {}", value),
            StringLiteral(value) => write!(f, "文字列リテラル \"{}\"", value.escape_debug()),
            TypeName(ty) => write!(f, "型 {}", ty),

            Else => write!(f, "else"),
            Func => write!(f, "func"),
            If => write!(f, "if"),
            Let => write!(f, "let"),
            Nil => write!(f, "nil"),
            Return => write!(f, "return"),
            Var => write!(f, "var"),
            While => write!(f, "while"),
            Underscore => write!(f, "_"),

            Plus => write!(f, "+"),
            Minus => write!(f, "-"),
            Star => write!(f, "*"),
            Slash => write!(f, "/"),
            Equal => write!(f, "="),
            EqualEqual => write!(f, "=="),
            BangEqual => write!(f, "!="),
            Less => write!(f, "<"),
            Greater => write!(f, ">"),
            LessEqual => write!(f, "<="),
            GreaterEqual => write!(f, ">="),
            Bang => write!(f, "!"),
            QuestionQuestion => write!(f, "??"),

            LeftParen => write!(f, "("),
            RightParen => write!(f, ")"),
            LeftBrace => write!(f, "{{"),
            RightBrace => write!(f, "}}"),
            Colon => write!(f, ":"),
            Comma => write!(f, ","),
            Arrow => write!(f, "->"),

            Eof => write!(f, "EOF"),
        }
    }
}

/// トークン
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// トークンの種類
    pub kind: TokenKind,
    /// トークンの位置情報
    pub location: SourceLocation,
    /// 直前に改行があったかどうか（連続する改行は1つにまとめられる）
    pub preceded_by_eol: bool,
}

impl Token {
    /// 新しいトークンを作成
    pub fn new(kind: TokenKind, location: SourceLocation, preceded_by_eol: bool) -> Self {
        Self {
            kind,
            location,
            preceded_by_eol,
        }
    }

    /// トークンが指定した種類かどうかを判定
    ///
    /// 識別子とリテラルは内容を無視して種類のみ比較します。
    pub fn is(&self, kind: &TokenKind) -> bool {
        use TokenKind::*;
        match (&self.kind, kind) {
            (Identifier(_), Identifier(_)) => true,
            (IntLiteral(_), IntLiteral(_)) => true,
            (DoubleLiteral(_), DoubleLiteral(_)) => true,
            (StringLiteral(_), StringLiteral(_)) => true,
            (TypeName(_), TypeName(_)) => true,
            (a, b) => a == b,
        }
    }

    /// 識別子名を取得
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}

/// キーワードの文字列からTokenKindへの変換
pub fn lookup_keyword(identifier: &str) -> TokenKind {
    match identifier {
        "Double" => TokenKind::TypeName(Type::Double),
        "Int" => TokenKind::TypeName(Type::Int),
        "String" => TokenKind::TypeName(Type::String),
        "else" => TokenKind::Else,
        "func" => TokenKind::Func,
        "if" => TokenKind::If,
        "let" => TokenKind::Let,
        "nil" => TokenKind::Nil,
        "return" => TokenKind::Return,
        "var" => TokenKind::Var,
        "while" => TokenKind::While,
        "_" => TokenKind::Underscore,
        _ => TokenKind::Identifier(identifier.to_string()),
    }
}
