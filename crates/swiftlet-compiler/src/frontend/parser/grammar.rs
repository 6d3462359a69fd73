//! # 演算子優先順位表
//!
//! 式の評価器が使う16×16の優先関係表を定義します。
//! 行はスタック上の最上位の終端記号、列は先読み記号です。
//!
//! 優先順位（高い順）: 後置 `!`、`* /`、`+ -`、`== != < > <= >=`（左結合）、
//! `??`（右結合、最低）。

use crate::frontend::lexer::TokenKind;

/// 式の終端記号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Mul,
    /// /
    Div,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Le,
    /// >=
    Ge,
    /// !=
    Neq,
    /// ==
    Eq,
    /// 後置 !
    Bang,
    /// ??
    Coalesce,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// 識別子またはリテラル
    Operand,
    /// 式の終端
    End,
}

impl Terminal {
    /// 表のインデックス
    pub fn index(self) -> usize {
        self as usize
    }

    /// トークンを終端記号に変換（式に含まれないトークンは `End`）
    pub fn from_token(kind: &TokenKind) -> Terminal {
        match kind {
            TokenKind::Plus => Terminal::Plus,
            TokenKind::Minus => Terminal::Minus,
            TokenKind::Star => Terminal::Mul,
            TokenKind::Slash => Terminal::Div,
            TokenKind::Less => Terminal::Lt,
            TokenKind::Greater => Terminal::Gt,
            TokenKind::LessEqual => Terminal::Le,
            TokenKind::GreaterEqual => Terminal::Ge,
            TokenKind::BangEqual => Terminal::Neq,
            TokenKind::EqualEqual => Terminal::Eq,
            TokenKind::Bang => Terminal::Bang,
            TokenKind::QuestionQuestion => Terminal::Coalesce,
            TokenKind::LeftParen => Terminal::LeftParen,
            TokenKind::RightParen => Terminal::RightParen,
            TokenKind::Identifier(_)
            | TokenKind::IntLiteral(_)
            | TokenKind::DoubleLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::Nil => Terminal::Operand,
            _ => Terminal::End,
        }
    }

    /// 二項演算子かどうか
    pub fn is_binary_operator(self) -> bool {
        self.index() < Terminal::Bang.index() || self == Terminal::Coalesce
    }

    /// この記号の後で被演算子が完結しているかどうか
    pub fn ends_operand(self) -> bool {
        matches!(self, Terminal::Operand | Terminal::RightParen | Terminal::Bang)
    }
}

/// 優先関係
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// シフト（`<`）
    Shift,
    /// 還元（`>`）
    Reduce,
    /// 括弧の対応（`=`）
    Equal,
    /// 構文エラー
    Error,
}

use self::Relation::{Equal as E, Error as X, Reduce as R, Shift as S};

/// 優先関係表
///
/// 列の順序: `+ - * / < > <= >= != == ! ?? ( ) i $`
#[rustfmt::skip]
const TABLE: [[Relation; 16]; 16] = [
    //  +  -  *  /  <  >  <= >= != == !  ?? (  )  i  $
    [R, R, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // +
    [R, R, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // -
    [R, R, R, R, R, R, R, R, R, R, S, R, S, R, S, R], // *
    [R, R, R, R, R, R, R, R, R, R, S, R, S, R, S, R], // /
    [S, S, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // <
    [S, S, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // >
    [S, S, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // <=
    [S, S, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // >=
    [S, S, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // !=
    [S, S, S, S, R, R, R, R, R, R, S, R, S, R, S, R], // ==
    [R, R, R, R, R, R, R, R, R, R, R, R, X, R, X, R], // !
    [S, S, S, S, S, S, S, S, S, S, S, S, S, R, S, R], // ??
    [S, S, S, S, S, S, S, S, S, S, S, S, S, E, S, X], // (
    [R, R, R, R, R, R, R, R, R, R, R, R, X, R, X, R], // )
    [R, R, R, R, R, R, R, R, R, R, R, R, X, R, X, R], // i
    [S, S, S, S, S, S, S, S, S, S, S, S, S, X, S, X], // $
];

/// スタック最上位の終端記号と先読み記号の優先関係を取得
pub fn relation(top: Terminal, input: Terminal) -> Relation {
    TABLE[top.index()][input.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(relation(Terminal::Plus, Terminal::Mul), Relation::Shift);
        assert_eq!(relation(Terminal::Mul, Terminal::Plus), Relation::Reduce);
    }

    #[test]
    fn test_associativity() {
        // 左結合
        assert_eq!(relation(Terminal::Minus, Terminal::Minus), Relation::Reduce);
        assert_eq!(relation(Terminal::Eq, Terminal::Lt), Relation::Reduce);
        // 右結合
        assert_eq!(relation(Terminal::Coalesce, Terminal::Coalesce), Relation::Shift);
    }

    #[test]
    fn test_coalesce_is_lowest() {
        for op in [Terminal::Plus, Terminal::Mul, Terminal::Eq, Terminal::Bang] {
            assert_eq!(relation(Terminal::Coalesce, op), Relation::Shift);
            assert_eq!(relation(op, Terminal::Coalesce), Relation::Reduce);
        }
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(relation(Terminal::LeftParen, Terminal::RightParen), Relation::Equal);
        assert_eq!(relation(Terminal::End, Terminal::RightParen), Relation::Error);
        assert_eq!(relation(Terminal::LeftParen, Terminal::End), Relation::Error);
        assert_eq!(relation(Terminal::Operand, Terminal::LeftParen), Relation::Error);
    }

    #[test]
    fn test_from_token() {
        assert_eq!(Terminal::from_token(&TokenKind::Nil), Terminal::Operand);
        assert_eq!(Terminal::from_token(&TokenKind::LeftBrace), Terminal::End);
        assert_eq!(Terminal::from_token(&TokenKind::QuestionQuestion), Terminal::Coalesce);
        assert!(Terminal::Coalesce.is_binary_operator());
        assert!(!Terminal::Bang.is_binary_operator());
    }
}
