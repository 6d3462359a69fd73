//! # 構文解析エラー処理
//!
//! 構文解析時に発生するエラーを生成するためのユーティリティを提供します。

use crate::frontend::error::CompilerError;
use crate::frontend::lexer::{Token, TokenKind};

/// 期待されるトークンの説明を生成
///
/// # 引数
/// * `expected` - 期待されるトークンの説明
/// * `found` - 実際に見つかったトークン
///
/// # 戻り値
/// フォーマットされたエラーメッセージ
pub fn expected_token_message(expected: &str, found: &Token) -> String {
    format!("'{}'が期待されましたが、{}が見つかりました", expected, token_to_string(found))
}

/// 期待される複数のトークンのいずれかの説明を生成
pub fn expected_one_of_message(expected: &[&str], found: &Token) -> String {
    let expected_str = expected.join("', '");
    format!("'{}'のいずれかが期待されましたが、{}が見つかりました", expected_str, token_to_string(found))
}

/// 構文エラーを作成
///
/// # 引数
/// * `message` - エラーメッセージ
/// * `token` - エラーが発生したトークン
pub fn syntax_error(message: impl Into<String>, token: &Token) -> CompilerError {
    CompilerError::syntax_error(message, Some(token.location))
}

/// 予期しないトークンのエラーを作成
pub fn unexpected_token_error(token: &Token) -> CompilerError {
    syntax_error(format!("予期しない{}です", token_to_string(token)), token)
}

/// 不正な式エラーを作成
pub fn invalid_expression_error(token: &Token) -> CompilerError {
    syntax_error(format!("不正な式です: {}", token_to_string(token)), token)
}

/// 文の間に改行がないエラーを作成
pub fn missing_line_break_error(token: &Token) -> CompilerError {
    syntax_error(
        format!("文の間には改行が必要です（{}の前）", token_to_string(token)),
        token,
    )
}

/// トークンを表示用の文字列に変換
pub fn token_to_string(token: &Token) -> String {
    match &token.kind {
        TokenKind::Eof => "ファイルの終端".to_string(),
        TokenKind::Identifier(_)
        | TokenKind::IntLiteral(_)
        | TokenKind::DoubleLiteral(_)
        | TokenKind::StringLiteral(_)
        | TokenKind::TypeName(_) => token.kind.to_string(),
        other => format!("'{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::error::SourceLocation;

    #[test]
    fn test_expected_token_message() {
        let token = Token::new(TokenKind::RightParen, SourceLocation::new(1, 4), false);
        assert_eq!(expected_token_message("{", &token), "'{'が期待されましたが、')'が見つかりました");
    }

    #[test]
    fn test_syntax_error_carries_location() {
        let token = Token::new(TokenKind::Eof, SourceLocation::new(7, 1), true);
        let error = unexpected_token_error(&token);
        assert_eq!(error.exit_code(), 2);
        assert_eq!(error.location, Some(SourceLocation::new(7, 1)));
        assert!(error.message.contains("ファイルの終端"));
    }
}
