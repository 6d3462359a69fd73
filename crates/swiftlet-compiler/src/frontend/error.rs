//! # エラー処理モジュール
//!
//! swiftletコンパイラのエラー処理を担当するモジュールです。
//! コンパイルは最初のエラーで即座に中断されるため、エラーは常に1つだけ
//! 報告されます。各エラーの種類はプロセスの終了コードに対応します。

use std::fmt;
use std::io;

use colored::*;
use thiserror::Error;

/// エラーの種類
///
/// 各バリアントは固有の終了コードを持ちます（[`ErrorKind::exit_code`]）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 字句解析エラー
    Lexical,
    /// 構文解析エラー
    Syntax,
    /// 未定義関数・再定義エラー
    UndefinedFunction,
    /// 関数呼び出しの引数・戻り値の型エラー
    CallSignature,
    /// 未定義・未初期化変数の使用
    UndefinedVariable,
    /// return文の欠落・過剰
    ReturnStatement,
    /// 式の型互換性エラー
    ExpressionType,
    /// 型推論エラー
    TypeInference,
    /// その他の意味解析エラー
    Semantic,
    /// 内部エラー
    Internal,
}

impl ErrorKind {
    /// プロセスの終了コードを取得
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Lexical => 1,
            ErrorKind::Syntax => 2,
            ErrorKind::UndefinedFunction => 3,
            ErrorKind::CallSignature => 4,
            ErrorKind::UndefinedVariable => 5,
            ErrorKind::ReturnStatement => 6,
            ErrorKind::ExpressionType => 7,
            ErrorKind::TypeInference => 8,
            ErrorKind::Semantic => 9,
            ErrorKind::Internal => 99,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorKind::Lexical => "字句解析エラー",
            ErrorKind::Syntax => "構文解析エラー",
            ErrorKind::UndefinedFunction => "未定義関数エラー",
            ErrorKind::CallSignature => "関数呼び出しの型エラー",
            ErrorKind::UndefinedVariable => "未定義変数エラー",
            ErrorKind::ReturnStatement => "return文エラー",
            ErrorKind::ExpressionType => "型互換性エラー",
            ErrorKind::TypeInference => "型推論エラー",
            ErrorKind::Semantic => "意味解析エラー",
            ErrorKind::Internal => "内部エラー",
        };
        write!(f, "{}", message)
    }
}

/// ソースコード内の位置情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    /// 行番号（1から始まる）
    pub line: usize,
    /// 列番号（1から始まる）
    pub column: usize,
}

impl SourceLocation {
    /// 新しい位置情報を作成
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// コンパイラエラー
#[derive(Debug, Clone, Error)]
#[error("{}{kind}: {message}", location_prefix(.location))]
pub struct CompilerError {
    /// エラーの種類
    pub kind: ErrorKind,
    /// エラーメッセージ
    pub message: String,
    /// エラーの位置
    pub location: Option<SourceLocation>,
}

/// Result型のエイリアス
pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    /// 新しいエラーを作成
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }

    /// 字句解析エラーを作成
    pub fn lexical_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::Lexical, message, Some(location))
    }

    /// 構文解析エラーを作成
    pub fn syntax_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::Syntax, message, location)
    }

    /// 未定義関数・再定義エラーを作成
    pub fn undefined_function(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::UndefinedFunction, message, location)
    }

    /// 関数呼び出しの型エラーを作成
    pub fn call_signature(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::CallSignature, message, location)
    }

    /// 未定義変数エラーを作成
    pub fn undefined_variable(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::UndefinedVariable, message, location)
    }

    /// return文エラーを作成
    pub fn return_statement(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::ReturnStatement, message, location)
    }

    /// 式の型エラーを作成
    pub fn type_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::ExpressionType, message, location)
    }

    /// 型推論エラーを作成
    pub fn inference_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::TypeInference, message, location)
    }

    /// その他の意味解析エラーを作成
    pub fn semantic_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::new(ErrorKind::Semantic, message, location)
    }

    /// 内部エラーを作成
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message, None)
    }

    /// 位置情報が未設定なら設定する
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location.get_or_insert(location);
        self
    }

    /// 終了コードを取得
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// エラーメッセージを色付きで整形
    pub fn format_colored(&self, file_name: Option<&str>) -> String {
        let mut result = format!(
            "{}: [{}] {}\n",
            "エラー".red().bold(),
            self.kind.to_string().yellow(),
            self.message.white().bold()
        );

        let location_str = match (file_name, &self.location) {
            (Some(name), Some(loc)) => format!("{}:{}", name.cyan(), loc.to_string().cyan().bold()),
            (Some(name), None) => name.cyan().to_string(),
            (None, Some(loc)) => loc.to_string().cyan().bold().to_string(),
            (None, None) => String::new(),
        };
        if !location_str.is_empty() {
            result.push_str(&format!("  --> {}\n", location_str));
        }

        result
    }
}

fn location_prefix(location: &Option<SourceLocation>) -> String {
    location.map(|loc| format!("{}: ", loc)).unwrap_or_default()
}

/// 出力先のI/Oエラーは内部エラーとして扱う
impl From<io::Error> for CompilerError {
    fn from(error: io::Error) -> Self {
        Self::internal_error(format!("I/Oエラー: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorKind::Lexical.exit_code(), 1);
        assert_eq!(ErrorKind::Syntax.exit_code(), 2);
        assert_eq!(ErrorKind::UndefinedFunction.exit_code(), 3);
        assert_eq!(ErrorKind::CallSignature.exit_code(), 4);
        assert_eq!(ErrorKind::UndefinedVariable.exit_code(), 5);
        assert_eq!(ErrorKind::ReturnStatement.exit_code(), 6);
        assert_eq!(ErrorKind::ExpressionType.exit_code(), 7);
        assert_eq!(ErrorKind::TypeInference.exit_code(), 8);
        assert_eq!(ErrorKind::Semantic.exit_code(), 9);
        assert_eq!(ErrorKind::Internal.exit_code(), 99);
    }

    #[test]
    fn test_display_with_location() {
        let error = CompilerError::syntax_error("'{'が必要です", Some(SourceLocation::new(3, 7)));
        assert_eq!(error.to_string(), "3:7: 構文解析エラー: '{'が必要です");
    }

    #[test]
    fn test_io_error_is_internal() {
        let error: CompilerError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert_eq!(error.kind, ErrorKind::Internal);
        assert_eq!(error.exit_code(), 99);
    }
}
