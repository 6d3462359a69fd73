//! コンパイラ設定モジュール
//!
//! コンパイラの動作を設定するためのオプションを提供します。
//! CLIはTOMLファイルからこの構造体を読み込みます。省略された項目は既定値になります。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frontend::error::{CompilerError, Result};

/// 実行時の強制アンラップ失敗で使う終了コードの既定値
pub const DEFAULT_UNWRAP_EXIT_CODE: u8 = 7;

/// 仮想マシンが受け付ける `EXIT` の終了コードの上限
pub const MAX_EXIT_CODE: u8 = 49;

/// コンパイラの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// `!` が nil に適用されたときの実行時終了コード（0〜49）
    pub unwrap_exit_code: u8,

    /// 関数の先頭に `# func 名前` のコメント行を出力するか
    pub emit_comments: bool,

    /// 診断情報の詳細レベル（0-3）
    pub verbosity: u8,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            unwrap_exit_code: DEFAULT_UNWRAP_EXIT_CODE,
            emit_comments: false,
            verbosity: 0,
        }
    }
}

impl CompilerConfig {
    /// 新しい設定を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// アンラップ失敗時の終了コードを設定
    pub fn with_unwrap_exit_code(mut self, code: u8) -> Self {
        self.unwrap_exit_code = code;
        self
    }

    /// コメント出力を設定
    pub fn with_comments(mut self, emit: bool) -> Self {
        self.emit_comments = emit;
        self
    }

    /// 詳細レベルを設定
    pub fn with_verbosity(mut self, level: u8) -> Self {
        self.verbosity = level;
        self
    }

    /// 設定値を検証
    pub fn validate(&self) -> Result<()> {
        if self.unwrap_exit_code > MAX_EXIT_CODE {
            return Err(CompilerError::semantic_error(
                format!(
                    "unwrap_exit_code は 0〜{} の範囲で指定してください（{}）",
                    MAX_EXIT_CODE, self.unwrap_exit_code
                ),
                None,
            ));
        }
        Ok(())
    }
}

impl fmt::Display for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "コンパイラ設定:")?;
        writeln!(f, "  アンラップ失敗時の終了コード: {}", self.unwrap_exit_code)?;
        writeln!(f, "  コメント出力: {}", self.emit_comments)?;
        write!(f, "  詳細レベル: {}", self.verbosity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.unwrap_exit_code, 7);
        assert!(!config.emit_comments);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CompilerConfig = toml::from_str("emit_comments = true").unwrap();
        assert!(config.emit_comments);
        assert_eq!(config.unwrap_exit_code, DEFAULT_UNWRAP_EXIT_CODE);
    }

    #[test]
    fn test_invalid_exit_code() {
        let config = CompilerConfig::new().with_unwrap_exit_code(50);
        assert_eq!(config.validate().unwrap_err().exit_code(), 9);
        assert!(CompilerConfig::new().with_unwrap_exit_code(49).validate().is_ok());
    }
}
