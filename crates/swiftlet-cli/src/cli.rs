/*
 * swiftlet CLI - コマンドライン引数処理モジュール
 *
 * このモジュールでは、swiftletコンパイラのコマンドライン引数を処理し、
 * 適切なコンパイラAPIの呼び出しに変換します。
 */

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use swiftlet_compiler::{compile, CompilerConfig, VERSION};

/// swiftlet言語のコンパイラCLIツール
///
/// ソースコードを読み込み、IFJcode23 のプログラムを出力します。
#[derive(Parser, Debug)]
#[command(name = "swiftlet")]
#[command(author = "swiftlet開発チーム")]
#[command(version = VERSION)]
#[command(about = "swiftlet言語のコンパイラ（IFJcode23を生成）", long_about = None)]
pub struct Cli {
    /// 入力ファイル（省略時は標準入力）
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// 出力ファイル（省略時は標準出力）
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// コンパイル設定ファイル（TOML）へのパス
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 関数の先頭にコメント行を出力する
    #[arg(long, default_value = "false")]
    pub comments: bool,

    /// ログの詳細度（-v, -vv, -vvv）
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// 色付き出力を無効にする
    #[arg(long, default_value = "false")]
    pub no_color: bool,
}

impl Cli {

    /// 診断で表示するファイル名
    pub fn display_name(&self) -> Option<String> {
        self.input.as_ref().map(|path| path.display().to_string())
    }
}

/// 詳細レベルに対応するログのフィルタレベル
pub fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 設定ファイルを読み込み、コマンドライン引数で上書きする
///
/// ロガーはこの結果の `verbosity` で初期化されるため、ここではログを出しません。
pub fn load_config(cli: &Cli) -> Result<CompilerConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => CompilerConfig::default(),
    };

    if cli.comments {
        config.emit_comments = true;
    }
    config.verbosity = config.verbosity.max(cli.verbose);
    Ok(config)
}

fn read_config(path: &Path) -> Result<CompilerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("設定ファイル {} を読み込めませんでした", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("設定ファイル {} の形式が正しくありません", path.display()))?;
    Ok(config)
}

/// コンパイラを実行する
///
/// コンパイラのエラーは [`swiftlet_compiler::CompilerError`] のまま
/// `anyhow::Error` に包んで返します。
pub fn run_compiler(cli: &Cli, config: &CompilerConfig) -> Result<()> {
    let source = read_source(cli.input.as_deref())?;
    info!("swiftlet コンパイラ v{}: {}バイトを読み込みました", VERSION, source.len());

    let code = compile(&source, config)?;

    // 成功した場合にのみ書き込む
    match &cli.output {
        Some(path) => fs::write(path, code)
            .with_context(|| format!("出力ファイル {} に書き込めませんでした", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(code.as_bytes()).context("標準出力に書き込めませんでした")?;
            handle.flush().context("標準出力に書き込めませんでした")?;
        }
    }
    Ok(())
}

fn read_source(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("入力ファイル {} を読み込めませんでした", path.display())),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("標準入力を読み込めませんでした")?;
            Ok(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from(["swiftlet", "main.swift", "-o", "out.code", "-vv", "--no-color"]);
        assert_eq!(cli.input, Some(PathBuf::from("main.swift")));
        assert_eq!(cli.output, Some(PathBuf::from("out.code")));
        assert_eq!(log_level(cli.verbose), LevelFilter::Debug);
        assert!(cli.no_color);
    }

    #[test]
    fn test_defaults_to_stdin() {
        let cli = Cli::parse_from(["swiftlet"]);
        assert!(cli.input.is_none());
        let config = load_config(&cli).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(log_level(config.verbosity), LevelFilter::Warn);
    }

    #[test]
    fn test_comments_flag_overrides_config() {
        let cli = Cli::parse_from(["swiftlet", "--comments"]);
        assert!(load_config(&cli).unwrap().emit_comments);
    }

    #[test]
    fn test_config_verbosity_raises_log_level() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "verbosity = 2").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["swiftlet", "-c", path.as_str()]);
        let config = load_config(&cli).unwrap();
        assert_eq!(log_level(config.verbosity), LevelFilter::Debug);

        let cli = Cli::parse_from(["swiftlet", "-c", path.as_str(), "-vvv"]);
        assert_eq!(log_level(load_config(&cli).unwrap().verbosity), LevelFilter::Trace);
    }
}
