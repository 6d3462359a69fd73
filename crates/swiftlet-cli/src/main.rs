/*
 * swiftlet CLI - メインエントリーポイント
 *
 * swiftlet言語のコンパイラCLIツールのエントリーポイントです。
 * コマンドライン引数の解析と処理ロジックを呼び出します。
 *
 * コンパイルエラーはエラーの種類に対応する終了コードでプロセスを終了します。
 */

use std::process;

use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use log::{debug, error};
use swiftlet_compiler::{CompilerError, ErrorKind};

mod cli;

fn main() {
    // コマンドライン引数の解析
    let cli = cli::Cli::parse();

    // ロガーは設定ファイルを反映した詳細レベルで初期化する
    let config = cli::load_config(&cli);
    let verbosity = config.as_ref().map_or(cli.verbose, |config| config.verbosity);

    // ロギングの初期化
    let mut builder = Builder::new();
    builder.filter_level(cli::log_level(verbosity));
    builder.init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = config.and_then(|config| {
        debug!("{}", config);
        cli::run_compiler(&cli, &config)
    });

    if let Err(e) = result {
        match e.downcast_ref::<CompilerError>() {
            Some(compiler_error) => {
                eprint!("{}", compiler_error.format_colored(cli.display_name().as_deref()));
                process::exit(compiler_error.exit_code());
            }
            None => {
                error!("{:#}", e);
                eprintln!("{}: {:#}", "エラー".red().bold(), e);
                process::exit(ErrorKind::Internal.exit_code());
            }
        }
    }
}
