// swiftlet Compiler Library
// Swift風言語から IFJcode23 を生成するコンパイラのライブラリ

//! # swiftlet Compiler
//!
//! Swift風の小さな言語のソースコードを1回の走査で解析し、
//! スタックマシン向けの中間言語 IFJcode23 を生成するコンパイラライブラリです。
//!
//! コンパイルは最初のエラーで中断され、その種類に応じた終了コードを持つ
//! [`CompilerError`] が返されます。成功した場合にのみ完全なプログラムが得られます。
//!
//! ```
//! use swiftlet_compiler::{compile, CompilerConfig};
//!
//! let code = compile("let x = 1 + 2\nwrite(x)", &CompilerConfig::default()).unwrap();
//! assert!(code.starts_with(".IFJcode23"));
//! ```

use std::io::Write;

use log::{debug, info};

pub mod backend;
pub mod config;
pub mod frontend;

pub use self::config::CompilerConfig;
pub use self::frontend::error::{CompilerError, ErrorKind, Result, SourceLocation};
pub use self::frontend::lexer::{Lexer, Token, TokenKind, TokenSource};
pub use self::frontend::parser::{parse, Program};
pub use self::frontend::semantic::Type;

/// コンパイラのバージョン
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// トークン供給源からプログラムを解析・検証する
pub fn compile_program<S: TokenSource>(source: S, config: &CompilerConfig) -> Result<Program> {
    config.validate()?;
    parse(source)
}

/// ソースコードをコンパイルし、IFJcode23 のテキストを返す
pub fn compile(source: &str, config: &CompilerConfig) -> Result<String> {
    let bytes = compile_to_bytes(Lexer::new(source), config)?;
    String::from_utf8(bytes).map_err(|error| CompilerError::internal_error(format!("出力がUTF-8ではありません: {}", error)))
}

/// トークン供給源からコンパイルし、結果を書き込み先へ出力する
///
/// 出力はコンパイルが成功した後にまとめて書き込まれるため、
/// エラー時に書き込み先へ部分的な出力が残ることはありません。
pub fn compile_to_writer<S: TokenSource, W: Write>(source: S, config: &CompilerConfig, mut out: W) -> Result<()> {
    let bytes = compile_to_bytes(source, config)?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}

fn compile_to_bytes<S: TokenSource>(source: S, config: &CompilerConfig) -> Result<Vec<u8>> {
    let program = compile_program(source, config)?;
    debug!("コード生成開始: 命令{}個", program.stream.len());

    let bytes = backend::generate(&program, config, Vec::new())?;
    info!(
        "コンパイル完了: スコープ{}個, 呼び出し{}件, 出力{}バイト",
        program.scopes.len(),
        program.calls.len(),
        bytes.len()
    );
    Ok(bytes)
}
