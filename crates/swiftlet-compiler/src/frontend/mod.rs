//! # swiftlet コンパイラフロントエンド
//!
//! ソースコードの字句解析から、構文解析・意味解析・命令生成までを担当します。
//! 構文解析器は1回の走査で命令列を組み立て、最後に呼び出しと return 文を検証します。
//!
//! ## コンパイルフェーズ
//! 1. 字句解析（[`lexer`]）
//! 2. 構文解析と命令生成（[`parser`]）
//! 3. 呼び出し・return 文の事後検証（[`semantic::validator`]）

pub mod error;
pub mod lexer;
pub mod parser;
pub mod semantic;
