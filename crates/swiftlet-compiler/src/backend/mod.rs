//! # swiftlet コンパイラバックエンド
//!
//! 構文解析中に組み立てられる命令列と、それを IFJcode23 のテキストへ変換する
//! コード生成器、組み込み関数の本体を提供します。

pub mod builtins;
pub mod codegen;
pub mod instruction;

pub use self::codegen::{generate, CodeGenerator};
pub use self::instruction::{InstrId, InstrKind, Instruction, InstructionStream, Payload};
