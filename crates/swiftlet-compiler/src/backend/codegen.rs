//! # コード生成モジュール
//!
//! 検証済みの命令列を先頭から1回だけ走査し、IFJcode23 のテキストを出力します。
//! 命令の種類ごとに1つの処理があり、フレーム（`GF`/`LF`）、スコープ名、連番、
//! ペイロードから1行以上のターゲット命令を組み立てます。
//!
//! 式の値はすべてデータスタック上で計算されます。関数定義は周囲のコードから
//! 飛び越され、メインプログラムは `EXIT int@0` で終わります。その後ろに、
//! 呼び出された組み込み関数の本体が1回ずつ続きます。

use std::collections::HashSet;
use std::io::Write;

use crate::backend::builtins;
use crate::backend::instruction::{InstrKind, Instruction, Payload};
use crate::config::CompilerConfig;
use crate::frontend::error::{CompilerError, Result};
use crate::frontend::parser::Program;
use crate::frontend::semantic::builtins as signatures;

/// 出力の先頭行
pub const HEADER: &str = ".IFJcode23";

/// 式の評価に使うグローバルな一時変数
const TMP1: &str = "GF@$tmp1";
const TMP2: &str = "GF@$tmp2";

/// コード生成器
pub struct CodeGenerator<'a, W: Write> {
    /// 生成元のプログラム
    program: &'a Program,
    /// コンパイラ設定
    config: &'a CompilerConfig,
    /// 出力先
    out: W,
    /// 本体を出力する組み込み関数（初出順）
    used_builtins: Vec<&'static str>,
    /// 出力済みの組み込み関数
    seen_builtins: HashSet<&'static str>,
}

impl<'a, W: Write> CodeGenerator<'a, W> {
    /// 新しいコード生成器を作成
    pub fn new(program: &'a Program, config: &'a CompilerConfig, out: W) -> Self {
        Self {
            program,
            config,
            out,
            used_builtins: Vec::new(),
            seen_builtins: HashSet::new(),
        }
    }

    /// プログラム全体を出力
    pub fn generate(mut self) -> Result<W> {
        let program = self.program;
        for (_, instruction) in program.stream.iter() {
            self.emit_instruction(instruction)?;
        }
        writeln!(self.out, "EXIT int@0")?;

        for name in std::mem::take(&mut self.used_builtins) {
            let body = builtins::body(name)
                .ok_or_else(|| CompilerError::internal_error(format!("組み込み関数 '{}' の本体がありません", name)))?;
            write!(self.out, "{}", body)?;
        }

        self.out.flush()?;
        Ok(self.out)
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> Result<()> {
        let frame = instruction.frame;
        match instruction.kind {
            InstrKind::ProgramStart => {
                writeln!(self.out, "{}", HEADER)?;
                writeln!(self.out, "DEFVAR {}", TMP1)?;
                writeln!(self.out, "DEFVAR {}", TMP2)?;
            }
            InstrKind::DefineVariable => {
                writeln!(self.out, "DEFVAR {}@{}", frame, name_of(instruction)?)?;
            }
            InstrKind::PushLiteral => {
                writeln!(self.out, "PUSHS {}", literal_of(instruction)?)?;
            }
            InstrKind::PushVariable => {
                writeln!(self.out, "PUSHS {}@{}", frame, name_of(instruction)?)?;
            }
            InstrKind::PopVariable => {
                writeln!(self.out, "POPS {}@{}", frame, name_of(instruction)?)?;
            }
            InstrKind::Add => writeln!(self.out, "ADDS")?,
            InstrKind::Sub => writeln!(self.out, "SUBS")?,
            InstrKind::Mul => writeln!(self.out, "MULS")?,
            InstrKind::Div => writeln!(self.out, "DIVS")?,
            InstrKind::IDiv => writeln!(self.out, "IDIVS")?,
            InstrKind::Concat => {
                // 文字列の連結にはスタック版の命令がない
                writeln!(self.out, "POPS {}", TMP2)?;
                writeln!(self.out, "POPS {}", TMP1)?;
                writeln!(self.out, "CONCAT {} {} {}", TMP1, TMP1, TMP2)?;
                writeln!(self.out, "PUSHS {}", TMP1)?;
            }
            InstrKind::Lt => writeln!(self.out, "LTS")?,
            InstrKind::Gt => writeln!(self.out, "GTS")?,
            InstrKind::Le => {
                writeln!(self.out, "GTS")?;
                writeln!(self.out, "NOTS")?;
            }
            InstrKind::Ge => {
                writeln!(self.out, "LTS")?;
                writeln!(self.out, "NOTS")?;
            }
            InstrKind::Eq => writeln!(self.out, "EQS")?,
            InstrKind::Neq => {
                writeln!(self.out, "EQS")?;
                writeln!(self.out, "NOTS")?;
            }
            InstrKind::Int2Float => writeln!(self.out, "INT2FLOATS")?,
            InstrKind::Unwrap => self.emit_unwrap(instruction.counter)?,
            InstrKind::Coalesce => self.emit_coalesce(instruction.counter)?,
            InstrKind::IfCondition => {
                writeln!(self.out, "PUSHS bool@true")?;
                writeln!(self.out, "JUMPIFNEQS {}$else", self.scope_name(instruction))?;
            }
            InstrKind::IfLetCondition => {
                writeln!(self.out, "PUSHS {}@{}", frame, name_of(instruction)?)?;
                writeln!(self.out, "PUSHS nil@nil")?;
                writeln!(self.out, "JUMPIFEQS {}$else", self.scope_name(instruction))?;
            }
            InstrKind::Else => {
                let name = self.scope_name(instruction);
                writeln!(self.out, "JUMP {}$end", name)?;
                writeln!(self.out, "LABEL {}$else", name)?;
            }
            InstrKind::EndIf => {
                writeln!(self.out, "LABEL {}$end", self.scope_name(instruction))?;
            }
            InstrKind::WhileLabel => {
                writeln!(self.out, "LABEL {}$start", self.scope_name(instruction))?;
            }
            InstrKind::WhileCondition => {
                writeln!(self.out, "PUSHS bool@false")?;
                writeln!(self.out, "JUMPIFEQS {}$end", self.scope_name(instruction))?;
            }
            InstrKind::EndWhile => {
                let name = self.scope_name(instruction);
                writeln!(self.out, "JUMP {}$start", name)?;
                writeln!(self.out, "LABEL {}$end", name)?;
            }
            InstrKind::FunctionBegin => {
                let name = name_of(instruction)?;
                if self.config.emit_comments {
                    writeln!(self.out, "# func {}", name)?;
                }
                writeln!(self.out, "JUMP {}$skip", name)?;
                writeln!(self.out, "LABEL {}", name)?;
                writeln!(self.out, "CREATEFRAME")?;
                writeln!(self.out, "PUSHFRAME")?;
            }
            InstrKind::ParamPop => {
                let name = name_of(instruction)?;
                writeln!(self.out, "DEFVAR {}@{}", frame, name)?;
                writeln!(self.out, "POPS {}@{}", frame, name)?;
            }
            InstrKind::Return => {
                writeln!(self.out, "POPFRAME")?;
                writeln!(self.out, "RETURN")?;
            }
            InstrKind::FunctionEnd => {
                writeln!(self.out, "POPFRAME")?;
                writeln!(self.out, "RETURN")?;
                writeln!(self.out, "LABEL {}$skip", name_of(instruction)?)?;
            }
            InstrKind::Call => {
                let name = name_of(instruction)?;
                let label = self.call_label(name);
                writeln!(self.out, "CALL {}", label)?;
            }
            InstrKind::DiscardResult => writeln!(self.out, "POPS {}", TMP1)?,
            InstrKind::Write => {
                writeln!(self.out, "POPS {}", TMP1)?;
                writeln!(self.out, "WRITE {}", TMP1)?;
            }
        }
        Ok(())
    }

    /// 強制アンラップ（nil なら実行時に終了）
    fn emit_unwrap(&mut self, counter: u32) -> Result<()> {
        let label = format!("$unwrap${}", counter);
        writeln!(self.out, "POPS {}", TMP1)?;
        writeln!(self.out, "JUMPIFNEQ {} {} nil@nil", label, TMP1)?;
        writeln!(self.out, "EXIT int@{}", self.config.unwrap_exit_code)?;
        writeln!(self.out, "LABEL {}", label)?;
        writeln!(self.out, "PUSHS {}", TMP1)?;
        Ok(())
    }

    /// nil 合体演算子
    fn emit_coalesce(&mut self, counter: u32) -> Result<()> {
        let label = format!("$coalesce${}", counter);
        writeln!(self.out, "POPS {}", TMP2)?;
        writeln!(self.out, "POPS {}", TMP1)?;
        writeln!(self.out, "JUMPIFEQ {} {} nil@nil", label, TMP1)?;
        writeln!(self.out, "PUSHS {}", TMP1)?;
        writeln!(self.out, "JUMP {}$end", label)?;
        writeln!(self.out, "LABEL {}", label)?;
        writeln!(self.out, "PUSHS {}", TMP2)?;
        writeln!(self.out, "LABEL {}$end", label)?;
        Ok(())
    }

    /// 呼び出し先のラベル（組み込み関数なら本体の出力を予約する）
    fn call_label(&mut self, name: &str) -> String {
        match signatures::lookup(name) {
            Some(builtin) if !builtin.variadic => {
                if self.seen_builtins.insert(builtin.name) {
                    log::trace!("組み込み関数 {} の本体を出力します", builtin.name);
                    self.used_builtins.push(builtin.name);
                }
                builtins::label(name)
            }
            _ => name.to_string(),
        }
    }

    fn scope_name(&self, instruction: &Instruction) -> &'a str {
        let program: &'a Program = self.program;
        &program.scopes.get(instruction.scope).name
    }
}

/// プログラムを IFJcode23 として出力する
pub fn generate<W: Write>(program: &Program, config: &CompilerConfig, out: W) -> Result<W> {
    CodeGenerator::new(program, config, out).generate()
}

fn name_of(instruction: &Instruction) -> Result<&str> {
    instruction.name().ok_or_else(|| {
        CompilerError::internal_error(format!("{:?} 命令に名前がありません", instruction.kind))
    })
}

fn literal_of(instruction: &Instruction) -> Result<String> {
    match &instruction.payload {
        Some(Payload::Int(value)) => Ok(format!("int@{}", value)),
        Some(Payload::Double(value)) => Ok(format!("float@{}", hex_float(*value))),
        Some(Payload::Str(value)) => Ok(format!("string@{}", escape_string(value))),
        Some(Payload::Nil) => Ok("nil@nil".to_string()),
        _ => Err(CompilerError::internal_error("リテラル命令に値がありません")),
    }
}

/// 浮動小数点数を C99 の16進表記（`%a`）で表す
pub fn hex_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value.is_infinite() {
        return format!("{}inf", sign);
    }

    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;
    if exponent == 0 && mantissa == 0 {
        return format!("{}0x0p+0", sign);
    }

    // 非正規化数は先頭の桁が 0
    let (lead, exponent) = if exponent == 0 { (0, -1022) } else { (1, exponent - 1023) };
    let digits = format!("{:013x}", mantissa);
    let digits = digits.trim_end_matches('0');
    if digits.is_empty() {
        format!("{}0x{}p{:+}", sign, lead, exponent)
    } else {
        format!("{}0x{}.{}p{:+}", sign, lead, digits, exponent)
    }
}

/// 文字列リテラルをエスケープ（制御文字・空白・`#`・`\` は `\ddd`）
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        let code = c as u32;
        if code <= 32 || code == 35 || code == 92 {
            escaped.push_str(&format!("\\{:03}", code));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_float() {
        assert_eq!(hex_float(0.0), "0x0p+0");
        assert_eq!(hex_float(1.0), "0x1p+0");
        assert_eq!(hex_float(2.5), "0x1.4p+1");
        assert_eq!(hex_float(0.1), "0x1.999999999999ap-4");
        assert_eq!(hex_float(-3.0), "-0x1.8p+1");
        assert_eq!(hex_float(f64::MIN_POSITIVE / 2.0), "0x0.8p-1022");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a b"), "a\\032b");
        assert_eq!(escape_string("x\ny"), "x\\010y");
        assert_eq!(escape_string("#\\"), "\\035\\092");
        assert_eq!(escape_string("ahoj"), "ahoj");
        assert_eq!(escape_string("žluť"), "žluť");
    }
}
