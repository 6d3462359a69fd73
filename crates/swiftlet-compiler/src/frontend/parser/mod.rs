//! # 構文解析器
//!
//! swiftlet言語の構文解析を担当するモジュールです。
//! LL(1)の再帰下降構文解析と意味解析・命令生成を1回の走査で行います。
//! 2トークン先を見る必要がある判断（代入か呼び出しか、引数ラベルの有無など）には
//! 1トークンの押し戻しバッファを使います。
//!
//! パーサーはコンパイル全体の状態（スコープ木、呼び出し記録、命令列、連番）を
//! 所有するコンテキストであり、グローバルな状態は持ちません。

use crate::backend::instruction::{InstrId, InstrKind, Instruction, InstructionStream};
use crate::frontend::error::{CompilerError, Result};
use crate::frontend::lexer::{Token, TokenKind, TokenSource};
use crate::frontend::semantic::scope::{ScopeId, ScopeTree};
use crate::frontend::semantic::types::Type;
use crate::frontend::semantic::validator;
use crate::frontend::semantic::CallRegistry;

pub mod declaration;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod statement;

pub use self::expression::{ExprValue, Origin};

/// 構文解析と検証を終えたプログラム
#[derive(Debug)]
pub struct Program {
    /// スコープ木
    pub scopes: ScopeTree,
    /// 命令列
    pub stream: InstructionStream,
    /// 呼び出し記録
    pub calls: CallRegistry,
}

/// パーサー
pub struct Parser<S: TokenSource> {
    /// トークン供給源
    source: S,
    /// 現在のトークン
    current: Token,
    /// 押し戻されたトークン（現在のトークンの次）
    pushback: Option<Token>,
    /// スコープ木
    pub(crate) scopes: ScopeTree,
    /// 呼び出し記録
    pub(crate) calls: CallRegistry,
    /// 命令列
    pub(crate) stream: InstructionStream,
    /// アンラップ・nil合体のラベル用連番
    label_counter: u32,
}

impl<S: TokenSource> Parser<S> {
    /// 新しいパーサーを作成
    ///
    /// 最初のトークンを読み込むため、字句解析エラーがここで返ることがあります。
    pub fn new(mut source: S) -> Result<Self> {
        let current = source.next_token()?;
        Ok(Self {
            source,
            current,
            pushback: None,
            scopes: ScopeTree::with_builtins()?,
            calls: CallRegistry::new(),
            stream: InstructionStream::new(),
            label_counter: 0,
        })
    }

    /// プログラム全体を解析し、事後検証まで行う
    ///
    /// `prog := stmt_seq EOF`
    pub fn parse_program(mut self) -> Result<Program> {
        self.parse_statement_list()?;

        if !self.check(&TokenKind::Eof) {
            return Err(error::unexpected_token_error(&self.current));
        }
        log::debug!(
            "構文解析完了: 命令{}個, スコープ{}個, 呼び出し{}件",
            self.stream.len(),
            self.scopes.len(),
            self.calls.len()
        );

        validator::validate_calls(&self.calls, &self.scopes, &mut self.stream)?;
        validator::validate_returns(&self.scopes)?;

        Ok(Program {
            scopes: self.scopes,
            stream: self.stream,
            calls: self.calls,
        })
    }

    // トークン操作

    /// 現在のトークン
    pub(crate) fn current(&self) -> &Token {
        &self.current
    }

    /// 次のトークンを先読み（押し戻しバッファに保持）
    pub(crate) fn peek(&mut self) -> Result<&Token> {
        if self.pushback.is_none() {
            self.pushback = Some(self.source.next_token()?);
        }
        self.pushback
            .as_ref()
            .ok_or_else(|| CompilerError::internal_error("先読みトークンがありません"))
    }

    /// 次のトークンへ進み、消費したトークンを返す
    pub(crate) fn advance(&mut self) -> Result<Token> {
        let next = match self.pushback.take() {
            Some(token) => token,
            None => self.source.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// 現在のトークンが指定した種類かどうか
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.current.is(kind)
    }

    /// 現在のトークンが指定した種類なら消費する
    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.check(kind) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// 指定した種類のトークンを消費する（なければ構文エラー）
    pub(crate) fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<Token> {
        if self.check(kind) {
            return self.advance();
        }
        Err(error::syntax_error(
            error::expected_token_message(expected, &self.current),
            &self.current,
        ))
    }

    /// 識別子を消費してその名前を返す
    pub(crate) fn consume_identifier(&mut self, what: &str) -> Result<(String, Token)> {
        match self.current.identifier() {
            Some(name) => {
                let name = name.to_string();
                let token = self.advance()?;
                Ok((name, token))
            }
            None => Err(error::syntax_error(
                format!("{}には{}", what, error::expected_token_message("識別子", &self.current)),
                &self.current,
            )),
        }
    }

    /// 型名を消費する
    ///
    /// `type := 'Int' | 'Double' | 'String' | 'Int?' | 'Double?' | 'String?'`
    pub(crate) fn consume_type(&mut self) -> Result<Type> {
        match self.current.kind {
            TokenKind::TypeName(ty) => {
                self.advance()?;
                Ok(ty)
            }
            _ => Err(error::syntax_error(
                error::expected_one_of_message(&["Int", "Double", "String", "Int?", "Double?", "String?"], &self.current),
                &self.current,
            )),
        }
    }

    // 命令生成

    /// 現在のスコープで命令を末尾に追加
    pub(crate) fn emit(&mut self, kind: InstrKind) -> InstrId {
        let instruction = self.instruction(kind, self.scopes.current());
        self.stream.append(instruction)
    }

    /// 指定したスコープに属する命令を作成
    pub(crate) fn instruction(&self, kind: InstrKind, scope: ScopeId) -> Instruction {
        Instruction::new(kind, scope, self.scopes.get(scope).frame)
    }

    /// ラベル用の連番を採番
    pub(crate) fn next_label(&mut self) -> u32 {
        self.label_counter += 1;
        self.label_counter
    }
}

/// 変数の格納先の名前（`名前$スコープID`）
pub fn target_name(name: &str, scope: ScopeId) -> String {
    format!("{}${}", name, scope)
}

/// ソースコードを構文解析する
pub fn parse<S: TokenSource>(source: S) -> Result<Program> {
    Parser::new(source)?.parse_program()
}
