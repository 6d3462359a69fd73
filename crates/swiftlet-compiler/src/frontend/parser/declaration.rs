//! # 宣言の構文解析
//!
//! 変数宣言（`let` / `var`）と関数定義（`func`）の構文解析を担当するモジュールです。
//! 宣言はシンボルテーブルへの登録と、変数領域の確保・関数の入口と出口の命令生成を伴います。

use super::error;
use super::{target_name, Parser};
use crate::backend::instruction::{InstrKind, Payload};
use crate::frontend::error::{CompilerError, Result};
use crate::frontend::lexer::{TokenKind, TokenSource};
use crate::frontend::semantic::scope::{ScopeId, ScopeKind};
use crate::frontend::semantic::symbol_table::Symbol;
use crate::frontend::semantic::types::Type;

impl<S: TokenSource> Parser<S> {
    /// 変数宣言を解析
    ///
    /// `var_decl := ('let' | 'var') ID [':' type] ['=' rhs]`
    pub(crate) fn parse_variable_declaration(&mut self) -> Result<()> {
        let keyword = self.advance()?;
        let mutable = keyword.kind == TokenKind::Var;
        let (name, token) = self.consume_identifier("変数名")?;
        let location = token.location;

        let current = self.scopes.current();
        if self.scopes.get(current).table.contains(&name) {
            return Err(CompilerError::undefined_function(
                format!("'{}' はこのスコープで既に定義されています", name),
                Some(location),
            ));
        }

        let annotation = if self.match_token(&TokenKind::Colon)? {
            Some(self.consume_type()?)
        } else {
            None
        };

        let target = target_name(&name, current);
        self.define_variable(&target)?;

        // 初期化式は新しいシンボルを登録する前に評価する
        let (ty, defined) = if self.match_token(&TokenKind::Equal)? {
            (self.parse_rhs(annotation, &name, location)?, true)
        } else {
            match annotation {
                Some(ty) if ty.is_optional() && mutable => {
                    // 初期値のないオプショナル型の var は暗黙に nil
                    let instruction = self.literal(Payload::Nil);
                    self.stream.append(instruction);
                    (ty, true)
                }
                Some(ty) => (ty, false),
                None => {
                    return Err(CompilerError::inference_error(
                        format!("変数 '{}' には型注釈か初期値が必要です", name),
                        Some(location),
                    ));
                }
            }
        };

        if defined {
            let instruction = self
                .instruction(InstrKind::PopVariable, current)
                .with_payload(Payload::Name(target));
            self.stream.append(instruction);
        }

        self.scopes
            .get_mut(current)
            .table
            .insert(Symbol::variable(name, mutable, ty, defined, Some(location)))
    }

    /// 変数領域を確保する命令を生成
    ///
    /// while ループの中では、最も外側のループのラベルの直前に巻き上げます。
    fn define_variable(&mut self, target: &str) -> Result<()> {
        let current = self.scopes.current();
        let instruction = self
            .instruction(InstrKind::DefineVariable, current)
            .with_payload(Payload::Name(target.to_string()));

        match self.scopes.outermost_while(current) {
            Some(loop_scope) => {
                let label = self
                    .stream
                    .find_backward(|_, instr| instr.kind == InstrKind::WhileLabel && instr.scope == loop_scope)
                    .ok_or_else(|| {
                        CompilerError::internal_error(format!("ループ {} のラベルが見つかりません", loop_scope))
                    })?;
                self.stream.set_cursor(label);
                self.stream.insert_before_cursor(instruction)?;
                log::debug!(
                    "変数 {} の宣言をループ {} の前に巻き上げました",
                    target,
                    self.scopes.get(loop_scope).name
                );
            }
            None => {
                self.stream.append(instruction);
            }
        }
        Ok(())
    }

    /// 関数定義を解析
    ///
    /// `func_def := 'func' ID '(' [param {',' param}] ')' ['->' type] block`
    pub(crate) fn parse_function_declaration(&mut self) -> Result<()> {
        let current = self.scopes.current();
        if !self.scopes.get(current).kind.allows_function_declarations() {
            return Err(error::syntax_error("関数はグローバルスコープでのみ定義できます", self.current()));
        }
        self.consume(&TokenKind::Func, "func")?;

        let (name, token) = self.consume_identifier("関数名")?;
        if self.scopes.get(ScopeId::ROOT).table.contains(&name) {
            return Err(CompilerError::undefined_function(
                format!("関数 '{}' は既に定義されています", name),
                Some(token.location),
            ));
        }
        self.consume(&TokenKind::LeftParen, "(")?;

        let header = self.scopes.enter(ScopeKind::FunctionHeader, name.clone());
        let mut count = 0;
        if !self.check(&TokenKind::RightParen) {
            loop {
                self.parse_parameter(header, count)?;
                count += 1;
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, ")")?;
        self.scopes.get_mut(header).parameter_count = count;

        let return_type = if self.match_token(&TokenKind::Arrow)? {
            self.consume_type()?
        } else {
            Type::Void
        };

        // 再帰呼び出しのため本体より先に登録する
        let mut symbol = Symbol::function(name.clone(), return_type, false);
        symbol.location = Some(token.location);
        self.scopes.get_mut(ScopeId::ROOT).table.insert(symbol)?;

        self.emit_function_entry(header, &name, count)?;

        self.scopes.enter(ScopeKind::FunctionBody, name.clone());
        self.parse_block()?;
        self.scopes.leave()?;
        self.scopes.leave()?;

        let instruction = self
            .instruction(InstrKind::FunctionEnd, header)
            .with_payload(Payload::Name(name));
        self.stream.append(instruction);
        Ok(())
    }

    /// パラメータを解析してヘッダスコープに登録
    ///
    /// `param := (ID | '_') (ID | '_') ':' type`
    fn parse_parameter(&mut self, header: ScopeId, index: usize) -> Result<()> {
        let location = self.current().location;
        let label = self.parameter_name("パラメータの外部名")?;
        let internal = self.parameter_name("パラメータの内部名")?;
        self.consume(&TokenKind::Colon, ":")?;
        let ty = self.consume_type()?;

        if label.is_some() && label == internal {
            return Err(CompilerError::semantic_error(
                format!(
                    "パラメータの外部名と内部名は異なる必要があります: '{}'",
                    label.unwrap_or_default()
                ),
                Some(location),
            ));
        }

        let key = internal.unwrap_or_else(|| format!("_${}", index));
        self.scopes
            .get_mut(header)
            .table
            .insert(Symbol::parameter(key, index, label, ty, Some(location)))
    }

    /// パラメータ名を1つ読む（`_` なら `None`）
    fn parameter_name(&mut self, what: &str) -> Result<Option<String>> {
        if self.match_token(&TokenKind::Underscore)? {
            return Ok(None);
        }
        let (name, _) = self.consume_identifier(what)?;
        Ok(Some(name))
    }

    /// 関数の入口の命令を生成（パラメータは宣言の逆順に受け取る）
    fn emit_function_entry(&mut self, header: ScopeId, name: &str, count: usize) -> Result<()> {
        let instruction = self
            .instruction(InstrKind::FunctionBegin, header)
            .with_payload(Payload::Name(name.to_string()));
        self.stream.append(instruction);

        for index in (0..count).rev() {
            let parameter = self
                .scopes
                .get(header)
                .table
                .parameter_at(index)
                .map(|symbol| symbol.name.clone())
                .ok_or_else(|| CompilerError::internal_error(format!("{}番目のパラメータがありません", index)))?;
            let instruction = self
                .instruction(InstrKind::ParamPop, header)
                .with_payload(Payload::Name(target_name(&parameter, header)));
            self.stream.append(instruction);
        }

        log::debug!("関数 {} を定義（パラメータ{}個）", name, count);
        Ok(())
    }
}
