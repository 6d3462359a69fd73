//! # 文の構文解析
//!
//! swiftlet言語の文（代入、呼び出し、if、while、return、ブロック）の
//! 構文解析と、それに伴う意味検査・命令生成を担当するモジュールです。

use super::error;
use super::{ExprValue, Parser};
use crate::backend::instruction::{InstrKind, Payload};
use crate::frontend::error::{CompilerError, Result, SourceLocation};
use crate::frontend::lexer::{TokenKind, TokenSource};
use crate::frontend::semantic::builtins;
use crate::frontend::semantic::scope::{ScopeId, ScopeKind};
use crate::frontend::semantic::symbol_table::SymbolKind;
use crate::frontend::semantic::types::Type;
use crate::frontend::semantic::{CallArgument, CallSite};

impl<S: TokenSource> Parser<S> {
    /// 文のリストを解析
    ///
    /// 2つ目以降の文の前には改行が必要です。
    pub(crate) fn parse_statement_list(&mut self) -> Result<()> {
        let mut first = true;

        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            if !first && !self.current().preceded_by_eol {
                return Err(error::missing_line_break_error(self.current()));
            }
            self.parse_statement()?;
            first = false;
        }

        Ok(())
    }

    /// 文を解析
    pub(crate) fn parse_statement(&mut self) -> Result<()> {
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::Let | TokenKind::Var => self.parse_variable_declaration(),
            TokenKind::Func => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Identifier(_) => {
                let next = self.peek()?.kind.clone();
                match next {
                    TokenKind::Equal => self.parse_assignment(),
                    TokenKind::LeftParen => self.parse_call_statement(),
                    _ => {
                        let peeked = self.peek()?.clone();
                        Err(error::syntax_error(
                            error::expected_one_of_message(&["=", "("], &peeked),
                            &peeked,
                        ))
                    }
                }
            }
            _ => Err(error::unexpected_token_error(self.current())),
        }
    }

    /// ブロックを解析 (`{ stmt_seq }`)
    pub(crate) fn parse_block(&mut self) -> Result<()> {
        self.consume(&TokenKind::LeftBrace, "{")?;
        self.parse_statement_list()?;
        self.consume(&TokenKind::RightBrace, "}")?;
        Ok(())
    }

    /// 代入文を解析 (`ID = rhs`)
    fn parse_assignment(&mut self) -> Result<()> {
        let (name, token) = self.consume_identifier("代入先")?;
        self.consume(&TokenKind::Equal, "=")?;

        let current = self.scopes.current();
        let symbol = self.scopes.lookup(current, &name).ok_or_else(|| {
            CompilerError::undefined_variable(format!("変数 '{}' は定義されていません", name), Some(token.location))
        })?;

        let ty = match &symbol.kind {
            SymbolKind::Variable { mutable: false, defined: true, .. } => {
                return Err(CompilerError::semantic_error(
                    format!("定数 '{}' には再代入できません", name),
                    Some(token.location),
                ));
            }
            SymbolKind::Variable { ty, .. } => *ty,
            SymbolKind::Parameter { .. } => {
                return Err(CompilerError::semantic_error(
                    format!("パラメータ '{}' には代入できません", name),
                    Some(token.location),
                ));
            }
            SymbolKind::Function { .. } => {
                return Err(CompilerError::undefined_variable(
                    format!("'{}' は変数ではありません", name),
                    Some(token.location),
                ));
            }
        };

        self.parse_rhs(Some(ty), &name, token.location)?;

        let (_, instruction, _) = self.variable_reference(&name, token.location, InstrKind::PopVariable)?;
        self.stream.append(instruction);
        self.mark_defined(&name);
        Ok(())
    }

    /// 右辺（呼び出しまたは式）を解析し、受け取る側の型を返す
    ///
    /// `declared` が `None` の場合は右辺から型を推論します。
    pub(crate) fn parse_rhs(&mut self, declared: Option<Type>, name: &str, location: SourceLocation) -> Result<Type> {
        if self.is_call_ahead()? {
            let callee = self.current().identifier().unwrap_or_default().to_string();
            let ty = match declared {
                Some(ty) => ty,
                None => match self.function_return_type(&callee) {
                    None => {
                        return Err(CompilerError::inference_error(
                            format!("宣言前の関数 '{}' の戻り値から '{}' の型を推論できません", callee, name),
                            Some(location),
                        ));
                    }
                    Some(Type::Void) => {
                        return Err(CompilerError::inference_error(
                            format!("関数 '{}' は値を返さないため '{}' の型を推論できません", callee, name),
                            Some(location),
                        ));
                    }
                    Some(ty) => ty,
                },
            };
            self.parse_call(Some(ty), false)?;
            return Ok(ty);
        }

        let value = self.parse_expression(declared)?;
        match declared {
            Some(ty) if ty.accepts(value.ty) => Ok(ty),
            Some(ty) => Err(CompilerError::type_error(
                format!("{} 型の '{}' に {} 型の値は代入できません", ty, name, value.ty),
                Some(location),
            )),
            None => infer_type(&value, name, location),
        }
    }

    /// 現在のトークンから関数呼び出しが始まるかどうか (`ID (`)
    fn is_call_ahead(&mut self) -> Result<bool> {
        if self.current().identifier().is_none() {
            return Ok(false);
        }
        Ok(self.peek()?.kind == TokenKind::LeftParen)
    }

    /// 関数呼び出し文を解析
    fn parse_call_statement(&mut self) -> Result<()> {
        let name = self.current().identifier().unwrap_or_default().to_string();
        let scaffold = !builtins::is_variadic(&name) && self.function_return_type(&name) != Some(Type::Void);
        self.parse_call(None, scaffold)
    }

    /// 関数呼び出しを解析して記録する
    ///
    /// `call := ID '(' [arg {',' arg}] ')'`
    ///
    /// `scaffold` が真なら、呼び出しの直後に戻り値を捨てる命令を置きます。
    pub(crate) fn parse_call(&mut self, target: Option<Type>, scaffold: bool) -> Result<()> {
        let (name, token) = self.consume_identifier("関数名")?;
        self.consume(&TokenKind::LeftParen, "(")?;

        let variadic = builtins::is_variadic(&name);
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let arg = self.parse_argument()?;
                if variadic {
                    self.emit(InstrKind::Write);
                }
                args.push(arg);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, ")")?;

        let current = self.scopes.current();
        let call_id = self.calls.next_id();
        let scaffolded = scaffold && !variadic;
        if !variadic {
            let instruction = self
                .instruction(InstrKind::Call, current)
                .with_counter(call_id)
                .with_payload(Payload::Name(name.clone()));
            self.stream.append(instruction);
            if scaffolded {
                self.emit(InstrKind::DiscardResult);
            }
        }

        self.calls.record(CallSite {
            name,
            target,
            args,
            call_id,
            scaffolded,
            scope: current,
            location: Some(token.location),
        });
        Ok(())
    }

    /// 実引数を解析 (`[ID ':'] term`)
    fn parse_argument(&mut self) -> Result<CallArgument> {
        let location = self.current().location;

        let label = if self.current().identifier().is_some() && self.peek()?.kind == TokenKind::Colon {
            let (label, _) = self.consume_identifier("引数ラベル")?;
            self.advance()?;
            Some(label)
        } else {
            None
        };

        if !self.current().kind.is_term() {
            return Err(error::syntax_error(
                error::expected_token_message("引数", self.current()),
                self.current(),
            ));
        }

        let token = self.advance()?;
        let (ty, literal, initialized, instruction) = match &token.kind {
            TokenKind::Identifier(name) => {
                let (ty, instruction, defined) =
                    self.variable_reference(name, token.location, InstrKind::PushVariable)?;
                (ty, false, defined, instruction)
            }
            TokenKind::IntLiteral(value) => (Type::Int, true, true, self.literal(Payload::Int(*value))),
            TokenKind::DoubleLiteral(value) => (Type::Double, true, true, self.literal(Payload::Double(*value))),
            TokenKind::StringLiteral(value) => (Type::String, true, true, self.literal(Payload::Str(value.clone()))),
            _ => (Type::Nil, true, true, self.literal(Payload::Nil)),
        };
        let push = self.stream.append(instruction);

        Ok(CallArgument {
            label,
            ty,
            initialized,
            literal,
            push,
            location: Some(location),
        })
    }

    /// if 文を解析
    ///
    /// `if_stmt := 'if' (expr | 'let' ID) block ['else' block]`
    fn parse_if_statement(&mut self) -> Result<()> {
        self.consume(&TokenKind::If, "if")?;

        let parent = self.scopes.current();
        let name = self.scopes.next_conditional_name(ScopeKind::If);
        let if_scope = self.scopes.create_child(parent, ScopeKind::If, name.clone());

        let narrowed = if self.match_token(&TokenKind::Let)? {
            Some(self.parse_if_let_condition(if_scope)?)
        } else {
            let location = self.current().location;
            let condition = self.parse_expression(None)?;
            expect_condition(&condition, "if", location)?;
            let instruction = self.instruction(InstrKind::IfCondition, if_scope);
            self.stream.append(instruction);
            None
        };

        self.scopes.enter_existing(if_scope);
        self.parse_block()?;
        self.scopes.leave()?;

        // if let で絞り込んだ型を元に戻す
        if let Some((variable, ty)) = narrowed {
            self.set_symbol_type(&variable, ty);
        }

        let instruction = self.instruction(InstrKind::Else, if_scope);
        self.stream.append(instruction);

        if self.match_token(&TokenKind::Else)? {
            let else_scope = self.scopes.create_child(parent, ScopeKind::Else, format!("{}$else", name));
            self.scopes.get_mut(if_scope).else_branch = Some(else_scope);
            self.scopes.enter_existing(else_scope);
            self.parse_block()?;
            self.scopes.leave()?;
        }

        let instruction = self.instruction(InstrKind::EndIf, if_scope);
        self.stream.append(instruction);
        Ok(())
    }

    /// `if let ID` の条件を解析し、絞り込んだ変数名と元の型を返す
    fn parse_if_let_condition(&mut self, if_scope: ScopeId) -> Result<(String, Type)> {
        let (variable, token) = self.consume_identifier("if let の変数")?;
        let (ty, mut instruction, defined) =
            self.variable_reference(&variable, token.location, InstrKind::IfLetCondition)?;

        if !defined {
            return Err(CompilerError::undefined_variable(
                format!("変数 '{}' は初期化されていません", variable),
                Some(token.location),
            ));
        }
        if !ty.is_optional() {
            return Err(CompilerError::type_error(
                format!("if let の変数 '{}' はオプショナル型でなければなりません（{} 型）", variable, ty),
                Some(token.location),
            ));
        }

        instruction.scope = if_scope;
        self.stream.append(instruction);
        self.set_symbol_type(&variable, ty.base());
        Ok((variable, ty))
    }

    /// while 文を解析 (`'while' expr block`)
    fn parse_while_statement(&mut self) -> Result<()> {
        self.consume(&TokenKind::While, "while")?;

        let parent = self.scopes.current();
        let name = self.scopes.next_conditional_name(ScopeKind::While);
        let while_scope = self.scopes.create_child(parent, ScopeKind::While, name);

        let instruction = self.instruction(InstrKind::WhileLabel, while_scope);
        self.stream.append(instruction);

        let location = self.current().location;
        let condition = self.parse_expression(None)?;
        expect_condition(&condition, "while", location)?;
        let instruction = self.instruction(InstrKind::WhileCondition, while_scope);
        self.stream.append(instruction);

        self.scopes.enter_existing(while_scope);
        self.parse_block()?;
        self.scopes.leave()?;

        let instruction = self.instruction(InstrKind::EndWhile, while_scope);
        self.stream.append(instruction);
        Ok(())
    }

    /// return 文を解析 (`'return' [expr]`)
    fn parse_return_statement(&mut self) -> Result<()> {
        let token = self.consume(&TokenKind::Return, "return")?;
        let current = self.scopes.current();
        let header = self
            .scopes
            .enclosing_function(current)
            .map_err(|error| error.with_location(token.location))?;

        if self.scopes.get(current).has_return {
            return Err(CompilerError::return_statement(
                "同じブロックに複数の return 文があります",
                Some(token.location),
            ));
        }

        let function = self.scopes.get(header).name.clone();
        let return_type = self
            .function_return_type(&function)
            .ok_or_else(|| CompilerError::internal_error(format!("関数 '{}' のシンボルがありません", function)))?;
        let has_value = !(self.check(&TokenKind::RightBrace)
            || self.check(&TokenKind::Eof)
            || self.current().preceded_by_eol);

        match (return_type, has_value) {
            (Type::Void, true) => {
                return Err(CompilerError::return_statement(
                    format!("値を返さない関数 '{}' の return に式があります", function),
                    Some(token.location),
                ));
            }
            (Type::Void, false) => {}
            (_, false) => {
                return Err(CompilerError::return_statement(
                    format!("関数 '{}' は {} 型の値を返す必要があります", function, return_type),
                    Some(token.location),
                ));
            }
            (_, true) => {
                let value = self.parse_expression(Some(return_type))?;
                if !return_type.accepts(value.ty) {
                    return Err(CompilerError::call_signature(
                        format!("関数 '{}' の戻り値は {} 型ですが、{} 型の値が返されました", function, return_type, value.ty),
                        Some(token.location),
                    ));
                }
            }
        }

        self.emit(InstrKind::Return);
        self.scopes.get_mut(current).has_return = true;
        Ok(())
    }

    /// 宣言済みの関数の戻り値の型
    pub(crate) fn function_return_type(&self, name: &str) -> Option<Type> {
        self.scopes
            .get(ScopeId::ROOT)
            .table
            .get(name)
            .filter(|symbol| symbol.is_function())
            .map(|symbol| symbol.ty())
    }

    /// 変数を代入済みにする
    pub(crate) fn mark_defined(&mut self, name: &str) {
        let current = self.scopes.current();
        if let Some(symbol) = self.scopes.lookup_mut(current, name) {
            if let SymbolKind::Variable { defined, .. } = &mut symbol.kind {
                *defined = true;
            }
        }
    }

    /// 変数・パラメータの型をその場で書き換える（if let の絞り込み）
    fn set_symbol_type(&mut self, name: &str, new_type: Type) {
        let current = self.scopes.current();
        if let Some(symbol) = self.scopes.lookup_mut(current, name) {
            match &mut symbol.kind {
                SymbolKind::Variable { ty, .. } | SymbolKind::Parameter { ty, .. } => *ty = new_type,
                SymbolKind::Function { .. } => {}
            }
        }
    }
}

/// 条件式が比較式かどうかを検査
fn expect_condition(condition: &ExprValue, statement: &str, location: SourceLocation) -> Result<()> {
    if condition.ty != Type::Bool {
        return Err(CompilerError::type_error(
            format!("{} の条件は比較式でなければなりません（{} 型）", statement, condition.ty),
            Some(location),
        ));
    }
    Ok(())
}

/// 初期化式から変数の型を推論
fn infer_type(value: &ExprValue, name: &str, location: SourceLocation) -> Result<Type> {
    match value.ty {
        Type::Nil => Err(CompilerError::inference_error(
            format!("nil から変数 '{}' の型を推論できません", name),
            Some(location),
        )),
        Type::Bool => Err(CompilerError::type_error(
            format!("比較式の結果は変数 '{}' に格納できません", name),
            Some(location),
        )),
        Type::Void => Err(CompilerError::inference_error(
            format!("変数 '{}' の型を推論できません", name),
            Some(location),
        )),
        ty => Ok(ty),
    }
}
