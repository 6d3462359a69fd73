//! # 式の評価器
//!
//! 演算子優先順位法で式を解析し、型付きの命令を生成します。
//! 終端記号・非終端記号・ハンドルの区切りを積む明示的なスタックを使い、
//! `grammar` の優先関係表に従ってシフトと還元を繰り返します。
//!
//! 還元規則は `i`、`E op E`、`E !`、`( E )` の4つだけです。
//! 数値の暗黙変換は次の方針に従います。
//!
//! - 同じ型どうしは変換しない
//! - リテラルだけで構成された `Int` の部分式は、相手が `Double` ならコンパイル時に
//!   `Double` に書き換える（実行時の変換命令は生成しない）
//! - リテラルでない `Int` の被演算子には実行時の変換命令を挿入する

use super::error;
use super::grammar::{relation, Relation, Terminal};
use super::{target_name, Parser};
use crate::backend::instruction::{InstrId, InstrKind, Instruction, Payload};
use crate::frontend::error::{CompilerError, Result, SourceLocation};
use crate::frontend::lexer::{Token, TokenKind, TokenSource};
use crate::frontend::semantic::types::Type;

/// 式の値の由来
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// リテラルのみで構成される
    Literal,
    /// 単独の変数
    Identifier,
    /// それ以外の複合式
    Compound,
}

impl Origin {
    fn combine(self, other: Origin) -> Origin {
        if self == Origin::Literal && other == Origin::Literal {
            Origin::Literal
        } else {
            Origin::Compound
        }
    }
}

/// 評価済みの式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprValue {
    /// 静的な型
    pub ty: Type,
    /// 値の由来
    pub origin: Origin,
    /// 式の最初の命令
    pub first: InstrId,
    /// 式の最後の命令
    pub last: InstrId,
}

/// 評価スタックの要素
#[derive(Debug, Clone)]
enum StackItem {
    /// 終端記号
    Symbol(Terminal, Token),
    /// ハンドルの開始位置
    Marker,
    /// 還元済みの式
    Expr(ExprValue),
}

impl<S: TokenSource> Parser<S> {
    /// 式を解析する
    ///
    /// `context` には値を受け取る側の型（宣言された変数の型、関数の戻り値の型）を
    /// 渡します。リテラルのみの `Int` の式は、文脈が `Double` なら昇格されます。
    pub(crate) fn parse_expression(&mut self, context: Option<Type>) -> Result<ExprValue> {
        let mut stack = vec![StackItem::Symbol(Terminal::End, self.current().clone())];
        let mut previous: Option<Terminal> = None;
        let mut reductions = 0usize;

        loop {
            let input = self.lookahead_terminal(previous);
            let (top_index, top) = top_terminal(&stack)
                .ok_or_else(|| CompilerError::internal_error("式スタックに終端記号がありません"))?;

            if top == Terminal::End && input == Terminal::End {
                break;
            }

            match relation(top, input) {
                Relation::Shift => {
                    stack.insert(top_index + 1, StackItem::Marker);
                    let token = self.advance()?;
                    stack.push(StackItem::Symbol(input, token));
                    previous = Some(input);
                }
                Relation::Equal => {
                    let token = self.advance()?;
                    stack.push(StackItem::Symbol(input, token));
                    previous = Some(input);
                }
                Relation::Reduce => {
                    self.reduce(&mut stack)?;
                    reductions += 1;
                }
                Relation::Error => return Err(error::invalid_expression_error(self.current())),
            }
        }

        if reductions == 0 {
            return Err(error::syntax_error(
                error::expected_token_message("式", self.current()),
                self.current(),
            ));
        }

        let mut value = match (stack.pop(), stack.len()) {
            (Some(StackItem::Expr(value)), 1) => value,
            _ => return Err(error::invalid_expression_error(self.current())),
        };

        if let Some(context) = context {
            if context.base() == Type::Double && value.ty == Type::Int && value.origin == Origin::Literal {
                self.promote_literal(&mut value);
            }
        }

        log::trace!("式を評価: {} ({:?})", value.ty, value.origin);
        Ok(value)
    }

    /// 現在のトークンを先読み記号に変換する
    ///
    /// 被演算子が完結した後、改行を挟んで被演算子か '(' が来た場合は文の境界とみなします。
    fn lookahead_terminal(&self, previous: Option<Terminal>) -> Terminal {
        let token = self.current();
        let terminal = Terminal::from_token(&token.kind);
        let starts_operand = matches!(terminal, Terminal::Operand | Terminal::LeftParen);
        if token.preceded_by_eol && starts_operand && previous.map_or(false, Terminal::ends_operand) {
            return Terminal::End;
        }
        terminal
    }

    /// 最も近いハンドルまでを取り出し、規則に従って還元する
    fn reduce(&mut self, stack: &mut Vec<StackItem>) -> Result<()> {
        let marker = stack
            .iter()
            .rposition(|item| matches!(item, StackItem::Marker))
            .ok_or_else(|| error::invalid_expression_error(self.current()))?;
        let handle: Vec<StackItem> = stack.drain(marker + 1..).collect();
        stack.pop();

        let value = match handle.as_slice() {
            [StackItem::Symbol(Terminal::Operand, token)] => self.reduce_operand(token)?,
            [StackItem::Expr(lhs), StackItem::Symbol(op, token), StackItem::Expr(rhs)] if op.is_binary_operator() => {
                self.reduce_binary(*lhs, *op, *rhs, token.location)?
            }
            [StackItem::Expr(value), StackItem::Symbol(Terminal::Bang, token)] => {
                self.reduce_unwrap(*value, token.location)?
            }
            [StackItem::Symbol(Terminal::LeftParen, _), StackItem::Expr(value), StackItem::Symbol(Terminal::RightParen, _)] => {
                *value
            }
            _ => return Err(error::invalid_expression_error(self.current())),
        };

        stack.push(StackItem::Expr(value));
        Ok(())
    }

    /// `E -> i`
    fn reduce_operand(&mut self, token: &Token) -> Result<ExprValue> {
        let (ty, origin, instruction) = match &token.kind {
            TokenKind::Identifier(name) => {
                let (ty, instruction) = self.load_variable(name, token.location)?;
                (ty, Origin::Identifier, instruction)
            }
            TokenKind::IntLiteral(value) => (Type::Int, Origin::Literal, self.literal(Payload::Int(*value))),
            TokenKind::DoubleLiteral(value) => (Type::Double, Origin::Literal, self.literal(Payload::Double(*value))),
            TokenKind::StringLiteral(value) => (Type::String, Origin::Literal, self.literal(Payload::Str(value.clone()))),
            TokenKind::Nil => (Type::Nil, Origin::Literal, self.literal(Payload::Nil)),
            _ => return Err(error::invalid_expression_error(token)),
        };

        let id = self.stream.append(instruction);
        Ok(ExprValue {
            ty,
            origin,
            first: id,
            last: id,
        })
    }

    /// リテラルをプッシュする命令を作成
    pub(crate) fn literal(&self, payload: Payload) -> Instruction {
        self.instruction(InstrKind::PushLiteral, self.scopes.current()).with_payload(payload)
    }

    /// 変数をプッシュする命令を作成（宣言済みかつ代入済みでなければエラー）
    pub(crate) fn load_variable(&self, name: &str, location: SourceLocation) -> Result<(Type, Instruction)> {
        let (ty, instruction, defined) = self.variable_reference(name, location, InstrKind::PushVariable)?;
        if !defined {
            return Err(CompilerError::undefined_variable(
                format!("変数 '{}' は初期化されていません", name),
                Some(location),
            ));
        }
        Ok((ty, instruction))
    }

    /// 変数を参照する命令を作成し、型と代入済みかどうかを返す
    pub(crate) fn variable_reference(
        &self,
        name: &str,
        location: SourceLocation,
        kind: InstrKind,
    ) -> Result<(Type, Instruction, bool)> {
        let current = self.scopes.current();
        let undefined = || CompilerError::undefined_variable(format!("変数 '{}' は定義されていません", name), Some(location));

        let owner = self.scopes.owning_scope(current, name).ok_or_else(undefined)?;
        let symbol = self.scopes.get(owner).table.get(name).ok_or_else(undefined)?;
        if symbol.is_function() {
            return Err(undefined());
        }

        let instruction = Instruction::new(kind, current, self.scopes.get(owner).frame)
            .with_payload(Payload::Name(target_name(name, owner)));
        Ok((symbol.ty(), instruction, symbol.is_defined()))
    }

    /// `E -> E op E`
    fn reduce_binary(&mut self, lhs: ExprValue, op: Terminal, rhs: ExprValue, location: SourceLocation) -> Result<ExprValue> {
        match op {
            Terminal::Plus | Terminal::Minus | Terminal::Mul | Terminal::Div => self.arithmetic(lhs, op, rhs, location),
            Terminal::Lt | Terminal::Gt | Terminal::Le | Terminal::Ge => self.relational(lhs, op, rhs, location),
            Terminal::Eq | Terminal::Neq => self.equality(lhs, op, rhs, location),
            Terminal::Coalesce => self.coalesce(lhs, rhs, location),
            _ => Err(CompilerError::internal_error(format!("二項演算子ではありません: {:?}", op))),
        }
    }

    fn arithmetic(&mut self, lhs: ExprValue, op: Terminal, rhs: ExprValue, location: SourceLocation) -> Result<ExprValue> {
        if lhs.ty == Type::String && rhs.ty == Type::String {
            if op != Terminal::Plus {
                return Err(CompilerError::type_error(
                    "文字列には '+' 以外の算術演算子を使用できません",
                    Some(location),
                ));
            }
            let id = self.emit(InstrKind::Concat);
            return Ok(ExprValue {
                ty: Type::String,
                origin: lhs.origin.combine(rhs.origin),
                first: lhs.first,
                last: id,
            });
        }

        if !lhs.ty.is_numeric() || !rhs.ty.is_numeric() {
            return Err(operand_type_error(op, lhs.ty, rhs.ty, location));
        }

        let (lhs, rhs) = self.unify_numeric(lhs, rhs)?;
        let kind = match op {
            Terminal::Plus => InstrKind::Add,
            Terminal::Minus => InstrKind::Sub,
            Terminal::Mul => InstrKind::Mul,
            _ if lhs.ty == Type::Int => InstrKind::IDiv,
            _ => InstrKind::Div,
        };
        let id = self.emit(kind);

        Ok(ExprValue {
            ty: lhs.ty,
            origin: lhs.origin.combine(rhs.origin),
            first: lhs.first,
            last: id,
        })
    }

    fn relational(&mut self, lhs: ExprValue, op: Terminal, rhs: ExprValue, location: SourceLocation) -> Result<ExprValue> {
        let (lhs, _) = if lhs.ty == Type::String && rhs.ty == Type::String {
            (lhs, rhs)
        } else if lhs.ty.is_numeric() && rhs.ty.is_numeric() {
            self.unify_numeric(lhs, rhs)?
        } else {
            return Err(operand_type_error(op, lhs.ty, rhs.ty, location));
        };

        let kind = match op {
            Terminal::Lt => InstrKind::Lt,
            Terminal::Gt => InstrKind::Gt,
            Terminal::Le => InstrKind::Le,
            _ => InstrKind::Ge,
        };
        Ok(self.boolean(kind, lhs.first))
    }

    fn equality(&mut self, lhs: ExprValue, op: Terminal, rhs: ExprValue, location: SourceLocation) -> Result<ExprValue> {
        let (mut lhs, mut rhs) = (lhs, rhs);

        if lhs.ty.is_numeric() && rhs.ty.is_numeric() {
            let unified = self.unify_numeric(lhs, rhs)?;
            lhs = unified.0;
        } else if lhs.ty == Type::OptionalDouble && is_int_literal(&rhs) {
            self.promote_literal(&mut rhs);
        } else if rhs.ty == Type::OptionalDouble && is_int_literal(&lhs) {
            self.promote_literal(&mut lhs);
        } else if !equality_compatible(lhs.ty, rhs.ty) {
            return Err(operand_type_error(op, lhs.ty, rhs.ty, location));
        }

        let kind = if op == Terminal::Eq { InstrKind::Eq } else { InstrKind::Neq };
        Ok(self.boolean(kind, lhs.first))
    }

    fn boolean(&mut self, kind: InstrKind, first: InstrId) -> ExprValue {
        let id = self.emit(kind);
        ExprValue {
            ty: Type::Bool,
            origin: Origin::Compound,
            first,
            last: id,
        }
    }

    /// `E -> E ?? E`
    fn coalesce(&mut self, lhs: ExprValue, rhs: ExprValue, location: SourceLocation) -> Result<ExprValue> {
        if !lhs.ty.is_optional() && lhs.ty != Type::Nil {
            return Err(CompilerError::type_error(
                format!("'??' の左辺はオプショナル型でなければなりません（{} 型）", lhs.ty),
                Some(location),
            ));
        }

        let mut rhs = rhs;
        let base = if lhs.ty == Type::Nil { rhs.ty.base() } else { lhs.ty.base() };
        if base == Type::Double && is_int_literal(&rhs) {
            self.promote_literal(&mut rhs);
        }
        if rhs.ty != Type::Nil && (rhs.ty.base() != base || !rhs.ty.is_storable()) {
            return Err(operand_type_error(Terminal::Coalesce, lhs.ty, rhs.ty, location));
        }

        let ty = if rhs.ty.is_optional() || rhs.ty == Type::Nil {
            base.optional()
        } else {
            base
        };
        let counter = self.next_label();
        let instruction = self
            .instruction(InstrKind::Coalesce, self.scopes.current())
            .with_counter(counter);
        let id = self.stream.append(instruction);

        Ok(ExprValue {
            ty,
            origin: Origin::Compound,
            first: lhs.first,
            last: id,
        })
    }

    /// `E -> E !`
    fn reduce_unwrap(&mut self, value: ExprValue, location: SourceLocation) -> Result<ExprValue> {
        if !value.ty.is_optional() {
            return Err(CompilerError::type_error(
                format!("'!' はオプショナル型にのみ使用できます（{} 型）", value.ty),
                Some(location),
            ));
        }

        let counter = self.next_label();
        let instruction = self
            .instruction(InstrKind::Unwrap, self.scopes.current())
            .with_counter(counter);
        let id = self.stream.append(instruction);

        Ok(ExprValue {
            ty: value.ty.base(),
            origin: Origin::Compound,
            first: value.first,
            last: id,
        })
    }

    /// 数値型の被演算子の型を揃える
    fn unify_numeric(&mut self, lhs: ExprValue, rhs: ExprValue) -> Result<(ExprValue, ExprValue)> {
        let (mut lhs, mut rhs) = (lhs, rhs);

        match (lhs.ty, rhs.ty) {
            (Type::Int, Type::Double) if lhs.origin == Origin::Literal => self.promote_literal(&mut lhs),
            (Type::Double, Type::Int) if rhs.origin == Origin::Literal => self.promote_literal(&mut rhs),
            (Type::Int, Type::Double) => {
                // 左辺の命令列の直後（右辺の先頭の直前）に変換を挿入
                self.stream.set_cursor(rhs.first);
                let instruction = self.instruction(InstrKind::Int2Float, self.scopes.current());
                lhs.last = self.stream.insert_before_cursor(instruction)?;
                lhs.ty = Type::Double;
                log::trace!("左辺に実行時の Int→Double 変換を挿入");
            }
            (Type::Double, Type::Int) => {
                rhs.last = self.emit(InstrKind::Int2Float);
                rhs.ty = Type::Double;
                log::trace!("右辺に実行時の Int→Double 変換を追加");
            }
            _ => {}
        }

        Ok((lhs, rhs))
    }

    /// リテラルのみの `Int` の式をコンパイル時に `Double` へ書き換える
    pub(crate) fn promote_literal(&mut self, value: &mut ExprValue) {
        for id in self.stream.range(value.first, value.last) {
            let instruction = self.stream.get_mut(id);
            match (instruction.kind, &instruction.payload) {
                (InstrKind::PushLiteral, Some(Payload::Int(v))) => {
                    instruction.payload = Some(Payload::Double(*v as f64));
                }
                (InstrKind::IDiv, _) => instruction.kind = InstrKind::Div,
                _ => {}
            }
        }
        value.ty = Type::Double;
    }
}

/// スタック最上位の終端記号とその位置
fn top_terminal(stack: &[StackItem]) -> Option<(usize, Terminal)> {
    stack.iter().enumerate().rev().find_map(|(index, item)| match item {
        StackItem::Symbol(terminal, _) => Some((index, *terminal)),
        _ => None,
    })
}

fn is_int_literal(value: &ExprValue) -> bool {
    value.ty == Type::Int && value.origin == Origin::Literal
}

/// `==` / `!=` で比較できる型の組み合わせかどうか（数値どうしを除く）
fn equality_compatible(lhs: Type, rhs: Type) -> bool {
    if lhs == rhs {
        return lhs.is_storable() || lhs == Type::Nil;
    }
    if lhs.is_optional() && (rhs == lhs.base() || rhs == Type::Nil) {
        return true;
    }
    rhs.is_optional() && (lhs == rhs.base() || lhs == Type::Nil)
}

fn operand_type_error(op: Terminal, lhs: Type, rhs: Type, location: SourceLocation) -> CompilerError {
    let symbol = match op {
        Terminal::Plus => "+",
        Terminal::Minus => "-",
        Terminal::Mul => "*",
        Terminal::Div => "/",
        Terminal::Lt => "<",
        Terminal::Gt => ">",
        Terminal::Le => "<=",
        Terminal::Ge => ">=",
        Terminal::Neq => "!=",
        Terminal::Eq => "==",
        _ => "??",
    };
    CompilerError::type_error(
        format!("演算子 '{}' は {} 型と {} 型には適用できません", symbol, lhs, rhs),
        Some(location),
    )
}
