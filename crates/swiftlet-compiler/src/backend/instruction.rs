//! # 命令列
//!
//! スタックマシン向けの抽象命令を、前後のインデックスで連結したアリーナに保持します。
//! 先頭には常に番兵の `ProgramStart` があり、列が空になることはありません。
//! 末尾への追加のほか、カーソル位置の直前への挿入と直後の削除ができるため、
//! 変数宣言の巻き上げや不要になった命令の除去を生成後に行えます。

use std::fmt;

use crate::frontend::error::{CompilerError, Result};
use crate::frontend::semantic::scope::{Frame, ScopeId};

/// 命令の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(pub usize);

impl InstrId {
    /// 番兵命令
    pub const START: InstrId = InstrId(0);
}

/// 命令の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrKind {
    /// プログラム開始（番兵、ヘッダと一時変数を出力）
    ProgramStart,
    /// 変数の宣言
    DefineVariable,
    /// リテラルのプッシュ
    PushLiteral,
    /// 変数のプッシュ
    PushVariable,
    /// 変数へのポップ
    PopVariable,
    /// 加算
    Add,
    /// 減算
    Sub,
    /// 乗算
    Mul,
    /// 浮動小数点除算
    Div,
    /// 整数除算
    IDiv,
    /// 文字列連結
    Concat,
    /// 小なり
    Lt,
    /// 大なり
    Gt,
    /// 小なりイコール
    Le,
    /// 大なりイコール
    Ge,
    /// 等価
    Eq,
    /// 非等価
    Neq,
    /// 整数から浮動小数点への変換
    Int2Float,
    /// 強制アンラップ（nil なら実行時に終了）
    Unwrap,
    /// nil 合体
    Coalesce,
    /// if 条件の判定
    IfCondition,
    /// if let の判定
    IfLetCondition,
    /// else 節の開始
    Else,
    /// if 文の終了
    EndIf,
    /// while ループ先頭のラベル
    WhileLabel,
    /// while 条件の判定
    WhileCondition,
    /// while ループの終了
    EndWhile,
    /// 関数定義の開始
    FunctionBegin,
    /// パラメータの受け取り
    ParamPop,
    /// return 文
    Return,
    /// 関数定義の終了
    FunctionEnd,
    /// 関数呼び出し
    Call,
    /// 戻り値の破棄
    DiscardResult,
    /// write による出力（引数1つ分）
    Write,
}

/// 命令のペイロード
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 整数リテラル
    Int(i64),
    /// 浮動小数点リテラル
    Double(f64),
    /// 文字列リテラル
    Str(String),
    /// nil リテラル
    Nil,
    /// 変数名・関数名などの名前
    Name(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Int(value) => write!(f, "{}", value),
            Payload::Double(value) => write!(f, "{}", value),
            Payload::Str(value) => write!(f, "\"{}\"", value.escape_debug()),
            Payload::Nil => write!(f, "nil"),
            Payload::Name(name) => write!(f, "{}", name),
        }
    }
}

/// 命令
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// 命令の種類
    pub kind: InstrKind,
    /// 命令を生成したスコープ
    pub scope: ScopeId,
    /// 対象変数のフレーム
    pub frame: Frame,
    /// ラベルなどを区別するための連番
    pub counter: u32,
    /// ペイロード
    pub payload: Option<Payload>,
}

impl Instruction {
    /// 新しい命令を作成
    pub fn new(kind: InstrKind, scope: ScopeId, frame: Frame) -> Self {
        Self {
            kind,
            scope,
            frame,
            counter: 0,
            payload: None,
        }
    }

    /// ペイロードを設定
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// 連番を設定
    pub fn with_counter(mut self, counter: u32) -> Self {
        self.counter = counter;
        self
    }

    /// 名前ペイロードを取得
    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Name(name)) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    instruction: Instruction,
    prev: Option<InstrId>,
    next: Option<InstrId>,
}

/// 命令列
#[derive(Debug)]
pub struct InstructionStream {
    slots: Vec<Slot>,
    tail: InstrId,
    cursor: InstrId,
    len: usize,
}

impl Default for InstructionStream {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionStream {
    /// 番兵のみを持つ命令列を作成
    pub fn new() -> Self {
        let start = Slot {
            instruction: Instruction::new(InstrKind::ProgramStart, ScopeId::ROOT, Frame::Global),
            prev: None,
            next: None,
        };
        Self {
            slots: vec![start],
            tail: InstrId::START,
            cursor: InstrId::START,
            len: 1,
        }
    }

    /// 末尾に追加
    pub fn append(&mut self, instruction: Instruction) -> InstrId {
        let id = InstrId(self.slots.len());
        self.slots.push(Slot {
            instruction,
            prev: Some(self.tail),
            next: None,
        });
        self.slots[self.tail.0].next = Some(id);
        self.tail = id;
        self.len += 1;
        id
    }

    /// カーソルを設定
    pub fn set_cursor(&mut self, id: InstrId) {
        self.cursor = id;
    }

    /// 現在のカーソル
    pub fn cursor(&self) -> InstrId {
        self.cursor
    }

    /// カーソル位置の命令の直前に挿入
    pub fn insert_before_cursor(&mut self, instruction: Instruction) -> Result<InstrId> {
        let prev = self.slots[self.cursor.0]
            .prev
            .ok_or_else(|| CompilerError::internal_error("プログラム開始命令の前には挿入できません"))?;

        let id = InstrId(self.slots.len());
        self.slots.push(Slot {
            instruction,
            prev: Some(prev),
            next: Some(self.cursor),
        });
        self.slots[prev.0].next = Some(id);
        self.slots[self.cursor.0].prev = Some(id);
        self.len += 1;
        Ok(id)
    }

    /// カーソル位置の命令の直後の命令を削除
    pub fn delete_after_cursor(&mut self) -> Result<Instruction> {
        let target = self.slots[self.cursor.0]
            .next
            .ok_or_else(|| CompilerError::internal_error("削除する命令がありません"))?;

        let next = self.slots[target.0].next;
        self.slots[self.cursor.0].next = next;
        match next {
            Some(next) => self.slots[next.0].prev = Some(self.cursor),
            None => self.tail = self.cursor,
        }
        self.slots[target.0].prev = None;
        self.slots[target.0].next = None;
        self.len -= 1;
        Ok(self.slots[target.0].instruction.clone())
    }

    /// 末尾から先頭に向かって条件を満たす命令を検索
    pub fn find_backward<F>(&self, mut predicate: F) -> Option<InstrId>
    where
        F: FnMut(InstrId, &Instruction) -> bool,
    {
        let mut current = Some(self.tail);
        while let Some(id) = current {
            if predicate(id, &self.slots[id.0].instruction) {
                return Some(id);
            }
            current = self.slots[id.0].prev;
        }
        None
    }

    /// 命令を取得
    pub fn get(&self, id: InstrId) -> &Instruction {
        &self.slots[id.0].instruction
    }

    /// 命令を取得（可変参照）
    pub fn get_mut(&mut self, id: InstrId) -> &mut Instruction {
        &mut self.slots[id.0].instruction
    }

    /// 次の命令
    pub fn next(&self, id: InstrId) -> Option<InstrId> {
        self.slots[id.0].next
    }

    /// 前の命令
    pub fn prev(&self, id: InstrId) -> Option<InstrId> {
        self.slots[id.0].prev
    }

    /// 末尾の命令
    pub fn tail(&self) -> InstrId {
        self.tail
    }

    /// 連結されている命令の数（番兵を含む）
    pub fn len(&self) -> usize {
        self.len
    }

    /// 番兵以外の命令がないかどうか
    pub fn is_empty(&self) -> bool {
        self.len <= 1
    }

    /// `first` から `last` まで（両端を含む）の命令IDを順に列挙
    pub fn range(&self, first: InstrId, last: InstrId) -> Vec<InstrId> {
        let mut ids = Vec::new();
        let mut current = Some(first);
        while let Some(id) = current {
            ids.push(id);
            if id == last {
                break;
            }
            current = self.slots[id.0].next;
        }
        ids
    }

    /// 先頭から順に命令を走査
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stream: self,
            next: Some(InstrId::START),
        }
    }
}

/// 命令列のイテレータ（最終的な順序）
pub struct Iter<'a> {
    stream: &'a InstructionStream,
    next: Option<InstrId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (InstrId, &'a Instruction);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.stream.next(id);
        Some((id, self.stream.get(id)))
    }
}
