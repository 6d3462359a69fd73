//! # シンボルテーブル
//!
//! 名前解決のためのシンボルテーブルを提供します。
//! 各スコープは1つのテーブルを持ち、変数・関数・パラメータの名前とその定義情報を
//! AVL木（平衡二分探索木）で管理します。同じスコープ内でのキーの重複は許可されません。

use std::cmp::Ordering;
use std::fmt;

use super::types::Type;
use crate::frontend::error::{CompilerError, Result, SourceLocation};

/// シンボルの種類
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// 変数（`let` / `var`）
    Variable {
        /// `var` で宣言されたかどうか
        mutable: bool,
        /// 変数の型
        ty: Type,
        /// 値が代入済みかどうか
        defined: bool,
    },
    /// 関数
    Function {
        /// 戻り値の型（`->` がなければ `Void`）
        return_type: Type,
        /// 組み込み関数かどうか
        builtin: bool,
    },
    /// パラメータ
    Parameter {
        /// 宣言順の位置（0から始まる）
        index: usize,
        /// 外部名（`_` の場合は `None`）
        label: Option<String>,
        /// パラメータの型
        ty: Type,
    },
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable { mutable: true, .. } => write!(f, "変数"),
            SymbolKind::Variable { mutable: false, .. } => write!(f, "定数"),
            SymbolKind::Function { .. } => write!(f, "関数"),
            SymbolKind::Parameter { .. } => write!(f, "パラメータ"),
        }
    }
}

/// シンボル定義
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// シンボル名（テーブルのキー）
    pub name: String,
    /// シンボルの種類
    pub kind: SymbolKind,
    /// ソースコード内の位置情報
    pub location: Option<SourceLocation>,
}

impl Symbol {
    /// 変数シンボルを作成
    pub fn variable(
        name: impl Into<String>,
        mutable: bool,
        ty: Type,
        defined: bool,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Variable { mutable, ty, defined },
            location,
        }
    }

    /// 関数シンボルを作成
    pub fn function(name: impl Into<String>, return_type: Type, builtin: bool) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Function { return_type, builtin },
            location: None,
        }
    }

    /// パラメータシンボルを作成
    pub fn parameter(
        name: impl Into<String>,
        index: usize,
        label: Option<String>,
        ty: Type,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Parameter { index, label, ty },
            location,
        }
    }

    /// 値として使用したときの型（関数の場合は戻り値の型）
    pub fn ty(&self) -> Type {
        match &self.kind {
            SymbolKind::Variable { ty, .. } => *ty,
            SymbolKind::Function { return_type, .. } => *return_type,
            SymbolKind::Parameter { ty, .. } => *ty,
        }
    }

    /// 値を読み出せる状態かどうか（パラメータは常に定義済み）
    pub fn is_defined(&self) -> bool {
        match &self.kind {
            SymbolKind::Variable { defined, .. } => *defined,
            SymbolKind::Function { .. } => false,
            SymbolKind::Parameter { .. } => true,
        }
    }

    /// 関数シンボルかどうか
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }
}

/// AVL木のノード
#[derive(Debug)]
struct Node {
    symbol: Symbol,
    height: i32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(symbol: Symbol) -> Box<Self> {
        Box::new(Self {
            symbol,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn key(&self) -> &str {
        &self.symbol.name
    }
}

/// シンボルテーブル
#[derive(Debug, Default)]
pub struct SymbolTable {
    root: Option<Box<Node>>,
    len: usize,
}

impl SymbolTable {
    /// 新しいシンボルテーブルを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// シンボルを追加
    ///
    /// 同じ名前のシンボルが既に存在する場合は再定義エラー（終了コード3）を返します。
    pub fn insert(&mut self, symbol: Symbol) -> Result<()> {
        if let Some(existing) = self.get(&symbol.name) {
            return Err(CompilerError::undefined_function(
                format!("{} '{}' は既に定義されています", existing.kind, symbol.name),
                symbol.location,
            ));
        }

        let key = symbol.name.clone();
        self.root = Some(insert_node(self.root.take(), symbol, &key));
        self.len += 1;
        Ok(())
    }

    /// 名前でシンボルを検索
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match name.cmp(node.key()) {
                Ordering::Equal => return Some(&node.symbol),
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
            }
        }
        None
    }

    /// 名前でシンボルを検索（可変参照）
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match name.cmp(node.symbol.name.as_str()) {
                Ordering::Equal => return Some(&mut node.symbol),
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
            }
        }
        None
    }

    /// 指定した名前のシンボルが存在するかどうか
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 宣言順の位置が `index` のパラメータを取得
    ///
    /// 木の形に依存せず宣言順にパラメータを取り出すために使います。
    pub fn parameter_at(&self, index: usize) -> Option<&Symbol> {
        self.iter().find(|symbol| {
            matches!(symbol.kind, SymbolKind::Parameter { index: i, .. } if i == index)
        })
    }

    /// キーの昇順でシンボルを走査
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// シンボルの数
    pub fn len(&self) -> usize {
        self.len
    }

    /// テーブルが空かどうか
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 木の高さ
    pub fn height(&self) -> i32 {
        height(&self.root)
    }

    /// AVL条件（平衡係数が-1〜1、高さが正しい、キーが昇順）を満たしているか検査
    pub fn is_balanced(&self) -> bool {
        check_node(&self.root, None, None).is_some()
    }
}

/// シンボルテーブルのイテレータ（中間順）
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iter<'a> {
    fn push_left(&mut self, mut node: Option<&'a Node>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Symbol;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(&node.symbol)
    }
}

fn height(node: &Option<Box<Node>>) -> i32 {
    node.as_ref().map_or(0, |n| n.height)
}

fn update_height(node: &mut Node) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn balance_factor(node: &Node) -> i32 {
    height(&node.left) - height(&node.right)
}

fn insert_node(node: Option<Box<Node>>, symbol: Symbol, key: &str) -> Box<Node> {
    let mut node = match node {
        None => return Node::leaf(symbol),
        Some(node) => node,
    };

    if key < node.key() {
        node.left = Some(insert_node(node.left.take(), symbol, key));
    } else {
        node.right = Some(insert_node(node.right.take(), symbol, key));
    }

    update_height(&mut node);
    rebalance(node, key)
}

fn rebalance(mut node: Box<Node>, key: &str) -> Box<Node> {
    let balance = balance_factor(&node);

    if balance > 1 {
        let left_key_greater = node.left.as_ref().map_or(false, |l| key > l.key());
        if left_key_greater {
            // LR
            node.left = node.left.take().map(rotate_left);
        }
        // LL
        return rotate_right(node);
    }

    if balance < -1 {
        let right_key_less = node.right.as_ref().map_or(false, |r| key < r.key());
        if right_key_less {
            // RL
            node.right = node.right.take().map(rotate_right);
        }
        // RR
        return rotate_left(node);
    }

    node
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    match node.left.take() {
        Some(mut pivot) => {
            node.left = pivot.right.take();
            update_height(&mut node);
            pivot.right = Some(node);
            update_height(&mut pivot);
            pivot
        }
        None => node,
    }
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    match node.right.take() {
        Some(mut pivot) => {
            node.right = pivot.left.take();
            update_height(&mut node);
            pivot.left = Some(node);
            update_height(&mut pivot);
            pivot
        }
        None => node,
    }
}

/// 部分木を検査し、正しければ高さを返す
fn check_node(node: &Option<Box<Node>>, lower: Option<&str>, upper: Option<&str>) -> Option<i32> {
    let node = match node {
        None => return Some(0),
        Some(node) => node,
    };

    if lower.map_or(false, |l| node.key() <= l) || upper.map_or(false, |u| node.key() >= u) {
        return None;
    }

    let left = check_node(&node.left, lower, Some(node.key()))?;
    let right = check_node(&node.right, Some(node.key()), upper)?;
    let expected = 1 + left.max(right);

    if (left - right).abs() > 1 || node.height != expected {
        return None;
    }
    Some(expected)
}
