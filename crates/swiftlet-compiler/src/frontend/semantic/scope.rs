//! # スコープ管理
//!
//! コードのスコープを管理するモジュールです。
//! スコープはアリーナ（`Vec`）に格納された木構造で、[`ScopeId`] で参照されます。
//! 各スコープは自身のシンボルテーブルと、条件分岐の連番・パラメータ数などの
//! カウンタを持ちます。スコープはコンパイル全体が終わるまで破棄されません。

use std::fmt;

use super::symbol_table::{Symbol, SymbolTable};
use crate::frontend::error::{CompilerError, Result};

/// スコープの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

impl ScopeId {
    /// グローバルスコープ
    pub const ROOT: ScopeId = ScopeId(0);
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// スコープの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// グローバルスコープ
    Global,
    /// 関数ヘッダ（パラメータを保持）
    FunctionHeader,
    /// 関数本体
    FunctionBody,
    /// if の then 節
    If,
    /// else 節
    Else,
    /// while ループ本体
    While,
}

impl ScopeKind {
    /// このスコープが関数宣言を許可するかどうか
    pub fn allows_function_declarations(&self) -> bool {
        matches!(self, ScopeKind::Global)
    }
}

/// 変数の格納先フレーム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// グローバルフレーム（GF）
    Global,
    /// ローカルフレーム（LF）
    Local,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Global => write!(f, "GF"),
            Frame::Local => write!(f, "LF"),
        }
    }
}

/// スコープ
#[derive(Debug)]
pub struct Scope {
    /// 識別子
    pub id: ScopeId,
    /// 種類
    pub kind: ScopeKind,
    /// 名前（ラベル生成に使用され、プログラム全体で一意）
    pub name: String,
    /// 親スコープ
    pub parent: Option<ScopeId>,
    /// 子スコープ（作成順）
    pub children: Vec<ScopeId>,
    /// シンボルテーブル
    pub table: SymbolTable,
    /// 子の if / while に振る連番
    pub conditional_counter: u32,
    /// 宣言されたパラメータの数
    pub parameter_count: usize,
    /// 無条件の return 文を直接含むかどうか
    pub has_return: bool,
    /// 変数の格納先フレーム
    pub frame: Frame,
    /// if スコープに対応する else スコープ
    pub else_branch: Option<ScopeId>,
}

/// スコープ木
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// グローバルスコープのみを持つ木を作成
    pub fn new() -> Self {
        let root = Scope {
            id: ScopeId::ROOT,
            kind: ScopeKind::Global,
            name: "$main".to_string(),
            parent: None,
            children: Vec::new(),
            table: SymbolTable::new(),
            conditional_counter: 0,
            parameter_count: 0,
            has_return: false,
            frame: Frame::Global,
            else_branch: None,
        };
        Self {
            scopes: vec![root],
            current: ScopeId::ROOT,
        }
    }

    /// 組み込み関数を登録済みの木を作成
    pub fn with_builtins() -> Result<Self> {
        let mut tree = Self::new();
        super::builtins::register(&mut tree)?;
        Ok(tree)
    }

    /// 現在のスコープ
    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// スコープを取得
    ///
    /// `ScopeId` はこの木が発行したものに限られるため、範囲外にはなりません。
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// スコープを取得（可変参照）
    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// スコープの数
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// 木が空かどうか（ルートが常に存在するため常に false）
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// 親の子として新しいスコープを作成（現在のスコープは変更しない）
    pub fn create_child(&mut self, parent: ScopeId, kind: ScopeKind, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let frame = match kind {
            ScopeKind::FunctionHeader | ScopeKind::FunctionBody => Frame::Local,
            _ => self.get(parent).frame,
        };
        let name = name.into();
        log::trace!("スコープ作成: {} ({:?}, 親 {})", name, kind, parent);

        self.scopes.push(Scope {
            id,
            kind,
            name,
            parent: Some(parent),
            children: Vec::new(),
            table: SymbolTable::new(),
            conditional_counter: 0,
            parameter_count: 0,
            has_return: false,
            frame,
            else_branch: None,
        });
        self.get_mut(parent).children.push(id);
        id
    }

    /// 現在のスコープの子を作成して入る
    pub fn enter(&mut self, kind: ScopeKind, name: impl Into<String>) -> ScopeId {
        let id = self.create_child(self.current, kind, name);
        self.current = id;
        log::debug!("スコープに入る: {}", self.get(id).name);
        id
    }

    /// 既存のスコープに入る
    pub fn enter_existing(&mut self, id: ScopeId) {
        self.current = id;
    }

    /// 親スコープに戻る
    pub fn leave(&mut self) -> Result<()> {
        let parent = self
            .get(self.current)
            .parent
            .ok_or_else(|| CompilerError::internal_error("グローバルスコープから抜けることはできません"))?;
        log::debug!("スコープから出る: {}", self.get(self.current).name);
        self.current = parent;
        Ok(())
    }

    /// 現在のスコープの下に作る if / while スコープの名前を採番
    pub fn next_conditional_name(&mut self, kind: ScopeKind) -> String {
        let scope = self.get_mut(self.current);
        scope.conditional_counter += 1;
        let tag = match kind {
            ScopeKind::While => "while",
            _ => "if",
        };
        format!("{}${}{}", scope.name, tag, scope.conditional_counter)
    }

    /// `from` から親方向へ辿るスコープ列
    pub fn ancestors(&self, from: ScopeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(from),
        }
    }

    /// シンボルを親方向に検索
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<&Symbol> {
        self.owning_scope(from, name)
            .and_then(|id| self.get(id).table.get(name))
    }

    /// シンボルを親方向に検索（可変参照）
    pub fn lookup_mut(&mut self, from: ScopeId, name: &str) -> Option<&mut Symbol> {
        let owner = self.owning_scope(from, name)?;
        self.get_mut(owner).table.get_mut(name)
    }

    /// シンボルを所有するスコープを親方向に検索
    pub fn owning_scope(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        self.ancestors(from)
            .find(|scope| scope.table.contains(name))
            .map(|scope| scope.id)
    }

    /// 関数ヘッダスコープをグローバルスコープの直下から検索
    pub fn find_function(&self, name: &str) -> Option<ScopeId> {
        self.get(ScopeId::ROOT)
            .children
            .iter()
            .copied()
            .find(|&id| {
                let scope = self.get(id);
                scope.kind == ScopeKind::FunctionHeader && scope.name == name
            })
    }

    /// 最も近い while スコープを親方向に検索
    pub fn enclosing_while(&self, from: ScopeId) -> Option<ScopeId> {
        self.ancestors(from)
            .find(|scope| scope.kind == ScopeKind::While)
            .map(|scope| scope.id)
    }

    /// ループの入れ子の最も外側の while スコープを検索
    pub fn outermost_while(&self, from: ScopeId) -> Option<ScopeId> {
        let mut outermost = self.enclosing_while(from)?;
        while let Some(outer) = self
            .get(outermost)
            .parent
            .and_then(|parent| self.enclosing_while(parent))
        {
            outermost = outer;
        }
        Some(outermost)
    }

    /// 最も近い関数ヘッダスコープを親方向に検索
    ///
    /// グローバルスコープに到達した場合は return 文エラーになります。
    pub fn enclosing_function(&self, from: ScopeId) -> Result<ScopeId> {
        self.ancestors(from)
            .find(|scope| scope.kind == ScopeKind::FunctionHeader)
            .map(|scope| scope.id)
            .ok_or_else(|| CompilerError::return_statement("関数の外で return 文は使用できません", None))
    }
}

/// 親方向へのスコープイテレータ
pub struct Ancestors<'a> {
    tree: &'a ScopeTree,
    next: Option<ScopeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Scope;

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.tree.get(self.next?);
        self.next = scope.parent;
        Some(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::semantic::types::Type;

    fn variable(name: &str) -> Symbol {
        Symbol::variable(name, true, Type::Int, true, None)
    }

    #[test]
    fn test_lookup_resolves_nearest_scope() {
        let mut tree = ScopeTree::new();
        tree.get_mut(ScopeId::ROOT).table.insert(variable("x")).unwrap();

        let name = tree.next_conditional_name(ScopeKind::If);
        let inner = tree.enter(ScopeKind::If, name);
        tree.get_mut(inner).table.insert(variable("x")).unwrap();
        tree.get_mut(inner).table.insert(variable("y")).unwrap();

        assert_eq!(tree.owning_scope(inner, "x"), Some(inner));
        assert_eq!(tree.owning_scope(inner, "y"), Some(inner));
        tree.leave().unwrap();
        assert_eq!(tree.owning_scope(tree.current(), "x"), Some(ScopeId::ROOT));
        assert_eq!(tree.owning_scope(tree.current(), "y"), None);
    }

    #[test]
    fn test_conditional_names_are_unique() {
        let mut tree = ScopeTree::new();
        let first = tree.next_conditional_name(ScopeKind::If);
        let second = tree.next_conditional_name(ScopeKind::While);
        assert_eq!(first, "$main$if1");
        assert_eq!(second, "$main$while2");

        tree.enter(ScopeKind::While, second);
        assert_eq!(tree.next_conditional_name(ScopeKind::If), "$main$while2$if1");
    }

    #[test]
    fn test_outermost_while_skips_ifs() {
        let mut tree = ScopeTree::new();
        let outer = tree.enter(ScopeKind::While, "w1");
        tree.enter(ScopeKind::If, "i1");
        let inner = tree.enter(ScopeKind::While, "w2");
        let leaf = tree.enter(ScopeKind::If, "i2");

        assert_eq!(tree.enclosing_while(leaf), Some(inner));
        assert_eq!(tree.outermost_while(leaf), Some(outer));
        assert_eq!(tree.outermost_while(ScopeId::ROOT), None);
    }

    #[test]
    fn test_enclosing_function_at_global_is_error() {
        let mut tree = ScopeTree::new();
        assert_eq!(tree.enclosing_function(ScopeId::ROOT).unwrap_err().exit_code(), 6);

        let header = tree.enter(ScopeKind::FunctionHeader, "f");
        let body = tree.enter(ScopeKind::FunctionBody, "f");
        let branch = tree.enter(ScopeKind::If, "f$if1");
        assert_eq!(tree.enclosing_function(branch).unwrap(), header);
        assert_eq!(tree.get(body).frame, Frame::Local);
        assert_eq!(tree.get(branch).frame, Frame::Local);
    }

    #[test]
    fn test_find_function_only_searches_root_children() {
        let mut tree = ScopeTree::new();
        let header = tree.enter(ScopeKind::FunctionHeader, "f");
        tree.enter(ScopeKind::FunctionBody, "f");
        tree.enter(ScopeKind::FunctionHeader, "g");

        assert_eq!(tree.find_function("f"), Some(header));
        assert_eq!(tree.find_function("g"), None);
    }

    #[test]
    fn test_leave_root_is_internal_error() {
        let mut tree = ScopeTree::new();
        assert_eq!(tree.leave().unwrap_err().exit_code(), 99);
    }
}
