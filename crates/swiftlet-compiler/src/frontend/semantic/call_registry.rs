//! # 呼び出し記録
//!
//! 関数は呼び出しより後で定義されることがあるため、構文解析中の呼び出しは
//! その場では検証せず、ここに記録しておきます。記録は構文解析の完了後に
//! `validator` が記録順に検証します。

use super::scope::ScopeId;
use super::types::Type;
use crate::backend::instruction::InstrId;
use crate::frontend::error::SourceLocation;

/// 呼び出しの実引数
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgument {
    /// 引数ラベル（`name: value` の `name`）
    pub label: Option<String>,
    /// 引数の型
    pub ty: Type,
    /// 値が代入済みかどうか
    pub initialized: bool,
    /// リテラルかどうか（`Int` から `Double` への昇格に使用）
    pub literal: bool,
    /// 引数をプッシュする命令
    pub push: InstrId,
    /// 引数の位置
    pub location: Option<SourceLocation>,
}

/// 呼び出し箇所
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    /// 呼び出される関数名
    pub name: String,
    /// 結果を受け取る型（結果を破棄する場合は `None`）
    pub target: Option<Type>,
    /// 実引数
    pub args: Vec<CallArgument>,
    /// 呼び出しの連番（`Call` 命令の `counter` と一致）
    pub call_id: u32,
    /// 結果破棄の足場命令が直後に置かれているかどうか
    pub scaffolded: bool,
    /// 呼び出し元のスコープ
    pub scope: ScopeId,
    /// 呼び出しの位置
    pub location: Option<SourceLocation>,
}

/// 呼び出し記録
#[derive(Debug, Default)]
pub struct CallRegistry {
    sites: Vec<CallSite>,
}

impl CallRegistry {
    /// 新しい記録を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 次に記録される呼び出しの連番
    pub fn next_id(&self) -> u32 {
        self.sites.len() as u32 + 1
    }

    /// 呼び出しを記録
    pub fn record(&mut self, site: CallSite) {
        log::trace!("呼び出しを記録: {} (#{})", site.name, site.call_id);
        self.sites.push(site);
    }

    /// 記録順に呼び出しを走査
    pub fn iter(&self) -> std::slice::Iter<'_, CallSite> {
        self.sites.iter()
    }

    /// 記録された呼び出しの数
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// 記録が空かどうか
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
