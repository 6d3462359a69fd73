//! # 組み込み関数のシグネチャ
//!
//! グローバルスコープにあらかじめ登録される組み込み関数の定義です。
//! 本体の命令列は `backend::builtins` が生成します。

use super::scope::{ScopeId, ScopeKind, ScopeTree};
use super::symbol_table::Symbol;
use super::types::Type;
use crate::frontend::error::Result;

/// 組み込み関数のパラメータ
#[derive(Debug, Clone, Copy)]
pub struct BuiltinParam {
    /// 外部名（`_` の場合は `None`）
    pub label: Option<&'static str>,
    /// 内部名
    pub name: &'static str,
    /// 型
    pub ty: Type,
}

/// 組み込み関数
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    /// 関数名
    pub name: &'static str,
    /// パラメータ
    pub params: &'static [BuiltinParam],
    /// 戻り値の型
    pub return_type: Type,
    /// 可変長引数かどうか（`write` のみ）
    pub variadic: bool,
}

const fn param(label: Option<&'static str>, name: &'static str, ty: Type) -> BuiltinParam {
    BuiltinParam { label, name, ty }
}

/// 組み込み関数の一覧
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "readString",
        params: &[],
        return_type: Type::OptionalString,
        variadic: false,
    },
    Builtin {
        name: "readInt",
        params: &[],
        return_type: Type::OptionalInt,
        variadic: false,
    },
    Builtin {
        name: "readDouble",
        params: &[],
        return_type: Type::OptionalDouble,
        variadic: false,
    },
    Builtin {
        name: "write",
        params: &[],
        return_type: Type::Void,
        variadic: true,
    },
    Builtin {
        name: "Int2Double",
        params: &[param(None, "term", Type::Int)],
        return_type: Type::Double,
        variadic: false,
    },
    Builtin {
        name: "Double2Int",
        params: &[param(None, "term", Type::Double)],
        return_type: Type::Int,
        variadic: false,
    },
    Builtin {
        name: "length",
        params: &[param(None, "s", Type::String)],
        return_type: Type::Int,
        variadic: false,
    },
    Builtin {
        name: "substring",
        params: &[
            param(Some("of"), "s", Type::String),
            param(Some("startingAt"), "i", Type::Int),
            param(Some("endingBefore"), "j", Type::Int),
        ],
        return_type: Type::OptionalString,
        variadic: false,
    },
    Builtin {
        name: "ord",
        params: &[param(None, "c", Type::String)],
        return_type: Type::Int,
        variadic: false,
    },
    Builtin {
        name: "chr",
        params: &[param(None, "i", Type::Int)],
        return_type: Type::String,
        variadic: false,
    },
];

/// 名前で組み込み関数を検索
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// 可変長引数の関数かどうか
pub fn is_variadic(name: &str) -> bool {
    lookup(name).map_or(false, |builtin| builtin.variadic)
}

/// 組み込み関数をグローバルスコープに登録
///
/// 関数シンボル1つと、パラメータを持つ関数ヘッダスコープ1つを作成します。
pub fn register(tree: &mut ScopeTree) -> Result<()> {
    for builtin in BUILTINS {
        tree.get_mut(ScopeId::ROOT)
            .table
            .insert(Symbol::function(builtin.name, builtin.return_type, true))?;

        let header = tree.create_child(ScopeId::ROOT, ScopeKind::FunctionHeader, builtin.name);
        for (index, p) in builtin.params.iter().enumerate() {
            let symbol = Symbol::parameter(p.name, index, p.label.map(str::to_string), p.ty, None);
            tree.get_mut(header).table.insert(symbol)?;
        }
        tree.get_mut(header).parameter_count = builtin.params.len();
    }

    log::trace!("組み込み関数を{}個登録しました", BUILTINS.len());
    Ok(())
}
