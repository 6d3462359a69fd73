//! # 意味解析モジュール
//!
//! swiftlet言語の意味解析を担当するモジュールです。
//! 意味解析は構文解析と同じ1回の走査の中で行われるため、ここにはパーサーが
//! 参照・更新するデータ構造（型、シンボルテーブル、スコープ木、呼び出し記録）と、
//! 構文解析の完了後に走る事後検証が置かれています。

pub mod builtins;
pub mod call_registry;
pub mod scope;
pub mod symbol_table;
pub mod types;
pub mod validator;

// 再エクスポート
pub use self::call_registry::{CallArgument, CallRegistry, CallSite};
pub use self::scope::{Frame, Scope, ScopeId, ScopeKind, ScopeTree};
pub use self::symbol_table::{Symbol, SymbolKind, SymbolTable};
pub use self::types::Type;
