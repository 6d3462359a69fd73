//! # 事後検証
//!
//! 構文解析の完了後に実行される検証です。
//!
//! - 呼び出し検証: 記録された呼び出しを記録順に1回ずつ、関数の存在・引数の数・
//!   初期化・ラベル・型・戻り値の型の順で検証します。戻り値を捨てる呼び出しの
//!   呼び出し先が `Void` だった場合は、結果破棄の足場命令を取り除きます。
//! - return 網羅性検証: 戻り値を持つ関数のすべての経路に return があるかを検証します。

use super::builtins;
use super::call_registry::{CallRegistry, CallSite};
use super::scope::{ScopeId, ScopeKind, ScopeTree};
use super::symbol_table::SymbolKind;
use super::types::Type;
use crate::backend::instruction::{InstrId, InstrKind, InstructionStream, Payload};
use crate::frontend::error::{CompilerError, Result};

/// すべての呼び出しを検証
pub fn validate_calls(
    registry: &CallRegistry,
    scopes: &ScopeTree,
    stream: &mut InstructionStream,
) -> Result<()> {
    for site in registry.iter() {
        validate_call(site, scopes, stream)?;
    }
    log::debug!("{}件の呼び出しを検証しました", registry.len());
    Ok(())
}

fn validate_call(site: &CallSite, scopes: &ScopeTree, stream: &mut InstructionStream) -> Result<()> {
    // 関数の存在
    let header = scopes.find_function(&site.name).ok_or_else(|| {
        CompilerError::undefined_function(format!("関数 '{}' は定義されていません", site.name), site.location)
    })?;
    let return_type = match scopes.get(ScopeId::ROOT).table.get(&site.name) {
        Some(symbol) if symbol.is_function() => symbol.ty(),
        _ => {
            return Err(CompilerError::undefined_function(
                format!("'{}' は関数ではありません", site.name),
                site.location,
            ))
        }
    };
    let variadic = builtins::is_variadic(&site.name);
    let header_scope = scopes.get(header);

    // 引数の数
    if !variadic && site.args.len() != header_scope.parameter_count {
        return Err(CompilerError::call_signature(
            format!(
                "関数 '{}' の引数は{}個ですが、{}個渡されました",
                site.name,
                header_scope.parameter_count,
                site.args.len()
            ),
            site.location,
        ));
    }

    // 引数の初期化
    if let Some(arg) = site.args.iter().find(|arg| !arg.initialized) {
        return Err(CompilerError::undefined_variable(
            format!("関数 '{}' に初期化されていない変数が渡されました", site.name),
            arg.location.or(site.location),
        ));
    }

    if !variadic {
        for (index, arg) in site.args.iter().enumerate() {
            let (label, param_type) = match header_scope.table.parameter_at(index).map(|p| &p.kind) {
                Some(SymbolKind::Parameter { label, ty, .. }) => (label.as_deref(), *ty),
                _ => {
                    return Err(CompilerError::internal_error(format!(
                        "関数 '{}' の{}番目のパラメータが見つかりません",
                        site.name, index
                    )))
                }
            };

            // 引数ラベル
            if arg.label.as_deref() != label {
                return Err(CompilerError::call_signature(
                    format!(
                        "関数 '{}' の{}番目の引数のラベルが一致しません（期待: {}）",
                        site.name,
                        index + 1,
                        label.unwrap_or("_")
                    ),
                    arg.location.or(site.location),
                ));
            }

            // 引数の型
            if param_type.accepts(arg.ty) {
                continue;
            }
            if arg.literal && arg.ty == Type::Int && param_type.base() == Type::Double {
                promote_literal_argument(stream, arg.push);
                continue;
            }
            return Err(CompilerError::call_signature(
                format!(
                    "関数 '{}' の{}番目の引数は {} 型ですが、{} 型が渡されました",
                    site.name,
                    index + 1,
                    param_type,
                    arg.ty
                ),
                arg.location.or(site.location),
            ));
        }
    }

    match site.target {
        // 戻り値の型
        Some(target) => {
            if !target.accepts(return_type) {
                return Err(CompilerError::call_signature(
                    format!(
                        "関数 '{}' の戻り値は {} 型ですが、{} 型が必要です",
                        site.name, return_type, target
                    ),
                    site.location,
                ));
            }
        }
        None if return_type == Type::Void && site.scaffolded => {
            remove_scaffold(stream, site.call_id)?;
        }
        None => {}
    }

    Ok(())
}

/// 整数リテラルの引数を浮動小数点リテラルに書き換える
fn promote_literal_argument(stream: &mut InstructionStream, push: InstrId) {
    let instruction = stream.get_mut(push);
    if let Some(Payload::Int(value)) = instruction.payload {
        instruction.payload = Some(Payload::Double(value as f64));
    }
}

/// `Void` 関数の呼び出し直後にある結果破棄の足場命令を取り除く
fn remove_scaffold(stream: &mut InstructionStream, call_id: u32) -> Result<()> {
    let call = stream
        .find_backward(|id, instr| {
            instr.kind == InstrKind::Call
                && instr.counter == call_id
                && stream
                    .next(id)
                    .map_or(false, |next| stream.get(next).kind == InstrKind::DiscardResult)
        })
        .ok_or_else(|| CompilerError::internal_error(format!("呼び出し #{} の足場命令が見つかりません", call_id)))?;

    stream.set_cursor(call);
    stream.delete_after_cursor()?;
    log::debug!("Void 呼び出し #{} の結果破棄を除去しました", call_id);
    Ok(())
}

/// 戻り値を持つすべての関数について return の網羅性を検証
pub fn validate_returns(scopes: &ScopeTree) -> Result<()> {
    let root = scopes.get(ScopeId::ROOT);
    for &header in &root.children {
        let header_scope = scopes.get(header);
        if header_scope.kind != ScopeKind::FunctionHeader {
            continue;
        }

        let returns_value = matches!(
            root.table.get(&header_scope.name).map(|s| &s.kind),
            Some(SymbolKind::Function { return_type, builtin: false }) if *return_type != Type::Void
        );
        if !returns_value {
            continue;
        }

        let body = header_scope
            .children
            .iter()
            .copied()
            .find(|&id| scopes.get(id).kind == ScopeKind::FunctionBody);
        if !body.map_or(false, |body| returns_on_all_paths(scopes, body)) {
            return Err(CompilerError::return_statement(
                format!("関数 '{}' には値を返さない経路があります", header_scope.name),
                None,
            ));
        }
    }
    Ok(())
}

/// スコープが無条件の return を持つか、同じ階層のいずれかの if 文の
/// 両方の節が再帰的に return を持つかどうか
pub fn returns_on_all_paths(scopes: &ScopeTree, id: ScopeId) -> bool {
    let scope = scopes.get(id);
    if scope.has_return {
        return true;
    }

    scope.children.iter().any(|&child| {
        let child_scope = scopes.get(child);
        child_scope.kind == ScopeKind::If
            && child_scope.else_branch.map_or(false, |else_branch| {
                returns_on_all_paths(scopes, child) && returns_on_all_paths(scopes, else_branch)
            })
    })
}
