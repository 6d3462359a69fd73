//! # 型
//!
//! swiftlet言語の静的型を定義します。
//! ユーザーが記述できるのは `Int` `Double` `String` とそのオプショナル型のみで、
//! `Bool` `Nil` `Void` はコンパイラ内部でのみ現れます。

use std::fmt;

/// 静的型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 整数
    Int,
    /// 浮動小数点数
    Double,
    /// 文字列
    String,
    /// `Int?`
    OptionalInt,
    /// `Double?`
    OptionalDouble,
    /// `String?`
    OptionalString,
    /// 比較演算の結果（変数には格納できない）
    Bool,
    /// `nil` リテラルの型
    Nil,
    /// 戻り値なし
    Void,
}

impl Type {
    /// オプショナル型かどうか
    pub fn is_optional(&self) -> bool {
        matches!(self, Type::OptionalInt | Type::OptionalDouble | Type::OptionalString)
    }

    /// 数値型（非オプショナル）かどうか
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// 変数・パラメータに格納可能な型かどうか
    pub fn is_storable(&self) -> bool {
        !matches!(self, Type::Bool | Type::Nil | Type::Void)
    }

    /// オプショナルを外した基底型を取得
    pub fn base(&self) -> Type {
        match self {
            Type::OptionalInt => Type::Int,
            Type::OptionalDouble => Type::Double,
            Type::OptionalString => Type::String,
            other => *other,
        }
    }

    /// 対応するオプショナル型を取得
    pub fn optional(&self) -> Type {
        match self {
            Type::Int => Type::OptionalInt,
            Type::Double => Type::OptionalDouble,
            Type::String => Type::OptionalString,
            other => *other,
        }
    }

    /// この型の変数に `other` 型の値を代入できるかどうか
    ///
    /// `T?` は `T`、`T?`、`nil` を受け入れます。暗黙の数値変換は含みません。
    pub fn accepts(&self, other: Type) -> bool {
        if *self == other {
            return self.is_storable();
        }
        self.is_optional() && (other == Type::Nil || other == self.base())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "Int",
            Type::Double => "Double",
            Type::String => "String",
            Type::OptionalInt => "Int?",
            Type::OptionalDouble => "Double?",
            Type::OptionalString => "String?",
            Type::Bool => "Bool",
            Type::Nil => "nil",
            Type::Void => "Void",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_accepts_base_and_nil() {
        assert!(Type::OptionalInt.accepts(Type::Int));
        assert!(Type::OptionalInt.accepts(Type::Nil));
        assert!(Type::OptionalInt.accepts(Type::OptionalInt));
        assert!(!Type::OptionalInt.accepts(Type::Double));
        assert!(!Type::Int.accepts(Type::OptionalInt));
        assert!(!Type::Int.accepts(Type::Nil));
    }

    #[test]
    fn test_internal_types_are_not_storable() {
        assert!(!Type::Bool.accepts(Type::Bool));
        assert!(!Type::Void.accepts(Type::Void));
        assert!(!Type::Nil.is_storable());
    }

    #[test]
    fn test_base_and_optional() {
        assert_eq!(Type::OptionalString.base(), Type::String);
        assert_eq!(Type::Double.optional(), Type::OptionalDouble);
        assert_eq!(Type::Nil.base(), Type::Nil);
    }
}
