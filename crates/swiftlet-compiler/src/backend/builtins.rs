//! # 組み込み関数の実装
//!
//! 組み込み関数の IFJcode23 による本体です。プログラム中で呼び出された関数だけが
//! メインプログラムの後ろに1回ずつ出力されます。
//!
//! 呼び出し規約はユーザー定義関数と同じで、引数は左から順にデータスタックに積まれ、
//! 呼び出された側が逆順に取り出します。戻り値はデータスタックに残します。
//! `write` は呼び出し箇所で展開されるため本体を持ちません。

/// 組み込み関数のラベル
pub fn label(name: &str) -> String {
    format!("${}", name)
}

/// 組み込み関数の本体を取得
pub fn body(name: &str) -> Option<&'static str> {
    let body = match name {
        "readString" => READ_STRING,
        "readInt" => READ_INT,
        "readDouble" => READ_DOUBLE,
        "Int2Double" => INT2DOUBLE,
        "Double2Int" => DOUBLE2INT,
        "length" => LENGTH,
        "substring" => SUBSTRING,
        "ord" => ORD,
        "chr" => CHR,
        _ => return None,
    };
    Some(body)
}

const READ_STRING: &str = "\
LABEL $readString
CREATEFRAME
PUSHFRAME
DEFVAR LF@result
READ LF@result string
PUSHS LF@result
POPFRAME
RETURN
";

const READ_INT: &str = "\
LABEL $readInt
CREATEFRAME
PUSHFRAME
DEFVAR LF@result
READ LF@result int
PUSHS LF@result
POPFRAME
RETURN
";

const READ_DOUBLE: &str = "\
LABEL $readDouble
CREATEFRAME
PUSHFRAME
DEFVAR LF@result
READ LF@result float
PUSHS LF@result
POPFRAME
RETURN
";

const INT2DOUBLE: &str = "\
LABEL $Int2Double
INT2FLOATS
RETURN
";

const DOUBLE2INT: &str = "\
LABEL $Double2Int
FLOAT2INTS
RETURN
";

const LENGTH: &str = "\
LABEL $length
CREATEFRAME
PUSHFRAME
DEFVAR LF@s
POPS LF@s
DEFVAR LF@len
STRLEN LF@len LF@s
PUSHS LF@len
POPFRAME
RETURN
";

// 範囲外なら nil を返す
const SUBSTRING: &str = "\
LABEL $substring
CREATEFRAME
PUSHFRAME
DEFVAR LF@j
POPS LF@j
DEFVAR LF@i
POPS LF@i
DEFVAR LF@s
POPS LF@s
DEFVAR LF@len
STRLEN LF@len LF@s
DEFVAR LF@cond
LT LF@cond LF@i int@0
JUMPIFEQ $substring$nil LF@cond bool@true
LT LF@cond LF@j int@0
JUMPIFEQ $substring$nil LF@cond bool@true
GT LF@cond LF@i LF@j
JUMPIFEQ $substring$nil LF@cond bool@true
LT LF@cond LF@i LF@len
JUMPIFEQ $substring$nil LF@cond bool@false
GT LF@cond LF@j LF@len
JUMPIFEQ $substring$nil LF@cond bool@true
DEFVAR LF@result
MOVE LF@result string@
DEFVAR LF@char
LABEL $substring$loop
JUMPIFEQ $substring$done LF@i LF@j
GETCHAR LF@char LF@s LF@i
CONCAT LF@result LF@result LF@char
ADD LF@i LF@i int@1
JUMP $substring$loop
LABEL $substring$done
PUSHS LF@result
POPFRAME
RETURN
LABEL $substring$nil
PUSHS nil@nil
POPFRAME
RETURN
";

const ORD: &str = "\
LABEL $ord
CREATEFRAME
PUSHFRAME
DEFVAR LF@s
POPS LF@s
DEFVAR LF@len
STRLEN LF@len LF@s
JUMPIFNEQ $ord$nonempty LF@len int@0
PUSHS int@0
POPFRAME
RETURN
LABEL $ord$nonempty
DEFVAR LF@code
STRI2INT LF@code LF@s int@0
PUSHS LF@code
POPFRAME
RETURN
";

const CHR: &str = "\
LABEL $chr
INT2CHARS
RETURN
";
