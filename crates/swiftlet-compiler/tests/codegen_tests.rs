use swiftlet_compiler::{compile, compile_to_writer, CompilerConfig, Lexer};

fn generate(source: &str) -> String {
    compile(source, &CompilerConfig::default()).unwrap()
}

fn lines(code: &str) -> Vec<&str> {
    code.lines().collect()
}

/// `expected` が連続した行として現れることを確認する
fn assert_block(code: &str, expected: &[&str]) {
    let actual = lines(code);
    let found = actual.windows(expected.len()).any(|window| window == expected);
    assert!(found, "{:?} が見つかりません:\n{}", expected, code);
}

#[test]
fn test_add_program_end_to_end() {
    let source = "func add(_ a: Int, _ b: Int) -> Int {\n    return a + b\n}\nlet r = add(1, 2)\nwrite(r)\n";
    let code = generate(source);

    assert_block(&code, &[".IFJcode23", "DEFVAR GF@$tmp1", "DEFVAR GF@$tmp2", "JUMP add$skip", "LABEL add"]);
    assert_block(&code, &["CREATEFRAME", "PUSHFRAME", "DEFVAR LF@b$11", "POPS LF@b$11", "DEFVAR LF@a$11", "POPS LF@a$11"]);
    assert_block(&code, &["PUSHS LF@a$11", "PUSHS LF@b$11", "ADDS", "POPFRAME", "RETURN"]);
    assert_block(&code, &["POPFRAME", "RETURN", "LABEL add$skip", "DEFVAR GF@r$0"]);
    assert_block(
        &code,
        &[
            "PUSHS int@1",
            "PUSHS int@2",
            "CALL add",
            "POPS GF@r$0",
            "PUSHS GF@r$0",
            "POPS GF@$tmp1",
            "WRITE GF@$tmp1",
            "EXIT int@0",
        ],
    );
    assert!(code.ends_with("EXIT int@0\n"));
}

#[test]
fn test_literals() {
    let code = generate("let a = 10\nlet b = 0.5\nlet c = \"x y#\\\\z\"\nlet d: String? = nil");
    assert!(code.contains("PUSHS int@10\n"));
    assert!(code.contains("PUSHS float@0x1p-1\n"));
    assert!(code.contains("PUSHS string@x\\032y\\035\\092z\n"));
    assert!(code.contains("PUSHS nil@nil\n"));
}

#[test]
fn test_optional_without_initializer_is_nil() {
    let code = generate("var x: Int?");
    assert_block(&code, &["DEFVAR GF@x$0", "PUSHS nil@nil", "POPS GF@x$0"]);

    let code = generate("var y: Int\ny = 3");
    assert_block(&code, &["DEFVAR GF@y$0", "PUSHS int@3", "POPS GF@y$0"]);
}

#[test]
fn test_if_else_labels() {
    let code = generate("let a = 1\nif a > 0 {\n    write(1)\n} else {\n    write(2)\n}");
    assert_block(&code, &["GTS", "PUSHS bool@true", "JUMPIFNEQS $main$if1$else"]);
    assert_block(&code, &["JUMP $main$if1$end", "LABEL $main$if1$else"]);
    assert_block(&code, &["WRITE GF@$tmp1", "LABEL $main$if1$end", "EXIT int@0"]);
}

#[test]
fn test_if_without_else_still_has_labels() {
    let code = generate("if 1 <= 2 {\n}");
    assert_block(
        &code,
        &["GTS", "NOTS", "PUSHS bool@true", "JUMPIFNEQS $main$if1$else", "JUMP $main$if1$end", "LABEL $main$if1$else", "LABEL $main$if1$end"],
    );
}

#[test]
fn test_if_let() {
    let code = generate("let a: Int? = 4\nif let a {\n    let b: Int = a + 1\n    write(b)\n}");
    assert_block(&code, &["PUSHS GF@a$0", "PUSHS nil@nil", "JUMPIFEQS $main$if1$else"]);
}

#[test]
fn test_while_labels() {
    let code = generate("var i = 0\nwhile i != 3 {\n    i = i + 1\n}");
    assert_block(
        &code,
        &["LABEL $main$while1$start", "PUSHS GF@i$0", "PUSHS int@3", "EQS", "NOTS", "PUSHS bool@false", "JUMPIFEQS $main$while1$end"],
    );
    assert_block(&code, &["POPS GF@i$0", "JUMP $main$while1$start", "LABEL $main$while1$end"]);
}

#[test]
fn test_string_concatenation() {
    let code = generate("let s = \"a\" + \"b\"");
    assert_block(
        &code,
        &["PUSHS string@a", "PUSHS string@b", "POPS GF@$tmp2", "POPS GF@$tmp1", "CONCAT GF@$tmp1 GF@$tmp1 GF@$tmp2", "PUSHS GF@$tmp1"],
    );
}

#[test]
fn test_unwrap_and_coalesce() {
    let code = generate("let a: Int? = 1\nlet b = a!\nlet c = a ?? 0");
    assert_block(&code, &["POPS GF@$tmp1", "JUMPIFNEQ $unwrap$1 GF@$tmp1 nil@nil", "EXIT int@7", "LABEL $unwrap$1", "PUSHS GF@$tmp1"]);
    assert_block(
        &code,
        &[
            "POPS GF@$tmp2",
            "POPS GF@$tmp1",
            "JUMPIFEQ $coalesce$2 GF@$tmp1 nil@nil",
            "PUSHS GF@$tmp1",
            "JUMP $coalesce$2$end",
            "LABEL $coalesce$2",
            "PUSHS GF@$tmp2",
            "LABEL $coalesce$2$end",
        ],
    );
}

#[test]
fn test_unwrap_exit_code_from_config() {
    let config = CompilerConfig::new().with_unwrap_exit_code(30);
    let code = compile("let a: Int? = nil\nlet b = a!", &config).unwrap();
    assert!(code.contains("EXIT int@30\n"));
}

#[test]
fn test_builtins_are_emitted_once() {
    let code = generate("let s = readString()\nlet t = readString()\nlet n = length(\"abc\")\nwrite(s, t, n)");
    assert_eq!(code.matches("LABEL $readString\n").count(), 1);
    assert_eq!(code.matches("LABEL $length\n").count(), 1);
    assert!(!code.contains("LABEL $ord"));
    assert!(code.contains("CALL $readString\n"));

    let exit = code.find("EXIT int@0").unwrap();
    assert!(code.find("LABEL $readString").unwrap() > exit);
}

#[test]
fn test_write_expands_each_argument() {
    let code = generate("write(1, \"a\", nil)");
    assert_block(
        &code,
        &[
            "PUSHS int@1",
            "POPS GF@$tmp1",
            "WRITE GF@$tmp1",
            "PUSHS string@a",
            "POPS GF@$tmp1",
            "WRITE GF@$tmp1",
            "PUSHS nil@nil",
            "POPS GF@$tmp1",
            "WRITE GF@$tmp1",
        ],
    );
    assert!(!code.contains("CALL"));
}

#[test]
fn test_function_comments() {
    let config = CompilerConfig::new().with_comments(true);
    let code = compile("func f() {\n}", &config).unwrap();
    assert_block(&code, &["# func f", "JUMP f$skip"]);
    assert!(!generate("func f() {\n}").contains('#'));
}

#[test]
fn test_no_output_on_error() {
    let mut out = Vec::new();
    let result = compile_to_writer(Lexer::new("write(1)\nlet x = y"), &CompilerConfig::default(), &mut out);
    assert_eq!(result.unwrap_err().exit_code(), 5);
    assert!(out.is_empty());
}
