use swiftlet_compiler::backend::InstrKind;
use swiftlet_compiler::frontend::semantic::{ScopeId, ScopeKind};
use swiftlet_compiler::{compile, compile_program, CompilerConfig, Lexer, Program};

fn parse(source: &str) -> Program {
    compile_program(Lexer::new(source), &CompilerConfig::default()).unwrap()
}

fn exit_code(source: &str) -> i32 {
    compile(source, &CompilerConfig::default()).unwrap_err().exit_code()
}

fn lines(source: &str) -> Vec<String> {
    compile(source, &CompilerConfig::default())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_scope_tree_shape() {
    let program = parse(
        "func f(_ a: Int) {\n    if a < 1 {\n        write(a)\n    } else {\n        write(0)\n    }\n}\nwhile 1 < 2 {\n}",
    );
    let scopes = &program.scopes;

    let header = scopes.find_function("f").unwrap();
    assert_eq!(scopes.get(header).kind, ScopeKind::FunctionHeader);
    assert_eq!(scopes.get(header).parameter_count, 1);

    let body = scopes.get(header).children[0];
    assert_eq!(scopes.get(body).kind, ScopeKind::FunctionBody);

    let names: Vec<&str> = scopes.get(body).children.iter().map(|&id| scopes.get(id).name.as_str()).collect();
    assert_eq!(names, vec!["f$if1", "f$if1$else"]);

    let if_scope = scopes.get(body).children[0];
    assert_eq!(scopes.get(if_scope).else_branch, Some(scopes.get(body).children[1]));

    let last = *scopes.get(ScopeId::ROOT).children.last().unwrap();
    assert_eq!(scopes.get(last).name, "$main$while1");
}

#[test]
fn test_resolves_nearest_declaration() {
    let code = lines("let x = 1\nif x == 1 {\n    let x = \"inner\"\n    write(x)\n}\nwrite(x)");
    let writes: Vec<&String> = code.iter().filter(|line| line.starts_with("PUSHS GF@x$")).collect();
    assert_eq!(writes.len(), 3);
    // 比較と外側の write は同じ変数、内側の write は別の変数
    assert_eq!(writes[0], "PUSHS GF@x$0");
    assert_ne!(writes[1], "PUSHS GF@x$0");
    assert_eq!(writes[2], "PUSHS GF@x$0");
}

#[test]
fn test_undeclared_variable() {
    assert_eq!(exit_code("let a = b + 1"), 5);
    assert_eq!(exit_code("if 1 < 2 {\n    let t = 1\n}\nwrite(t)"), 5);
    assert_eq!(exit_code("var u: Int\nlet v = u"), 5);
    assert_eq!(exit_code("y = 1"), 5);
}

#[test]
fn test_forward_reference() {
    let code = lines("let r: Int = add(1, 2)\nwrite(r)\nfunc add(_ a: Int, _ b: Int) -> Int {\n    return a + b\n}");
    let call = code.iter().position(|line| line == "CALL add").unwrap();
    assert!(code.iter().position(|line| line == "LABEL add").unwrap() > call);
    assert!(code[call + 1].starts_with("POPS GF@r$"));
}

#[test]
fn test_forward_call_is_checked_after_whole_file() {
    let source = "let r: Int = add(1, \"x\")\nfunc add(_ a: Int, _ b: Int) -> Int {\n    return a + b\n}";
    assert_eq!(exit_code(source), 4);

    // 呼び出しの検証より後ろの字句エラーが先に報告される
    assert_eq!(exit_code(&format!("{}\nlet z = 1 @ 2", source)), 1);
}

#[test]
fn test_forward_inference_is_rejected() {
    assert_eq!(exit_code("let r = f()\nfunc f() -> Int {\n    return 1\n}"), 8);
    assert_eq!(exit_code("func g() {\n}\nlet v = g()"), 8);
}

#[test]
fn test_void_scaffold_is_removed() {
    let code = lines("greet()\nfunc greet() {\n    write(\"hi\")\n}");
    let call = code.iter().position(|line| line == "CALL greet").unwrap();
    assert_ne!(code[call + 1], "POPS GF@$tmp1");

    let program = parse("greet()\nfunc greet() {\n}");
    let kinds: Vec<InstrKind> = program.stream.iter().map(|(_, instr)| instr.kind).collect();
    assert!(!kinds.contains(&InstrKind::DiscardResult));
}

#[test]
fn test_non_void_result_is_discarded() {
    let code = lines("answer()\nfunc answer() -> Int {\n    return 42\n}");
    let call = code.iter().position(|line| line == "CALL answer").unwrap();
    assert_eq!(code[call + 1], "POPS GF@$tmp1");
}

#[test]
fn test_hoisting_above_outermost_loop() {
    let source = "var i = 0\nwhile i < 3 {\n    var j = 0\n    while j < 2 {\n        if j == 1 {\n            let x = i * j\n            write(x)\n        }\n        j = j + 1\n    }\n    i = i + 1\n}";
    let code = lines(source);

    let defs: Vec<usize> = code
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("DEFVAR GF@x$"))
        .map(|(index, _)| index)
        .collect();
    assert_eq!(defs.len(), 1);
    assert_eq!(code[defs[0] + 1], "LABEL $main$while1$start");

    // j も外側のループの前で一度だけ宣言される
    let j_defs = code.iter().filter(|line| line.starts_with("DEFVAR GF@j$")).count();
    assert_eq!(j_defs, 1);
    let label = code.iter().position(|line| line == "LABEL $main$while1$start").unwrap();
    assert!(code[..label].iter().any(|line| line.starts_with("DEFVAR GF@j$")));
}

#[test]
fn test_hoisting_inside_function() {
    let code = lines("func f() {\n    while 1 < 2 {\n        let y = 1\n        write(y)\n    }\n}");
    let label = code.iter().position(|line| line == "LABEL f$while1$start").unwrap();
    assert!(code[label - 1].starts_with("DEFVAR LF@y$"));
}

#[test]
fn test_statements_need_line_breaks() {
    assert_eq!(exit_code("let a = 1 let b = 2"), 2);
    assert_eq!(exit_code("write(1) write(2)"), 2);
}

#[test]
fn test_syntax_errors() {
    assert_eq!(exit_code("let = 1"), 2);
    assert_eq!(exit_code("if 1 < 2 {\n"), 2);
    assert_eq!(exit_code("func f( {\n}"), 2);
    assert_eq!(exit_code("let a = (1 + 2"), 2);
    assert_eq!(exit_code("x"), 2);
    assert_eq!(exit_code("if 1 < 2 {\n    func g() {\n    }\n}"), 2);
}

#[test]
fn test_redefinitions() {
    assert_eq!(exit_code("let x = 1\nlet x = 2"), 3);
    assert_eq!(exit_code("func f() {\n}\nfunc f() {\n}"), 3);
    assert_eq!(exit_code("func readInt() -> Int {\n    return 1\n}"), 3);
    assert_eq!(exit_code("func f(_ a: Int, _ a: Int) {\n}"), 3);
}

#[test]
fn test_let_is_assigned_once() {
    assert_eq!(exit_code("let a = 1\na = 2"), 9);
    assert!(compile("let a: Int\na = 2\nwrite(a)", &CompilerConfig::default()).is_ok());
    assert_eq!(exit_code("func f(_ p: Int) {\n    p = 1\n}"), 9);
}

#[test]
fn test_uninitialized_let_takes_one_assignment() {
    assert!(compile("let a: Int\na = 2", &CompilerConfig::default()).is_ok());
    assert_eq!(exit_code("let a: Int\na = 2\na = 3"), 9);
    assert_eq!(exit_code("let a: Int\nwrite(a)"), 5);

    let code = lines("let x: Int?\nx = 3");
    assert!(code.iter().any(|line| line == "DEFVAR GF@x$0"));
    assert!(code.iter().any(|line| line == "POPS GF@x$0"));
    assert!(!code.iter().any(|line| line == "PUSHS nil@nil"));
    assert_eq!(exit_code("let x: Int?\nx = 3\nx = 4"), 9);
    assert_eq!(exit_code("let x: Int?\nwrite(x)"), 5);
}

#[test]
fn test_uninitialized_optional_var_is_nil() {
    let code = lines("var y: Int?\nwrite(y)\ny = 1\ny = 2");
    let nil = code.iter().position(|line| line == "PUSHS nil@nil").unwrap();
    assert_eq!(code[nil + 1], "POPS GF@y$0");
}

#[test]
fn test_parameter_names_must_differ() {
    assert_eq!(exit_code("func f(a a: Int) {\n}"), 9);
    assert!(compile("func f(_ _: Int) {\n}\nf(1)", &CompilerConfig::default()).is_ok());
}
