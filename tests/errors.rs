use cinder::{parse, run_captured, ErrorKind, Interpreter, PrintHandler, MAX_CALL_DEPTH};
use pretty_assertions::assert_eq;

fn runtime_error(source: &str) -> ErrorKind {
    run_captured(source).unwrap_err().kind
}

fn parse_error(source: &str) -> ErrorKind {
    parse(source).unwrap_err().kind
}

#[test]
fn test_redeclaration_in_same_scope() {
    assert_eq!(
        runtime_error("var x = 1; var x = 2;"),
        ErrorKind::AlreadyDeclared("x".to_string())
    );
    assert_eq!(
        runtime_error("func f() : return 1; end func f() : return 2; end"),
        ErrorKind::AlreadyDeclared("f".to_string())
    );
}

#[test]
fn test_redeclaration_in_loop_body_fails_on_second_iteration() {
    let source = r#"
        for (var i = 0; i < 3; i++) :
            print(i);
            var doubled = i * 2;
        end
    "#;
    let output = PrintHandler::buffer();
    let mut interp = Interpreter::with_output(output.clone());
    let err = interp.run_source(source).unwrap_err();

    assert_eq!(err.kind, ErrorKind::AlreadyDeclared("doubled".to_string()));
    assert_eq!(output.contents(), "0\n1\n");
}

#[test]
fn test_unbound_identifiers() {
    assert_eq!(runtime_error("print(y);"), ErrorKind::NotDeclared("y".to_string()));
    assert_eq!(runtime_error("y = 1;"), ErrorKind::NotDeclared("y".to_string()));
    assert_eq!(runtime_error("missing();"), ErrorKind::NotDeclared("missing".to_string()));
}

#[test]
fn test_arity_mismatch() {
    let source = "func add(a, b) : return a + b; end";
    assert_eq!(
        runtime_error(&format!("{} add(1);", source)),
        ErrorKind::WrongArity { name: "add".to_string(), expected: 2, got: 1 }
    );
    assert_eq!(
        runtime_error(&format!("{} add(1, 2, 3);", source)),
        ErrorKind::WrongArity { name: "add".to_string(), expected: 2, got: 3 }
    );
    assert_eq!(
        runtime_error("var s = string(1, 2);"),
        ErrorKind::WrongArity { name: "string".to_string(), expected: 1, got: 2 }
    );
}

#[test]
fn test_runtime_type_errors() {
    for source in [
        "var x = 1 + Nothing;",
        "var x = Nothing == Nothing;",
        r#"var x = "a" * 2;"#,
        "var x = [1] < [2];",
        "var x = [Nothing] == [Nothing];",
        r#"var x = [1, 2] != [1, "2"];"#,
        r#"var x = -"neg";"#,
        "var n = 1; var x = n[0];",
        r#"var xs = [1]; var x = xs["0"];"#,
    ] {
        assert!(
            matches!(runtime_error(source), ErrorKind::TypeMismatch(_)),
            "{} should be a type mismatch",
            source
        );
    }
}

#[test]
fn test_division_by_zero() {
    assert_eq!(runtime_error("print(1 / 0);"), ErrorKind::DivisionByZero);
    assert_eq!(runtime_error("var z = 0.0; print(5 / z);"), ErrorKind::DivisionByZero);
}

#[test]
fn test_return_at_top_level() {
    assert_eq!(runtime_error("return 1;"), ErrorKind::ReturnOutsideFunction);
    assert_eq!(
        runtime_error("if (true) : return; end"),
        ErrorKind::ReturnOutsideFunction
    );
}

#[test]
fn test_calling_a_non_function() {
    assert_eq!(
        runtime_error("var n = 3; n();"),
        ErrorKind::NotCallable("n".to_string())
    );
}

#[test]
fn test_unbounded_recursion_hits_depth_limit() {
    assert_eq!(
        runtime_error("func forever(n) : return forever(n + 1); end forever(0);"),
        ErrorKind::StackOverflow(MAX_CALL_DEPTH)
    );
}

#[test]
fn test_deep_recursion_below_limit_succeeds() {
    let source = r#"
        func sum(n) :
            if (n == 0) : return 0; end
            return n + sum(n - 1);
        end
        print(sum(100), sum(199));
    "#;
    assert_eq!(run_captured(source).unwrap(), "5050 19900\n");
}

#[test]
fn test_deeply_nested_expressions_evaluate() {
    let depth = 3000;
    let parens = format!("print({}1{});", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(run_captured(&parens).unwrap(), "1\n");

    let negations = format!("print({}1);", "- ".repeat(depth));
    assert_eq!(run_captured(&negations).unwrap(), "1\n");
}

#[test]
fn test_duplicate_parameter_is_a_parse_error() {
    assert_eq!(
        parse_error("func f(a, a) : return a; end"),
        ErrorKind::DuplicateParameter("a".to_string())
    );
}

#[test]
fn test_runtime_error_reports_location() {
    let source = "var xs = [1, 2];\nvar a = 1;\nprint(xs[5]);";
    let err = run_captured(source).unwrap_err().with_source(source);
    assert_eq!(err.span.map(|s| s.line), Some(3));
    let message = err.to_string();
    assert!(message.starts_with("[line 3:"), "{}", message);
    assert!(message.contains("index 5 out of range for array of length 2"), "{}", message);
    assert!(message.contains("print(xs[5]);"), "{}", message);
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse_error("1 + x;"), ErrorKind::UnexpectedToken("1".to_string()));
    assert!(matches!(parse_error("x + 1;"), ErrorKind::ExpectedToken { .. }));
    assert!(matches!(parse_error("var x;"), ErrorKind::ExpectedToken { .. }));
    assert!(matches!(parse_error("var x = 1"), ErrorKind::UnexpectedEof(_)));
    assert!(matches!(parse_error("if (true : end"), ErrorKind::ExpectedToken { .. }));
    assert!(matches!(parse_error("if (true) end"), ErrorKind::ExpectedToken { .. }));
    assert_eq!(parse_error("if (true) : else : end"), ErrorKind::EmptyBody("else"));
    assert_eq!(parse_error("for (var i = 0; i < 3; i++) : end"), ErrorKind::EmptyBody("for"));
    assert_eq!(
        parse_error("for (var i = 0; i < 3; i + 1) : print(i); end"),
        ErrorKind::InvalidIncrement
    );
    assert!(matches!(parse_error("var xs = [1, 2,];"), ErrorKind::ExpectedToken { .. }));
    assert!(matches!(parse_error("while (true) : print(1);"), ErrorKind::UnexpectedEof(_)));
}

#[test]
fn test_lexer_errors_surface_through_parse() {
    assert_eq!(parse_error("var s = \"open;"), ErrorKind::UnterminatedString);
    assert_eq!(parse_error("var x = 1 # 2;"), ErrorKind::UnexpectedCharacter('#'));
}

#[test]
fn test_output_before_error_is_kept() {
    let output = PrintHandler::buffer();
    let mut interp = Interpreter::with_output(output.clone());
    let err = interp.run_source("print(\"before\"); print(1 / 0); print(\"after\");").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(output.contents(), "before\n");
}
