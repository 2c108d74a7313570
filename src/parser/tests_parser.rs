//! Parser tests: grammar acceptance and fatal syntax errors.

use crate::compiler::{compile, Compiler};
use crate::diagnostic::SyntaxError;
use crate::parser::Parser;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse(source: &str) -> Result<(), SyntaxError> {
    let mut compiler = Compiler::new();
    Parser::new(source, &mut compiler).parse()
}

#[test]
fn accepts_the_statement_forms() {
    init();
    assert!(parse(
        "int main(void) {\n\
             int i;\n\
             i = 0;\n\
             while (i < 10)\n\
                 if (i % 2)\n\
                     i = i + 1;\n\
                 else {\n\
                     int j;\n\
                     j = i;\n\
                     i = j + 2;\n\
                 }\n\
             return i;\n\
         }"
    )
    .is_ok());
}

#[test]
fn accepts_declarator_lists_and_prototypes() {
    init();
    assert!(parse("int a, *b, c[4], f(), *g();").is_ok());
    assert!(parse("double *x; int y[10]; int h();").is_ok());
}

#[test]
fn accepts_parenthesized_expressions_and_casts() {
    init();
    // `(x)` is an expression, `(int)` begins a cast; one token of
    // peek-ahead decides.
    assert!(parse("int main(void) { int x; x = (x); x = (int)3.5; return (x); }").is_ok());
    assert!(parse("double f(void) { return (double)(1 + 2); }").is_ok());
}

#[test]
fn accepts_sizeof_forms() {
    init();
    assert!(parse("int main(void) { int a[3]; return sizeof a + sizeof(double *) + sizeof a[0]; }").is_ok());
}

#[test]
fn rejects_missing_semicolon() {
    init();
    assert_eq!(
        parse("int main(void) { return 0 }"),
        Err(SyntaxError::AtToken("}".into()))
    );
}

#[test]
fn rejects_stray_characters() {
    init();
    assert_eq!(parse("int main(void) { @ }"), Err(SyntaxError::AtToken("@".into())));
}

#[test]
fn rejects_truncated_input() {
    init();
    assert_eq!(parse("int main(void) {"), Err(SyntaxError::AtEndOfFile));
    assert_eq!(parse("int"), Err(SyntaxError::AtEndOfFile));
}

#[test]
fn rejects_bad_declarators() {
    init();
    assert_eq!(
        parse("int a["),
        Err(SyntaxError::AtEndOfFile)
    );
    assert_eq!(
        parse("int 5;"),
        Err(SyntaxError::AtToken("5".into()))
    );
}

#[test]
fn rejects_string_outside_argument_position() {
    init();
    assert_eq!(
        parse("int main(void) { return \"hi\"; }"),
        Err(SyntaxError::AtToken("\"hi\"".into()))
    );
}

#[test]
fn semantic_errors_do_not_stop_the_parse() {
    init();
    let output = compile("int f(void) { return ghost; } int g(void) { return 0; }")
        .expect("parse should succeed");
    assert_eq!(output.diagnostics.len(), 1);
}
