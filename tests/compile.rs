//! End-to-end scenarios: whole programs in, assembly and diagnostics
//! out.

use simplec::compiler::compile;
use simplec::diagnostic::{SemanticError, SyntaxError};

fn assemble(source: &str) -> String {
    let output = compile(source).expect("unexpected syntax error");
    assert!(
        output.is_clean(),
        "unexpected diagnostics: {:?}",
        output.diagnostics
    );
    output.assembly
}

fn diagnostics(source: &str) -> Vec<SemanticError> {
    compile(source).expect("unexpected syntax error").diagnostics
}

#[test]
fn empty_main() {
    let asm = assemble("int main(void) { return 0; }");
    assert!(asm.contains("main:"));
    assert!(asm.contains("\t.set\tmain.size, 0"));
    assert!(!asm.contains(".data"));
}

#[test]
fn recursive_factorial() {
    let asm = assemble(
        "int fact(int n) {\n\
             if (n < 2)\n\
                 return 1;\n\
             return n * fact(n - 1);\n\
         }\n\
         int main(void) { return fact(5); }",
    );

    assert!(asm.contains("fact:"));
    assert!(asm.contains("\tcall\tfact"));
    assert!(asm.contains("\timull\t"));
    // Both functions end in their own epilogues.
    assert!(asm.contains(".Lret_0:"));
    assert!(asm.contains(".Lret_1:"));
}

#[test]
fn pointer_walk_over_an_array() {
    let asm = assemble(
        "int sum(int *a, int n) {\n\
             int total;\n\
             int i;\n\
             total = 0;\n\
             i = 0;\n\
             while (i < n) {\n\
                 total = total + a[i];\n\
                 i = i + 1;\n\
             }\n\
             return total;\n\
         }\n\
         int data[8];\n\
         int main(void) { return sum(data, 8); }",
    );

    // a[i] scales by four and loads through the sum.
    assert!(asm.contains("\timull\t$4, %eax"));
    assert!(asm.contains("\tmovl\t(%eax), %eax"));
    // Passing the array decays to pushing its address.
    assert!(asm.contains("\tleal\tdata, %eax"));
    assert!(asm.contains("\t.comm\tdata, 32, 4"));
}

#[test]
fn mixed_arithmetic_promotes_to_double() {
    let asm = assemble(
        "double average(double total, int count) {\n\
             return total / count;\n\
         }",
    );

    // The int operand is converted on the x87 stack, then the divide
    // is floating point.
    assert!(asm.contains("\tfildl\t"));
    assert!(asm.contains("\tfdivl\t"));
    assert!(!asm.contains("\tidivl"));
}

#[test]
fn globals_come_after_all_functions() {
    let asm = assemble("int a; int main(void) { return a; }");

    let data = asm.find("\t.data").expect("data section present");
    let ret = asm.find("\tret").expect("epilogue present");
    assert!(ret < data, "functions first, then one data section");
    assert!(asm.contains("\t.comm\ta, 4, 4"));
}

#[test]
fn double_entry_points_through_the_fpu() {
    let asm = assemble(
        "double scale;\n\
         double apply(double x) { return x * scale; }\n\
         int main(void) { scale = 2.0; return (int)apply(3.0); }",
    );

    assert!(asm.contains("\tfmull\t"));
    assert!(asm.contains("\tfistpl\t"));
    assert!(asm.contains("\t.comm\tscale, 8, 4"));
    assert!(asm.contains(".fp0:\t.double\t2.0"));
}

#[test]
fn string_argument_reaches_the_data_section() {
    let asm = assemble(
        "int puts();\n\
         int main(void) { puts(\"hello\"); return 0; }",
    );

    assert!(asm.contains("\tpushl\t$.L0"));
    assert!(asm.contains(".L0:\t.asciz\t\"hello\""));
}

#[test]
fn every_semantic_error_format() {
    let cases: &[(&str, SemanticError)] = &[
        (
            "int f(void) { return f; }",
            SemanticError::InvalidReturn,
        ),
        (
            "int f(void) { int a[2]; while (f) return 0; return 1; }",
            SemanticError::InvalidTest,
        ),
        (
            "int f(void) { 1 = 2; return 0; }",
            SemanticError::InvalidLvalue,
        ),
        (
            "int f(void) { int *p; p = p + p; return 0; }",
            SemanticError::InvalidOperands("+"),
        ),
        (
            "int f(void) { int a[2]; return -a; }",
            SemanticError::InvalidOperand("-"),
        ),
        (
            "int f(void) { double d; d = 0.0; return (int *)d != (int *)0; }",
            SemanticError::InvalidCast,
        ),
        (
            "int f(void) { int x; return x(); }",
            SemanticError::InvalidFunction,
        ),
        (
            "int g(int x) { return x; } int f(void) { return g(); }",
            SemanticError::InvalidArguments,
        ),
        (
            "int f(); double f(); int main(void) { return 0; }",
            SemanticError::RedeclaredFunction("f".into()),
        ),
        (
            "int f(void) { int x; double x; return 0; }",
            SemanticError::RedeclaredVariable("x".into()),
        ),
        (
            "int f(int x, double x) { return 0; }",
            SemanticError::RedeclaredParameter("x".into()),
        ),
        (
            "int f(void) { return nope; }",
            SemanticError::UndeclaredIdentifier("nope".into()),
        ),
    ];

    for (source, expected) in cases {
        let found = diagnostics(source);
        assert_eq!(
            found.as_slice(),
            std::slice::from_ref(expected),
            "for source: {source}"
        );
    }
}

#[test]
fn error_type_suppresses_cascades() {
    // One undeclared name inside a larger expression: one diagnostic.
    let found = diagnostics("int f(void) { return (missing + 1) * 2 - missing; }");
    assert_eq!(
        found,
        vec![SemanticError::UndeclaredIdentifier("missing".into())]
    );
}

#[test]
fn syntax_error_is_fatal_and_typed() {
    assert_eq!(
        compile("int main(void) { return 0; ").err(),
        Some(SyntaxError::AtEndOfFile)
    );
    assert_eq!(
        compile("int main(void) { int x; x += 1; return x; }").err(),
        Some(SyntaxError::AtToken("=".into()))
    );
}

#[test]
fn shadowing_resolves_to_the_nearest_scope() {
    let asm = assemble(
        "int x;\n\
         int main(void) {\n\
             int x;\n\
             x = 1;\n\
             {\n\
                 double x;\n\
                 x = 2.0;\n\
             }\n\
             return x;\n\
         }",
    );

    // The inner assignment is the only double store; the outer x stays
    // an int in its own slot.
    assert!(asm.contains("\tfstl\t"));
    assert!(asm.contains("\tmovl\t%eax, -4(%ebp)"));
}

#[test]
fn chained_assignment_is_right_associative() {
    let asm = assemble("int main(void) { int a; int b; a = b = 5; return a; }");

    // b receives 5 first, then a receives the assignment's value.
    let store_b = asm.find("\tmovl\t%eax, -8(%ebp)").expect("store to b");
    let store_a = asm.find("\tmovl\t%eax, -4(%ebp)").expect("store to a");
    assert!(store_b < store_a);
}

#[test]
fn not_on_double_produces_int() {
    let asm = assemble("int main(void) { return !(double)0.0; }");

    assert!(asm.contains("\tftst"));
    assert!(asm.contains("\tfnstsw\t%ax"));
    assert!(asm.contains("\tsete\t%al"));
    assert!(asm.contains("\tmovzbl\t%al, %eax"));
}
