//! Emission tests over the whole pipeline: source in, assembly out.

use crate::compiler::compile;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assemble(source: &str) -> String {
    let output = compile(source).expect("unexpected syntax error");
    assert!(
        output.is_clean(),
        "unexpected diagnostics: {:?}",
        output.diagnostics
    );
    output.assembly
}

#[test]
fn minimal_function() {
    init();
    let asm = assemble("int main(void) { return 0; }");

    assert!(asm.contains("main:"));
    assert!(asm.contains("\tpushl\t%ebp"));
    assert!(asm.contains("\tmovl\t%esp, %ebp"));
    assert!(asm.contains("\tsubl\t$main.size, %esp"));
    assert!(asm.contains("\tmovl\t$0, %eax"));
    assert!(asm.contains("\tjmp\t.Lret_0"));
    assert!(asm.contains(".Lret_0:"));
    assert!(asm.contains("\tmovl\t%ebp, %esp"));
    assert!(asm.contains("\tpopl\t%ebp"));
    assert!(asm.contains("\t.global\tmain"));
    // No locals, no temporaries.
    assert!(asm.contains("\t.set\tmain.size, 0"));
    // Nothing to put in a data section.
    assert!(!asm.contains(".data"));
}

#[test]
fn globals_and_parameter_offsets() {
    init();
    let asm = assemble("int a; double b; int f(int x, double y) { return x; }");

    assert!(asm.contains("\t.data"));
    assert!(asm.contains("\t.comm\ta, 4, 4"));
    assert!(asm.contains("\t.comm\tb, 8, 4"));
    // First parameter at 8(%ebp), the double after it at 12(%ebp).
    assert!(asm.contains("\tmovl\t8(%ebp), %eax"));
}

#[test]
fn array_assignment_goes_through_a_pointer() {
    init();
    let asm = assemble("int a[10]; int main(void) { a[3] = 7; return a[3]; }");

    // The index is scaled by the element size...
    assert!(asm.contains("\tmovl\t$3, %eax"));
    assert!(asm.contains("\timull\t$4, %eax"));
    // ...the array decays via leal...
    assert!(asm.contains("\tleal\ta, %eax"));
    // ...and the store goes through the computed address.
    assert!(asm.contains("\tmovl\t%eax, (%ecx)"));
    // The load back is indirect too.
    assert!(asm.contains("\tmovl\t(%eax), %eax"));
    assert!(asm.contains("\t.comm\ta, 40, 4"));
}

#[test]
fn int_literal_promoted_into_float_table() {
    init();
    let asm = assemble("double f(void) { return 1 + 2.0; }");

    // The rewritten literal and the real one both land in the table.
    assert!(asm.contains(".fp0:\t.double\t1"));
    assert!(asm.contains(".fp1:\t.double\t2.0"));
    // The add is x87 end to end; no fildl cast sequence.
    assert!(asm.contains("\tfldl\t.fp0"));
    assert!(asm.contains("\tfaddl\t.fp1"));
    assert!(asm.contains("\tfstpl\t"));
    assert!(!asm.contains("fildl"));
}

#[test]
fn address_of_and_store_through_pointer() {
    init();
    let asm = assemble("int main(void) { int *p; int x; p = &x; *p = 5; return *p; }");

    // &x is a leal of the local's slot.
    assert!(asm.contains("\tleal\t-8(%ebp), %eax"));
    // *p = 5 stores through %ecx.
    assert!(asm.contains("\tmovl\t$5, %eax"));
    assert!(asm.contains("\tmovl\t%eax, (%ecx)"));
}

#[test]
fn if_else_with_comparison() {
    init();
    let asm = assemble("int main(void) { if (1 < 2) return 1; else return 0; }");

    assert!(asm.contains("\tcmpl\t$2, %eax"));
    assert!(asm.contains("\tsetl\t%al"));
    assert!(asm.contains("\tmovzbl\t%al, %eax"));
    assert!(asm.contains("\ttestl\t%eax, %eax"));
    assert!(asm.contains("\tje\t.L0"));
    assert!(asm.contains("\tjmp\t.L1"));
    assert!(asm.contains(".L0:"));
    assert!(asm.contains(".L1:"));
    // Both branches return through the single epilogue.
    assert_eq!(asm.matches("\tjmp\t.Lret_0").count(), 2);
}

#[test]
fn while_loop_shape() {
    init();
    let asm = assemble(
        "int main(void) { int i; i = 0; while (i < 10) i = i + 1; return i; }",
    );

    assert!(asm.contains(".L0:"));
    assert!(asm.contains("\tje\t.L1"));
    assert!(asm.contains("\tjmp\t.L0"));
    assert!(asm.contains(".L1:"));
}

#[test]
fn integer_comparisons_use_signed_conditions() {
    init();
    let asm = assemble(
        "int main(void) { int x; x = 1; return (x < 1) + (x > 1) + (x <= 1) + (x >= 1) + (x == 1) + (x != 1); }",
    );

    for cc in ["setl", "setg", "setle", "setge", "sete", "setne"] {
        assert!(asm.contains(&format!("\t{cc}\t%al")), "missing {cc}");
    }
}

#[test]
fn double_comparisons_use_x87_conditions() {
    init();
    let asm = assemble(
        "int main(void) { double x; x = 1.0; return (x < 1.0) + (x > 1.0) + (x <= 1.0) + (x >= 1.0); }",
    );

    assert!(asm.contains("\tfcompl\t"));
    assert!(asm.contains("\tfnstsw\t%ax"));
    assert!(asm.contains("\tsahf"));
    for cc in ["setb", "seta", "setbe", "setae"] {
        assert!(asm.contains(&format!("\t{cc}\t%al")), "missing {cc}");
    }
}

#[test]
fn logical_operators_short_circuit() {
    init();
    let asm = assemble("int main(void) { int x; x = 1; return x && 0 || x; }");

    // && skips on false, || skips on true, both join on setne.
    assert!(asm.contains("\tje\t.L"));
    assert!(asm.contains("\tjne\t.L"));
    assert!(asm.matches("\tsetne\t%al").count() >= 2);
}

#[test]
fn calls_push_right_to_left_and_clean_up() {
    init();
    let asm = assemble(
        "int add(int x, int y) { return x + y; }\n\
         int main(void) { return add(1, 2); }",
    );

    let first = asm.find("\tpushl\t$2").expect("second argument pushed");
    let second = asm.find("\tpushl\t$1").expect("first argument pushed");
    assert!(first < second, "arguments must be pushed right to left");
    assert!(asm.contains("\tcall\tadd"));
    assert!(asm.contains("\taddl\t$8, %esp"));
    assert!(asm.contains("\tmovl\t%eax, "));
}

#[test]
fn double_arguments_take_eight_bytes() {
    init();
    let asm = assemble(
        "double half(double d) { return d / 2.0; }\n\
         int main(void) { half(3.0); return 0; }",
    );

    assert!(asm.contains("\tsubl\t$8, %esp"));
    assert!(asm.contains("\tfstpl\t(%esp)"));
    assert!(asm.contains("\taddl\t$8, %esp"));
    // The double return value is stored from the x87 stack.
    assert!(asm.contains("\tfstpl\t"));
    assert!(asm.contains("\tfdivl\t"));
}

#[test]
fn string_literals_intern_and_decay_to_label_constants() {
    init();
    let asm = assemble(
        "int printf();\n\
         int main(void) { printf(\"hi\"); printf(\"hi\"); printf(\"there\"); return 0; }",
    );

    // The same spelling shares one label.
    assert_eq!(asm.matches("\tpushl\t$.L0").count(), 2);
    assert!(asm.contains("\tpushl\t$.L1"));
    assert_eq!(asm.matches(".asciz").count(), 2);
    assert!(asm.contains(".L0:\t.asciz\t\"hi\""));
    assert!(asm.contains(".L1:\t.asciz\t\"there\""));
}

#[test]
fn float_literals_intern_by_spelling() {
    init();
    let asm = assemble("double f(void) { return 2.5 + 2.5; }");

    assert_eq!(asm.matches(".double").count(), 1);
    assert!(asm.contains(".fp0:\t.double\t2.5"));
}

#[test]
fn frame_size_covers_locals_and_temporaries() {
    init();
    let asm = assemble("int main(void) { int x; x = 1 + 2 * 3; return x; }");

    // x at -4; the statement needs temps for *, + and = below it.
    assert!(asm.contains("\t.set\tmain.size, 16"));
}

#[test]
fn temporaries_reset_between_statements() {
    init();
    let asm = assemble("int main(void) { int x; x = 1 + 2; x = 3 + 4; return x; }");

    // Both statements reuse the same temp slots, so the frame is no
    // deeper than one statement's worth.
    assert!(asm.contains("\t.set\tmain.size, 12"));
    assert_eq!(asm.matches("\tmovl\t%eax, -12(%ebp)").count(), 2);
}

#[test]
fn casts_move_between_integer_and_x87() {
    init();
    let asm = assemble("int main(void) { int x; x = (int)1.5; return (int)(double)x; }");

    assert!(asm.contains("\tfldl\t"));
    assert!(asm.contains("\tfistpl\t"));
    assert!(asm.contains("\tfildl\t"));
}

#[test]
fn unary_operators() {
    init();
    let asm = assemble("int main(void) { int x; x = 5; return -x + !x; }");

    assert!(asm.contains("\tnegl\t%eax"));
    assert!(asm.contains("\tsete\t%al"));
    assert!(asm.contains("\ttestl\t%eax, %eax"));
}

#[test]
fn negating_a_double_uses_fchs() {
    init();
    let asm = assemble("double f(double d) { return -d; }");

    assert!(asm.contains("\tfchs"));
    assert!(asm.contains("\tfldl\t8(%ebp)"));
}

#[test]
fn remainder_takes_the_remainder_register() {
    init();
    let asm = assemble("int main(void) { return 7 % 3; }");

    assert!(asm.contains("\tcltd"));
    assert!(asm.contains("\tidivl\t%ecx"));
    assert!(asm.contains("\tmovl\t%edx, "));
}

#[test]
fn pointer_difference_divides() {
    init();
    let asm = assemble("int main(void) { int *p; int *q; p = q; return p - q; }");

    assert!(asm.contains("\tsubl\t"));
    // The divide by the element size runs right after the subtract.
    assert!(asm.contains("\tmovl\t$4, %ecx"));
    assert!(asm.contains("\tidivl\t%ecx"));
}

#[test]
fn errors_suppress_later_functions_and_data() {
    init();
    let output = compile(
        "int a;\n\
         int good(void) { return 1; }\n\
         int bad(void) { return ghost; }\n\
         int late(void) { return 2; }",
    )
    .expect("parses fine");

    assert!(!output.is_clean());
    // The function compiled before the error is still in the output.
    assert!(output.assembly.contains("good:"));
    // Everything at or after the error is suppressed.
    assert!(!output.assembly.contains("bad:"));
    assert!(!output.assembly.contains("late:"));
    assert!(!output.assembly.contains(".data"));
    assert!(!output.assembly.contains(".comm"));
}

#[test]
fn sizeof_folds_to_constants() {
    init();
    let asm = assemble(
        "int a[10];\n\
         int main(void) { return sizeof a + sizeof(int) + sizeof(double) + sizeof(int *); }",
    );

    // The array keeps its full size: no decay under sizeof.
    assert!(asm.contains("\tmovl\t$40, %eax"));
    assert!(asm.contains("\taddl\t$4, %eax"));
    assert!(asm.contains("\taddl\t$8, %eax"));
}

#[test]
fn global_scalars_use_their_names_as_operands() {
    init();
    let asm = assemble("int g; int main(void) { g = 3; return g; }");

    assert!(asm.contains("\tmovl\t%eax, g"));
    assert!(asm.contains("\tmovl\tg, %eax"));
    assert!(asm.contains("\t.comm\tg, 4, 4"));
}

#[test]
fn return_label_counts_up_per_function() {
    init();
    let asm = assemble(
        "int f(void) { return 1; }\n\
         int g(void) { return 2; }",
    );

    assert!(asm.contains(".Lret_0:"));
    assert!(asm.contains(".Lret_1:"));
}
