//! Checker tests: implicit conversions, pointer arithmetic scaling,
//! and one diagnostic per faulty subtree.

use symbol_table::GlobalSymbol as Name;

use crate::ast::{BinaryOp, ExprKind, Expression};
use crate::diagnostic::{DiagnosticEngine, SemanticError};
use crate::semantic::checker::Checker;
use crate::semantic::symbol_table::SymbolTable;
use crate::semantic::types::{Specifier, Type};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn int_lit(text: &str) -> Expression {
    Expression::integer(Name::new(text))
}

fn real_lit(text: &str) -> Expression {
    Expression::real(Name::new(text))
}

/// Declare a variable and build an identifier expression for it.
fn variable(checker: &mut Checker, name: &str, ty: Type) -> Expression {
    let id = checker.declare_variable(Name::new(name), ty.clone());
    Expression::identifier(id, ty)
}

#[test]
fn integer_literal_meeting_double_is_rewritten() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let sum = checker.check_add(int_lit("1"), real_lit("2.0"));
    assert_eq!(sum.ty, Type::double());

    let ExprKind::Binary(BinaryOp::Add, left, right) = &sum.kind else {
        panic!("expected an add node");
    };
    // The literal became a real literal outright, not a cast.
    assert!(matches!(left.kind, ExprKind::Real(s) if s.as_str() == "1"));
    assert!(matches!(right.kind, ExprKind::Real(_)));

    drop(checker);
    assert!(!diag.has_errors());
}

#[test]
fn non_literal_int_meeting_double_is_cast() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let x = variable(&mut checker, "x", Type::int());
    let sum = checker.check_add(x, real_lit("2.0"));
    assert_eq!(sum.ty, Type::double());

    let ExprKind::Binary(BinaryOp::Add, left, _) = &sum.kind else {
        panic!("expected an add node");
    };
    assert!(matches!(left.kind, ExprKind::Cast(_)));
    assert_eq!(left.ty, Type::double());
}

#[test]
fn pointer_addition_scales_by_pointee_size() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let p = variable(&mut checker, "p", Type::scalar(Specifier::Double, 1));
    let sum = checker.check_add(p, int_lit("2"));
    assert_eq!(sum.ty, Type::scalar(Specifier::Double, 1));

    let ExprKind::Binary(BinaryOp::Add, _, right) = &sum.kind else {
        panic!("expected an add node");
    };
    let ExprKind::Binary(BinaryOp::Multiply, _, scale) = &right.kind else {
        panic!("expected the index to be scaled");
    };
    assert!(matches!(scale.kind, ExprKind::Integer(s) if s.as_str() == "8"));
}

#[test]
fn pointer_difference_divides_by_pointee_size() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let p = variable(&mut checker, "p", Type::scalar(Specifier::Int, 1));
    let q = variable(&mut checker, "q", Type::scalar(Specifier::Int, 1));
    let difference = checker.check_subtract(p, q);

    // The whole subtraction is wrapped in a divide and yields an int.
    assert_eq!(difference.ty, Type::int());
    let ExprKind::Binary(BinaryOp::Divide, inner, scale) = &difference.kind else {
        panic!("expected a divide wrapper");
    };
    assert!(matches!(inner.kind, ExprKind::Binary(BinaryOp::Subtract, _, _)));
    assert!(matches!(scale.kind, ExprKind::Integer(s) if s.as_str() == "4"));

    drop(checker);
    assert!(!diag.has_errors());
}

#[test]
fn array_subscript_decays_scales_and_dereferences() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let a = variable(&mut checker, "a", Type::array(Specifier::Int, 0, 10));
    assert!(!a.lvalue);

    let element = checker.check_array(a, int_lit("3"));
    assert_eq!(element.ty, Type::int());
    assert!(element.lvalue);

    let ExprKind::Dereference(sum) = &element.kind else {
        panic!("expected a dereference");
    };
    let ExprKind::Binary(BinaryOp::Add, base, index) = &sum.kind else {
        panic!("expected base plus scaled index");
    };
    assert!(matches!(base.kind, ExprKind::Address(_)));
    assert!(matches!(index.kind, ExprKind::Binary(BinaryOp::Multiply, _, _)));

    drop(checker);
    assert!(!diag.has_errors());
}

#[test]
fn address_requires_lvalue() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let x = variable(&mut checker, "x", Type::int());
    let good = checker.check_address(x);
    assert_eq!(good.ty, Type::scalar(Specifier::Int, 1));
    assert!(!good.lvalue);

    let bad = checker.check_address(int_lit("1"));
    assert!(bad.ty.is_error());

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidLvalue]);
}

#[test]
fn assignment_to_non_lvalue_is_reported() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let assignment = checker.check_assign(int_lit("1"), int_lit("2"));
    assert!(assignment.ty.is_error());

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidLvalue]);
}

#[test]
fn assignment_converts_right_operand() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let d = variable(&mut checker, "d", Type::double());
    let assignment = checker.check_assign(d, int_lit("3"));
    assert_eq!(assignment.ty, Type::double());

    let i = variable(&mut checker, "i", Type::int());
    let truncating = checker.check_assign(i, real_lit("3.5"));
    assert_eq!(truncating.ty, Type::int());
    let ExprKind::Binary(BinaryOp::Assign, _, right) = &truncating.kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(right.kind, ExprKind::Cast(_)));

    drop(checker);
    assert!(!diag.has_errors());
}

#[test]
fn undeclared_identifier_reports_once() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let id = checker.check_identifier(Name::new("ghost"));
    assert!(checker.symbols.symbol(id).ty.is_error());

    // The error-typed symbol silences the second use...
    let again = checker.check_identifier(Name::new("ghost"));
    assert_eq!(id, again);

    // ...and every operator above it.
    let ghost = Expression::identifier(id, Type::error());
    let sum = checker.check_add(ghost, int_lit("1"));
    assert!(sum.ty.is_error());

    drop(checker);
    assert_eq!(
        diag.diagnostics(),
        &[SemanticError::UndeclaredIdentifier("ghost".into())]
    );
}

#[test]
fn redeclarations_replace_and_report() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    checker.declare_variable(Name::new("x"), Type::int());
    let second = checker.declare_variable(Name::new("x"), Type::double());
    assert_eq!(checker.symbols.lookup(Name::new("x")), Some(second));

    // Shadowing in an inner scope is not a redeclaration.
    checker.open_scope();
    checker.declare_variable(Name::new("x"), Type::int());
    checker.close_scope();

    drop(checker);
    assert_eq!(
        diag.diagnostics(),
        &[SemanticError::RedeclaredVariable("x".into())]
    );
}

#[test]
fn call_checks_prototyped_arguments() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let f = checker.declare_function(
        Name::new("f"),
        Type::function(Specifier::Int, 0, Some(vec![Type::double()])),
    );

    // Wrong arity.
    let call = checker.check_call(f, vec![]);
    assert!(matches!(call.kind, ExprKind::Call(_, _)));

    // Right arity: the int argument is promoted to double.
    let call = checker.check_call(f, vec![int_lit("1")]);
    assert_eq!(call.ty, Type::int());
    let ExprKind::Call(_, args) = &call.kind else {
        panic!("expected a call");
    };
    assert_eq!(args[0].ty, Type::double());

    // A pointer does not convert to a double parameter.
    let p = variable(&mut checker, "p", Type::scalar(Specifier::Int, 1));
    let call = checker.check_call(f, vec![p]);
    assert!(call.ty.is_error());

    drop(checker);
    assert_eq!(
        diag.diagnostics(),
        &[
            SemanticError::InvalidArguments,
            SemanticError::InvalidArguments
        ]
    );
}

#[test]
fn unprototyped_call_only_decays_arguments() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let f = checker.declare_function(Name::new("f"), Type::function(Specifier::Int, 0, None));
    let a = variable(&mut checker, "a", Type::array(Specifier::Int, 0, 10));

    let call = checker.check_call(f, vec![a, real_lit("1.5"), int_lit("7")]);
    assert_eq!(call.ty, Type::int());

    let ExprKind::Call(_, args) = &call.kind else {
        panic!("expected a call");
    };
    assert_eq!(args[0].ty, Type::scalar(Specifier::Int, 1));
    assert_eq!(args[1].ty, Type::double());
    assert_eq!(args[2].ty, Type::int());

    drop(checker);
    assert!(!diag.has_errors());
}

#[test]
fn calling_a_variable_is_invalid() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let x = checker.declare_variable(Name::new("x"), Type::int());
    let call = checker.check_call(x, vec![]);
    assert!(call.ty.is_error());

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidFunction]);
}

#[test]
fn remainder_takes_ints_only() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let ok = checker.check_remainder(int_lit("7"), int_lit("2"));
    assert_eq!(ok.ty, Type::int());

    let bad = checker.check_remainder(int_lit("7"), real_lit("2.0"));
    assert!(bad.ty.is_error());

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidOperands("%")]);
}

#[test]
fn comparisons_require_identical_value_types() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let ok = checker.check_comparison(BinaryOp::Less, int_lit("1"), int_lit("2"));
    assert_eq!(ok.ty, Type::int());

    // Cross promotion makes int vs double comparable.
    let promoted = checker.check_comparison(BinaryOp::Greater, int_lit("1"), real_lit("2.0"));
    assert_eq!(promoted.ty, Type::int());

    // Pointers to different pointees are not.
    let p = variable(&mut checker, "p", Type::scalar(Specifier::Int, 1));
    let q = variable(&mut checker, "q", Type::scalar(Specifier::Double, 1));
    let bad = checker.check_comparison(BinaryOp::Equal, p, q);
    assert!(bad.ty.is_error());

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidOperands("==")]);
}

#[test]
fn casts_follow_the_allowed_pairs() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    let ok = checker.check_cast(Type::int(), real_lit("1.5"));
    assert_eq!(ok.ty, Type::int());

    let p = variable(&mut checker, "p", Type::scalar(Specifier::Double, 1));
    let repointed = checker.check_cast(Type::scalar(Specifier::Int, 1), p);
    assert_eq!(repointed.ty, Type::scalar(Specifier::Int, 1));

    let int_to_ptr = checker.check_cast(Type::scalar(Specifier::Int, 1), int_lit("0"));
    assert_eq!(int_to_ptr.ty, Type::scalar(Specifier::Int, 1));

    // double -> pointer is not allowed.
    let bad = checker.check_cast(Type::scalar(Specifier::Int, 1), real_lit("1.0"));
    assert!(bad.ty.is_error());

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidCast]);
}

#[test]
fn return_and_test_checks() {
    init();
    let mut symbols = SymbolTable::new();
    let mut diag = DiagnosticEngine::new();
    let mut checker = Checker::new(&mut symbols, &mut diag);

    // return converts toward the function's type.
    let converted = checker.check_return(int_lit("0"), &Type::double());
    assert_eq!(converted.ty, Type::double());

    // A pointer cannot be returned as a double.
    let p = variable(&mut checker, "p", Type::scalar(Specifier::Int, 1));
    let bad = checker.check_return(p, &Type::double());
    assert_eq!(bad.ty, Type::scalar(Specifier::Int, 1));

    // Tests accept any value type, arrays decay first.
    let a = variable(&mut checker, "a", Type::array(Specifier::Int, 0, 3));
    let test = checker.check_test(a);
    assert_eq!(test.ty, Type::scalar(Specifier::Int, 1));

    drop(checker);
    assert_eq!(diag.diagnostics(), &[SemanticError::InvalidReturn]);
}
