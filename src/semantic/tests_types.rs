//! Type predicate and layout tests.

use crate::semantic::types::{Specifier, Type};

#[test]
fn scalar_predicates() {
    let int = Type::int();
    assert!(int.is_numeric());
    assert!(int.is_value());
    assert!(!int.is_pointer());
    assert!(!int.is_real());

    let double = Type::double();
    assert!(double.is_numeric());
    assert!(double.is_real());

    let pointer = Type::scalar(Specifier::Int, 1);
    assert!(pointer.is_pointer());
    assert!(pointer.is_value());
    assert!(!pointer.is_numeric());
    assert!(!pointer.is_real());
}

#[test]
fn aggregate_predicates() {
    let array = Type::array(Specifier::Double, 0, 10);
    assert!(array.is_array());
    assert!(!array.is_value());
    assert!(!array.is_pointer());

    let function = Type::function(Specifier::Int, 0, None);
    assert!(function.is_function());
    assert!(!function.is_value());

    assert!(Type::error().is_error());
    assert!(!Type::int().is_error());
}

#[test]
fn sizes() {
    assert_eq!(Type::int().size(), 4);
    assert_eq!(Type::double().size(), 8);
    assert_eq!(Type::scalar(Specifier::Double, 1).size(), 4);
    assert_eq!(Type::array(Specifier::Int, 0, 10).size(), 40);
    assert_eq!(Type::array(Specifier::Double, 0, 10).size(), 80);
    // An array of pointers is word-sized per element.
    assert_eq!(Type::array(Specifier::Double, 1, 10).size(), 40);
}

#[test]
fn promote_decays_arrays_only() {
    let array = Type::array(Specifier::Int, 0, 10);
    let promoted = array.promote();
    assert_eq!(promoted, Type::scalar(Specifier::Int, 1));

    // Idempotent once decayed.
    assert_eq!(promoted.promote(), promoted);
    assert_eq!(Type::double().promote(), Type::double());
}

#[test]
fn deref_strips_one_level() {
    let pp = Type::scalar(Specifier::Int, 2);
    assert_eq!(pp.deref(), Type::scalar(Specifier::Int, 1));
    assert_eq!(pp.deref().deref(), Type::int());
}

#[test]
fn equality_is_structural() {
    assert_eq!(Type::int(), Type::int());
    assert_ne!(Type::int(), Type::double());
    assert_ne!(Type::int(), Type::scalar(Specifier::Int, 1));
    assert_ne!(
        Type::array(Specifier::Int, 0, 4),
        Type::array(Specifier::Int, 0, 5)
    );
    assert_eq!(
        Type::function(Specifier::Int, 0, Some(vec![Type::int()])),
        Type::function(Specifier::Int, 0, Some(vec![Type::int()]))
    );
    assert_ne!(
        Type::function(Specifier::Int, 0, Some(vec![])),
        Type::function(Specifier::Int, 0, None)
    );
}
