//! Frame layout tests.

use symbol_table::GlobalSymbol as Name;

use crate::ast::{Block, Function, Statement};
use crate::codegen::allocator::allocate_function;
use crate::semantic::symbol_table::{ScopeId, Symbol, SymbolTable};
use crate::semantic::types::{Specifier, Type};

fn declare_function(symbols: &mut SymbolTable, name: &str, params: Vec<Type>) -> crate::semantic::symbol_table::SymbolId {
    symbols.insert_in(
        ScopeId::OUTERMOST,
        Symbol::new(Name::new(name), Type::function(Specifier::Int, 0, Some(params))),
    )
}

#[test]
fn parameters_climb_from_eight() {
    let mut symbols = SymbolTable::new();
    let id = declare_function(
        &mut symbols,
        "f",
        vec![Type::int(), Type::double(), Type::scalar(Specifier::Int, 1)],
    );

    let scope = symbols.open_scope();
    let x = symbols.insert_in(scope, Symbol::new(Name::new("x"), Type::int()));
    let y = symbols.insert_in(scope, Symbol::new(Name::new("y"), Type::double()));
    let p = symbols.insert_in(
        scope,
        Symbol::new(Name::new("p"), Type::scalar(Specifier::Int, 1)),
    );
    symbols.close_scope();

    let function = Function {
        id,
        body: Block {
            scope,
            statements: Vec::new(),
        },
    };
    let lowest = allocate_function(&function, &mut symbols);

    assert_eq!(symbols.symbol(x).offset, 8);
    assert_eq!(symbols.symbol(y).offset, 12);
    assert_eq!(symbols.symbol(p).offset, 20);
    assert_eq!(lowest, 0);
}

#[test]
fn locals_descend_in_declaration_order() {
    let mut symbols = SymbolTable::new();
    let id = declare_function(&mut symbols, "f", Vec::new());

    let scope = symbols.open_scope();
    let x = symbols.insert_in(scope, Symbol::new(Name::new("x"), Type::int()));
    let d = symbols.insert_in(scope, Symbol::new(Name::new("d"), Type::double()));
    let a = symbols.insert_in(
        scope,
        Symbol::new(Name::new("a"), Type::array(Specifier::Int, 0, 10)),
    );
    symbols.close_scope();

    let function = Function {
        id,
        body: Block {
            scope,
            statements: Vec::new(),
        },
    };
    let lowest = allocate_function(&function, &mut symbols);

    assert_eq!(symbols.symbol(x).offset, -4);
    assert_eq!(symbols.symbol(d).offset, -12);
    assert_eq!(symbols.symbol(a).offset, -52);
    assert_eq!(lowest, -52);
}

#[test]
fn exclusive_branches_share_storage() {
    let mut symbols = SymbolTable::new();
    let id = declare_function(&mut symbols, "f", Vec::new());

    let outer = symbols.open_scope();
    let x = symbols.insert_in(outer, Symbol::new(Name::new("x"), Type::int()));

    let then_scope = symbols.open_scope();
    let a = symbols.insert_in(then_scope, Symbol::new(Name::new("a"), Type::int()));
    symbols.close_scope();

    let else_scope = symbols.open_scope();
    let b = symbols.insert_in(else_scope, Symbol::new(Name::new("b"), Type::double()));
    symbols.close_scope();

    symbols.close_scope();

    let test = crate::ast::Expression::integer(Name::new("1"));
    let function = Function {
        id,
        body: Block {
            scope: outer,
            statements: vec![Statement::If {
                test,
                then_branch: Box::new(Statement::Block(Block {
                    scope: then_scope,
                    statements: Vec::new(),
                })),
                else_branch: Some(Box::new(Statement::Block(Block {
                    scope: else_scope,
                    statements: Vec::new(),
                }))),
            }],
        },
    };
    let lowest = allocate_function(&function, &mut symbols);

    assert_eq!(symbols.symbol(x).offset, -4);
    // Both branch locals sit below x, overlapping each other.
    assert_eq!(symbols.symbol(a).offset, -8);
    assert_eq!(symbols.symbol(b).offset, -12);
    assert_eq!(lowest, -12);
}

#[test]
fn while_allocates_through_to_its_body() {
    let mut symbols = SymbolTable::new();
    let id = declare_function(&mut symbols, "f", Vec::new());

    let outer = symbols.open_scope();
    let body_scope = symbols.open_scope();
    let n = symbols.insert_in(body_scope, Symbol::new(Name::new("n"), Type::int()));
    symbols.close_scope();
    symbols.close_scope();

    let function = Function {
        id,
        body: Block {
            scope: outer,
            statements: vec![Statement::While {
                test: crate::ast::Expression::integer(Name::new("1")),
                body: Box::new(Statement::Block(Block {
                    scope: body_scope,
                    statements: Vec::new(),
                })),
            }],
        },
    };
    let lowest = allocate_function(&function, &mut symbols);

    assert_eq!(symbols.symbol(n).offset, -4);
    assert_eq!(lowest, -4);
}
