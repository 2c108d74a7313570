//! Storage allocation.
//!
//! Walks a function's body assigning frame-pointer offsets: parameters
//! climb from `8(%ebp)` in declaration order, locals grow downward from
//! the frame pointer. Sibling branches and sibling blocks start from
//! the same offset, so storage whose lifetimes cannot overlap shares
//! stack space; the lowest offset reached becomes the function's frame
//! size.

use log::debug;

use crate::ast::{Block, Function, Statement};
use crate::semantic::symbol_table::SymbolTable;
use crate::semantic::types::TypeKind;

/// First parameter offset: past the saved `%ebp` and the return
/// address.
pub const INIT_PARAM_OFFSET: i32 = 8;

/// Assign offsets to the parameters and locals of a function. Returns
/// the lowest (most negative) offset used by declared storage; the
/// generator starts its temporaries below it.
pub fn allocate_function(function: &Function, symbols: &mut SymbolTable) -> i32 {
    let param_count = match &symbols.symbol(function.id).ty.kind {
        TypeKind::Function(Some(parameters)) => parameters.len(),
        _ => 0,
    };

    // Parameters are the first symbols declared in the body's scope.
    let params: Vec<_> = symbols
        .scope_symbols(function.body.scope)
        .iter()
        .copied()
        .take(param_count)
        .collect();

    let mut offset = INIT_PARAM_OFFSET;
    for id in params {
        let size = symbols.symbol(id).ty.size() as i32;
        symbols.symbol_mut(id).offset = offset;
        debug!("parameter {} at {}(%ebp)", symbols.symbol(id).name, offset);
        offset += size;
    }

    let mut offset = 0;
    allocate_block(&function.body, symbols, &mut offset);
    offset
}

fn allocate_block(block: &Block, symbols: &mut SymbolTable, offset: &mut i32) {
    // Only symbols without an offset get one here; parameters were
    // already placed above the frame pointer.
    let locals: Vec<_> = symbols.scope_symbols(block.scope).to_vec();
    for id in locals {
        if symbols.symbol(id).offset == 0 {
            *offset -= symbols.symbol(id).ty.size() as i32;
            symbols.symbol_mut(id).offset = *offset;
            debug!("local {} at {}(%ebp)", symbols.symbol(id).name, *offset);
        }
    }

    let base = *offset;
    let mut lowest = base;
    for statement in &block.statements {
        let mut branch = base;
        allocate_statement(statement, symbols, &mut branch);
        lowest = lowest.min(branch);
    }
    *offset = lowest;
}

fn allocate_statement(statement: &Statement, symbols: &mut SymbolTable, offset: &mut i32) {
    match statement {
        Statement::Block(block) => allocate_block(block, symbols, offset),
        Statement::While { body, .. } => allocate_statement(body, symbols, offset),
        Statement::If {
            then_branch,
            else_branch,
            ..
        } => {
            // The branches are exclusive, so the else branch may reuse
            // the then branch's space.
            let base = *offset;
            allocate_statement(then_branch, symbols, offset);
            if let Some(else_branch) = else_branch {
                let mut other = base;
                allocate_statement(else_branch, symbols, &mut other);
                *offset = (*offset).min(other);
            }
        }
        Statement::Expression(_) | Statement::Return(_) => {}
    }
}
