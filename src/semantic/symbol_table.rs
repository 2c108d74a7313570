//! Symbol and scope management.
//!
//! Symbols and scopes live in flattened arenas indexed by `NonZeroU32`
//! newtypes, so AST nodes can hold plain copyable handles instead of
//! references into the table. Scopes keep their symbols in insertion
//! order; parameter offsets depend on it.

use std::num::NonZeroU32;

use log::debug;
use symbol_table::GlobalSymbol as Name;

use crate::semantic::types::Type;

/// Handle to a symbol in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(NonZeroU32);

impl SymbolId {
    fn new(index: usize) -> Self {
        SymbolId(NonZeroU32::new(index as u32 + 1).expect("symbol arena overflow"))
    }

    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Handle to a scope in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(NonZeroU32);

impl ScopeId {
    /// The outermost scope, where functions and globals live.
    pub const OUTERMOST: Self = ScopeId(NonZeroU32::new(1).unwrap());

    fn new(index: usize) -> Self {
        ScopeId(NonZeroU32::new(index as u32 + 1).expect("scope arena overflow"))
    }

    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// A named entity: variable, parameter, or function.
///
/// `offset == 0` means no frame offset has been assigned yet; globals
/// keep a zero offset and are addressed by name instead.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Name,
    pub ty: Type,
    pub offset: i32,
}

impl Symbol {
    pub fn new(name: Name, ty: Type) -> Self {
        Symbol { name, ty, offset: 0 }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    symbols: Vec<SymbolId>,
}

/// The scope chain plus the symbol arena behind it.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create the table with the outermost scope already open.
    pub fn new() -> Self {
        SymbolTable {
            symbols: Vec::new(),
            scopes: vec![Scope {
                parent: None,
                symbols: Vec::new(),
            }],
            current: ScopeId::OUTERMOST,
        }
    }

    /// Open a new scope nested in the current one and make it current.
    pub fn open_scope(&mut self) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(self.current),
            symbols: Vec::new(),
        });
        self.current = id;
        debug!("opened scope {:?}", id);
        id
    }

    /// Close the current scope and return it; its symbols stay in the
    /// arena and the closed scope is owned by the block being built.
    pub fn close_scope(&mut self) -> ScopeId {
        let closed = self.current;
        self.current = self.scopes[closed.index()]
            .parent
            .expect("cannot close the outermost scope");
        debug!("closed scope {:?}", closed);
        closed
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// Look for `name` in one scope only.
    pub fn find_in(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.scopes[scope.index()]
            .symbols
            .iter()
            .copied()
            .find(|&id| self.symbols[id.index()].name == name)
    }

    /// Look for `name` starting at the current scope and walking out
    /// through the enclosing scopes.
    pub fn lookup(&self, name: Name) -> Option<SymbolId> {
        let mut scope = self.current;
        loop {
            if let Some(id) = self.find_in(scope, name) {
                return Some(id);
            }
            scope = self.scopes[scope.index()].parent?;
        }
    }

    /// Insert a symbol into the given scope, at the end of its order.
    pub fn insert_in(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        debug!("declare {} : {} in {:?}", symbol.name, symbol.ty, scope);
        let id = SymbolId::new(self.symbols.len());
        self.symbols.push(symbol);
        self.scopes[scope.index()].symbols.push(id);
        id
    }

    /// Drop `name` from one scope's ordering. The arena entry remains
    /// so outstanding handles stay valid.
    pub fn remove_from(&mut self, scope: ScopeId, name: Name) {
        let symbols = &self.symbols;
        self.scopes[scope.index()]
            .symbols
            .retain(|&id| symbols[id.index()].name != name);
    }

    /// Symbols of a scope, in declaration order.
    pub fn scope_symbols(&self, scope: ScopeId) -> &[SymbolId] {
        &self.scopes[scope.index()].symbols
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }
}
