//! The compiler context and pipeline.
//!
//! All state that outlives a single production lives here: the scope
//! chain, the diagnostic engine, the list of global variables awaiting
//! the data section, and the emitter with its label counters and
//! literal tables. `main` creates one [`Compiler`] per run; nothing is
//! process-global.

use crate::codegen::generator::Emitter;
use crate::diagnostic::{DiagnosticEngine, SemanticError, SyntaxError};
use crate::parser::Parser;
use crate::semantic::symbol_table::{SymbolId, SymbolTable};

#[derive(Default)]
pub struct Compiler {
    pub symbols: SymbolTable,
    pub diag: DiagnosticEngine,
    pub globals: Vec<SymbolId>,
    pub emitter: Emitter,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            symbols: SymbolTable::new(),
            diag: DiagnosticEngine::new(),
            globals: Vec::new(),
            emitter: Emitter::new(),
        }
    }
}

/// What a run produces: the assembly emitted so far and the semantic
/// errors reported along the way. Any semantic error suppresses the
/// data section and every function compiled after the error occurred,
/// but the process still exits cleanly.
pub struct CompileOutput {
    pub assembly: String,
    pub diagnostics: Vec<SemanticError>,
}

impl CompileOutput {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Compile one Simple C translation unit to assembly text.
pub fn compile(source: &str) -> Result<CompileOutput, SyntaxError> {
    let mut compiler = Compiler::new();

    Parser::new(source, &mut compiler).parse()?;

    let Compiler {
        symbols,
        diag,
        globals,
        mut emitter,
    } = compiler;

    if !diag.has_errors() {
        emitter.generate_globals(&globals, &symbols);
    }

    Ok(CompileOutput {
        assembly: emitter.finish(),
        diagnostics: diag.into_diagnostics(),
    })
}
