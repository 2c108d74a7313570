//! Diagnostics for the Simple C compiler.
//!
//! Syntax errors are fatal: the parser stops at the first one and the
//! driver exits with a nonzero status. Semantic errors are collected by
//! the [`DiagnosticEngine`], written to stderr as they occur, and only
//! suppress code generation.

use log::debug;

/// Fatal parse errors. The parser performs no error recovery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("syntax error at end of file")]
    AtEndOfFile,

    #[error("syntax error at '{0}'")]
    AtToken(String),
}

/// Semantic errors, with the exact message formats the compiler emits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("invalid return type")]
    InvalidReturn,

    #[error("invalid type for test expression")]
    InvalidTest,

    #[error("invalid lvalue in expression")]
    InvalidLvalue,

    #[error("invalid operands to binary {0}")]
    InvalidOperands(&'static str),

    #[error("invalid operand to unary {0}")]
    InvalidOperand(&'static str),

    #[error("invalid operand in cast expression")]
    InvalidCast,

    #[error("called object is not a function")]
    InvalidFunction,

    #[error("invalid arguments to called function")]
    InvalidArguments,

    #[error("function {0} is previously declared")]
    RedeclaredFunction(String),

    #[error("variable {0} is previously declared")]
    RedeclaredVariable(String),

    #[error("parameter {0} is previously declared")]
    RedeclaredParameter(String),

    #[error("{0} is undeclared")]
    UndeclaredIdentifier(String),
}

/// Collects semantic errors and mirrors each one to stderr.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<SemanticError>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        DiagnosticEngine {
            diagnostics: Vec::new(),
        }
    }

    /// Report a semantic error. The message goes to stderr immediately;
    /// the error is kept so callers can inspect what was reported.
    pub fn report(&mut self, error: SemanticError) {
        debug!("reported: {error}");
        eprintln!("{error}");
        self.diagnostics.push(error);
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[SemanticError] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<SemanticError> {
        self.diagnostics
    }
}
