//! Abstract syntax trees for Simple C.
//!
//! Statements and expressions are tagged variants; storage allocation
//! and code generation are match-on-kind passes over them rather than
//! methods spread across node classes. Every expression carries its
//! checked type, an lvalue flag, and an operand string that the code
//! generator fills in (a frame location such as `-8(%ebp)`, a literal
//! such as `$4`, or a label).

use symbol_table::GlobalSymbol as Name;

use crate::semantic::symbol_table::{ScopeId, SymbolId};
use crate::semantic::types::{Specifier, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Remainder,
    Add,
    Subtract,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
    Assign,
}

impl BinaryOp {
    /// The operator's source spelling, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Assign => "=",
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    /// A string literal; the spelling keeps its surrounding quotes.
    /// Only legal as a function call argument.
    StringLit(Name),
    Identifier(SymbolId),
    Integer(Name),
    Real(Name),
    Call(SymbolId, Vec<Expression>),
    Not(Box<Expression>),
    Negate(Box<Expression>),
    Dereference(Box<Expression>),
    Address(Box<Expression>),
    /// Conversion to the expression's own type.
    Cast(Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
}

#[derive(Debug)]
pub struct Expression {
    pub kind: ExprKind,
    pub ty: Type,
    pub lvalue: bool,
    pub operand: String,
}

impl Expression {
    pub fn new(kind: ExprKind, ty: Type, lvalue: bool) -> Self {
        Expression {
            kind,
            ty,
            lvalue,
            operand: String::new(),
        }
    }

    /// An identifier is an lvalue unless it names an array or function.
    pub fn identifier(symbol: SymbolId, ty: Type) -> Self {
        let lvalue = !ty.is_array() && !ty.is_function();
        Expression::new(ExprKind::Identifier(symbol), ty, lvalue)
    }

    pub fn integer(spelling: Name) -> Self {
        Expression::new(ExprKind::Integer(spelling), Type::int(), false)
    }

    /// An integer literal synthesized by the compiler (`sizeof`, array
    /// index scaling).
    pub fn integer_value(value: u32) -> Self {
        Expression::integer(Name::new(&value.to_string()))
    }

    pub fn real(spelling: Name) -> Self {
        Expression::new(ExprKind::Real(spelling), Type::double(), false)
    }

    /// String literals decay like arrays when passed to unprototyped
    /// callees, so they are typed as arrays of their character count
    /// plus the terminator.
    pub fn string_lit(spelling: Name) -> Self {
        let length = spelling.as_str().len().saturating_sub(2) as u32 + 1;
        let ty = Type::array(Specifier::Int, 0, length);
        Expression::new(ExprKind::StringLit(spelling), ty, false)
    }

    /// A dereference is always an lvalue, even when its type check
    /// failed.
    pub fn dereference(expr: Expression, ty: Type) -> Self {
        Expression::new(ExprKind::Dereference(Box::new(expr)), ty, true)
    }
}

#[derive(Debug)]
pub struct Block {
    pub scope: ScopeId,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub enum Statement {
    Expression(Expression),
    Return(Expression),
    Block(Block),
    While {
        test: Expression,
        body: Box<Statement>,
    },
    If {
        test: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
}

/// A function definition: the symbol of the function and its body. The
/// body block owns the scope the parameters were declared in.
#[derive(Debug)]
pub struct Function {
    pub id: SymbolId,
    pub body: Block,
}
