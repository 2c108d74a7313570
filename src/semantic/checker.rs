//! The semantic checker.
//!
//! Each `check_*` entry point validates one production as the parser
//! reduces it and builds the corresponding AST node. Implicit
//! conversions are inserted here: array-to-pointer decay, int/double
//! promotion and truncation, and the scaling of pointer arithmetic by
//! the pointee size. Once a subexpression has the error type, every
//! enclosing operator yields the error type silently, so each faulty
//! subtree produces at most one diagnostic.

use log::debug;
use symbol_table::GlobalSymbol as Name;

use crate::ast::{BinaryOp, ExprKind, Expression};
use crate::diagnostic::{DiagnosticEngine, SemanticError};
use crate::semantic::symbol_table::{ScopeId, Symbol, SymbolId, SymbolTable};
use crate::semantic::types::{Type, TypeKind};

/// Checker context: the scope chain plus the diagnostic sink.
pub struct Checker<'a> {
    pub symbols: &'a mut SymbolTable,
    pub diag: &'a mut DiagnosticEngine,
}

impl<'a> Checker<'a> {
    pub fn new(symbols: &'a mut SymbolTable, diag: &'a mut DiagnosticEngine) -> Self {
        Checker { symbols, diag }
    }

    // ----- scopes and declarations -----

    pub fn open_scope(&mut self) -> ScopeId {
        self.symbols.open_scope()
    }

    pub fn close_scope(&mut self) -> ScopeId {
        self.symbols.close_scope()
    }

    /// Functions always live in the outermost scope. A redeclaration
    /// replaces the previous entry.
    pub fn declare_function(&mut self, name: Name, ty: Type) -> SymbolId {
        if self.symbols.find_in(ScopeId::OUTERMOST, name).is_some() {
            self.diag
                .report(SemanticError::RedeclaredFunction(name.to_string()));
            self.symbols.remove_from(ScopeId::OUTERMOST, name);
        }

        self.symbols.insert_in(ScopeId::OUTERMOST, Symbol::new(name, ty))
    }

    pub fn declare_variable(&mut self, name: Name, ty: Type) -> SymbolId {
        let scope = self.symbols.current_scope();
        if self.symbols.find_in(scope, name).is_some() {
            self.diag
                .report(SemanticError::RedeclaredVariable(name.to_string()));
            self.symbols.remove_from(scope, name);
        }

        self.symbols.insert_in(scope, Symbol::new(name, ty))
    }

    pub fn declare_parameter(&mut self, name: Name, ty: Type) -> SymbolId {
        let scope = self.symbols.current_scope();
        if self.symbols.find_in(scope, name).is_some() {
            self.diag
                .report(SemanticError::RedeclaredParameter(name.to_string()));
            self.symbols.remove_from(scope, name);
        }

        self.symbols.insert_in(scope, Symbol::new(name, ty))
    }

    /// Resolve a use of `name`. An undeclared identifier is reported
    /// once and installed with the error type so later uses stay quiet.
    pub fn check_identifier(&mut self, name: Name) -> SymbolId {
        if let Some(id) = self.symbols.lookup(name) {
            return id;
        }

        self.diag
            .report(SemanticError::UndeclaredIdentifier(name.to_string()));
        let scope = self.symbols.current_scope();
        self.symbols.insert_in(scope, Symbol::new(name, Type::error()))
    }

    // ----- implicit conversions -----

    /// Array-to-pointer decay: wrap an array-typed expression in an
    /// address-of node carrying the promoted type.
    fn decay(&mut self, expr: Expression) -> Expression {
        if expr.ty.is_array() {
            debug!("promoting array to pointer");
            let ty = expr.ty.promote();
            Expression::new(ExprKind::Address(Box::new(expr)), ty, false)
        } else {
            expr
        }
    }

    /// Promote `expr` toward `target`: an int meeting a double becomes
    /// a double, with integer literals rewritten in place rather than
    /// cast at run time. Arrays decay afterwards.
    fn promote(&mut self, expr: Expression, target: &Type) -> Expression {
        let expr = if expr.ty == Type::int() && *target == Type::double() {
            debug!("promoting int to double");
            if let ExprKind::Integer(spelling) = expr.kind {
                Expression::real(spelling)
            } else {
                Expression::new(ExprKind::Cast(Box::new(expr)), Type::double(), false)
            }
        } else {
            expr
        };

        self.decay(expr)
    }

    /// Convert `expr` toward `target` by truncation or promotion.
    fn convert(&mut self, expr: Expression, target: &Type) -> Expression {
        let expr = if expr.ty == Type::double() && *target == Type::int() {
            debug!("converting double to int");
            Expression::new(ExprKind::Cast(Box::new(expr)), Type::int(), false)
        } else {
            expr
        };

        self.promote(expr, target)
    }

    // ----- expressions -----

    /// A call through `id`. Prototyped functions get an arity check and
    /// per-argument conversion; the unprototyped `name()` form only
    /// decays its arguments.
    pub fn check_call(&mut self, id: SymbolId, args: Vec<Expression>) -> Expression {
        let ty = self.symbols.symbol(id).ty.clone();
        let mut result = Type::error();
        let mut args = args;

        if !ty.is_error() {
            if !ty.is_function() {
                self.diag.report(SemanticError::InvalidFunction);
            } else {
                result = Type::scalar(ty.specifier, ty.indirection);

                if let TypeKind::Function(params) = &ty.kind {
                    match params {
                        Some(params) => {
                            if params.len() != args.len() {
                                self.diag.report(SemanticError::InvalidArguments);
                            } else {
                                let mut converted = Vec::with_capacity(args.len());
                                let mut failed = false;

                                for (arg, param) in args.into_iter().zip(params) {
                                    if failed {
                                        converted.push(arg);
                                        continue;
                                    }
                                    let arg = self.convert(arg, param);
                                    if arg.ty != *param {
                                        self.diag.report(SemanticError::InvalidArguments);
                                        result = Type::error();
                                        failed = true;
                                    }
                                    converted.push(arg);
                                }

                                args = converted;
                            }
                        }
                        None => {
                            args = args.into_iter().map(|arg| self.decay(arg)).collect();
                        }
                    }
                }
            }
        }

        Expression::new(ExprKind::Call(id, args), result, false)
    }

    /// `a[i]` rewrites to `*(a + i * sizeof *a)`; the index multiply is
    /// materialized in the tree so the generator never special-cases
    /// subscripts.
    pub fn check_array(&mut self, left: Expression, right: Expression) -> Expression {
        let left = self.decay(left);
        let t1 = left.ty.clone();
        let t2 = right.ty.clone();
        let mut result = Type::error();

        let scaled = Expression::new(
            ExprKind::Binary(
                BinaryOp::Multiply,
                Box::new(right),
                Box::new(Expression::integer_value(t1.deref().size())),
            ),
            Type::int(),
            false,
        );
        let sum = Expression::new(
            ExprKind::Binary(BinaryOp::Add, Box::new(left), Box::new(scaled)),
            t1.clone(),
            false,
        );

        if !t1.is_error() && !t2.is_error() {
            if t1.is_pointer() && t2 == Type::int() {
                result = t1.deref();
            } else {
                self.diag.report(SemanticError::InvalidOperands("[]"));
            }
        }

        Expression::dereference(sum, result)
    }

    pub fn check_not(&mut self, expr: Expression) -> Expression {
        let expr = self.decay(expr);
        let mut result = Type::error();

        if !expr.ty.is_error() {
            if expr.ty.is_value() {
                result = Type::int();
            } else {
                self.diag.report(SemanticError::InvalidOperand("!"));
            }
        }

        Expression::new(ExprKind::Not(Box::new(expr)), result, false)
    }

    pub fn check_negate(&mut self, expr: Expression) -> Expression {
        let mut result = Type::error();

        if !expr.ty.is_error() {
            if expr.ty.is_numeric() {
                result = expr.ty.clone();
            } else {
                self.diag.report(SemanticError::InvalidOperand("-"));
            }
        }

        Expression::new(ExprKind::Negate(Box::new(expr)), result, false)
    }

    pub fn check_dereference(&mut self, expr: Expression) -> Expression {
        let expr = self.decay(expr);
        let mut result = Type::error();

        if !expr.ty.is_error() {
            if expr.ty.is_pointer() {
                result = expr.ty.deref();
            } else {
                self.diag.report(SemanticError::InvalidOperand("*"));
            }
        }

        Expression::dereference(expr, result)
    }

    pub fn check_address(&mut self, expr: Expression) -> Expression {
        let mut result = Type::error();

        if !expr.ty.is_error() {
            if expr.lvalue {
                result = Type::scalar(expr.ty.specifier, expr.ty.indirection + 1);
            } else {
                self.diag.report(SemanticError::InvalidLvalue);
            }
        }

        Expression::new(ExprKind::Address(Box::new(expr)), result, false)
    }

    /// `(T)e`. Legal between numeric types, between pointer types, and
    /// between int and pointers in either direction.
    pub fn check_cast(&mut self, target: Type, expr: Expression) -> Expression {
        let expr = self.decay(expr);
        let t = expr.ty.clone();
        let mut result = Type::error();

        if !t.is_error() {
            if (target.is_numeric() && t.is_numeric())
                || (target.is_pointer() && (t.is_pointer() || t == Type::int()))
                || (t.is_pointer() && target == Type::int())
            {
                result = target;
            } else {
                self.diag.report(SemanticError::InvalidCast);
            }
        }

        Expression::new(ExprKind::Cast(Box::new(expr)), result, false)
    }

    /// Cross-promote the operands of a binary operator against each
    /// other, mirroring the usual arithmetic conversions.
    fn cross_promote(&mut self, left: Expression, right: Expression) -> (Expression, Expression) {
        let right_ty = right.ty.clone();
        let left = self.promote(left, &right_ty);
        let left_ty = left.ty.clone();
        let right = self.promote(right, &left_ty);
        (left, right)
    }

    /// `*` and `/`: both operands numeric; int only when both are int.
    pub fn check_multiplicative(
        &mut self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
    ) -> Expression {
        let (left, right) = self.cross_promote(left, right);
        let mut result = Type::error();

        if !left.ty.is_error() && !right.ty.is_error() {
            if left.ty.is_numeric() && right.ty.is_numeric() {
                result = left.ty.clone();
            } else {
                self.diag.report(SemanticError::InvalidOperands(op.symbol()));
            }
        }

        Expression::new(
            ExprKind::Binary(op, Box::new(left), Box::new(right)),
            result,
            false,
        )
    }

    /// `%` takes ints only and performs no promotion.
    pub fn check_remainder(&mut self, left: Expression, right: Expression) -> Expression {
        let mut result = Type::error();

        if !left.ty.is_error() && !right.ty.is_error() {
            if left.ty == Type::int() && right.ty == Type::int() {
                result = Type::int();
            } else {
                self.diag.report(SemanticError::InvalidOperands("%"));
            }
        }

        Expression::new(
            ExprKind::Binary(BinaryOp::Remainder, Box::new(left), Box::new(right)),
            result,
            false,
        )
    }

    /// Multiply an integer operand of pointer arithmetic by the size of
    /// the pointee.
    fn scale_index(&mut self, index: Expression, pointer_ty: &Type) -> Expression {
        Expression::new(
            ExprKind::Binary(
                BinaryOp::Multiply,
                Box::new(index),
                Box::new(Expression::integer_value(pointer_ty.deref().size())),
            ),
            Type::int(),
            false,
        )
    }

    pub fn check_add(&mut self, left: Expression, right: Expression) -> Expression {
        let (mut left, mut right) = self.cross_promote(left, right);
        let t1 = left.ty.clone();
        let t2 = right.ty.clone();
        let mut result = Type::error();

        if !t1.is_error() && !t2.is_error() {
            if t1.is_numeric() && t2.is_numeric() {
                result = t1;
            } else if t1.is_pointer() && t2 == Type::int() {
                right = self.scale_index(right, &t1);
                result = t1;
            } else if t1 == Type::int() && t2.is_pointer() {
                left = self.scale_index(left, &t2);
                result = t2;
            } else {
                self.diag.report(SemanticError::InvalidOperands("+"));
            }
        }

        Expression::new(
            ExprKind::Binary(BinaryOp::Add, Box::new(left), Box::new(right)),
            result,
            false,
        )
    }

    /// Subtraction also covers pointer differences: identical pointer
    /// types subtract and the whole result is divided by the pointee
    /// size, yielding an element count.
    pub fn check_subtract(&mut self, left: Expression, right: Expression) -> Expression {
        let (left, mut right) = self.cross_promote(left, right);
        let t1 = left.ty.clone();
        let t2 = right.ty.clone();
        let mut result = Type::error();
        let pointer_difference = t1.is_pointer() && t1 == t2;

        if !t1.is_error() && !t2.is_error() {
            if t1.is_numeric() && t2.is_numeric() {
                result = t1.clone();
            } else if pointer_difference {
                result = Type::int();
            } else if t1.is_pointer() && t2 == Type::int() {
                right = self.scale_index(right, &t1);
                result = t1.clone();
            } else {
                self.diag.report(SemanticError::InvalidOperands("-"));
            }
        }

        let tree = Expression::new(
            ExprKind::Binary(BinaryOp::Subtract, Box::new(left), Box::new(right)),
            result.clone(),
            false,
        );

        if pointer_difference {
            Expression::new(
                ExprKind::Binary(
                    BinaryOp::Divide,
                    Box::new(tree),
                    Box::new(Expression::integer_value(t1.deref().size())),
                ),
                result,
                false,
            )
        } else {
            tree
        }
    }

    /// Equality and relational operators: identical value types, int
    /// result.
    pub fn check_comparison(
        &mut self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
    ) -> Expression {
        let (left, right) = self.cross_promote(left, right);
        let mut result = Type::error();

        if !left.ty.is_error() && !right.ty.is_error() {
            if left.ty == right.ty && left.ty.is_value() {
                result = Type::int();
            } else {
                self.diag.report(SemanticError::InvalidOperands(op.symbol()));
            }
        }

        Expression::new(
            ExprKind::Binary(op, Box::new(left), Box::new(right)),
            result,
            false,
        )
    }

    /// `&&` and `||`: any two value types, int result.
    pub fn check_logical(
        &mut self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
    ) -> Expression {
        let left = self.decay(left);
        let right = self.decay(right);
        let mut result = Type::error();

        if !left.ty.is_error() && !right.ty.is_error() {
            if left.ty.is_value() && right.ty.is_value() {
                result = Type::int();
            } else {
                self.diag.report(SemanticError::InvalidOperands(op.symbol()));
            }
        }

        Expression::new(
            ExprKind::Binary(op, Box::new(left), Box::new(right)),
            result,
            false,
        )
    }

    pub fn check_assign(&mut self, left: Expression, right: Expression) -> Expression {
        let t1 = left.ty.clone();
        let right = self.convert(right, &t1);
        let t2 = right.ty.clone();
        let mut result = Type::error();

        if !t1.is_error() && !t2.is_error() {
            if !left.lvalue {
                self.diag.report(SemanticError::InvalidLvalue);
            } else if t1 == t2 && t1.is_value() {
                result = t1;
            } else {
                self.diag.report(SemanticError::InvalidOperands("="));
            }
        }

        Expression::new(
            ExprKind::Binary(BinaryOp::Assign, Box::new(left), Box::new(right)),
            result,
            false,
        )
    }

    // ----- statements -----

    /// Convert a return expression to the enclosing function's return
    /// type.
    pub fn check_return(&mut self, expr: Expression, return_type: &Type) -> Expression {
        let expr = self.convert(expr, return_type);

        if !expr.ty.is_error() && expr.ty != *return_type {
            self.diag.report(SemanticError::InvalidReturn);
        }

        expr
    }

    /// The test of an `if` or `while` must have a value type.
    pub fn check_test(&mut self, expr: Expression) -> Expression {
        let expr = self.decay(expr);

        if !expr.ty.is_error() && !expr.ty.is_value() {
            self.diag.report(SemanticError::InvalidTest);
        }

        expr
    }
}
