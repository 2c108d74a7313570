//! The recursive-descent parser.
//!
//! One function per production. The parser owns one token of lookahead
//! plus one token of peek-ahead (enough to tell a cast from a
//! parenthesized expression) and reduces straight into the checker's
//! entry points, so the AST it hands on is already typed. When a
//! function definition closes and no errors have been reported, its
//! storage is allocated and its code generated immediately; the parser
//! never holds more than one function.
//!
//! There is no error recovery: the first syntax error aborts the
//! compilation.

use log::debug;
use symbol_table::GlobalSymbol as Name;

use crate::ast::{BinaryOp, Block, Expression, Function, Statement};
use crate::compiler::Compiler;
use crate::diagnostic::SyntaxError;
use crate::lexer::{parse_integer, Lexer, Token, TokenKind};
use crate::semantic::checker::Checker;
use crate::semantic::types::{Specifier, Type};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
    peeked: Option<Token>,
    return_type: Type,
    ctx: &'a mut Compiler,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, ctx: &'a mut Compiler) -> Self {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token();
        Parser {
            lexer,
            lookahead,
            peeked: None,
            return_type: Type::int(),
            ctx,
        }
    }

    /// translation-unit: global-declaration* EOF
    pub fn parse(&mut self) -> Result<(), SyntaxError> {
        while self.lookahead.kind != TokenKind::Eof {
            self.global_declaration()?;
        }
        Ok(())
    }

    // ----- token plumbing -----

    fn checker(&mut self) -> Checker<'_> {
        Checker::new(&mut self.ctx.symbols, &mut self.ctx.diag)
    }

    fn syntax_error<T>(&self) -> Result<T, SyntaxError> {
        if self.lookahead.kind == TokenKind::Eof {
            Err(SyntaxError::AtEndOfFile)
        } else {
            Err(SyntaxError::AtToken(self.lookahead.kind.lexeme()))
        }
    }

    fn advance(&mut self) {
        self.lookahead = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token(),
        };
    }

    /// The token after the lookahead, without consuming anything.
    fn peek(&mut self) -> TokenKind {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }
        self.peeked.expect("just filled").kind
    }

    fn eat(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        if self.lookahead.kind == kind {
            self.advance();
            Ok(())
        } else {
            self.syntax_error()
        }
    }

    fn expect_identifier(&mut self) -> Result<Name, SyntaxError> {
        match self.lookahead.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => self.syntax_error(),
        }
    }

    fn expect_integer(&mut self) -> Result<Name, SyntaxError> {
        match self.lookahead.kind {
            TokenKind::Integer(spelling) => {
                self.advance();
                Ok(spelling)
            }
            _ => self.syntax_error(),
        }
    }

    fn at_specifier(&self) -> bool {
        matches!(self.lookahead.kind, TokenKind::Int | TokenKind::Double)
    }

    // ----- declarations -----

    /// specifier: int | double
    fn specifier(&mut self) -> Result<Specifier, SyntaxError> {
        match self.lookahead.kind {
            TokenKind::Int => {
                self.advance();
                Ok(Specifier::Int)
            }
            TokenKind::Double => {
                self.advance();
                Ok(Specifier::Double)
            }
            _ => self.syntax_error(),
        }
    }

    /// pointers: ('*')*
    fn pointers(&mut self) -> u32 {
        let mut count = 0;
        while self.lookahead.kind == TokenKind::Star {
            self.advance();
            count += 1;
        }
        count
    }

    /// declarator: pointers ID | pointers ID [ INTEGER ]
    fn declarator(&mut self, specifier: Specifier) -> Result<(), SyntaxError> {
        let indirection = self.pointers();
        let name = self.expect_identifier()?;

        if self.lookahead.kind == TokenKind::LeftBracket {
            self.advance();
            let length = parse_integer(self.expect_integer()?.as_str());
            self.checker()
                .declare_variable(name, Type::array(specifier, indirection, length));
            self.eat(TokenKind::RightBracket)?;
        } else {
            self.checker()
                .declare_variable(name, Type::scalar(specifier, indirection));
        }

        Ok(())
    }

    /// declaration: specifier declarator (',' declarator)* ';'
    fn declaration(&mut self) -> Result<(), SyntaxError> {
        let specifier = self.specifier()?;
        self.declarator(specifier)?;

        while self.lookahead.kind == TokenKind::Comma {
            self.advance();
            self.declarator(specifier)?;
        }

        self.eat(TokenKind::Semicolon)
    }

    fn declarations(&mut self) -> Result<(), SyntaxError> {
        while self.at_specifier() {
            self.declaration()?;
        }
        Ok(())
    }

    // ----- expressions -----

    /// argument: STRING | expression
    ///
    /// String literals only exist as call arguments, to support the
    /// printf family.
    fn argument(&mut self) -> Result<Expression, SyntaxError> {
        if let TokenKind::StringLit(spelling) = self.lookahead.kind {
            self.advance();
            return Ok(Expression::string_lit(spelling));
        }
        self.expression()
    }

    /// primary: ( expression ) | INTEGER | REAL | ID ( arguments? ) | ID
    fn primary(&mut self) -> Result<Expression, SyntaxError> {
        match self.lookahead.kind {
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.eat(TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Integer(spelling) => {
                self.advance();
                Ok(Expression::integer(spelling))
            }
            TokenKind::Real(spelling) => {
                self.advance();
                Ok(Expression::real(spelling))
            }
            TokenKind::Identifier(_) => {
                let name = self.expect_identifier()?;
                let symbol = self.checker().check_identifier(name);

                if self.lookahead.kind == TokenKind::LeftParen {
                    self.advance();
                    let mut args = Vec::new();

                    if self.lookahead.kind != TokenKind::RightParen {
                        args.push(self.argument()?);
                        while self.lookahead.kind == TokenKind::Comma {
                            self.advance();
                            args.push(self.argument()?);
                        }
                    }

                    let call = self.checker().check_call(symbol, args);
                    self.eat(TokenKind::RightParen)?;
                    Ok(call)
                } else {
                    let ty = self.ctx.symbols.symbol(symbol).ty.clone();
                    Ok(Expression::identifier(symbol, ty))
                }
            }
            _ => self.syntax_error(),
        }
    }

    /// postfix: primary ('[' expression ']')*
    fn postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.primary()?;

        while self.lookahead.kind == TokenKind::LeftBracket {
            self.advance();
            let right = self.expression()?;
            left = self.checker().check_array(left, right);
            self.eat(TokenKind::RightBracket)?;
        }

        Ok(left)
    }

    /// unary: postfix | ! unary | - unary | * unary | & unary
    ///      | sizeof unary | sizeof ( specifier pointers )
    fn unary(&mut self) -> Result<Expression, SyntaxError> {
        match self.lookahead.kind {
            TokenKind::Not => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.checker().check_not(expr))
            }
            TokenKind::Minus => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.checker().check_negate(expr))
            }
            TokenKind::Star => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.checker().check_dereference(expr))
            }
            TokenKind::Amp => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.checker().check_address(expr))
            }
            TokenKind::Sizeof => {
                self.advance();

                // sizeof never decays its operand: the size of an array
                // is the whole array's.
                let ty = if self.lookahead.kind == TokenKind::LeftParen
                    && matches!(self.peek(), TokenKind::Int | TokenKind::Double)
                {
                    self.advance();
                    let specifier = self.specifier()?;
                    let indirection = self.pointers();
                    self.eat(TokenKind::RightParen)?;
                    Type::scalar(specifier, indirection)
                } else {
                    self.unary()?.ty
                };

                Ok(Expression::integer_value(ty.size()))
            }
            _ => self.postfix(),
        }
    }

    /// cast: ( specifier pointers ) cast | unary
    fn cast_expression(&mut self) -> Result<Expression, SyntaxError> {
        if self.lookahead.kind == TokenKind::LeftParen
            && matches!(self.peek(), TokenKind::Int | TokenKind::Double)
        {
            self.advance();
            let specifier = self.specifier()?;
            let indirection = self.pointers();
            self.eat(TokenKind::RightParen)?;
            let expr = self.cast_expression()?;
            return Ok(self
                .checker()
                .check_cast(Type::scalar(specifier, indirection), expr));
        }

        self.unary()
    }

    /// multiplicative: cast (('*' | '/' | '%') cast)*
    fn multiplicative(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.cast_expression()?;

        loop {
            let op = match self.lookahead.kind {
                TokenKind::Star => Some(BinaryOp::Multiply),
                TokenKind::Slash => Some(BinaryOp::Divide),
                TokenKind::Percent => None,
                _ => break,
            };
            self.advance();
            let right = self.cast_expression()?;
            left = match op {
                Some(op) => self.checker().check_multiplicative(op, left, right),
                None => self.checker().check_remainder(left, right),
            };
        }

        Ok(left)
    }

    /// additive: multiplicative (('+' | '-') multiplicative)*
    fn additive(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.multiplicative()?;

        loop {
            let subtract = match self.lookahead.kind {
                TokenKind::Plus => false,
                TokenKind::Minus => true,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = if subtract {
                self.checker().check_subtract(left, right)
            } else {
                self.checker().check_add(left, right)
            };
        }

        Ok(left)
    }

    /// relational: additive (('<' | '>' | '<=' | '>=') additive)*
    fn relational(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.additive()?;

        loop {
            let op = match self.lookahead.kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = self.checker().check_comparison(op, left, right);
        }

        Ok(left)
    }

    /// equality: relational (('==' | '!=') relational)*
    fn equality(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.relational()?;

        loop {
            let op = match self.lookahead.kind {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.relational()?;
            left = self.checker().check_comparison(op, left, right);
        }

        Ok(left)
    }

    /// logical-and: equality ('&&' equality)*
    fn logical_and(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.equality()?;

        while self.lookahead.kind == TokenKind::LogicAnd {
            self.advance();
            let right = self.equality()?;
            left = self.checker().check_logical(BinaryOp::LogicalAnd, left, right);
        }

        Ok(left)
    }

    /// logical-or: logical-and ('||' logical-and)*
    fn logical_or(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.logical_and()?;

        while self.lookahead.kind == TokenKind::LogicOr {
            self.advance();
            let right = self.logical_and()?;
            left = self.checker().check_logical(BinaryOp::LogicalOr, left, right);
        }

        Ok(left)
    }

    /// expression: logical-or ('=' expression)?
    ///
    /// Assignment is right associative; there is no comma operator.
    fn expression(&mut self) -> Result<Expression, SyntaxError> {
        let left = self.logical_or()?;

        if self.lookahead.kind == TokenKind::Assign {
            self.advance();
            let right = self.expression()?;
            return Ok(self.checker().check_assign(left, right));
        }

        Ok(left)
    }

    // ----- statements -----

    /// A statement sequence runs to the closing brace of its block.
    fn statements(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        let mut statements = Vec::new();
        while self.lookahead.kind != TokenKind::RightBrace {
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    /// statement: { declarations statements } | return expression ;
    ///          | while ( expression ) statement
    ///          | if ( expression ) statement (else statement)?
    ///          | expression ;
    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.lookahead.kind {
            TokenKind::LeftBrace => {
                self.advance();
                let scope = self.checker().open_scope();
                self.declarations()?;
                let statements = self.statements()?;
                self.checker().close_scope();
                self.eat(TokenKind::RightBrace)?;
                Ok(Statement::Block(Block { scope, statements }))
            }

            TokenKind::Return => {
                self.advance();
                let expr = self.expression()?;
                let return_type = self.return_type.clone();
                let expr = self.checker().check_return(expr, &return_type);
                self.eat(TokenKind::Semicolon)?;
                Ok(Statement::Return(expr))
            }

            TokenKind::While => {
                self.advance();
                self.eat(TokenKind::LeftParen)?;
                let test = self.expression()?;
                let test = self.checker().check_test(test);
                self.eat(TokenKind::RightParen)?;
                let body = self.statement()?;
                Ok(Statement::While {
                    test,
                    body: Box::new(body),
                })
            }

            TokenKind::If => {
                self.advance();
                self.eat(TokenKind::LeftParen)?;
                let test = self.expression()?;
                let test = self.checker().check_test(test);
                self.eat(TokenKind::RightParen)?;
                let then_branch = Box::new(self.statement()?);

                let else_branch = if self.lookahead.kind == TokenKind::Else {
                    self.advance();
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };

                Ok(Statement::If {
                    test,
                    then_branch,
                    else_branch,
                })
            }

            _ => {
                let expr = self.expression()?;
                self.eat(TokenKind::Semicolon)?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    // ----- functions and globals -----

    /// parameter: specifier pointers ID
    fn parameter(&mut self) -> Result<Type, SyntaxError> {
        let specifier = self.specifier()?;
        let indirection = self.pointers();
        let name = self.expect_identifier()?;

        let ty = Type::scalar(specifier, indirection);
        self.checker().declare_parameter(name, ty.clone());
        Ok(ty)
    }

    /// parameters: void | parameter (',' parameter)*
    fn parameters(&mut self) -> Result<Vec<Type>, SyntaxError> {
        let mut params = Vec::new();

        if self.lookahead.kind == TokenKind::Void {
            self.advance();
        } else {
            params.push(self.parameter()?);
            while self.lookahead.kind == TokenKind::Comma {
                self.advance();
                params.push(self.parameter()?);
            }
        }

        Ok(params)
    }

    /// The body of a function definition, after `specifier pointers ID (`
    /// has been consumed and the next token is not `)`.
    fn function_definition(
        &mut self,
        specifier: Specifier,
        indirection: u32,
        name: Name,
    ) -> Result<(), SyntaxError> {
        let scope = self.checker().open_scope();
        let params = self.parameters()?;
        self.return_type = Type::scalar(specifier, indirection);
        let id = self
            .checker()
            .declare_function(name, Type::function(specifier, indirection, Some(params)));
        self.eat(TokenKind::RightParen)?;
        self.eat(TokenKind::LeftBrace)?;
        self.declarations()?;
        let statements = self.statements()?;
        self.checker().close_scope();
        self.eat(TokenKind::RightBrace)?;

        let mut function = Function {
            id,
            body: Block { scope, statements },
        };

        // Single pass: each error-free definition is compiled as soon
        // as it closes. Erroneous ones are parsed and dropped.
        if self.ctx.diag.has_errors() {
            debug!("skipping code generation for {name}");
        } else {
            let ctx = &mut *self.ctx;
            ctx.emitter.generate_function(&mut function, &mut ctx.symbols);
        }

        Ok(())
    }

    /// global-declarator tail: an array, a prototype, or a scalar.
    fn global_declarator(
        &mut self,
        specifier: Specifier,
        indirection: u32,
        name: Name,
    ) -> Result<(), SyntaxError> {
        match self.lookahead.kind {
            TokenKind::LeftBracket => {
                self.advance();
                let length = parse_integer(self.expect_integer()?.as_str());
                let id = self
                    .checker()
                    .declare_variable(name, Type::array(specifier, indirection, length));
                self.ctx.globals.push(id);
                self.eat(TokenKind::RightBracket)
            }
            TokenKind::LeftParen => {
                self.advance();
                self.eat(TokenKind::RightParen)?;
                self.checker()
                    .declare_function(name, Type::function(specifier, indirection, None));
                Ok(())
            }
            _ => {
                let id = self
                    .checker()
                    .declare_variable(name, Type::scalar(specifier, indirection));
                self.ctx.globals.push(id);
                Ok(())
            }
        }
    }

    /// global-declaration: specifier global-declarator-list ';'
    ///                   | function-definition
    fn global_declaration(&mut self) -> Result<(), SyntaxError> {
        let specifier = self.specifier()?;
        let indirection = self.pointers();
        let name = self.expect_identifier()?;

        // A definition is the one form that doesn't join a declarator
        // list: `specifier pointers ID ( parameters ) { ... }`.
        if self.lookahead.kind == TokenKind::LeftParen && self.peek() != TokenKind::RightParen {
            self.advance();
            return self.function_definition(specifier, indirection, name);
        }

        self.global_declarator(specifier, indirection, name)?;

        while self.lookahead.kind == TokenKind::Comma {
            self.advance();
            let indirection = self.pointers();
            let name = self.expect_identifier()?;
            self.global_declarator(specifier, indirection, name)?;
        }

        self.eat(TokenKind::Semicolon)
    }
}

#[cfg(test)]
mod tests_parser;
