//! Code generation.
//!
//! A stack-based evaluator over the checked AST. Every materialized
//! intermediate result is stored into a temporary slot at a negative
//! `%ebp` offset; the temp pointer resets between statements and the
//! low-water mark becomes the function's deferred `name.size` symbol,
//! so the prologue needs a single `subl`. Integer work goes through
//! `%eax`; double-typed operations use the x87 stack (`fldl`/`fstpl`).
//! Assignment evaluates its left side in "indirect" mode, where a
//! dereference yields the pointer's location instead of loading through
//! it, so stores land in the pointed-to object.

use std::fmt::Write as _;

use hashbrown::HashMap;
use log::debug;
use symbol_table::GlobalSymbol as Name;

use crate::ast::{BinaryOp, Block, ExprKind, Expression, Function, Statement};
use crate::codegen::allocator;
use crate::semantic::symbol_table::{SymbolId, SymbolTable};

macro_rules! emit {
    ($self:ident, $($arg:tt)*) => {{
        let _ = writeln!($self.output, $($arg)*);
    }};
}

/// The emitter: output buffer, label counters, literal interning
/// tables, and the temporary-offset trackers for the function being
/// generated.
pub struct Emitter {
    output: String,

    // Monotone counters: `.L` labels (control flow and strings share
    // one sequence), `.fp` float labels, `.Lret` epilogue labels.
    label_count: u32,
    float_count: u32,
    return_count: u32,

    // Interned literals, in first-use order.
    float_labels: Vec<(u32, Name)>,
    float_index: HashMap<Name, u32>,
    string_labels: Vec<(u32, Name)>,
    string_index: HashMap<Name, u32>,

    // Temporary tracking for the current function.
    temp_offset: i32,
    reset_point: i32,
    max_depth: i32,
    return_label: u32,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            output: String::new(),
            label_count: 0,
            float_count: 0,
            return_count: 0,
            float_labels: Vec::new(),
            float_index: HashMap::new(),
            string_labels: Vec::new(),
            string_index: HashMap::new(),
            temp_offset: 0,
            reset_point: 0,
            max_depth: 0,
            return_label: 0,
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn next_label(&mut self) -> u32 {
        let n = self.label_count;
        self.label_count += 1;
        n
    }

    /// Claim the next temporary slot for a result of `size` bytes.
    fn assign_temp(&mut self, size: u32) -> String {
        self.temp_offset -= size as i32;
        format!("{}(%ebp)", self.temp_offset)
    }

    fn intern_float(&mut self, spelling: Name) -> u32 {
        if let Some(&n) = self.float_index.get(&spelling) {
            return n;
        }
        let n = self.float_count;
        self.float_count += 1;
        self.float_labels.push((n, spelling));
        self.float_index.insert(spelling, n);
        debug!("interned float {spelling} as .fp{n}");
        n
    }

    fn intern_string(&mut self, spelling: Name) -> u32 {
        if let Some(&n) = self.string_index.get(&spelling) {
            return n;
        }
        let n = self.next_label();
        self.string_labels.push((n, spelling));
        self.string_index.insert(spelling, n);
        debug!("interned string {spelling} as .L{n}");
        n
    }

    /// Generate one function: allocate its frame, emit the prologue,
    /// body and single epilogue, and define the deferred frame-size
    /// symbol from the deepest temporary reached.
    pub fn generate_function(&mut self, function: &mut Function, symbols: &mut SymbolTable) {
        let offset = allocator::allocate_function(function, symbols);
        let name = symbols.symbol(function.id).name;

        self.return_label = self.return_count;
        self.return_count += 1;
        self.temp_offset = offset;
        self.reset_point = offset;
        self.max_depth = offset;
        debug!("generating {name}, locals reach {offset}");

        emit!(self, "{name}:");
        emit!(self, "\tpushl\t%ebp");
        emit!(self, "\tmovl\t%esp, %ebp");
        emit!(self, "\tsubl\t${name}.size, %esp");

        self.generate_block(&mut function.body, symbols);

        emit!(self, ".Lret_{}:", self.return_label);
        emit!(self, "\tmovl\t%ebp, %esp");
        emit!(self, "\tpopl\t%ebp");
        emit!(self, "\tret");
        emit!(self, "");
        emit!(self, "\t.global\t{name}");
        emit!(self, "\t.set\t{name}.size, {}", -self.max_depth);
        emit!(self, "");
    }

    /// Emit the data section: global variables, then interned float and
    /// string literals. Nothing is emitted when there is nothing to
    /// declare.
    pub fn generate_globals(&mut self, globals: &[SymbolId], symbols: &SymbolTable) {
        if globals.is_empty() && self.float_labels.is_empty() && self.string_labels.is_empty() {
            return;
        }

        emit!(self, "\t.data");

        for &id in globals {
            let symbol = symbols.symbol(id);
            emit!(self, "\t.comm\t{}, {}, 4", symbol.name, symbol.ty.size());
        }

        for &(n, value) in &self.float_labels {
            emit!(self, ".fp{n}:\t.double\t{value}");
        }

        for &(n, value) in &self.string_labels {
            emit!(self, ".L{n}:\t.asciz\t{value}");
        }
    }

    fn generate_block(&mut self, block: &mut Block, symbols: &SymbolTable) {
        for statement in &mut block.statements {
            self.generate_statement(statement, symbols);

            // Temporaries live for one statement; record the low-water
            // mark and rewind.
            if self.temp_offset < self.max_depth {
                self.max_depth = self.temp_offset;
            }
            self.temp_offset = self.reset_point;
        }
    }

    fn generate_statement(&mut self, statement: &mut Statement, symbols: &SymbolTable) {
        match statement {
            Statement::Expression(expr) => self.generate_expr(expr, symbols),

            Statement::Return(expr) => {
                self.generate_expr(expr, symbols);
                if expr.ty.is_real() {
                    emit!(self, "\tfldl\t{}", expr.operand);
                } else {
                    emit!(self, "\tmovl\t{}, %eax", expr.operand);
                }
                emit!(self, "\tjmp\t.Lret_{}", self.return_label);
            }

            Statement::Block(block) => self.generate_block(block, symbols),

            Statement::While { test, body } => {
                let top = self.next_label();
                let exit = self.next_label();
                emit!(self, ".L{top}:");
                self.generate_expr(test, symbols);
                emit!(self, "\tmovl\t{}, %eax", test.operand);
                emit!(self, "\ttestl\t%eax, %eax");
                emit!(self, "\tje\t.L{exit}");
                self.generate_statement(body, symbols);
                emit!(self, "\tjmp\t.L{top}");
                emit!(self, ".L{exit}:");
            }

            Statement::If {
                test,
                then_branch,
                else_branch,
            } => {
                self.generate_expr(test, symbols);
                let skip = self.next_label();
                emit!(self, "\tmovl\t{}, %eax", test.operand);
                emit!(self, "\ttestl\t%eax, %eax");
                emit!(self, "\tje\t.L{skip}");
                self.generate_statement(then_branch, symbols);

                match else_branch {
                    Some(else_branch) => {
                        let join = self.next_label();
                        emit!(self, "\tjmp\t.L{join}");
                        emit!(self, ".L{skip}:");
                        self.generate_statement(else_branch, symbols);
                        emit!(self, ".L{join}:");
                    }
                    None => emit!(self, ".L{skip}:"),
                }
            }
        }
    }

    /// Evaluate for the left side of an assignment. A dereference only
    /// computes its pointer and reports `true`, so the caller can store
    /// through it; everything else evaluates normally.
    fn generate_indirect(&mut self, expr: &mut Expression, symbols: &SymbolTable) -> bool {
        if let ExprKind::Dereference(inner) = &mut expr.kind {
            self.generate_expr(inner, symbols);
            expr.operand = inner.operand.clone();
            true
        } else {
            self.generate_expr(expr, symbols);
            false
        }
    }

    fn generate_expr(&mut self, expr: &mut Expression, symbols: &SymbolTable) {
        let size = expr.ty.size();
        let is_real = expr.ty.is_real();

        match &mut expr.kind {
            // Leaves only update their operand.
            ExprKind::Identifier(id) => {
                let symbol = symbols.symbol(*id);
                expr.operand = if symbol.offset != 0 {
                    format!("{}(%ebp)", symbol.offset)
                } else {
                    symbol.name.to_string()
                };
            }

            ExprKind::Integer(spelling) => expr.operand = format!("${spelling}"),

            ExprKind::Real(spelling) => {
                let n = self.intern_float(*spelling);
                expr.operand = format!(".fp{n}");
            }

            ExprKind::StringLit(spelling) => {
                let n = self.intern_string(*spelling);
                expr.operand = format!(".L{n}");
            }

            ExprKind::Call(id, args) => {
                // cdecl: arguments pushed right to left, caller pops.
                let mut bytes = 0;
                for arg in args.iter_mut().rev() {
                    self.generate_expr(arg, symbols);
                    if arg.ty.is_real() {
                        emit!(self, "\tsubl\t$8, %esp");
                        emit!(self, "\tfldl\t{}", arg.operand);
                        emit!(self, "\tfstpl\t(%esp)");
                    } else {
                        emit!(self, "\tpushl\t{}", arg.operand);
                    }
                    bytes += arg.ty.size();
                }

                emit!(self, "\tcall\t{}", symbols.symbol(*id).name);
                if bytes > 0 {
                    emit!(self, "\taddl\t${bytes}, %esp");
                }

                let tmp = self.assign_temp(size);
                if is_real {
                    emit!(self, "\tfstpl\t{tmp}");
                } else {
                    emit!(self, "\tmovl\t%eax, {tmp}");
                }
                expr.operand = tmp;
            }

            ExprKind::Not(inner) => {
                self.generate_expr(inner, symbols);
                let tmp = self.assign_temp(size);
                if inner.ty.is_real() {
                    emit!(self, "\tfldl\t{}", inner.operand);
                    emit!(self, "\tftst");
                    emit!(self, "\tfstp\t%st(0)");
                    emit!(self, "\tfnstsw\t%ax");
                    emit!(self, "\tsahf");
                } else {
                    emit!(self, "\tmovl\t{}, %eax", inner.operand);
                    emit!(self, "\ttestl\t%eax, %eax");
                }
                emit!(self, "\tsete\t%al");
                emit!(self, "\tmovzbl\t%al, %eax");
                emit!(self, "\tmovl\t%eax, {tmp}");
                expr.operand = tmp;
            }

            ExprKind::Negate(inner) => {
                self.generate_expr(inner, symbols);
                let tmp = self.assign_temp(size);
                if is_real {
                    emit!(self, "\tfldl\t{}", inner.operand);
                    emit!(self, "\tfchs");
                    emit!(self, "\tfstpl\t{tmp}");
                } else {
                    emit!(self, "\tmovl\t{}, %eax", inner.operand);
                    emit!(self, "\tnegl\t%eax");
                    emit!(self, "\tmovl\t%eax, {tmp}");
                }
                expr.operand = tmp;
            }

            ExprKind::Dereference(inner) => {
                self.generate_expr(inner, symbols);
                let tmp = self.assign_temp(size);
                emit!(self, "\tmovl\t{}, %eax", inner.operand);
                if is_real {
                    emit!(self, "\tfldl\t(%eax)");
                    emit!(self, "\tfstpl\t{tmp}");
                } else {
                    emit!(self, "\tmovl\t(%eax), %eax");
                    emit!(self, "\tmovl\t%eax, {tmp}");
                }
                expr.operand = tmp;
            }

            ExprKind::Address(inner) => {
                // &*p is just p; a label operand is an address constant.
                let indirect = self.generate_indirect(inner, symbols);
                if indirect {
                    expr.operand = inner.operand.clone();
                } else if inner.operand.starts_with('.') {
                    expr.operand = format!("${}", inner.operand);
                } else {
                    let tmp = self.assign_temp(size);
                    emit!(self, "\tleal\t{}, %eax", inner.operand);
                    emit!(self, "\tmovl\t%eax, {tmp}");
                    expr.operand = tmp;
                }
            }

            ExprKind::Cast(inner) => {
                self.generate_expr(inner, symbols);
                if inner.ty.is_real() == is_real {
                    // Same representation; nothing to materialize.
                    expr.operand = inner.operand.clone();
                } else if is_real {
                    let tmp = self.assign_temp(size);
                    emit!(self, "\tfildl\t{}", inner.operand);
                    emit!(self, "\tfstpl\t{tmp}");
                    expr.operand = tmp;
                } else {
                    let tmp = self.assign_temp(size);
                    emit!(self, "\tfldl\t{}", inner.operand);
                    emit!(self, "\tfistpl\t{tmp}");
                    expr.operand = tmp;
                }
            }

            ExprKind::Binary(op, left, right) => {
                let op = *op;
                match op {
                    BinaryOp::Assign => {
                        let indirect = self.generate_indirect(left, symbols);
                        self.generate_expr(right, symbols);
                        let tmp = self.assign_temp(size);

                        if left.ty.is_real() {
                            emit!(self, "\tfldl\t{}", right.operand);
                            if indirect {
                                emit!(self, "\tmovl\t{}, %eax", left.operand);
                                emit!(self, "\tfstl\t(%eax)");
                            } else {
                                emit!(self, "\tfstl\t{}", left.operand);
                            }
                            emit!(self, "\tfstpl\t{tmp}");
                        } else {
                            emit!(self, "\tmovl\t{}, %eax", right.operand);
                            if indirect {
                                emit!(self, "\tmovl\t{}, %ecx", left.operand);
                                emit!(self, "\tmovl\t%eax, (%ecx)");
                            } else {
                                emit!(self, "\tmovl\t%eax, {}", left.operand);
                            }
                            emit!(self, "\tmovl\t%eax, {tmp}");
                        }
                        expr.operand = tmp;
                    }

                    BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                        // Short circuit: branch on the left value, and
                        // materialize whatever the flags say at the join.
                        let jump = if op == BinaryOp::LogicalAnd { "je" } else { "jne" };
                        self.generate_expr(left, symbols);
                        let tmp = self.assign_temp(size);
                        let label = self.next_label();
                        emit!(self, "\tmovl\t{}, %eax", left.operand);
                        emit!(self, "\ttestl\t%eax, %eax");
                        emit!(self, "\t{jump}\t.L{label}");
                        self.generate_expr(right, symbols);
                        emit!(self, "\tmovl\t{}, %eax", right.operand);
                        emit!(self, "\ttestl\t%eax, %eax");
                        emit!(self, ".L{label}:");
                        emit!(self, "\tsetne\t%al");
                        emit!(self, "\tmovzbl\t%al, %eax");
                        emit!(self, "\tmovl\t%eax, {tmp}");
                        expr.operand = tmp;
                    }

                    BinaryOp::Remainder => {
                        self.generate_expr(left, symbols);
                        self.generate_expr(right, symbols);
                        let tmp = self.assign_temp(size);
                        emit!(self, "\tmovl\t{}, %eax", left.operand);
                        emit!(self, "\tcltd");
                        emit!(self, "\tmovl\t{}, %ecx", right.operand);
                        emit!(self, "\tidivl\t%ecx");
                        emit!(self, "\tmovl\t%edx, {tmp}");
                        expr.operand = tmp;
                    }

                    BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Add | BinaryOp::Subtract => {
                        self.generate_expr(left, symbols);
                        self.generate_expr(right, symbols);
                        let tmp = self.assign_temp(size);

                        if is_real {
                            let instruction = match op {
                                BinaryOp::Multiply => "fmull",
                                BinaryOp::Divide => "fdivl",
                                BinaryOp::Add => "faddl",
                                _ => "fsubl",
                            };
                            emit!(self, "\tfldl\t{}", left.operand);
                            emit!(self, "\t{instruction}\t{}", right.operand);
                            emit!(self, "\tfstpl\t{tmp}");
                        } else if op == BinaryOp::Divide {
                            emit!(self, "\tmovl\t{}, %eax", left.operand);
                            emit!(self, "\tcltd");
                            emit!(self, "\tmovl\t{}, %ecx", right.operand);
                            emit!(self, "\tidivl\t%ecx");
                            emit!(self, "\tmovl\t%eax, {tmp}");
                        } else {
                            let instruction = match op {
                                BinaryOp::Multiply => "imull",
                                BinaryOp::Add => "addl",
                                _ => "subl",
                            };
                            emit!(self, "\tmovl\t{}, %eax", left.operand);
                            emit!(self, "\t{instruction}\t{}, %eax", right.operand);
                            emit!(self, "\tmovl\t%eax, {tmp}");
                        }
                        expr.operand = tmp;
                    }

                    // Comparisons.
                    _ => {
                        self.generate_expr(left, symbols);
                        self.generate_expr(right, symbols);
                        let tmp = self.assign_temp(size);

                        if left.ty.is_real() {
                            emit!(self, "\tfldl\t{}", left.operand);
                            emit!(self, "\tfcompl\t{}", right.operand);
                            emit!(self, "\tfnstsw\t%ax");
                            emit!(self, "\tsahf");
                            emit!(self, "\t{}\t%al", real_condition(op));
                        } else {
                            emit!(self, "\tmovl\t{}, %eax", left.operand);
                            emit!(self, "\tcmpl\t{}, %eax", right.operand);
                            emit!(self, "\t{}\t%al", int_condition(op));
                        }
                        emit!(self, "\tmovzbl\t%al, %eax");
                        emit!(self, "\tmovl\t%eax, {tmp}");
                        expr.operand = tmp;
                    }
                }
            }
        }
    }
}

/// Signed condition codes for integer comparisons.
fn int_condition(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Less => "setl",
        BinaryOp::Greater => "setg",
        BinaryOp::LessEqual => "setle",
        BinaryOp::GreaterEqual => "setge",
        BinaryOp::Equal => "sete",
        _ => "setne",
    }
}

/// x87 comparisons come back through `sahf`, which lands the result in
/// the carry/zero flags, so the unsigned-style conditions apply.
fn real_condition(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Less => "setb",
        BinaryOp::Greater => "seta",
        BinaryOp::LessEqual => "setbe",
        BinaryOp::GreaterEqual => "setae",
        BinaryOp::Equal => "sete",
        _ => "setne",
    }
}
