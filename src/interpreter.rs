//! Tree-walking interpreter for Cinder
//!
//! Statements execute to a [`Flow`]: either they complete normally or a
//! `return` is unwinding towards the nearest call. Errors travel separately
//! through [`Result`] and abort the whole run.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{BinaryOp, Expr, Literal, PostfixOp, Program, Stmt, UnaryOp};
use crate::builtins;
use crate::environment::Environment;
use crate::error::{CinderError, ErrorKind, Result};
use crate::print_handler::PrintHandler;
use crate::stack::ensure_sufficient_stack;
use crate::token::Span;
use crate::value::{ArrayCell, Function, Value};

/// Maximum depth of nested user function calls
pub const MAX_CALL_DEPTH: usize = 200;

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    /// A `return` carrying its value to the enclosing call
    Return(Value),
}

/// The interpreter state
pub struct Interpreter {
    env: Environment,
    output: PrintHandler,
    call_depth: usize,
    max_depth: usize,
}

impl Interpreter {
    /// Interpreter printing to stdout, with builtins installed
    pub fn new() -> Self {
        Self::with_output(PrintHandler::Stdout)
    }

    pub fn with_output(output: PrintHandler) -> Self {
        let mut env = Environment::new();
        builtins::install(&mut env);
        Self {
            env,
            output,
            call_depth: 0,
            max_depth: MAX_CALL_DEPTH,
        }
    }

    /// Override the call depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn output(&self) -> &PrintHandler {
        &self.output
    }

    /// The active environment; the global scope between runs
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Lex, parse and run `source` against this interpreter's state
    pub fn run_source(&mut self, source: &str) -> Result<()> {
        let program = crate::parse(source)?;
        self.interpret(&program)
    }

    /// Execute every statement of `program` in order
    pub fn interpret(&mut self, program: &Program) -> Result<()> {
        debug!(statements = program.statements.len(), "interpreting program");

        for stmt in &program.statements {
            if let Flow::Return(_) = self.execute(stmt)? {
                return Err(CinderError::at(ErrorKind::ReturnOutsideFunction, stmt.span()));
            }
        }

        debug!(scopes = self.env.depth(), "program finished");
        Ok(())
    }

    // ==================== Statements ====================

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::VarDecl { name, initializer, span } => {
                let value = self.evaluate(initializer)?;
                self.env.declare(name, value).map_err(|e| e.or_span(*span))?;
                Ok(Flow::Normal)
            }

            Stmt::Assign { name, value, span } => {
                let value = self.evaluate(value)?;
                self.env.assign(name, value).map_err(|e| e.or_span(*span))?;
                Ok(Flow::Normal)
            }

            Stmt::IndexAssign { array, index, value, span } => {
                let target = self.evaluate(array)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;

                let items = as_array(&target, *span)?;
                let slot = resolve_index(&index, items.borrow().len(), *span)?;
                items.borrow_mut()[slot] = value;
                Ok(Flow::Normal)
            }

            Stmt::If { condition, body, else_branch, .. } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.scoped(|interp| interp.execute_block(body))
                } else if let Some(else_body) = else_branch {
                    self.scoped(|interp| interp.execute_block(else_body))
                } else {
                    Ok(Flow::Normal)
                }
            }

            // one scope spans every iteration
            Stmt::While { condition, body, .. } => self.scoped(|interp| {
                while interp.evaluate(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = interp.execute_block(body)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }),

            Stmt::For { init, condition, increment, body, .. } => self.scoped(|interp| {
                interp.execute(init)?;
                while interp.evaluate(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = interp.execute_block(body)? {
                        return Ok(flow);
                    }
                    interp.execute(increment)?;
                }
                Ok(Flow::Normal)
            }),

            Stmt::Function { name, params, body, span } => {
                let function = Function::new(
                    name.clone(),
                    params.clone(),
                    body.clone(),
                    self.env.clone(),
                );
                self.env
                    .declare(name, Value::Function(Rc::new(function)))
                    .map_err(|e| e.or_span(*span))?;
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => Ok(Flow::Return(self.evaluate(value)?)),

            Stmt::Expr { expr } => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn execute_block(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            if let flow @ Flow::Return(_) = self.execute(stmt)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `f` inside a fresh scope, exiting it on every path
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.env.enter_scope();
        let result = f(self);
        self.env.exit_scope();
        result
    }

    // ==================== Expressions ====================

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.eval_expr(expr))
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(n) => Value::Float(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
            }),

            Expr::Nothing { .. } => Ok(Value::Nothing),

            Expr::Variable { name, span } => self.env.get(name).map_err(|e| e.or_span(*span)),

            Expr::Binary { left, op, right, span } => self.binary(left, *op, right, *span),

            Expr::Unary { op, operand, span } => {
                let value = self.evaluate(operand)?;
                unary(*op, value).map_err(|e| e.or_span(*span))
            }

            Expr::Postfix { name, op, span } => {
                self.postfix(name, *op).map_err(|e| e.or_span(*span))
            }

            Expr::Call { name, args, span } => self.call(name, args, *span),

            Expr::Array { elements, .. } => {
                let items = elements
                    .iter()
                    .map(|e| self.evaluate(e))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(items))
            }

            Expr::Index { array, index, span } => {
                let target = self.evaluate(array)?;
                let index = self.evaluate(index)?;

                let items = as_array(&target, *span)?;
                let items = items.borrow();
                let slot = resolve_index(&index, items.len(), *span)?;
                let value = items[slot].clone();
                Ok(value)
            }
        }
    }

    fn binary(&mut self, left: &Expr, op: BinaryOp, right: &Expr, span: Span) -> Result<Value> {
        match op {
            BinaryOp::And => {
                if !self.evaluate(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(right)?.is_truthy()))
            }
            BinaryOp::Or => {
                if self.evaluate(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate(right)?.is_truthy()))
            }
            _ => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                eval_values(&left, op, &right).map_err(|e| e.or_span(span))
            }
        }
    }

    /// `i++` / `i--`: store the updated number, yield the old one
    fn postfix(&mut self, name: &str, op: PostfixOp) -> Result<Value> {
        let current = self.env.get(name)?;
        let delta = match op {
            PostfixOp::Increment => 1,
            PostfixOp::Decrement => -1,
        };

        let updated = match &current {
            Value::Int(n) => Value::Int(n.checked_add(delta).ok_or(ErrorKind::IntegerOverflow)?),
            Value::Float(n) => Value::Float(n + delta as f64),
            other => {
                return Err(ErrorKind::TypeMismatch(format!(
                    "cannot apply '{}' to {}",
                    op,
                    other.type_name()
                ))
                .into())
            }
        };

        self.env.assign(name, updated)?;
        Ok(current)
    }

    // ==================== Calls ====================

    fn call(&mut self, name: &str, args: &[Expr], span: Span) -> Result<Value> {
        let callee = self.env.get(name).map_err(|e| e.or_span(span))?;

        // arguments are evaluated in the caller's scope
        let args = args
            .iter()
            .map(|a| self.evaluate(a))
            .collect::<Result<Vec<_>>>()?;

        let result = match &callee {
            Value::Builtin(builtin) => {
                if let Some(expected) = builtin.arity {
                    check_arity(builtin.name, expected, args.len())?;
                }
                trace!(builtin = builtin.name, args = args.len(), "calling builtin");
                (builtin.func)(self, &args)
            }
            Value::Function(function) => self.call_function(function, args),
            _ => Err(ErrorKind::NotCallable(name.to_string()).into()),
        };

        result.map_err(|e| e.or_span(span))
    }

    fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>) -> Result<Value> {
        check_arity(&function.name, function.params.len(), args.len())?;
        if self.call_depth >= self.max_depth {
            return Err(ErrorKind::StackOverflow(self.max_depth).into());
        }

        debug!(function = %function.name, depth = self.call_depth, "calling function");

        let mut call_env = function.closure.clone();
        call_env.enter_scope();
        for (param, arg) in function.params.iter().zip(args) {
            call_env.declare(param, arg)?;
        }

        let caller_env = std::mem::replace(&mut self.env, call_env);
        self.call_depth += 1;
        let result = self.execute_block(&function.body);
        self.call_depth -= 1;
        // dropping the callee environment discards its call scope
        self.env = caller_env;

        match result? {
            Flow::Return(value) => {
                trace!(function = %function.name, value = %value, "returned");
                Ok(value)
            }
            Flow::Normal => Ok(Value::Nothing),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn check_arity(name: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(ErrorKind::WrongArity {
            name: name.to_string(),
            expected,
            got,
        }
        .into());
    }
    Ok(())
}

fn as_array(value: &Value, span: Span) -> Result<&ArrayCell> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(CinderError::at(
            ErrorKind::TypeMismatch(format!("cannot index into {}", other.type_name())),
            span,
        )),
    }
}

/// Negative indices count from the end; the result must fall in `0..len`.
fn resolve_index(index: &Value, len: usize, span: Span) -> Result<usize> {
    let Value::Int(index) = *index else {
        return Err(CinderError::at(
            ErrorKind::TypeMismatch(format!("array index must be int, got {}", index.type_name())),
            span,
        ));
    };

    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(CinderError::at(ErrorKind::IndexOutOfRange { index, len }, span));
    }
    Ok(resolved as usize)
}

fn unary(op: UnaryOp, value: Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Plus, value @ (Value::Int(_) | Value::Float(_))) => Ok(value),
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.checked_neg().ok_or(ErrorKind::IntegerOverflow)?)),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (op, other) => Err(ErrorKind::TypeMismatch(format!(
            "cannot apply unary '{}' to {}",
            op,
            other.type_name()
        ))
        .into()),
    }
}

fn mismatch(left: &Value, op: BinaryOp, right: &Value) -> CinderError {
    ErrorKind::TypeMismatch(format!(
        "cannot apply '{}' to {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
    .into()
}

/// Apply a binary operator to two evaluated operands
pub fn eval_values(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    let has_nothing = matches!(left, Value::Nothing) || matches!(right, Value::Nothing);

    match op {
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        _ if has_nothing => Err(mismatch(left, op, right)),
        BinaryOp::Add => match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", left, right)))
            }
            _ => arithmetic(left, op, right, i64::checked_add, |a, b| a + b),
        },
        BinaryOp::Sub => arithmetic(left, op, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(left, op, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(mismatch(left, op, right));
            };
            if b == 0.0 {
                return Err(ErrorKind::DivisionByZero.into());
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::Eq => equals(left, right).map(Value::Bool).ok_or_else(|| mismatch(left, op, right)),
        BinaryOp::Ne => equals(left, right).map(|eq| Value::Bool(!eq)).ok_or_else(|| mismatch(left, op, right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(left, op, right),
    }
}

fn arithmetic(
    left: &Value,
    op: BinaryOp,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| ErrorKind::IntegerOverflow.into());
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
        _ => Err(mismatch(left, op, right)),
    }
}

/// `None` when the two kinds cannot be compared for equality
fn equals(left: &Value, right: &Value) -> Option<bool> {
    equals_in(left, right, &mut Vec::new())
}

/// Arrays compare element by element under the same rules as scalars,
/// stopping at the first unequal pair. `open` holds the array pairs being
/// compared so cyclic arrays terminate.
fn equals_in(
    left: &Value,
    right: &Value,
    open: &mut Vec<(*const ArrayCell, *const ArrayCell)>,
) -> Option<bool> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a == b),
        (a, b) if a.is_numeric() && b.is_numeric() => Some(a.as_f64() == b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a == b),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        (Value::Array(a), Value::Array(b)) => {
            let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
            if open.contains(&pair) {
                return Some(true);
            }

            let (xs, ys) = (a.borrow(), b.borrow());
            if xs.len() != ys.len() {
                return Some(false);
            }

            open.push(pair);
            let mut result = Some(true);
            for (x, y) in xs.iter().zip(ys.iter()) {
                match ensure_sufficient_stack(|| equals_in(x, y, open)) {
                    Some(true) => {}
                    other => {
                        result = other;
                        break;
                    }
                }
            }
            open.pop();
            result
        }
        _ => None,
    }
}

fn compare(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64().partial_cmp(&b.as_f64()),
        _ => return Err(mismatch(left, op, right)),
    };

    // NaN compares false with everything
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };

    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Bool(result))
}
