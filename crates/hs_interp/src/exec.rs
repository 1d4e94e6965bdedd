use std::collections::HashMap;

use hs_ast::ast::{AssignOp, BinOp, DeclType, Expr, RangeSpec, Stmt, UnaryOp};
use hs_ast::Spanned;
use hs_sim::GameState;

use crate::builtins;
use crate::value::Value;
use crate::RuntimeError;

/// Hard ceiling on loop iterations. Scripts have no other cancellation
/// mechanism, so a runaway `while` must terminate on its own.
pub const MAX_LOOP_ITERATIONS: usize = 10_000;

// ── Variable table ─────────────────────────────────────────────

/// A dialect's persistent variable table. One per front-end, carried
/// across `interpret()` calls (REPL semantics, not a fresh process).
#[derive(Debug, Default)]
pub struct Vars {
    values: HashMap<String, Value>,
    /// Declared types, populated only by the typed front-end.
    decl_types: HashMap<String, DeclType>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|s| s.as_str())
    }

    /// Direct untyped binding, used by front-ends that assign outside
    /// the shared executor (the shell's `NAME=value` words).
    pub fn set(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }
}

// ── Execution environment ──────────────────────────────────────

/// Borrowed context for one `interpret()` call. Constructor-injected:
/// no ambient lookups anywhere downstream.
pub struct Env<'a> {
    pub vars: &'a mut Vars,
    pub state: &'a mut GameState,
    pub output: &'a mut Vec<String>,
}

// ── Statements ─────────────────────────────────────────────────

pub fn exec_stmts(env: &mut Env, stmts: &[Spanned<Stmt>]) -> Result<(), RuntimeError> {
    for stmt in stmts {
        exec_stmt(env, stmt)?;
    }
    Ok(())
}

fn exec_stmt(env: &mut Env, stmt: &Spanned<Stmt>) -> Result<(), RuntimeError> {
    match &stmt.node {
        Stmt::Assign {
            name,
            op,
            value,
            decl,
        } => exec_assign(env, name, *op, value, *decl),
        Stmt::Expr(expr) => {
            eval_expr(env, expr)?;
            Ok(())
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval_expr(env, cond)?.is_truthy() {
                exec_stmts(env, then_branch)
            } else {
                exec_stmts(env, else_branch)
            }
        }
        Stmt::While { cond, body } => {
            let mut iterations = 0usize;
            while eval_expr(env, cond)?.is_truthy() {
                iterations += 1;
                if iterations > MAX_LOOP_ITERATIONS {
                    return Err(RuntimeError::with_span(
                        format!("while loop exceeded {} iterations", MAX_LOOP_ITERATIONS),
                        stmt.span,
                    ));
                }
                exec_stmts(env, body)?;
            }
            Ok(())
        }
        Stmt::For { var, range, body } => exec_for(env, var, range, body),
        Stmt::Label(_) => Ok(()),
    }
}

fn exec_assign(
    env: &mut Env,
    name: &str,
    op: AssignOp,
    value: &Spanned<Expr>,
    decl: Option<DeclType>,
) -> Result<(), RuntimeError> {
    let rhs = eval_expr(env, value)?;

    let new_value = match op {
        AssignOp::Eq => rhs,
        AssignOp::PlusEq | AssignOp::MinusEq => {
            let current = env.vars.get(name).cloned().ok_or_else(|| {
                RuntimeError::with_span(format!("unknown variable '{}'", name), value.span)
            })?;
            let bin_op = if op == AssignOp::PlusEq {
                BinOp::Add
            } else {
                BinOp::Sub
            };
            apply_binop(bin_op, &current, &rhs, value.span)?
        }
    };

    if let Some(decl) = decl {
        env.vars.decl_types.insert(name.to_string(), decl);
    }
    let coerced = match env.vars.decl_types.get(name) {
        Some(decl) => coerce_declared(*decl, new_value, name, value)?,
        None => new_value,
    };

    env.vars.values.insert(name.to_string(), coerced);
    Ok(())
}

/// Enforce a declared type, allowing int-to-float widening.
fn coerce_declared(
    decl: DeclType,
    value: Value,
    name: &str,
    expr: &Spanned<Expr>,
) -> Result<Value, RuntimeError> {
    let ok = match (decl, &value) {
        (DeclType::Int, Value::Int(_)) => true,
        (DeclType::Float, Value::Float(_)) => true,
        (DeclType::Float, Value::Int(n)) => return Ok(Value::Float(*n as f64)),
        (DeclType::Str, Value::Str(_)) => true,
        (DeclType::Bool, Value::Bool(_)) => true,
        _ => false,
    };
    if ok {
        Ok(value)
    } else {
        Err(RuntimeError::with_span(
            format!(
                "cannot assign {} to {} {}",
                value.type_name(),
                decl.name(),
                name
            ),
            expr.span,
        ))
    }
}

fn exec_for(
    env: &mut Env,
    var: &str,
    range: &RangeSpec,
    body: &[Spanned<Stmt>],
) -> Result<(), RuntimeError> {
    let mut bounds = Vec::with_capacity(range.args.len());
    for arg in &range.args {
        match eval_expr(env, arg)? {
            Value::Int(n) => bounds.push(n),
            other => {
                return Err(RuntimeError::with_span(
                    format!("range() arguments must be integers, got {}", other.type_name()),
                    arg.span,
                ))
            }
        }
    }

    // The standard three-overload rules.
    let (start, end, step) = match bounds.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step] => (*start, *end, *step),
        _ => {
            return Err(RuntimeError::with_span(
                "range() takes 1 to 3 arguments",
                range.span,
            ))
        }
    };
    if step == 0 {
        return Err(RuntimeError::with_span(
            "range() step must not be zero",
            range.span,
        ));
    }

    let mut current = start;
    let mut iterations = 0usize;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        iterations += 1;
        if iterations > MAX_LOOP_ITERATIONS {
            return Err(RuntimeError::with_span(
                format!("for loop exceeded {} iterations", MAX_LOOP_ITERATIONS),
                range.span,
            ));
        }
        env.vars
            .values
            .insert(var.to_string(), Value::Int(current));
        exec_stmts(env, body)?;
        current += step;
    }
    Ok(())
}

// ── Expressions ────────────────────────────────────────────────

pub fn eval_expr(env: &mut Env, expr: &Spanned<Expr>) -> Result<Value, RuntimeError> {
    match &expr.node {
        Expr::Literal(literal) => Ok(Value::from(literal)),
        Expr::Ident(name) => env.vars.get(name).cloned().ok_or_else(|| {
            RuntimeError::with_span(format!("unknown variable '{}'", name), expr.span)
        }),
        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(env, arg)?);
            }
            let outcome = builtins::call_builtin(env.state, name, &values)
                .map_err(|e| match e.span {
                    Some(_) => e,
                    None => RuntimeError::with_span(e.message, expr.span),
                })?;
            env.output.extend(outcome.output);
            env.output.extend(env.state.take_events());
            Ok(Value::Bool(outcome.success))
        }
        Expr::BinOp { op, lhs, rhs } => {
            // Short-circuit logic on truthiness.
            match op {
                BinOp::And => {
                    let left = eval_expr(env, lhs)?;
                    if !left.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let right = eval_expr(env, rhs)?;
                    return Ok(Value::Bool(right.is_truthy()));
                }
                BinOp::Or => {
                    let left = eval_expr(env, lhs)?;
                    if left.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let right = eval_expr(env, rhs)?;
                    return Ok(Value::Bool(right.is_truthy()));
                }
                _ => {}
            }
            let left = eval_expr(env, lhs)?;
            let right = eval_expr(env, rhs)?;
            apply_binop(*op, &left, &right, expr.span)
        }
        Expr::UnaryOp { op, operand } => {
            let value = eval_expr(env, operand)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(n) => Ok(Value::Int(-n)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(RuntimeError::with_span(
                        format!("cannot negate {}", other.type_name()),
                        expr.span,
                    )),
                },
            }
        }
    }
}

fn apply_binop(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
    span: hs_ast::Span,
) -> Result<Value, RuntimeError> {
    use BinOp::*;

    match op {
        Eq => return Ok(Value::Bool(value_eq(lhs, rhs))),
        NotEq => return Ok(Value::Bool(!value_eq(lhs, rhs))),
        _ => {}
    }

    // String concatenation.
    if op == Add {
        if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
    }

    // String ordering.
    if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
        let result = match op {
            Lt => a < b,
            Gt => a > b,
            LtEq => a <= b,
            GtEq => a >= b,
            _ => {
                return Err(RuntimeError::with_span(
                    "operator not defined for strings",
                    span,
                ))
            }
        };
        return Ok(Value::Bool(result));
    }

    // Integer arithmetic stays integral.
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        return match op {
            Add => Ok(Value::Int(a.wrapping_add(*b))),
            Sub => Ok(Value::Int(a.wrapping_sub(*b))),
            Mul => Ok(Value::Int(a.wrapping_mul(*b))),
            Div => {
                if *b == 0 {
                    Err(RuntimeError::with_span("division by zero", span))
                } else {
                    Ok(Value::Int(a / b))
                }
            }
            Mod => {
                if *b == 0 {
                    Err(RuntimeError::with_span("modulo by zero", span))
                } else {
                    Ok(Value::Int(a % b))
                }
            }
            Lt => Ok(Value::Bool(a < b)),
            Gt => Ok(Value::Bool(a > b)),
            LtEq => Ok(Value::Bool(a <= b)),
            GtEq => Ok(Value::Bool(a >= b)),
            Eq | NotEq | And | Or => unreachable!("handled above"),
        };
    }

    // Mixed numeric promotes to float.
    let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(RuntimeError::with_span(
            format!(
                "operator not defined for {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ),
            span,
        ));
    };
    match op {
        Add => Ok(Value::Float(a + b)),
        Sub => Ok(Value::Float(a - b)),
        Mul => Ok(Value::Float(a * b)),
        Div => {
            if b == 0.0 {
                Err(RuntimeError::with_span("division by zero", span))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        Mod => {
            if b == 0.0 {
                Err(RuntimeError::with_span("modulo by zero", span))
            } else {
                Ok(Value::Float(a % b))
            }
        }
        Lt => Ok(Value::Bool(a < b)),
        Gt => Ok(Value::Bool(a > b)),
        LtEq => Ok(Value::Bool(a <= b)),
        GtEq => Ok(Value::Bool(a >= b)),
        Eq | NotEq | And | Or => unreachable!("handled above"),
    }
}

/// Runtime equality: numeric across Int/Float, structural otherwise.
/// Cross-type comparisons are `false`, not errors.
fn value_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => lhs == rhs,
    }
}
