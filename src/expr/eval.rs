//! Interpreter for parsed rule conditions.
//!
//! Evaluation walks the expression tree against a JSON object context.
//! Dotted field paths traverse nested objects; a missing path resolves to
//! null rather than erroring, so rules can probe optional fields. The final
//! result is coerced to a boolean by truthiness (`false`, `0`, `""`, and
//! `null` are falsy), matching how loosely-written rule text expects to
//! behave.

use serde_json::Value;

use super::parser::{BinaryOp, Expr, Literal, UnaryOp};
use super::ExprError;

/// Tolerance for float comparison
const EPSILON: f64 = 1e-9;

/// Intermediate value produced while walking the tree
#[derive(Debug, Clone, PartialEq)]
enum EvalValue {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Json(Value),
}

impl EvalValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => EvalValue::Null,
            Value::Bool(b) => EvalValue::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(f) => EvalValue::Number(f),
                None => EvalValue::Json(value.clone()),
            },
            Value::String(s) => EvalValue::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => EvalValue::Json(value.clone()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            EvalValue::Number(_) => "number",
            EvalValue::Str(_) => "string",
            EvalValue::Bool(_) => "boolean",
            EvalValue::Null => "null",
            EvalValue::Json(Value::Array(_)) => "array",
            EvalValue::Json(_) => "object",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            EvalValue::Bool(b) => *b,
            EvalValue::Number(n) => *n != 0.0 && !n.is_nan(),
            EvalValue::Str(s) => !s.is_empty(),
            EvalValue::Null => false,
            EvalValue::Json(_) => true,
        }
    }
}

/// Evaluate an expression against a context and coerce the result to bool
pub fn evaluate_truthy(expr: &Expr, context: &Value) -> Result<bool, ExprError> {
    Ok(eval(expr, context)?.truthy())
}

fn eval(expr: &Expr, context: &Value) -> Result<EvalValue, ExprError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Number(n) => EvalValue::Number(*n),
            Literal::String(s) => EvalValue::Str(s.clone()),
            Literal::Bool(b) => EvalValue::Bool(*b),
            Literal::Null => EvalValue::Null,
        }),
        Expr::Field(path) => Ok(resolve_path(path, context)),
        Expr::Unary { op, operand } => {
            let value = eval(operand, context)?;
            match op {
                UnaryOp::Not => Ok(EvalValue::Bool(!value.truthy())),
                UnaryOp::Neg => match value {
                    EvalValue::Number(n) => Ok(EvalValue::Number(-n)),
                    other => Err(ExprError::Eval(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                },
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, context),
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    context: &Value,
) -> Result<EvalValue, ExprError> {
    // boolean operators short-circuit on the left operand's truthiness
    match op {
        BinaryOp::And => {
            let l = eval(left, context)?;
            if !l.truthy() {
                return Ok(EvalValue::Bool(false));
            }
            return Ok(EvalValue::Bool(eval(right, context)?.truthy()));
        }
        BinaryOp::Or => {
            let l = eval(left, context)?;
            if l.truthy() {
                return Ok(EvalValue::Bool(true));
            }
            return Ok(EvalValue::Bool(eval(right, context)?.truthy()));
        }
        _ => {}
    }

    let l = eval(left, context)?;
    let r = eval(right, context)?;

    match op {
        BinaryOp::Eq => Ok(EvalValue::Bool(values_equal(&l, &r))),
        BinaryOp::Ne => Ok(EvalValue::Bool(!values_equal(&l, &r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => order_values(op, &l, &r),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, &l, &r),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn resolve_path(path: &str, context: &Value) -> EvalValue {
    let mut current = context;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return EvalValue::Null,
            },
            _ => return EvalValue::Null,
        }
    }
    EvalValue::from_json(current)
}

/// Equality is strict across types: mismatched types compare unequal
fn values_equal(l: &EvalValue, r: &EvalValue) -> bool {
    match (l, r) {
        (EvalValue::Number(a), EvalValue::Number(b)) => (a - b).abs() < EPSILON,
        (EvalValue::Str(a), EvalValue::Str(b)) => a == b,
        (EvalValue::Bool(a), EvalValue::Bool(b)) => a == b,
        (EvalValue::Null, EvalValue::Null) => true,
        (EvalValue::Json(a), EvalValue::Json(b)) => a == b,
        _ => false,
    }
}

fn order_values(op: BinaryOp, l: &EvalValue, r: &EvalValue) -> Result<EvalValue, ExprError> {
    let ordering = match (l, r) {
        (EvalValue::Number(a), EvalValue::Number(b)) => a.partial_cmp(b),
        (EvalValue::Str(a), EvalValue::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ExprError::Eval(format!(
                "cannot order {} against {}",
                l.type_name(),
                r.type_name()
            )))
        }
    };
    let ordering = ordering
        .ok_or_else(|| ExprError::Eval("incomparable numeric values".into()))?;

    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("not an ordering operator"),
    };
    Ok(EvalValue::Bool(result))
}

fn arithmetic(op: BinaryOp, l: &EvalValue, r: &EvalValue) -> Result<EvalValue, ExprError> {
    let (a, b) = match (l, r) {
        (EvalValue::Number(a), EvalValue::Number(b)) => (*a, *b),
        _ => {
            return Err(ExprError::Eval(format!(
                "arithmetic requires numbers, got {} and {}",
                l.type_name(),
                r.type_name()
            )))
        }
    };

    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExprError::Eval("division by zero".into()));
            }
            a / b
        }
        _ => unreachable!("not an arithmetic operator"),
    };
    Ok(EvalValue::Number(result))
}
