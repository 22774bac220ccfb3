use super::ast::{Expression, PathRoot};
use crate::error::EvalError;
use serde_json::Value;

/// The four objects a condition can read from.
///
/// `data` is the *primary* data object: the root content data, or the
/// nearest array-item's local object when the owning rule was compiled
/// with `use_item_data` and an item scope is present.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub user: &'a Value,
    pub ctx: &'a Value,
    pub data: &'a Value,
    pub item_data: Option<&'a Value>,
}

/// JS-like truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy,
/// everything else (including empty arrays and objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The core recursive engine for evaluating a parsed condition.
pub struct ExprEngine<'a> {
    context: EvalContext<'a>,
}

impl<'a> ExprEngine<'a> {
    pub fn new(context: EvalContext<'a>) -> Self {
        Self { context }
    }

    pub fn evaluate(&self, expr: &Expression) -> Result<Value, EvalError> {
        match expr {
            // --- Logical operations ---
            Expression::Not(v) => {
                let value = self.evaluate(v)?;
                Ok(Value::Bool(!is_truthy(&value)))
            }
            Expression::And(l, r) => {
                let left = self.evaluate(l)?;
                if !is_truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                let right = self.evaluate(r)?;
                Ok(Value::Bool(is_truthy(&right)))
            }
            Expression::Or(l, r) => {
                let left = self.evaluate(l)?;
                if is_truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                let right = self.evaluate(r)?;
                Ok(Value::Bool(is_truthy(&right)))
            }

            // --- Equality ---
            Expression::Equal(l, r) => {
                let left = self.evaluate(l)?;
                let right = self.evaluate(r)?;
                Ok(Value::Bool(values_equal(&left, &right)))
            }
            Expression::NotEqual(l, r) => {
                let left = self.evaluate(l)?;
                let right = self.evaluate(r)?;
                Ok(Value::Bool(!values_equal(&left, &right)))
            }

            // --- Ordering comparisons ---
            Expression::GreaterThan(l, r) => {
                self.eval_comparison(l, r, ">", |o| o == std::cmp::Ordering::Greater)
            }
            Expression::GreaterThanOrEqual(l, r) => {
                self.eval_comparison(l, r, ">=", |o| o != std::cmp::Ordering::Less)
            }
            Expression::SmallerThan(l, r) => {
                self.eval_comparison(l, r, "<", |o| o == std::cmp::Ordering::Less)
            }
            Expression::SmallerThanOrEqual(l, r) => {
                self.eval_comparison(l, r, "<=", |o| o != std::cmp::Ordering::Greater)
            }

            // --- Leaf nodes ---
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Path(root, segments) => Ok(self.resolve_path(*root, segments)),
        }
    }

    /// Resolves a dotted member path. Missing members resolve to `Null`
    /// rather than erroring, so `data.x == null` works for absent fields.
    fn resolve_path(&self, root: PathRoot, segments: &[String]) -> Value {
        let mut current = match root {
            PathRoot::Data => self.context.data,
            PathRoot::ItemData => match self.context.item_data {
                Some(item) => item,
                None => return Value::Null,
            },
            PathRoot::Ctx => self.context.ctx,
            PathRoot::User => self.context.user,
        };
        for segment in segments {
            match current.get(segment) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        current.clone()
    }

    fn eval_comparison<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &str,
        f: F,
    ) -> Result<Value, EvalError>
    where
        F: Fn(std::cmp::Ordering) -> bool,
    {
        let left = self.evaluate(l)?;
        let right = self.evaluate(r)?;
        let ordering = match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => {
                let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                a.partial_cmp(&b)
                    .ok_or_else(|| self.type_mismatch(op, "Number", &left))?
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => return Err(self.type_mismatch(op, "Number or String", &left)),
        };
        Ok(Value::Bool(f(ordering)))
    }

    fn type_mismatch(&self, op: &str, expected: &str, found: &Value) -> EvalError {
        EvalError::TypeMismatch {
            operation: op.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Equality with numeric coercion: `1` and `1.0` compare equal even
/// though `serde_json` distinguishes their representations.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            }
        }
        _ => left == right,
    }
}
