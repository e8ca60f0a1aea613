use std::cmp::Ordering;
use std::fmt;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{ArithOp, CompareOp, Expression},
    closure::{BindingError, Closure},
    context::Context,
    pipeline::{self, Sequence},
    value::Value,
};

/// Errors that can occur while evaluating an expression tree.
///
/// Errors are raised where the failure happens and propagate unchanged
/// through every enclosing node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A context name, member or path segment is missing
    #[error("Lookup error: '{0}' is not defined")]
    ContextLookup(String),

    /// A function call left a parameter unresolved or passed bad arguments
    #[error("Binding error: {0}")]
    ParameterBinding(#[from] BindingError),

    /// Reduce over a source without elements
    #[error("Cannot reduce an empty source")]
    EmptySource,

    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Integer arithmetic left the i64 range
    #[error("Integer overflow in {0}")]
    Overflow(ArithOp),

    /// A `Matches` pattern failed to compile
    #[cfg(feature = "regex")]
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// The result of evaluating a node.
///
/// Most nodes produce a plain [`Value`]. Pipeline stages produce a lazy
/// [`Sequence`] and `Func` nodes produce a [`Closure`]; both borrow from the
/// tree they were evaluated from.
pub enum Evaluated<'a> {
    Value(Value),
    Sequence(Sequence<'a>),
    Closure(Closure<'a>),
}

impl<'a> Evaluated<'a> {
    /// Sequences and closures are always truthy; nothing is consumed.
    pub fn is_truthy(&self) -> bool {
        match self {
            Evaluated::Value(v) => v.is_truthy(),
            Evaluated::Sequence(_) | Evaluated::Closure(_) => true,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Evaluated::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to a data value, draining a sequence into an array.
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Evaluated::Value(v) => Ok(v),
            Evaluated::Sequence(seq) => seq.collect_values().map(Value::Array),
            Evaluated::Closure(_) => Err(EvalError::TypeError(
                "a closure cannot be used as a data value".to_string(),
            )),
        }
    }

    /// Converts to a lazy sequence; see [`pipeline::iterate`] for which
    /// values are iterable.
    pub fn into_sequence(self) -> Result<Sequence<'a>, EvalError> {
        match self {
            Evaluated::Value(v) => pipeline::iterate(v),
            Evaluated::Sequence(seq) => Ok(seq),
            Evaluated::Closure(_) => Err(EvalError::TypeError("closure is not iterable".to_string())),
        }
    }

    pub fn into_closure(self) -> Result<Closure<'a>, EvalError> {
        match self {
            Evaluated::Closure(closure) => Ok(closure),
            Evaluated::Value(v) => Err(EvalError::TypeError(format!(
                "{} is not callable",
                v.type_name()
            ))),
            Evaluated::Sequence(_) => Err(EvalError::TypeError("sequence is not callable".to_string())),
        }
    }
}

impl fmt::Debug for Evaluated<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluated::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Evaluated::Sequence(seq) => f.debug_tuple("Sequence").field(seq).finish(),
            Evaluated::Closure(closure) => f.debug_tuple("Closure").field(closure).finish(),
        }
    }
}

/// Evaluates `tree` against `context`.
///
/// # Examples
///
/// ```
/// use expression_tree::{evaluate, field, Context, Value};
///
/// let ctx = Context::new().with("obj", Value::from(serde_json::json!({"age": 20})));
/// let adult = field("age", "obj").greater_than(18);
/// let result = evaluate(&adult, &ctx).unwrap();
///
/// assert_eq!(result.as_value(), Some(&Value::Boolean(true)));
/// ```
pub fn evaluate<'a>(tree: &'a Expression, context: &Context) -> Result<Evaluated<'a>, EvalError> {
    tree.evaluate(context)
}

impl Expression {
    /// Evaluates this node against `context`.
    ///
    /// Never mutates the context or the tree. Pipeline stages return without
    /// touching their source elements; the work happens as the returned
    /// sequence is consumed.
    pub fn evaluate(&self, context: &Context) -> Result<Evaluated<'_>, EvalError> {
        trace!(node = %self.kind(), "evaluating");
        match self {
            Expression::Value(v) => Ok(Evaluated::Value(v.clone())),
            Expression::Attribute { name, subject } => match present_subject(context, subject) {
                Some(object) => attribute_of(object, name, subject).map(Evaluated::Value),
                None => Ok(Evaluated::Value(Value::Null)),
            },
            Expression::Field { name, subject } => match present_subject(context, subject) {
                Some(mapping) => entry_of(mapping, name, subject).map(Evaluated::Value),
                None => Ok(Evaluated::Value(Value::Null)),
            },
            Expression::Reference(path) => resolve_reference(context, path).map(Evaluated::Value),
            Expression::Boolean(inner) => Ok(boolean(inner.evaluate(context)?.is_truthy())),
            Expression::Not(clause) => Ok(boolean(!clause.evaluate(context)?.is_truthy())),
            Expression::And(clauses) => {
                for clause in clauses {
                    if !clause.evaluate(context)?.is_truthy() {
                        return Ok(boolean(false));
                    }
                }
                Ok(boolean(true))
            }
            Expression::Or(clauses) => {
                for clause in clauses {
                    if clause.evaluate(context)?.is_truthy() {
                        return Ok(boolean(true));
                    }
                }
                Ok(boolean(false))
            }
            Expression::Compare { op, left, right } => {
                let left_val = left.evaluate(context)?.into_value()?;
                let right_val = right.evaluate(context)?.into_value()?;
                apply_compare(*op, &left_val, &right_val).map(boolean)
            }
            Expression::In { element, container } => {
                let element_val = element.evaluate(context)?.into_value()?;
                let container_val = container.evaluate(context)?;
                contains(container_val, &element_val).map(boolean)
            }
            #[cfg(feature = "regex")]
            Expression::Matches { subject, pattern } => {
                let subject_val = subject.evaluate(context)?.into_value()?;
                let pattern_val = pattern.evaluate(context)?.into_value()?;
                apply_matches(&subject_val, &pattern_val).map(boolean)
            }
            Expression::Arithmetic { op, left, right } => {
                let left_val = left.evaluate(context)?.into_value()?;
                let right_val = right.evaluate(context)?.into_value()?;
                apply_arith(*op, &left_val, &right_val).map(Evaluated::Value)
            }
            Expression::Func(func) => Ok(Evaluated::Closure(Closure::new(func, context.clone()))),
            Expression::From(source) => source.evaluate(context)?.into_sequence().map(Evaluated::Sequence),
            Expression::Select { source, selection } => {
                pipeline::select(source, selection, context).map(Evaluated::Sequence)
            }
            Expression::Filter { source, criterion } => {
                pipeline::filter(source, criterion, context).map(Evaluated::Sequence)
            }
            Expression::SelectMany { source, expansion } => {
                pipeline::select_many(source, expansion, context).map(Evaluated::Sequence)
            }
            Expression::Reduce { source, reduction } => {
                pipeline::reduce(source, reduction, context).map(Evaluated::Value)
            }
        }
    }

    /// Evaluates and converts the result with [`Evaluated::into_value`].
    pub fn evaluate_value(&self, context: &Context) -> Result<Value, EvalError> {
        self.evaluate(context)?.into_value()
    }
}

fn boolean<'a>(b: bool) -> Evaluated<'a> {
    Evaluated::Value(Value::Boolean(b))
}

/// The subject bound in `context`, or `None` when it is missing or falsy.
///
/// A falsy subject (empty object, zero, ...) counts as absent on purpose;
/// callers rely on `Attribute`/`Field` yielding `Null` rather than failing.
fn present_subject<'c>(context: &'c Context, subject: &str) -> Option<&'c Value> {
    context.get(subject).filter(|v| v.is_truthy())
}

fn attribute_of(object: &Value, name: &str, subject: &str) -> Result<Value, EvalError> {
    match object {
        Value::Object(members) => members
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::ContextLookup(format!("{}.{}", subject, name))),
        other => Err(EvalError::ContextLookup(format!(
            "{}.{} ({} has no members)",
            subject,
            name,
            other.type_name()
        ))),
    }
}

fn entry_of(mapping: &Value, name: &str, subject: &str) -> Result<Value, EvalError> {
    match mapping {
        Value::Object(map) => map
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::ContextLookup(format!("{}[{}]", subject, name))),
        Value::Array(arr) => {
            let index: i64 = name.parse().map_err(|_| {
                EvalError::TypeError(format!(
                    "Cannot use key '{}' on array; use an integer index instead",
                    name
                ))
            })?;
            // Negative index: count from end (-1 = last, -2 = second to last)
            let position = if index < 0 {
                usize::try_from(index.unsigned_abs())
                    .ok()
                    .and_then(|back| arr.len().checked_sub(back))
            } else {
                usize::try_from(index).ok()
            };
            position
                .and_then(|i| arr.get(i))
                .cloned()
                .ok_or_else(|| EvalError::ContextLookup(format!("{}[{}]", subject, name)))
        }
        other => Err(EvalError::TypeError(format!(
            "Cannot look up '{}' in {}",
            name,
            other.type_name()
        ))),
    }
}

/// Resolves `root.member.member...` against the context.
fn resolve_reference(context: &Context, path: &str) -> Result<Value, EvalError> {
    let (root, rest) = match path.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (path, None),
    };

    let mut current = context
        .get(root)
        .ok_or_else(|| EvalError::ContextLookup(root.to_string()))?;

    let Some(rest) = rest else {
        return Ok(current.clone());
    };

    let mut walked = root.len();
    for member in rest.split('.') {
        walked += member.len() + 1;
        current = match current {
            Value::Object(members) => members.get(member),
            _ => None,
        }
        .ok_or_else(|| EvalError::ContextLookup(path[..walked].to_string()))?;
    }

    Ok(current.clone())
}

fn apply_compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    if op == CompareOp::Equal {
        return Ok(values_equal(left, right));
    }

    let ordering = compare_values(left, right).map_err(|_| {
        EvalError::TypeError(format!(
            "Cannot compare {} {} {}",
            left.type_name(),
            op,
            right.type_name()
        ))
    })?;

    // Unordered (NaN) makes every ordering comparison false
    Ok(match ordering {
        None => false,
        Some(ord) => match op {
            CompareOp::Greater => ord == Ordering::Greater,
            CompareOp::GreaterEqual => ord != Ordering::Less,
            CompareOp::Lesser => ord == Ordering::Less,
            CompareOp::LesserEqual => ord != Ordering::Greater,
            CompareOp::Equal => ord == Ordering::Equal,
        },
    })
}

/// Equality with integers and floats compared numerically.
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            compare_int_float(*a, *b) == Some(Ordering::Equal)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        (a, b) => a == b,
    }
}

/// `Ok(None)` for unordered floats, `Err(())` for incomparable types.
fn compare_values(left: &Value, right: &Value) -> Result<Option<Ordering>, ()> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
        (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
        (Value::Integer(a), Value::Float(b)) => Ok(compare_int_float(*a, *b)),
        (Value::Float(a), Value::Integer(b)) => Ok(compare_int_float(*b, *a).map(Ordering::reverse)),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Some(a.cmp(b))),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare_values(x, y)? {
                    Some(Ordering::Equal) => continue,
                    other => return Ok(other),
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => Err(()),
    }
}

/// Exact ordering of an integer against a float; `None` when `b` is NaN.
fn compare_int_float(a: i64, b: f64) -> Option<Ordering> {
    // i64::MIN is exactly -2^63; i64::MAX rounds up to 2^63
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if b.is_nan() {
        return None;
    }
    if b >= LIMIT {
        return Some(Ordering::Less);
    }
    if b < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = b.trunc();
    // In range and integral, so the cast is exact
    match a.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(b - whole)),
        unequal => Some(unequal),
    }
}

fn contains(container: Evaluated<'_>, element: &Value) -> Result<bool, EvalError> {
    match container {
        Evaluated::Value(Value::Array(items)) => Ok(items.iter().any(|item| values_equal(item, element))),
        Evaluated::Value(Value::String(haystack)) => match element {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(EvalError::TypeError(format!(
                "Cannot search string for {}",
                other.type_name()
            ))),
        },
        Evaluated::Value(Value::Object(map)) => Ok(element.as_str().is_some_and(|key| map.contains_key(key))),
        Evaluated::Sequence(seq) => {
            for item in seq {
                if values_equal(&item?, element) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Evaluated::Value(other) => Err(EvalError::TypeError(format!(
            "{} is not a container",
            other.type_name()
        ))),
        Evaluated::Closure(_) => Err(EvalError::TypeError("closure is not a container".to_string())),
    }
}

#[cfg(feature = "regex")]
fn apply_matches(subject: &Value, pattern: &Value) -> Result<bool, EvalError> {
    let (Value::String(subject), Value::String(pattern)) = (subject, pattern) else {
        return Err(EvalError::TypeError(format!(
            "Matches requires string operands, got {} and {}",
            subject.type_name(),
            pattern.type_name()
        )));
    };
    let re = regex::Regex::new(pattern).map_err(|e| EvalError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;
    Ok(re.is_match(subject))
}

fn apply_arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arith(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => float_arith(op, *a, *b).map(Value::Float),
        (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => mixed_arith(op, left, right),
        (Value::String(a), Value::String(b)) if op == ArithOp::Add => Ok(Value::String(format!("{}{}", a, b))),
        (a, b) => Err(EvalError::TypeError(format!(
            "Cannot apply {} to {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn integer_arith(op: ArithOp, a: i64, b: i64) -> Result<Value, EvalError> {
    if b == 0 && matches!(op, ArithOp::Divide | ArithOp::Modulo) {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Subtract => a.checked_sub(b),
        ArithOp::Multiply => a.checked_mul(b),
        // Exact division stays an integer, anything else becomes a float
        ArithOp::Divide => match a.checked_rem(b) {
            Some(0) => a.checked_div(b),
            Some(_) => return Ok(Value::Float(a as f64 / b as f64)),
            None => None,
        },
        ArithOp::Modulo if b == -1 => Some(0),
        ArithOp::Modulo => a.checked_rem(b),
    };
    result.map(Value::Integer).ok_or(EvalError::Overflow(op))
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> Result<f64, EvalError> {
    if b == 0.0 && matches!(op, ArithOp::Divide | ArithOp::Modulo) {
        return Err(EvalError::DivisionByZero);
    }
    Ok(match op {
        ArithOp::Add => a + b,
        ArithOp::Subtract => a - b,
        ArithOp::Multiply => a * b,
        ArithOp::Divide => a / b,
        ArithOp::Modulo => a % b,
    })
}

/// Integer/float arithmetic through `Decimal`, so `100 * 1.1` stays `110`.
fn mixed_arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Err(EvalError::TypeError("mixed arithmetic requires numbers".to_string()));
    };

    if let Some(ad) = to_decimal(left)
        && let Some(bd) = to_decimal(right)
    {
        if bd.is_zero() && matches!(op, ArithOp::Divide | ArithOp::Modulo) {
            return Err(EvalError::DivisionByZero);
        }
        let rd = match op {
            ArithOp::Add => ad.checked_add(bd),
            ArithOp::Subtract => ad.checked_sub(bd),
            ArithOp::Multiply => ad.checked_mul(bd),
            ArithOp::Divide => ad.checked_div(bd),
            ArithOp::Modulo => ad.checked_rem(bd),
        };
        if let Some(rd) = rd {
            if rd.is_integer()
                && let Some(r) = rd.to_i64()
            {
                return Ok(Value::Integer(r));
            } else if let Some(r) = rd.to_f64() {
                return Ok(Value::Float(r));
            }
        }
    }

    float_arith(op, a, b).map(Value::Float)
}

fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}
