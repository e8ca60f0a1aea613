//! Constructors and combinators for building expression trees.
//!
//! Nothing here evaluates anything: every function and method returns a new,
//! unevaluated [`Expression`]. Build a predicate once, evaluate it against as
//! many contexts as needed.
//!
//! ```
//! use expression_tree::{field, Context, Value};
//!
//! let adult = field("age", "obj").greater_than(18);
//! let ctx = Context::try_from(serde_json::json!({"obj": {"age": 20}})).unwrap();
//!
//! assert_eq!(adult.evaluate_value(&ctx).unwrap(), Value::Boolean(true));
//! ```

use std::ops::{BitAnd, BitOr, Not};

use crate::ast::{ArithOp, CompareOp, Expression, Func};
use crate::value::Value;

/// Literal leaf
pub fn value(value: impl Into<Value>) -> Expression {
    Expression::Value(value.into())
}

/// Member `name` of the object bound to `subject`
pub fn attribute(name: impl Into<String>, subject: impl Into<String>) -> Expression {
    Expression::Attribute {
        name: name.into(),
        subject: subject.into(),
    }
}

/// Entry `name` of the mapping bound to `subject`
pub fn field(name: impl Into<String>, subject: impl Into<String>) -> Expression {
    Expression::Field {
        name: name.into(),
        subject: subject.into(),
    }
}

/// Dotted path into the context
pub fn reference(path: impl Into<String>) -> Expression {
    Expression::Reference(path.into())
}

pub fn boolean(inner: impl Into<Expression>) -> Expression {
    Expression::Boolean(Box::new(inner.into()))
}

/// Function literal node with no defaults
pub fn func<I, S>(parameters: I, body: impl Into<Expression>) -> Expression
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Expression::Func(Func::new(parameters, body.into()))
}

/// Start of a query pipeline
///
/// `source` is typically a literal array or a [`reference`] into the context.
pub fn from(source: impl Into<Expression>) -> Expression {
    Expression::From(Box::new(source.into()))
}

impl Expression {
    fn compare(self, op: CompareOp, other: impl Into<Expression>) -> Expression {
        Expression::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    fn arithmetic(self, op: ArithOp, other: impl Into<Expression>) -> Expression {
        Expression::Arithmetic {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Equal, other)
    }

    /// `Not(Equal(self, other))`
    pub fn not_equals(self, other: impl Into<Expression>) -> Expression {
        !self.equals(other)
    }

    pub fn greater_than(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Greater, other)
    }

    pub fn greater_equal(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::GreaterEqual, other)
    }

    pub fn less_than(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Lesser, other)
    }

    pub fn less_equal(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::LesserEqual, other)
    }

    /// `In(self, container)`
    pub fn is_in(self, container: impl Into<Expression>) -> Expression {
        Expression::In {
            element: Box::new(self),
            container: Box::new(container.into()),
        }
    }

    /// `In(element, self)`
    pub fn contains(self, element: impl Into<Expression>) -> Expression {
        let element: Expression = element.into();
        element.is_in(self)
    }

    #[cfg(feature = "regex")]
    pub fn matches(self, pattern: impl Into<Expression>) -> Expression {
        Expression::Matches {
            subject: Box::new(self),
            pattern: Box::new(pattern.into()),
        }
    }

    pub fn plus(self, other: impl Into<Expression>) -> Expression {
        self.arithmetic(ArithOp::Add, other)
    }

    pub fn minus(self, other: impl Into<Expression>) -> Expression {
        self.arithmetic(ArithOp::Subtract, other)
    }

    pub fn times(self, other: impl Into<Expression>) -> Expression {
        self.arithmetic(ArithOp::Multiply, other)
    }

    pub fn divided_by(self, other: impl Into<Expression>) -> Expression {
        self.arithmetic(ArithOp::Divide, other)
    }

    pub fn modulo(self, other: impl Into<Expression>) -> Expression {
        self.arithmetic(ArithOp::Modulo, other)
    }

    /// N-ary conjunction; `all(vec![])` is vacuously true
    pub fn all(clauses: Vec<Expression>) -> Expression {
        Expression::And(clauses)
    }

    /// N-ary disjunction; `any(vec![])` is false
    pub fn any(clauses: Vec<Expression>) -> Expression {
        Expression::Or(clauses)
    }

    pub fn select(self, selection: Func) -> Expression {
        Expression::Select {
            source: Box::new(self),
            selection,
        }
    }

    pub fn filter(self, criterion: Func) -> Expression {
        Expression::Filter {
            source: Box::new(self),
            criterion,
        }
    }

    pub fn select_many(self, expansion: Func) -> Expression {
        Expression::SelectMany {
            source: Box::new(self),
            expansion,
        }
    }

    pub fn reduce(self, reduction: Func) -> Expression {
        Expression::Reduce {
            source: Box::new(self),
            reduction,
        }
    }
}

/// `a & b` builds a two-clause `And`; chains nest rather than merge.
impl BitAnd for Expression {
    type Output = Expression;

    fn bitand(self, rhs: Expression) -> Expression {
        Expression::And(vec![self, rhs])
    }
}

/// `a | b` builds a two-clause `Or`; chains nest rather than merge.
impl BitOr for Expression {
    type Output = Expression;

    fn bitor(self, rhs: Expression) -> Expression {
        Expression::Or(vec![self, rhs])
    }
}

impl Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        Expression::Not(Box::new(self))
    }
}

impl From<Value> for Expression {
    fn from(v: Value) -> Self {
        Expression::Value(v)
    }
}

impl From<Func> for Expression {
    fn from(f: Func) -> Self {
        Expression::Func(f)
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::Value(b.into())
    }
}

impl From<i64> for Expression {
    fn from(n: i64) -> Self {
        Expression::Value(n.into())
    }
}

impl From<i32> for Expression {
    fn from(n: i32) -> Self {
        Expression::Value(n.into())
    }
}

impl From<f64> for Expression {
    fn from(n: f64) -> Self {
        Expression::Value(n.into())
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::Value(s.into())
    }
}

impl From<String> for Expression {
    fn from(s: String) -> Self {
        Expression::Value(s.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Expression {
    fn from(items: Vec<T>) -> Self {
        Expression::Value(items.into())
    }
}
