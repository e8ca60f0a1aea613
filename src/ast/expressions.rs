use std::collections::BTreeMap;
use std::fmt;

use crate::ast::{ArithOp, CompareOp};
use crate::value::Value;

/// A node of an expression tree.
///
/// Trees are built bottom-up from already constructed children and are never
/// mutated afterwards. Evaluation walks the whole tree every time; nothing is
/// cached or rewritten. Native `==` and `Hash` compare nodes structurally; use
/// the builder methods (`equals`, `greater_than`, ...) to construct predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    // Leaves
    /// Literal value, evaluates to itself regardless of context
    ///
    /// # Example
    /// ```text
    /// value(18)
    /// ```
    Value(Value),

    /// Member `name` of the object bound to `subject`
    ///
    /// A missing or falsy subject evaluates to `Null`; a present subject
    /// without the member is a lookup error.
    Attribute { name: String, subject: String },

    /// Entry `name` of the mapping (or array index) bound to `subject`
    ///
    /// Same absence rule as [`Expression::Attribute`].
    Field { name: String, subject: String },

    /// Dotted path into the context
    ///
    /// # Examples
    /// ```text
    /// reference("user")          // context["user"]
    /// reference("user.address")  // context["user"].address
    /// ```
    Reference(String),

    // Predicates
    /// Truthiness of the child
    Boolean(Box<Expression>),

    /// Logical negation of the child's truthiness
    Not(Box<Expression>),

    /// True iff every clause is truthy; short-circuits left to right
    And(Vec<Expression>),

    /// True iff any clause is truthy; short-circuits left to right
    Or(Vec<Expression>),

    /// Pairwise comparison of the evaluated operands
    Compare {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Membership of `element` in `container`
    In {
        element: Box<Expression>,
        container: Box<Expression>,
    },

    /// Regular expression match of a string against a pattern
    #[cfg(feature = "regex")]
    Matches {
        subject: Box<Expression>,
        pattern: Box<Expression>,
    },

    /// Arithmetic on the evaluated operands
    Arithmetic {
        op: ArithOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    // Functions
    /// Parameterized body, evaluates to a closure over the current context
    Func(Func),

    // Query pipeline
    /// Iterates the evaluated source
    From(Box<Expression>),

    /// Lazily maps every source element through `selection`
    Select {
        source: Box<Expression>,
        selection: Func,
    },

    /// Lazily keeps the source elements `criterion` holds for
    Filter {
        source: Box<Expression>,
        criterion: Func,
    },

    /// Lazily flattens the iterables `expansion` returns, one level deep
    SelectMany {
        source: Box<Expression>,
        expansion: Func,
    },

    /// Eagerly folds the source with a two-parameter `reduction`, seeded by
    /// the first element
    Reduce {
        source: Box<Expression>,
        reduction: Func,
    },
}

/// A function literal: named parameters, a body and optional defaults.
///
/// Evaluating a `Func` node yields a [`Closure`](crate::Closure); calling it
/// binds arguments to `parameters` and evaluates `body` in the captured
/// context extended with those bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Func {
    /// Parameter names, in positional order
    pub parameters: Vec<String>,

    /// Expression evaluated on every call
    pub body: Box<Expression>,

    /// Values used for parameters the caller leaves out
    pub defaults: BTreeMap<String, Value>,
}

impl Func {
    pub fn new<I, S>(parameters: I, body: Expression) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Func {
            parameters: parameters.into_iter().map(Into::into).collect(),
            body: Box::new(body),
            defaults: BTreeMap::new(),
        }
    }

    /// Adds a default for `parameter`
    pub fn with_default(mut self, parameter: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(parameter.into(), value.into());
        self
    }
}

/// Tag identifying the kind of an [`Expression`] node.
///
/// Comparison operators get a kind each so compile rules can be registered
/// per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Value,
    Attribute,
    Field,
    Reference,
    Boolean,
    Not,
    And,
    Or,
    Equal,
    Greater,
    GreaterEqual,
    Lesser,
    LesserEqual,
    In,
    #[cfg(feature = "regex")]
    Matches,
    Arithmetic,
    Func,
    From,
    Select,
    Filter,
    SelectMany,
    Reduce,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Value => "Value",
            NodeKind::Attribute => "Attribute",
            NodeKind::Field => "Field",
            NodeKind::Reference => "Reference",
            NodeKind::Boolean => "Boolean",
            NodeKind::Not => "Not",
            NodeKind::And => "And",
            NodeKind::Or => "Or",
            NodeKind::Equal => "Equal",
            NodeKind::Greater => "Greater",
            NodeKind::GreaterEqual => "GreaterEqual",
            NodeKind::Lesser => "Lesser",
            NodeKind::LesserEqual => "LesserEqual",
            NodeKind::In => "In",
            #[cfg(feature = "regex")]
            NodeKind::Matches => "Matches",
            NodeKind::Arithmetic => "Arithmetic",
            NodeKind::Func => "Func",
            NodeKind::From => "From",
            NodeKind::Select => "Select",
            NodeKind::Filter => "Filter",
            NodeKind::SelectMany => "SelectMany",
            NodeKind::Reduce => "Reduce",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Expression {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::Value(_) => NodeKind::Value,
            Expression::Attribute { .. } => NodeKind::Attribute,
            Expression::Field { .. } => NodeKind::Field,
            Expression::Reference(_) => NodeKind::Reference,
            Expression::Boolean(_) => NodeKind::Boolean,
            Expression::Not(_) => NodeKind::Not,
            Expression::And(_) => NodeKind::And,
            Expression::Or(_) => NodeKind::Or,
            Expression::Compare { op, .. } => match op {
                CompareOp::Equal => NodeKind::Equal,
                CompareOp::Greater => NodeKind::Greater,
                CompareOp::GreaterEqual => NodeKind::GreaterEqual,
                CompareOp::Lesser => NodeKind::Lesser,
                CompareOp::LesserEqual => NodeKind::LesserEqual,
            },
            Expression::In { .. } => NodeKind::In,
            #[cfg(feature = "regex")]
            Expression::Matches { .. } => NodeKind::Matches,
            Expression::Arithmetic { .. } => NodeKind::Arithmetic,
            Expression::Func(_) => NodeKind::Func,
            Expression::From(_) => NodeKind::From,
            Expression::Select { .. } => NodeKind::Select,
            Expression::Filter { .. } => NodeKind::Filter,
            Expression::SelectMany { .. } => NodeKind::SelectMany,
            Expression::Reduce { .. } => NodeKind::Reduce,
        }
    }
}
