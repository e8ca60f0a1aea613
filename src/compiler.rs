//! One-way compilation of expression trees to JSON-serializable structures.
//!
//! Compilation dispatches on the [`NodeKind`] of each node to a registered
//! [`CompileRule`]. The builtin rules cover `Value`, `Boolean`, `In`, `And`,
//! `Or` and `Equal`:
//!
//! | Node      | Output                                              |
//! |-----------|-----------------------------------------------------|
//! | `Value`   | the literal                                         |
//! | `Boolean` | its truth value, evaluated in an empty context      |
//! | `In`      | `{"in": {"element": .., "container": ..}}`          |
//! | `And`     | `{"And": [..]}`                                     |
//! | `Or`      | `{"Or": [..]}`                                      |
//! | `Equal`   | `{"Equal": {"left": .., "right": ..}}`              |
//!
//! Any other node fails with [`CompileError::UnsupportedNode`] unless a rule
//! is registered for it. There is no way back from JSON to a tree.
//!
//! # Examples
//!
//! ```
//! use expression_tree::{compile_to_json, value};
//! use serde_json::json;
//!
//! let tree = value(1).equals(1) & value(2).is_in(vec![1, 2, 3]);
//!
//! assert_eq!(
//!     compile_to_json(&tree).unwrap(),
//!     json!({"And": [
//!         {"Equal": {"left": 1, "right": 1}},
//!         {"in": {"element": 2, "container": [1, 2, 3]}}
//!     ]})
//! );
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::{Value as Json, json};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    ast::{CompareOp, Expression, NodeKind},
    context::Context,
    evaluator::EvalError,
    value::Value,
};

static BUILTIN: LazyLock<JsonCompiler> = LazyLock::new(JsonCompiler::new);

/// Errors that can occur while compiling a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// No rule is registered for the node's kind
    #[error("Unsupported node: no compile rule for {0}")]
    UnsupportedNode(NodeKind),

    /// A node compiled by evaluation (e.g. `Boolean`) failed to evaluate
    #[error("Evaluation failed during compilation: {0}")]
    Evaluation(#[from] EvalError),

    /// NaN and infinities have no JSON form
    #[error("Cannot compile non-finite number {0}")]
    NonFiniteNumber(f64),
}

/// Compiles one node; recurse into children through the given compiler.
pub type CompileRule = fn(&JsonCompiler, &Expression) -> Result<Json, CompileError>;

/// A type-directed compiler from expression trees to `serde_json::Value`.
///
/// Rules are looked up by [`NodeKind`] and can be replaced or added:
///
/// ```
/// use expression_tree::{CompileError, Expression, JsonCompiler, NodeKind, value};
/// use serde_json::json;
///
/// fn greater(compiler: &JsonCompiler, expr: &Expression) -> Result<serde_json::Value, CompileError> {
///     let Expression::Compare { left, right, .. } = expr else {
///         return Err(CompileError::UnsupportedNode(expr.kind()));
///     };
///     Ok(json!({"Greater": [compiler.compile(left)?, compiler.compile(right)?]}))
/// }
///
/// let mut compiler = JsonCompiler::new();
/// compiler.register(NodeKind::Greater, greater);
///
/// let compiled = compiler.compile(&value(3).greater_than(2)).unwrap();
/// assert_eq!(compiled, json!({"Greater": [3, 2]}));
/// ```
#[derive(Clone)]
pub struct JsonCompiler {
    rules: HashMap<NodeKind, CompileRule>,
}

impl JsonCompiler {
    /// A compiler with the builtin rules.
    pub fn new() -> Self {
        let mut compiler = Self::empty();

        compiler.register(NodeKind::Value, compile_value);
        compiler.register(NodeKind::Boolean, compile_boolean);
        compiler.register(NodeKind::In, compile_in);
        compiler.register(NodeKind::And, compile_and);
        compiler.register(NodeKind::Or, compile_or);
        compiler.register(NodeKind::Equal, compile_equal);

        compiler
    }

    /// A compiler with no rules at all.
    pub fn empty() -> Self {
        JsonCompiler { rules: HashMap::new() }
    }

    /// Registers `rule` for `kind`, returning the rule it replaces.
    pub fn register(&mut self, kind: NodeKind, rule: CompileRule) -> Option<CompileRule> {
        debug!(%kind, "registering compile rule");
        self.rules.insert(kind, rule)
    }

    pub fn unregister(&mut self, kind: NodeKind) -> Option<CompileRule> {
        self.rules.remove(&kind)
    }

    pub fn has_rule(&self, kind: NodeKind) -> bool {
        self.rules.contains_key(&kind)
    }

    pub fn compile(&self, expr: &Expression) -> Result<Json, CompileError> {
        let kind = expr.kind();
        trace!(%kind, "compiling");
        match self.rules.get(&kind) {
            Some(rule) => rule(self, expr),
            None => Err(CompileError::UnsupportedNode(kind)),
        }
    }
}

impl Default for JsonCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JsonCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.rules.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("JsonCompiler").field("rules", &kinds).finish()
    }
}

/// Compiles `expr` with the builtin rules.
pub fn compile_to_json(expr: &Expression) -> Result<Json, CompileError> {
    BUILTIN.compile(expr)
}

fn compile_value(_: &JsonCompiler, expr: &Expression) -> Result<Json, CompileError> {
    match expr {
        Expression::Value(v) => {
            check_finite(v)?;
            Ok(Json::from(v.clone()))
        }
        other => Err(CompileError::UnsupportedNode(other.kind())),
    }
}

fn check_finite(value: &Value) -> Result<(), CompileError> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(CompileError::NonFiniteNumber(*f)),
        Value::Array(items) => items.iter().try_for_each(check_finite),
        Value::Object(map) => map.values().try_for_each(check_finite),
        _ => Ok(()),
    }
}

fn compile_boolean(_: &JsonCompiler, expr: &Expression) -> Result<Json, CompileError> {
    match expr {
        Expression::Boolean(_) => {
            let truth = expr.evaluate(&Context::new())?.is_truthy();
            Ok(Json::Bool(truth))
        }
        other => Err(CompileError::UnsupportedNode(other.kind())),
    }
}

fn compile_in(compiler: &JsonCompiler, expr: &Expression) -> Result<Json, CompileError> {
    match expr {
        Expression::In { element, container } => Ok(json!({
            "in": {
                "element": compiler.compile(element)?,
                "container": compiler.compile(container)?,
            }
        })),
        other => Err(CompileError::UnsupportedNode(other.kind())),
    }
}

fn compile_clauses(compiler: &JsonCompiler, clauses: &[Expression]) -> Result<Json, CompileError> {
    clauses
        .iter()
        .map(|clause| compiler.compile(clause))
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}

fn compile_and(compiler: &JsonCompiler, expr: &Expression) -> Result<Json, CompileError> {
    match expr {
        Expression::And(clauses) => Ok(json!({ "And": compile_clauses(compiler, clauses)? })),
        other => Err(CompileError::UnsupportedNode(other.kind())),
    }
}

fn compile_or(compiler: &JsonCompiler, expr: &Expression) -> Result<Json, CompileError> {
    match expr {
        Expression::Or(clauses) => Ok(json!({ "Or": compile_clauses(compiler, clauses)? })),
        other => Err(CompileError::UnsupportedNode(other.kind())),
    }
}

fn compile_equal(compiler: &JsonCompiler, expr: &Expression) -> Result<Json, CompileError> {
    match expr {
        Expression::Compare {
            op: CompareOp::Equal,
            left,
            right,
        } => Ok(json!({
            "Equal": {
                "left": compiler.compile(left)?,
                "right": compiler.compile(right)?,
            }
        })),
        other => Err(CompileError::UnsupportedNode(other.kind())),
    }
}
