use std::collections::HashMap;

use crate::{evaluator::EvalError, value::Value};

/// Name to value bindings an expression tree is evaluated against.
///
/// Evaluation only ever reads a context. Function calls build a fresh copy
/// with their arguments layered on top (see [`Context::extended`]), so the
/// caller's bindings are shadowed, never replaced.
///
/// # Examples
///
/// ```
/// use expression_tree::{Context, Value};
///
/// let ctx = Context::new().with("limit", 10).with("name", "alice");
/// assert_eq!(ctx.get("limit"), Some(&Value::Integer(10)));
/// assert!(!ctx.contains("missing"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    bindings: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context with `name` bound to `value`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Copies this context and layers `bindings` over it.
    pub fn extended<I>(&self, bindings: I) -> Context
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut scope = self.clone();
        scope.bindings.extend(bindings);
        scope
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Context {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, Value>> for Context {
    fn from(bindings: HashMap<String, Value>) -> Self {
        Context { bindings }
    }
}

impl TryFrom<serde_json::Value> for Context {
    type Error = EvalError;

    /// Only a top-level JSON object can become a context.
    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from(json) {
            Value::Object(bindings) => Ok(Context { bindings }),
            other => Err(EvalError::TypeError(format!(
                "context must be built from an object, got {}",
                other.type_name()
            ))),
        }
    }
}
