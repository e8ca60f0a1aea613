//! Closures produced by `Func` nodes and the argument resolver behind them.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::Func,
    context::Context,
    evaluator::{EvalError, Evaluated},
    value::Value,
};

/// Reasons a call's arguments could not be bound to a function's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// No positional argument, keyword argument or default for the parameter
    #[error("parameter '{0}' is unbound")]
    Unbound(String),

    #[error("expected at most {expected} positional arguments, got {actual}")]
    TooManyArguments { expected: usize, actual: usize },

    /// A keyword argument named a parameter already bound positionally
    #[error("parameter '{0}' is bound more than once")]
    DuplicateArgument(String),

    #[error("unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),
}

/// A callable value: a [`Func`] together with the context it was evaluated in.
///
/// Every call evaluates the body in a fresh copy of the captured context
/// with the call's arguments layered on top; neither the captured context nor
/// an earlier call's bindings are ever touched.
///
/// # Examples
///
/// ```
/// use expression_tree::{Context, Expression, Func, reference, Value};
///
/// let add = Expression::Func(
///     Func::new(["x", "y"], reference("x").plus(reference("y"))).with_default("y", 0),
/// );
/// let ctx = Context::new();
/// let closure = add.evaluate(&ctx).unwrap().into_closure().unwrap();
///
/// let result = closure.call_positional(vec![Value::Integer(5)]).unwrap();
/// assert_eq!(result.into_value().unwrap(), Value::Integer(5));
/// ```
#[derive(Debug, Clone)]
pub struct Closure<'a> {
    func: &'a Func,
    context: Context,
}

impl<'a> Closure<'a> {
    pub(crate) fn new(func: &'a Func, context: Context) -> Self {
        Closure { func, context }
    }

    pub fn parameters(&self) -> &[String] {
        &self.func.parameters
    }

    /// The context captured when the `Func` node was evaluated
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Calls the closure with positional and keyword arguments.
    pub fn call(&self, positional: Vec<Value>, named: HashMap<String, Value>) -> Result<Evaluated<'a>, EvalError> {
        let func: &'a Func = self.func;
        let bindings = resolve_arguments(func, positional, named)?;
        debug!(
            parameters = ?func.parameters,
            bound = bindings.len(),
            "calling closure"
        );
        let scope = self.context.extended(bindings);
        func.body.evaluate(&scope)
    }

    pub fn call_positional(&self, positional: Vec<Value>) -> Result<Evaluated<'a>, EvalError> {
        self.call(positional, HashMap::new())
    }
}

/// Binds call arguments to the parameters of `func`.
///
/// Positional arguments fill parameters in declared order. Remaining
/// parameters are taken from `named`, then from the function's defaults.
/// Returns the bindings in parameter order.
pub fn resolve_arguments(
    func: &Func,
    positional: Vec<Value>,
    mut named: HashMap<String, Value>,
) -> Result<Vec<(String, Value)>, BindingError> {
    let parameters = &func.parameters;
    if positional.len() > parameters.len() {
        return Err(BindingError::TooManyArguments {
            expected: parameters.len(),
            actual: positional.len(),
        });
    }

    let mut positional = positional.into_iter();
    let mut bindings = Vec::with_capacity(parameters.len());

    for parameter in parameters {
        let argument = match positional.next() {
            Some(_) if named.contains_key(parameter) => {
                return Err(BindingError::DuplicateArgument(parameter.clone()));
            }
            Some(argument) => argument,
            None => match named.remove(parameter) {
                Some(argument) => argument,
                None => func
                    .defaults
                    .get(parameter)
                    .cloned()
                    .ok_or_else(|| BindingError::Unbound(parameter.clone()))?,
            },
        };
        bindings.push((parameter.clone(), argument));
    }

    // Alphabetically first leftover
    if let Some(unexpected) = named.into_keys().min() {
        return Err(BindingError::UnexpectedKeyword(unexpected));
    }

    Ok(bindings)
}
