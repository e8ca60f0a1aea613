//! Lazy query pipeline: `From`, `Select`, `Filter`, `SelectMany` and `Reduce`.
//!
//! Every stage except `Reduce` returns a [`Sequence`] without touching its
//! source; elements are pulled one at a time as the sequence is consumed.
//! A sequence is single-pass and single-consumer. Re-evaluating the node
//! that produced it yields a fresh sequence from the start of the source.

use std::fmt;

use tracing::debug;

use crate::{
    ast::{Expression, Func},
    closure::Closure,
    context::Context,
    evaluator::EvalError,
    value::Value,
};

/// A lazy, single-pass stream of values.
///
/// Items are `Result`s: a failing function call surfaces as an `Err` at the
/// position of the element that triggered it.
///
/// # Examples
///
/// ```
/// use expression_tree::{from, reference, Context, Func, Value};
///
/// let evens = from(vec![1, 2, 3, 4])
///     .filter(Func::new(["x"], reference("x").modulo(2).equals(0)));
///
/// let values = evens
///     .evaluate(&Context::new())
///     .unwrap()
///     .into_sequence()
///     .unwrap()
///     .collect_values()
///     .unwrap();
/// assert_eq!(values, vec![Value::Integer(2), Value::Integer(4)]);
/// ```
pub struct Sequence<'a> {
    items: Box<dyn Iterator<Item = Result<Value, EvalError>> + 'a>,
}

impl<'a> Sequence<'a> {
    pub fn new<I>(items: I) -> Self
    where
        I: Iterator<Item = Result<Value, EvalError>> + 'a,
    {
        Sequence { items: Box::new(items) }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Sequence::new(values.into_iter().map(Ok))
    }

    /// Drains the sequence, stopping at the first error.
    pub fn collect_values(self) -> Result<Vec<Value>, EvalError> {
        self.collect()
    }

    fn failed(error: EvalError) -> Self {
        Sequence::new(std::iter::once(Err(error)))
    }
}

impl Iterator for Sequence<'_> {
    type Item = Result<Value, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

impl fmt::Debug for Sequence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sequence(..)")
    }
}

/// Iterates a data value.
///
/// Arrays yield their elements, strings one-character strings and objects
/// their keys in sorted order. Scalars are not iterable.
pub fn iterate<'a>(value: Value) -> Result<Sequence<'a>, EvalError> {
    match value {
        Value::Array(items) => Ok(Sequence::from_values(items)),
        Value::String(s) => Ok(Sequence::from_values(
            s.chars().map(|c| Value::String(c.to_string())).collect(),
        )),
        Value::Object(map) => {
            let mut keys: Vec<String> = map.into_keys().collect();
            keys.sort();
            Ok(Sequence::from_values(keys.into_iter().map(Value::String).collect()))
        }
        other => Err(EvalError::TypeError(format!("{} is not iterable", other.type_name()))),
    }
}

fn source_sequence<'a>(source: &'a Expression, context: &Context) -> Result<Sequence<'a>, EvalError> {
    source.evaluate(context)?.into_sequence()
}

pub(crate) fn select<'a>(
    source: &'a Expression,
    selection: &'a Func,
    context: &Context,
) -> Result<Sequence<'a>, EvalError> {
    let items = source_sequence(source, context)?;
    let closure = Closure::new(selection, context.clone());

    Ok(Sequence::new(items.map(move |item| {
        closure.call_positional(vec![item?])?.into_value()
    })))
}

pub(crate) fn filter<'a>(
    source: &'a Expression,
    criterion: &'a Func,
    context: &Context,
) -> Result<Sequence<'a>, EvalError> {
    let items = source_sequence(source, context)?;
    let closure = Closure::new(criterion, context.clone());

    Ok(Sequence::new(items.filter_map(move |item| {
        let checked = item.and_then(|value| {
            let keep = closure.call_positional(vec![value.clone()])?.is_truthy();
            Ok((keep, value))
        });
        match checked {
            Ok((true, value)) => Some(Ok(value)),
            Ok((false, _)) => None,
            Err(e) => Some(Err(e)),
        }
    })))
}

pub(crate) fn select_many<'a>(
    source: &'a Expression,
    expansion: &'a Func,
    context: &Context,
) -> Result<Sequence<'a>, EvalError> {
    let items = source_sequence(source, context)?;
    let closure = Closure::new(expansion, context.clone());

    Ok(Sequence::new(items.flat_map(move |item| {
        let expanded = item.and_then(|value| closure.call_positional(vec![value])?.into_sequence());
        expanded.unwrap_or_else(Sequence::failed)
    })))
}

/// Folds the whole source left to right, seeded with its first element.
pub(crate) fn reduce<'a>(
    source: &'a Expression,
    reduction: &'a Func,
    context: &Context,
) -> Result<Value, EvalError> {
    let mut items = source_sequence(source, context)?;
    let closure = Closure::new(reduction, context.clone());

    let mut accumulator = items.next().ok_or(EvalError::EmptySource)??;
    let mut folded = 1usize;
    for item in items {
        accumulator = closure.call_positional(vec![accumulator, item?])?.into_value()?;
        folded += 1;
    }

    debug!(elements = folded, "reduced source");
    Ok(accumulator)
}
