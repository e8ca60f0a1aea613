//! # Expression Trees - Abstract Syntax Tree
//!
//! This module defines the node types of the expression DSL. Trees are
//! built in code through constructor functions and combinator methods; there
//! is no text syntax.
//!
//! ## Architecture Overview
//!
//! - **[expressions]** - The [`Expression`] node enum, [`Func`] literals and [`NodeKind`] tags
//! - **[operators]** - Comparison and arithmetic operators
//! - **[builder]** - Leaf constructors and the combinator algebra
//!
//! ## Core Concepts
//!
//! ### Leaves
//!
//! `Value`, `Attribute`, `Field` and `Reference` pull data from a literal, an
//! object member, a mapping entry or a dotted context path.
//!
//! ### Predicates
//!
//! Comparison builders (`greater_than`, `equals`, `is_in`, ...) and the `&`,
//! `|` and `!` operators compose leaves into boolean trees without evaluating
//! them:
//!
//! ```
//! use expression_tree::{field, reference};
//!
//! let eligible = field("age", "user").greater_equal(18)
//!     & !reference("user.banned").equals(true);
//! ```
//!
//! ### Pipelines
//!
//! `from(source)` starts a lazy query; `select`, `filter` and `select_many`
//! chain further stages and `reduce` folds it into one value.
//!
//! ```
//! use expression_tree::{from, reference, Context, Func, Value};
//!
//! let total = from(vec![1, 2, 3, 4])
//!     .reduce(Func::new(["acc", "x"], reference("acc").plus(reference("x"))));
//!
//! assert_eq!(total.evaluate_value(&Context::new()).unwrap(), Value::Integer(10));
//! ```
pub mod builder;
pub mod expressions;
pub mod operators;

pub use expressions::{Expression, Func, NodeKind};
pub use operators::{ArithOp, CompareOp};
