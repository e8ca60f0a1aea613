pub mod ast;
pub mod closure;
pub mod compiler;
pub mod context;
pub mod evaluator;
pub mod pipeline;
pub mod value;

pub use ast::builder::{attribute, boolean, field, from, func, reference, value};
pub use ast::{ArithOp, CompareOp, Expression, Func, NodeKind};
pub use closure::{BindingError, Closure};
pub use compiler::{CompileError, CompileRule, JsonCompiler, compile_to_json};
pub use context::Context;
pub use evaluator::{EvalError, Evaluated, evaluate};
pub use pipeline::Sequence;
pub use value::Value;
