//! Formula language for parameterised amounts.

pub mod ast;
pub mod context;
pub mod parser;

use thiserror::Error;

pub use ast::{BinaryOp, Expr};
pub use context::{FormulaContext, Scope};
pub use parser::parse;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {name} expects {expected} argument(s), got {got}")]
    Arity { name: String, expected: String, got: usize },

    #[error("Circular parameter reference: {0}")]
    Cycle(String),

    #[error("Formula result is not finite: {0}")]
    NotFinite(f64),
}
