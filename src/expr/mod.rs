//! Safe expression engine for rule conditions.
//!
//! Validation rules and compatibility rules carry short boolean conditions
//! such as `power >= 500 && efficiency == 'gold'`. These are parsed once into
//! a typed AST and interpreted over a JSON context map; no dynamically
//! constructed code is ever executed. See [`parser`] for the grammar and
//! [`eval`] for evaluation semantics.

mod eval;
mod parser;

pub use parser::{BinaryOp, Expr, Literal, UnaryOp};

use serde_json::Value;
use thiserror::Error;

/// Errors from parsing or evaluating a rule condition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("evaluation error: {0}")]
    Eval(String),
}

/// A parsed rule condition, ready for repeated evaluation.
///
/// Holds the original source text alongside the parsed tree so reports and
/// logs can show the condition as written.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    root: Expr,
}

impl Condition {
    /// Parse a condition string
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// The condition text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a JSON object context, coercing the result to bool
    pub fn evaluate(&self, context: &Value) -> Result<bool, ExprError> {
        eval::evaluate_truthy(&self.root, context)
    }

    /// Dotted field paths the condition reads
    pub fn references(&self) -> Vec<String> {
        self.root.references()
    }
}
