//! Sandboxed single-expression language used by the `custom` transformation.
//!
//! An expression sees exactly one binding, `value`, plus a fixed whitelist of
//! string/array/number methods and `Math`/conversion functions. There is no
//! assignment, no loop construct and no access to anything outside the input,
//! so every evaluation terminates in time proportional to the tree size.
//!
//! ```text
//! value.trim().toUpperCase()
//! value > 100 ? "high" : "low"
//! Math.round(parseFloat(value) * 1.2)
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use serde_json::Value;

pub use ast::Expr;

use crate::error::MappingError;

/// Longest accepted expression source, in bytes.
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// Deepest accepted syntax tree.
pub const MAX_DEPTH: usize = 64;

/// Parse `source` into an expression tree.
pub fn parse(source: &str) -> Result<Expr, MappingError> {
    if source.len() > MAX_EXPRESSION_LEN {
        return Err(MappingError::ExpressionParse {
            offset: MAX_EXPRESSION_LEN,
            message: format!(
                "expression is {} bytes, longer than the {} byte limit",
                source.len(),
                MAX_EXPRESSION_LEN
            ),
        });
    }
    parser::parse_tokens(source)
}

impl Expr {
    /// Evaluate with `value` bound to `input`.
    pub fn evaluate(&self, input: &Value) -> Result<Value, MappingError> {
        eval::eval(self, input).map(eval::Val::into_json)
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(source: &str, input: &Value) -> Result<Value, MappingError> {
    parse(source)?.evaluate(input)
}
