//! Boolean and value expressions over a configuration context.
//!
//! Expressions are compiled once into an [`Expression`] and may be evaluated
//! against any number of contexts:
//!
//! ```text
//! provider == 'local' && (vm.driver != 'docker-desktop' || loadbalancer.enabled == true)
//! cluster.workers.count > 2 ? 'ha' : 'single'
//! storage.provider in ['auto', 'openebs']
//! ```
//!
//! Dot paths that do not resolve evaluate to `nil` rather than failing.

mod eval;
mod lexer;
mod parser;

use crate::error::{Error, Result};
use crate::value::Value;
use parser::{Expr, Parser};

/// Parse failure before it is tied to its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompileError {
    pub(crate) position: usize,
    pub(crate) message: String,
}

impl CompileError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A compiled, side-effect-free expression
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Compile expression text
    pub fn compile(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::EmptyExpression);
        }

        let to_error = |e: CompileError| Error::Compile {
            expr: source.to_string(),
            position: e.position,
            message: e.message,
        };

        let tokens = lexer::tokenize(source).map_err(to_error)?;
        let ast = Parser::new(tokens).parse().map_err(to_error)?;

        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// The text this expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate to a value of any kind
    pub fn evaluate(&self, ctx: &Value) -> Result<Value> {
        eval::eval(&self.ast, ctx).map_err(|message| Error::Eval {
            expr: self.source.clone(),
            message,
        })
    }

    /// Evaluate, requiring a boolean result
    ///
    /// A `nil` result is a type error. Inside `&&`, `||`, `!` and `?:` nil
    /// still reads as false, so `!missing.flag` holds.
    pub fn evaluate_bool(&self, ctx: &Value) -> Result<bool> {
        match self.evaluate(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::Type {
                expr: self.source.clone(),
                found: other.kind(),
            }),
        }
    }
}

/// Compile and evaluate a boolean expression against `ctx`.
pub fn evaluate_expression(expr: &str, ctx: &Value) -> Result<bool> {
    Expression::compile(expr)?.evaluate_bool(ctx)
}

/// Compile and evaluate an expression of any result type against `ctx`.
pub fn evaluate_value(expr: &str, ctx: &Value) -> Result<Value> {
    Expression::compile(expr)?.evaluate(ctx)
}
