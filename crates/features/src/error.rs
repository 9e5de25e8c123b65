//! Error types for feature evaluation.
//!
//! Compile and evaluation errors are returned immediately and never retried;
//! the caller decides whether a failing gate aborts the run.

use thiserror::Error;

/// Result type alias for feature evaluation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or evaluating feature expressions.
#[derive(Debug, Error)]
pub enum Error {
    /// Expression text was empty or whitespace only
    #[error("expression is empty")]
    EmptyExpression,

    /// Expression failed to parse
    #[error("failed to compile '{expr}' at offset {position}: {message}")]
    Compile {
        /// Source text of the expression
        expr: String,
        /// Byte offset where parsing failed
        position: usize,
        /// What the parser expected or found
        message: String,
    },

    /// Expression parsed but could not be evaluated
    #[error("failed to evaluate '{expr}': {message}")]
    Eval {
        /// Source text of the expression
        expr: String,
        /// Description of the runtime failure
        message: String,
    },

    /// Boolean expression produced a non-boolean result
    #[error("expression '{expr}' must evaluate to a boolean, got {found}")]
    Type {
        /// Source text of the expression
        expr: String,
        /// Kind of the value that was produced
        found: &'static str,
    },

    /// A default value failed to resolve
    #[error("failed to resolve default '{path}': {source}")]
    Default {
        /// Dot/index path of the offending default (e.g. `cluster.nodes[0].name`)
        path: String,
        /// Underlying evaluation error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach a default-value path to an error.
    ///
    /// Already-located errors keep their innermost path.
    pub(crate) fn at_path(self, path: &str) -> Self {
        match self {
            Self::Default { .. } => self,
            other => Self::Default {
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Whether the error came from the parser rather than from evaluation.
    pub fn is_compile_error(&self) -> bool {
        match self {
            Self::EmptyExpression | Self::Compile { .. } => true,
            Self::Default { source, .. } => source.is_compile_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_path_keeps_innermost() {
        let err = Error::EmptyExpression.at_path("a.b").at_path("a");
        match err {
            Error::Default { path, .. } => assert_eq!(path, "a.b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_compile_error() {
        assert!(Error::EmptyExpression.is_compile_error());
        assert!(Error::EmptyExpression.at_path("x").is_compile_error());
        let eval = Error::Eval {
            expr: "a + 1".into(),
            message: "bad".into(),
        };
        assert!(!eval.is_compile_error());
    }
}
