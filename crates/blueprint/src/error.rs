//! Error types for blueprint handling and encoding.

use thiserror::Error;

/// Result type alias for blueprint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, merging or encoding blueprints.
#[derive(Debug, Error)]
pub enum Error {
    /// Nil or malformed top-level argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A value kind the encoder cannot represent
    #[error("unsupported type: {kind}")]
    UnsupportedType {
        /// Kind of the offending value (e.g. "channel", "function")
        kind: String,
    },

    /// Failure inside a sequence element, map value or struct field
    #[error("{context}: {source}")]
    Encode {
        /// Index (`[2]`), map key or field name where the failure occurred
        context: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Duration string could not be parsed
    #[error("invalid duration '{value}': {message}")]
    InvalidDuration {
        /// The rejected text
        value: String,
        /// Why it was rejected
        message: String,
    },

    /// Document did not match the blueprint schema
    #[error("invalid blueprint document: {0}")]
    Document(String),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap an error with the key/index/field where it happened.
    pub(crate) fn within(self, context: impl Into<String>) -> Self {
        Self::Encode {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Full location of an encoding failure, outermost first (`spec.items[1].handler`).
    pub fn context_path(&self) -> String {
        let mut path = String::new();
        let mut current = self;
        while let Self::Encode { context, source } = current {
            if !(path.is_empty() || context.starts_with('[')) {
                path.push('.');
            }
            path.push_str(context);
            current = source;
        }
        path
    }

    /// The innermost error beneath any encoding context
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Encode { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_path_joins_levels() {
        let err = Error::UnsupportedType {
            kind: "function".into(),
        }
        .within("handler")
        .within("[1]")
        .within("items");
        assert_eq!(err.context_path(), "items[1].handler");
        assert!(matches!(err.root_cause(), Error::UnsupportedType { .. }));
        assert_eq!(
            err.to_string(),
            "items: [1]: handler: unsupported type: function"
        );
    }
}
