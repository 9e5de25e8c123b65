//! Error types for orchestration.
//!
//! Errors are categorized so callers can decide whether a failed run is
//! worth repeating and what to tell the operator.

use thiserror::Error;

/// Categories of orchestration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The wait budget ran out before convergence
    Timeout,
    /// The caller stopped the operation
    Canceled,
    /// The reconciler reported a unit as failed
    Reconciliation,
    /// An external apply/destroy failed
    Executor,
    /// Template selection or rendering failed
    Template,
    /// Configuration or expression problems
    Config,
    /// The status provider could not be queried
    Status,
}

impl ErrorCategory {
    /// Whether running the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Status)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "Timed out waiting for reconciliation",
            Self::Canceled => "Operation canceled",
            Self::Reconciliation => "Reconciliation failed",
            Self::Executor => "External command failed",
            Self::Template => "Template error",
            Self::Config => "Configuration error",
            Self::Status => "Status query failed",
        }
    }

    /// Actionable advice for the operator.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Timeout => "Inspect the pending kustomizations or raise the wait timeout",
            Self::Canceled => "Run the command again when ready",
            Self::Reconciliation => "Check the kustomization's events and source",
            Self::Executor => "Check the command output above for details",
            Self::Template => "Check the platform name and template syntax",
            Self::Config => "Check the context values and blueprint overrides",
            Self::Status => "Check cluster connectivity and credentials",
        }
    }
}

/// Errors that can occur while orchestrating a blueprint.
#[derive(Debug, Error)]
pub enum Error {
    /// Deadline elapsed with units still pending
    #[error("timed out waiting for kustomizations: {}", pending.join(", "))]
    Timeout {
        /// Names still unobserved or in progress, sorted
        pending: Vec<String>,
    },

    /// Wait stopped through the cancel token
    #[error("operation canceled")]
    Canceled,

    /// A unit reached the failed state
    #[error("kustomization '{name}' failed: {message}")]
    ReconciliationFailed {
        /// Kustomization name
        name: String,
        /// Message reported by the status provider
        message: String,
    },

    /// Infrastructure or reconciler collaborator failed
    #[error("{target}: {message}")]
    Executor {
        /// Component path or kustomization name
        target: String,
        /// Diagnostic text from the collaborator
        message: String,
    },

    /// Template engine failure
    #[error("template '{name}': {message}")]
    Template {
        /// Template name
        name: String,
        /// Reason
        message: String,
    },

    /// Status provider failed too many times in a row
    #[error("status query failed: {message}")]
    Status {
        /// Last failure reported
        message: String,
    },

    /// Config store or document shape problem
    #[error("configuration error: {message}")]
    Config {
        /// Reason
        message: String,
    },

    /// Expression, condition or default evaluation failed
    #[error(transparent)]
    Feature(#[from] features::Error),

    /// Blueprint model or encoding failed
    #[error(transparent)]
    Blueprint(#[from] blueprint::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Canceled => ErrorCategory::Canceled,
            Error::ReconciliationFailed { .. } => ErrorCategory::Reconciliation,
            Error::Executor { .. } => ErrorCategory::Executor,
            Error::Template { .. } => ErrorCategory::Template,
            Error::Status { .. } => ErrorCategory::Status,
            Error::Config { .. } | Error::Feature(_) | Error::Blueprint(_) => {
                ErrorCategory::Config
            }
        }
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    pub(crate) fn executor(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Executor {
            target: target.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Result type for orchestration.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_lists_pending() {
        let err = Error::Timeout {
            pending: vec!["dns".into(), "ingress".into()],
        };
        assert_eq!(
            err.to_string(),
            "timed out waiting for kustomizations: dns, ingress"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::Canceled.category(), ErrorCategory::Canceled);
        assert!(!Error::Canceled.is_retryable());
        assert_eq!(
            Error::executor("cluster/talos", "exit 1").category(),
            ErrorCategory::Executor
        );
        assert_eq!(
            Error::from(features::Error::EmptyExpression).category(),
            ErrorCategory::Config
        );
    }

    #[test]
    fn test_executor_display_names_target() {
        let err = Error::executor("ingress", "connection refused");
        assert_eq!(err.to_string(), "ingress: connection refused");
    }
}
