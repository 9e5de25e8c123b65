//! Core types for orchestration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Reconciliation state of one kustomization as seen by the status provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// The reconciler has not reported on the unit yet
    #[default]
    Unobserved,
    InProgress,
    Ready,
    Failed,
    /// Synthetic: the deadline passed before Ready or Failed
    TimedOut,
}

impl UnitState {
    /// Whether the unit will not change state on its own
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unobserved => "unobserved",
            Self::InProgress => "in progress",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        };
        f.write_str(text)
    }
}

/// State plus the provider's human-readable message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: UnitState,
    pub message: Option<String>,
}

impl StatusReport {
    pub fn new(state: UnitState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn with_message(state: UnitState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: Some(message.into()),
        }
    }
}

/// Summary of an install or teardown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    /// Terraform components applied
    pub components_applied: usize,
    /// Terraform components destroyed
    pub components_destroyed: usize,
    /// Kustomizations submitted to the reconciler
    pub kustomizations_applied: usize,
    /// Kustomizations deleted
    pub kustomizations_deleted: usize,
    /// Kustomizations confirmed ready
    pub waited: usize,
    /// Steps skipped (dry run, `destroy: false`)
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.components_applied
            + self.components_destroyed
            + self.kustomizations_applied
            + self.kustomizations_deleted
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.components_applied += other.components_applied;
        self.components_destroyed += other.components_destroyed;
        self.kustomizations_applied += other.kustomizations_applied;
        self.kustomizations_deleted += other.kustomizations_deleted;
        self.waited += other.waited;
        self.skipped += other.skipped;
    }
}

/// Options for a single wait
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Caller-imposed limit; the effective deadline is the shorter of this
    /// and the graph's wait budget
    pub timeout: Option<Duration>,
    /// Consecutive failed status queries tolerated before giving up
    pub max_consecutive_errors: usize,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
            max_consecutive_errors: 5,
        }
    }
}

/// Options for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Don't call collaborators that change anything
    pub dry_run: bool,
    /// Namespace kustomization documents are written to
    pub namespace: String,
    /// Options for every wait the orchestrator performs
    pub wait: WaitOptions,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            namespace: blueprint::manifest::DEFAULT_NAMESPACE.to_string(),
            wait: WaitOptions::default(),
        }
    }
}
