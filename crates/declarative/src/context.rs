//! Collaborator traits
//!
//! These traits keep the orchestrator independent of how infrastructure is
//! applied, how the cluster is queried, and where configuration lives.
//! Implementations report failures with `anyhow` so they can carry their own
//! context chain; the orchestrator maps them onto [`crate::Error`].

use crate::types::StatusReport;
use anyhow::Result;
use blueprint::{Kustomization, TerraformComponent};
use features::{Mapping, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Batch status lookup for kustomizations
pub trait StatusProvider: Send + Sync {
    /// Current status of each named unit.
    ///
    /// Names missing from the returned map are treated as unobserved.
    fn statuses(&self, names: &[String]) -> Result<HashMap<String, StatusReport>>;
}

/// Applies and destroys infrastructure-as-code components
pub trait InfrastructureExecutor: Send + Sync {
    fn apply(&self, component: &TerraformComponent, inputs: &Mapping) -> Result<()>;

    fn destroy(&self, component: &TerraformComponent, inputs: &Mapping) -> Result<()>;
}

/// Submits kustomization documents to the cluster reconciler
pub trait Reconciler: Send + Sync {
    /// Submit the encoded resource document for `kustomization`
    fn apply(&self, kustomization: &Kustomization, document: &[u8]) -> Result<()>;

    fn delete(&self, kustomization: &Kustomization) -> Result<()>;
}

/// Renders a named template with context variables into a document
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, template: &str, vars: &Value) -> Result<Value>;
}

/// Per-context configuration documents
pub trait ConfigStore: Send + Sync {
    /// Environment values for `context` (an empty mapping when none exist)
    fn context_values(&self, context: &str) -> Result<Value>;

    /// Blueprint documents layered over the platform template, in order
    fn blueprint_overrides(&self, context: &str) -> Result<Vec<Value>>;
}

/// The external collaborators an orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub infrastructure: Arc<dyn InfrastructureExecutor>,
    pub reconciler: Arc<dyn Reconciler>,
    pub status: Arc<dyn StatusProvider>,
    pub templates: Arc<dyn TemplateEngine>,
    pub store: Arc<dyn ConfigStore>,
}

/// Kind of step reported to [`ProgressCallback::on_step_start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ApplyComponent,
    DestroyComponent,
    ApplyKustomization,
    DeleteKustomization,
}

impl Step {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::ApplyComponent => "Applying component",
            Self::DestroyComponent => "Destroying component",
            Self::ApplyKustomization => "Applying kustomization",
            Self::DeleteKustomization => "Deleting kustomization",
        }
    }
}

/// Progress callback for orchestration
///
/// Implement this trait to receive progress updates during install,
/// teardown and waits.
pub trait ProgressCallback: Send {
    /// Called before a collaborator is invoked for `target`
    fn on_step_start(&mut self, step: Step, target: &str);

    /// Called after the collaborator returned for `target`
    fn on_step_complete(&mut self, step: Step, target: &str, success: bool);

    /// Called when a wait begins
    fn on_wait_start(&mut self, message: &str, total: usize);

    /// Called after every poll
    fn on_wait_progress(&mut self, ready: usize, total: usize);

    /// Called when a wait ends, successfully or not
    fn on_wait_complete(&mut self, success: bool);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_step_start(&mut self, _step: Step, _target: &str) {}
    fn on_step_complete(&mut self, _step: Step, _target: &str, _success: bool) {}
    fn on_wait_start(&mut self, _message: &str, _total: usize) {}
    fn on_wait_progress(&mut self, _ready: usize, _total: usize) {}
    fn on_wait_complete(&mut self, _success: bool) {}
}
