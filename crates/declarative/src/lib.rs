//! # Declarative
//!
//! Wait-aware rollout and teardown of blueprints.
//!
//! ## Core Concepts
//!
//! - **Orchestrator**: owns a blueprint, loads it from platform templates and
//!   overrides, applies it in dependency order and tears it down in reverse
//! - **Waiter**: polls the reconciler's status until kustomizations are ready,
//!   one fails, the wait budget runs out, or the caller cancels
//! - **PlatformTemplates**: built-in `default`, `local`, `aws`, `azure` and
//!   `metal` templates with feature-gated fragments
//!
//! ## Collaborator Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`InfrastructureExecutor`]: applies and destroys terraform components
//! - [`Reconciler`]: submits and deletes kustomization documents
//! - [`StatusProvider`]: reports kustomization readiness in batches
//! - [`TemplateEngine`]: renders platform templates
//! - [`ConfigStore`]: supplies context values and blueprint overrides
//! - [`ProgressCallback`]: receives progress updates
//!
//! This allows the crate to be used without hard dependencies on terraform,
//! kubectl, or any particular UI.
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Collaborators, Orchestrator, OrchestratorOptions};
//!
//! let mut orchestrator = Orchestrator::new("local", collaborators, OrchestratorOptions::default());
//! orchestrator.load_config(true)?;
//! let summary = orchestrator.install()?;
//! println!("{} change(s), {} ready", summary.total_changes(), summary.waited);
//! ```

pub mod cancel;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod templates;
pub mod types;
pub mod waiter;

// Re-export main types at crate root
pub use cancel::CancelToken;
pub use context::{
    Collaborators, ConfigStore, InfrastructureExecutor, NoProgress, ProgressCallback, Reconciler,
    StatusProvider, Step, TemplateEngine,
};
pub use error::{Error, ErrorCategory, Result};
pub use orchestrator::Orchestrator;
pub use templates::{DEFAULT_PLATFORM, Feature, PlatformTemplate, PlatformTemplates, TemplateDocument};
pub use types::{ExecuteSummary, OrchestratorOptions, StatusReport, UnitState, WaitOptions};
pub use waiter::{Waiter, wait_for_kustomizations};
