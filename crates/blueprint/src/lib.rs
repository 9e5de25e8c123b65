//! # blueprint
//!
//! In-memory model of a blueprint: sources, terraform components and
//! kustomizations, plus the analysis and encoding built on top of it.
//!
//! - [`Blueprint`] and friends deserialize from the persisted YAML layout
//!   and layer with [`Blueprint::merge`]
//! - [`DependencyGraph`] computes the install/teardown order and the wait
//!   budget for kustomizations, tolerating cycles and dangling references
//! - [`Encoder`] writes any [`Encode`] type with per-type field paths;
//!   [`KustomizationManifest`] is the document submitted to the reconciler
//!
//! ## Example
//!
//! ```
//! use blueprint::{Blueprint, DependencyGraph};
//! use std::time::Duration;
//!
//! let bp = Blueprint::from_yaml(r"
//! kustomize:
//!   - {name: policy, timeout: 2m}
//!   - {name: ingress, dependsOn: [policy], timeout: 3m}
//! ").unwrap();
//!
//! let graph = DependencyGraph::from_kustomizations(&bp.kustomizations);
//! assert_eq!(graph.install_order(), vec!["policy", "ingress"]);
//! assert_eq!(graph.max_wait_time(), Duration::from_secs(300));
//! ```

pub mod duration;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod manifest;
mod merge;
pub mod types;

pub use duration::{format_duration, parse_duration};
pub use encoder::{Encode, Encoder, Field, FieldPath, Node, Record, TypeDescriptor};
pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use manifest::{KustomizationManifest, blueprint_encoder, manifest_encoder};
pub use types::{
    Blueprint, DEFAULT_KUSTOMIZATION_TIMEOUT, Kustomization, Metadata, Reference, Repository,
    Source, TerraformComponent,
};
