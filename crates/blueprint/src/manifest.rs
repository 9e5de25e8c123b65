//! Reconciler documents
//!
//! Each kustomization is submitted to the cluster as a Flux `Kustomization`
//! resource. The document types here describe themselves through
//! [`Encode`] and are written with [`manifest_encoder`]; blueprints are
//! written back with [`blueprint_encoder`].

use crate::duration::format_duration;
use crate::encoder::{Encode, Encoder, Node, Record, TypeDescriptor};
use crate::types::{
    Blueprint, Kustomization, Metadata, Reference, Repository, Source, TerraformComponent,
};
use features::Value;
use std::collections::BTreeMap;

pub const KUSTOMIZATION_API_VERSION: &str = "kustomize.toolkit.fluxcd.io/v1";
pub const DEFAULT_NAMESPACE: &str = "system-gitops";
pub const DEFAULT_INTERVAL: &str = "1m";
pub const DEFAULT_RETRY_INTERVAL: &str = "2m";

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KustomizationSpec {
    pub interval: String,
    pub timeout: String,
    pub retry_interval: String,
    pub path: String,
    pub prune: bool,
    pub wait: bool,
    pub force: bool,
    pub source_ref: SourceRef,
    pub depends_on: Vec<String>,
    pub patches: Vec<Value>,
    pub components: Vec<String>,
    pub substitute: BTreeMap<String, String>,
}

/// A Flux `Kustomization` resource
#[derive(Debug, Clone, PartialEq)]
pub struct KustomizationManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: KustomizationSpec,
}

impl KustomizationManifest {
    /// Build the resource for `kustomization` as declared in `blueprint`.
    ///
    /// Kustomizations without a source pull from the blueprint's own
    /// repository, named after the blueprint.
    pub fn new(blueprint: &Blueprint, kustomization: &Kustomization, namespace: &str) -> Self {
        let source_name = kustomization
            .source
            .clone()
            .unwrap_or_else(|| blueprint.metadata.name.clone());
        let source = blueprint.find_source(&source_name);

        let url = source.map_or(blueprint.repository.url.as_str(), |s| s.url.as_str());
        let kind = if url.starts_with("oci://") {
            "OCIRepository"
        } else {
            "GitRepository"
        };

        let prefix = source
            .and_then(|s| s.path_prefix.as_deref())
            .unwrap_or("kustomize");
        let path = if kustomization.path.is_empty() {
            format!("{prefix}/{}", kustomization.name)
        } else {
            format!("{prefix}/{}", kustomization.path)
        };

        Self {
            api_version: KUSTOMIZATION_API_VERSION.to_string(),
            kind: "Kustomization".to_string(),
            metadata: ObjectMeta {
                name: kustomization.name.clone(),
                namespace: namespace.to_string(),
            },
            spec: KustomizationSpec {
                interval: kustomization
                    .interval
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
                timeout: format_duration(kustomization.effective_timeout()),
                retry_interval: kustomization
                    .retry_interval
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RETRY_INTERVAL.to_string()),
                path,
                prune: kustomization.prune.unwrap_or(true),
                wait: kustomization.should_wait(),
                force: kustomization.force.unwrap_or(false),
                source_ref: SourceRef {
                    kind: kind.to_string(),
                    name: source_name,
                },
                depends_on: kustomization.depends_on.clone(),
                patches: kustomization.patches.iter().map(normalize_patch).collect(),
                components: kustomization.components.clone(),
                substitute: kustomization.substitutions.clone(),
            },
        }
    }
}

/// Plain patch text becomes `{patch: ...}`; documents without a `patch`
/// key are inlined as YAML text.
fn normalize_patch(patch: &Value) -> Value {
    match patch {
        Value::String(text) => {
            let mut entry = Value::mapping();
            if let Some(map) = entry.as_mapping_mut() {
                map.insert("patch".to_string(), Value::String(text.clone()));
            }
            entry
        }
        Value::Mapping(map) if !map.contains_key("patch") => {
            let text = serde_yaml::to_string(patch).unwrap_or_default();
            normalize_patch(&Value::String(text))
        }
        other => other.clone(),
    }
}

impl Encode for ObjectMeta {
    fn to_node(&self) -> Node {
        Record::new("ObjectMeta")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .into()
    }
}

impl Encode for SourceRef {
    fn to_node(&self) -> Node {
        Record::new("SourceRef")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .into()
    }
}

impl Encode for KustomizationSpec {
    fn to_node(&self) -> Node {
        let depends_on: Vec<Node> = self
            .depends_on
            .iter()
            .map(|name| Record::new("DependencyReference").field("name", name).into())
            .collect();
        let post_build = Record::new("PostBuild").field("substitute", &self.substitute);

        Record::new("KustomizationSpec")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("retry_interval", &self.retry_interval)
            .field("path", &self.path)
            .field("prune", self.prune)
            .field("wait", self.wait)
            .field("force", self.force)
            .field("source_ref", &self.source_ref)
            .field("depends_on", Node::seq(depends_on))
            .field("patches", &self.patches)
            .field("components", &self.components)
            .field("post_build", post_build)
            .into()
    }
}

impl Encode for KustomizationManifest {
    fn to_node(&self) -> Node {
        Record::new("KustomizationManifest")
            .field("api_version", &self.api_version)
            .field("kind", &self.kind)
            .field("metadata", &self.metadata)
            .field("spec", &self.spec)
            .into()
    }
}

/// Encoder for reconciler documents
pub fn manifest_encoder() -> Encoder {
    Encoder::new()
        .register(
            "KustomizationManifest",
            TypeDescriptor::new().rename("api_version", "apiVersion"),
        )
        .register(
            "KustomizationSpec",
            TypeDescriptor::new()
                .rename("retry_interval", "retryInterval")
                .rename("source_ref", "sourceRef")
                .rename("depends_on", "dependsOn")
                .rename("post_build", "postBuild")
                .omit_empty("depends_on")
                .omit_empty("patches")
                .omit_empty("components")
                .omit_empty("post_build")
                .omit_empty("force"),
        )
        .register("PostBuild", TypeDescriptor::new().omit_empty("substitute"))
}

impl Encode for Metadata {
    fn to_node(&self) -> Node {
        Record::new("Metadata")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("authors", &self.authors)
            .into()
    }
}

impl Encode for Reference {
    fn to_node(&self) -> Node {
        Record::new("Reference")
            .field("branch", &self.branch)
            .field("tag", &self.tag)
            .field("semver", &self.semver)
            .field("commit", &self.commit)
            .into()
    }
}

impl Encode for Repository {
    fn to_node(&self) -> Node {
        Record::new("Repository")
            .field("url", &self.url)
            .field("reference", &self.reference)
            .field("secret_name", &self.secret_name)
            .into()
    }
}

impl Encode for Source {
    fn to_node(&self) -> Node {
        Record::new("Source")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("reference", &self.reference)
            .field("path_prefix", &self.path_prefix)
            .field("secret_name", &self.secret_name)
            .into()
    }
}

impl Encode for TerraformComponent {
    fn to_node(&self) -> Node {
        Record::new("TerraformComponent")
            .field("path", &self.path)
            .field("source", &self.source)
            .field("inputs", &self.inputs)
            .field("destroy", &self.destroy)
            .into()
    }
}

impl Encode for Kustomization {
    fn to_node(&self) -> Node {
        Record::new("Kustomization")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("source", &self.source)
            .field("depends_on", &self.depends_on)
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .field("retry_interval", &self.retry_interval)
            .field("patches", &self.patches)
            .field("components", &self.components)
            .field("wait", &self.wait)
            .field("force", &self.force)
            .field("prune", &self.prune)
            .field("substitutions", &self.substitutions)
            .into()
    }
}

impl Encode for Blueprint {
    fn to_node(&self) -> Node {
        Record::new("Blueprint")
            .field("kind", &self.kind)
            .field("api_version", &self.api_version)
            .field("metadata", &self.metadata)
            .field("repository", &self.repository)
            .field("sources", &self.sources)
            .field("terraform", &self.terraform)
            .field("kustomizations", &self.kustomizations)
            .into()
    }
}

/// Encoder writing blueprints in their persisted layout
pub fn blueprint_encoder() -> Encoder {
    let optional = |fields: &[&str]| {
        fields
            .iter()
            .fold(TypeDescriptor::new(), |d, field| d.omit_empty(field))
    };

    Encoder::new()
        .register(
            "Blueprint",
            TypeDescriptor::new()
                .rename("api_version", "apiVersion")
                .rename("kustomizations", "kustomize"),
        )
        .register(
            "Metadata",
            optional(&["description", "authors"]),
        )
        .register("Reference", optional(&["branch", "tag", "semver", "commit"]))
        .register(
            "Repository",
            optional(&["secret_name"])
                .rename("reference", "ref")
                .rename("secret_name", "secretName"),
        )
        .register(
            "Source",
            optional(&["path_prefix", "secret_name"])
                .rename("reference", "ref")
                .rename("path_prefix", "pathPrefix")
                .rename("secret_name", "secretName"),
        )
        .register("TerraformComponent", optional(&["source", "inputs", "destroy"]))
        .register(
            "Kustomization",
            optional(&[
                "source",
                "depends_on",
                "timeout",
                "interval",
                "retry_interval",
                "patches",
                "components",
                "wait",
                "force",
                "prune",
                "substitutions",
            ])
            .rename("depends_on", "dependsOn")
            .rename("retry_interval", "retryInterval"),
        )
}
