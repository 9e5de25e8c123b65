//! Core blueprint types

use crate::duration::parse_duration;
use crate::error::{Error, Result};
use features::{Mapping, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Timeout applied to kustomizations that do not declare one
pub const DEFAULT_KUSTOMIZATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub const BLUEPRINT_API_VERSION: &str = "blueprints.bpctl.dev/v1alpha1";
pub const BLUEPRINT_KIND: &str = "Blueprint";

fn default_api_version() -> String {
    BLUEPRINT_API_VERSION.to_string()
}

fn default_kind() -> String {
    BLUEPRINT_KIND.to_string()
}

/// The declarative bundle of sources, infrastructure components and
/// kustomizations for an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Where the blueprint itself is sourced from
    #[serde(default)]
    pub repository: Repository,

    #[serde(default)]
    pub sources: Vec<Source>,

    /// Infrastructure-as-code components
    #[serde(default)]
    pub terraform: Vec<TerraformComponent>,

    /// Cluster reconciliation units
    #[serde(default, rename = "kustomize")]
    pub kustomizations: Vec<Kustomization>,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            api_version: default_api_version(),
            metadata: Metadata::default(),
            repository: Repository::default(),
            sources: Vec::new(),
            terraform: Vec::new(),
            kustomizations: Vec::new(),
        }
    }
}

impl Blueprint {
    /// Build a blueprint from a loosely typed document
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let yaml = serde_yaml::to_value(value)?;
        serde_yaml::from_value(yaml).map_err(|e| Error::Document(e.to_string()))
    }

    /// Parse a blueprint from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Document(e.to_string()))
    }

    /// Convert to a loosely typed document
    pub fn to_value(&self) -> Result<Value> {
        let yaml = serde_yaml::to_value(self)?;
        Ok(serde_yaml::from_value(yaml)?)
    }

    /// Check whether the blueprint declares nothing
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.terraform.is_empty() && self.kustomizations.is_empty()
    }

    /// Find a kustomization by name (first declaration wins)
    pub fn find_kustomization(&self, name: &str) -> Option<&Kustomization> {
        self.kustomizations.iter().find(|k| k.name == name)
    }

    /// Find a source by name
    pub fn find_source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Names of kustomizations the orchestrator must block on
    pub fn waited_kustomizations(&self) -> Vec<String> {
        self.kustomizations
            .iter()
            .filter(|k| k.should_wait())
            .map(|k| k.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub authors: Vec<String>,
}

/// A git reference: exactly one of these is normally set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl Reference {
    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.tag.is_none() && self.semver.is_none() && self.commit.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default)]
    pub url: String,

    #[serde(default, rename = "ref")]
    pub reference: Reference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// A named origin that components and kustomizations are pulled from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub name: String,

    pub url: String,

    #[serde(default, rename = "ref")]
    pub reference: Reference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// A unit of infrastructure-as-code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerraformComponent {
    /// Module path, relative to the source (or the project when no source)
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Input variables
    #[serde(default)]
    pub inputs: Mapping,

    /// Whether `down` destroys this component (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy: Option<bool>,
}

impl TerraformComponent {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn should_destroy(&self) -> bool {
        self.destroy.unwrap_or(true)
    }
}

/// A named, dependency-aware reconciliation unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    pub name: String,

    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Human duration (`5m`); unset means [`DEFAULT_KUSTOMIZATION_TIMEOUT`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<String>,

    /// Strategic-merge or JSON6902 patches, as strings or documents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,

    /// Block on readiness during install (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune: Option<bool>,

    /// Post-build variable substitutions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitutions: BTreeMap<String, String>,
}

impl Kustomization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style dependency declaration
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(names.into_iter().map(Into::into));
        self
    }

    /// Builder-style timeout declaration
    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn should_wait(&self) -> bool {
        self.wait.unwrap_or(true)
    }

    /// Declared timeout, or the default when unset or unparseable
    pub fn effective_timeout(&self) -> Duration {
        match self.timeout.as_deref() {
            None => DEFAULT_KUSTOMIZATION_TIMEOUT,
            Some(text) => parse_duration(text).unwrap_or_else(|e| {
                log::warn!(
                    "kustomization '{}': {e}; using default timeout",
                    self.name
                );
                DEFAULT_KUSTOMIZATION_TIMEOUT
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
kind: Blueprint
apiVersion: blueprints.bpctl.dev/v1alpha1
metadata:
  name: local
  description: Local development cluster
  authors: [platform-team]
repository:
  url: https://github.com/example/platform
  ref: {branch: main}
sources:
  - name: core
    url: https://github.com/example/core
    ref: {tag: v0.4.0}
terraform:
  - path: cluster/talos
    inputs: {controlplanes: 1, workers: 2}
kustomize:
  - name: policy
    path: policy
  - name: ingress
    path: ingress
    dependsOn: [policy]
    timeout: 10m
    wait: false
"#;

    #[test]
    fn test_parse_yaml() {
        let bp = Blueprint::from_yaml(SAMPLE).unwrap();
        assert_eq!(bp.metadata.name, "local");
        assert_eq!(bp.repository.reference.branch.as_deref(), Some("main"));
        assert_eq!(bp.sources[0].reference.tag.as_deref(), Some("v0.4.0"));
        assert_eq!(bp.terraform[0].inputs["workers"], Value::Int(2));
        let ingress = bp.find_kustomization("ingress").unwrap();
        assert_eq!(ingress.depends_on, vec!["policy"]);
        assert_eq!(ingress.effective_timeout(), Duration::from_secs(600));
        assert!(!ingress.should_wait());
        assert_eq!(bp.waited_kustomizations(), vec!["policy"]);
    }

    #[test]
    fn test_value_roundtrip() {
        let bp = Blueprint::from_yaml(SAMPLE).unwrap();
        let value = bp.to_value().unwrap();
        assert_eq!(
            value.get_path("metadata.name"),
            Some(&Value::from("local"))
        );
        assert_eq!(Blueprint::from_value(&value).unwrap(), bp);
    }

    #[test]
    fn test_defaults_applied() {
        let bp = Blueprint::from_value(&Value::Null).unwrap();
        assert_eq!(bp.kind, BLUEPRINT_KIND);
        assert!(bp.is_empty());

        let k = Kustomization::new("x");
        assert!(k.should_wait());
        assert_eq!(k.effective_timeout(), DEFAULT_KUSTOMIZATION_TIMEOUT);
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let k = Kustomization::new("x").with_timeout("soon");
        assert_eq!(k.effective_timeout(), DEFAULT_KUSTOMIZATION_TIMEOUT);
    }

    #[test]
    fn test_schema_mismatch_is_document_error() {
        let value: Value = serde_yaml::from_str("kustomize: {not: a-list}").unwrap();
        assert!(matches!(
            Blueprint::from_value(&value),
            Err(Error::Document(_))
        ));
    }
}
