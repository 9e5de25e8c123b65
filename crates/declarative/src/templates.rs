//! Platform templates
//!
//! A platform template is a document with three sections:
//!
//! ```yaml
//! blueprint: { ... }        # base blueprint, may contain ${...} markers
//! values: { ... }           # defaults, resolved against the context
//! features:                 # optional fragments
//!   - name: observability
//!     when: "observability.enabled == true"
//!     conditions: { "storage.provider": [auto, openebs] }
//!     terraform: [ ... ]
//!     kustomize: [ ... ]
//! ```

use crate::error::{Error, Result};
use blueprint::Blueprint;
use features::{Expression, Mapping, Value, match_conditions, resolve_value};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Template used when no platform is set
pub const DEFAULT_PLATFORM: &str = "default";

const BUILTIN: &[(&str, &str)] = &[
    ("default", include_str!("../templates/default.yaml")),
    ("local", include_str!("../templates/local.yaml")),
    ("aws", include_str!("../templates/aws.yaml")),
    ("azure", include_str!("../templates/azure.yaml")),
    ("metal", include_str!("../templates/metal.yaml")),
];

/// A selected template; `text` is empty for unknown platforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTemplate {
    pub name: String,
    pub text: String,
}

impl PlatformTemplate {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Catalog of platform templates: the built-in set plus registered ones
#[derive(Debug, Clone)]
pub struct PlatformTemplates {
    templates: BTreeMap<String, String>,
}

impl Default for PlatformTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PlatformTemplates {
    /// Catalog with the built-in platforms
    pub fn builtin() -> Self {
        Self {
            templates: BUILTIN
                .iter()
                .map(|(name, text)| ((*name).to_string(), (*text).to_string()))
                .collect(),
        }
    }

    /// Catalog with no templates at all
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Add or replace a template
    pub fn register(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), text.into());
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Pick the template for `platform`.
    ///
    /// An empty name selects the default template. Unknown platforms get an
    /// empty template rather than an error so they can still be layered
    /// with overrides.
    pub fn select(&self, platform: &str) -> PlatformTemplate {
        let name = if platform.is_empty() {
            DEFAULT_PLATFORM
        } else {
            platform
        };
        match self.templates.get(name) {
            Some(text) => PlatformTemplate {
                name: name.to_string(),
                text: text.clone(),
            },
            None => {
                log::debug!("no template for platform '{name}'; using an empty one");
                PlatformTemplate {
                    name: name.to_string(),
                    text: String::new(),
                }
            }
        }
    }
}

/// A rendered platform template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateDocument {
    pub blueprint: Value,
    pub values: Mapping,
    pub features: Vec<Feature>,
}

impl TemplateDocument {
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let yaml = serde_yaml::to_value(value).map_err(|e| Error::config(e.to_string()))?;
        serde_yaml::from_value(yaml)
            .map_err(|e| Error::config(format!("invalid template document: {e}")))
    }
}

/// An optional blueprint fragment gated on the environment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub name: String,
    /// Boolean expression; empty means always
    pub when: String,
    /// Dot-path conditions; empty means always
    pub conditions: Mapping,
    pub terraform: Vec<Value>,
    pub kustomize: Vec<Value>,
}

impl Feature {
    /// Whether both the expression and the conditions hold for `values`
    pub fn is_active(&self, values: &Value) -> Result<bool> {
        if !self.when.trim().is_empty() && !Expression::compile(&self.when)?.evaluate_bool(values)? {
            return Ok(false);
        }
        Ok(match_conditions(&self.conditions, values))
    }

    /// The fragment as a blueprint, markers resolved against `values`
    pub fn fragment(&self, values: &Value) -> Result<Blueprint> {
        let mut doc = Mapping::new();
        doc.insert(
            "terraform".to_string(),
            resolve_value(&Value::Sequence(self.terraform.clone()), values)?,
        );
        doc.insert(
            "kustomize".to_string(),
            resolve_value(&Value::Sequence(self.kustomize.clone()), values)?,
        );
        Ok(Blueprint::from_value(&Value::Mapping(doc))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_empty_platform_selects_default() {
        let templates = PlatformTemplates::builtin();
        let selected = templates.select("");
        assert_eq!(selected.name, DEFAULT_PLATFORM);
        assert!(!selected.is_empty());
    }

    #[test]
    fn test_unknown_platform_is_empty() {
        let selected = PlatformTemplates::builtin().select("mainframe");
        assert_eq!(selected.name, "mainframe");
        assert!(selected.is_empty());
    }

    #[test]
    fn test_builtin_catalog() {
        let templates = PlatformTemplates::builtin();
        let names: Vec<&str> = templates.names().collect();
        assert_eq!(names, vec!["aws", "azure", "default", "local", "metal"]);
        assert_eq!(PlatformTemplates::empty().names().count(), 0);
    }

    #[test]
    fn test_builtin_templates_parse() {
        for (name, text) in BUILTIN {
            let doc = TemplateDocument::from_value(&yaml(text)).unwrap();
            assert!(!doc.values.is_empty(), "{name} has no values");
            assert!(doc.blueprint.get("kustomize").is_some(), "{name} has no kustomizations");
        }
    }

    #[test]
    fn test_registered_template_overrides_builtin() {
        let mut templates = PlatformTemplates::builtin();
        templates.register("local", "blueprint: {}");
        assert_eq!(templates.select("local").text, "blueprint: {}");
    }

    #[test]
    fn test_feature_activation() {
        let values = yaml("storage: {provider: openebs}\nobservability: {enabled: false}");
        let storage = Feature {
            name: "storage".into(),
            conditions: yaml(r#"{"storage.provider": [auto, openebs]}"#)
                .as_mapping()
                .cloned()
                .unwrap(),
            ..Default::default()
        };
        assert!(storage.is_active(&values).unwrap());

        let observability = Feature {
            name: "observability".into(),
            when: "observability.enabled == true".into(),
            ..Default::default()
        };
        assert!(!observability.is_active(&values).unwrap());

        let broken = Feature {
            when: "observability.enabled ==".into(),
            ..Default::default()
        };
        assert!(matches!(
            broken.is_active(&values),
            Err(Error::Feature(features::Error::Compile { .. }))
        ));

        let unset_gate = Feature {
            when: "observability.tracing".into(),
            ..Default::default()
        };
        assert!(matches!(
            unset_gate.is_active(&values),
            Err(Error::Feature(features::Error::Type { found: "nil", .. }))
        ));
    }

    #[test]
    fn test_fragment_resolves_markers() {
        let feature: Feature = serde_yaml::from_str(
            r#"
name: csi
kustomize:
  - name: csi
    path: "csi/${storage.provider}"
    dependsOn: [policy-resources]
"#,
        )
        .unwrap();
        let fragment = feature
            .fragment(&yaml("storage: {provider: openebs}"))
            .unwrap();
        assert_eq!(fragment.kustomizations[0].path, "csi/openebs");
        assert!(fragment.terraform.is_empty());
    }
}
