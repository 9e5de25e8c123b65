//! Per-context configuration on disk
//!
//! ```text
//! <project>/contexts/<name>/values.{yaml,yml,json,toml}
//! <project>/contexts/<name>/blueprint.{yaml,yml,json}
//! ```
//!
//! A multi-document `blueprint.yaml` yields one override per document.

use anyhow::{Context, Result};
use declarative::ConfigStore;
use features::Value;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const VALUE_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "toml"];
const BLUEPRINT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Reads contexts from a project directory
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn context_dir(&self, context: &str) -> PathBuf {
        self.root.join("contexts").join(context)
    }

    /// First `<stem>.<ext>` that exists, in extension order
    fn find(&self, context: &str, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
        let dir = self.context_dir(context);
        extensions
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}

fn parse_documents(path: &Path) -> Result<Vec<Value>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;

    let documents: Vec<Value> = match extension(path) {
        "json" => vec![serde_json::from_str::<Value>(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?],
        "toml" => vec![toml::from_str::<Value>(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?],
        _ => serde_yaml::Deserializer::from_str(&content)
            .map(Value::deserialize)
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };

    Ok(documents.into_iter().filter(|doc| !doc.is_null()).collect())
}

impl ConfigStore for DirStore {
    fn context_values(&self, context: &str) -> Result<Value> {
        let Some(path) = self.find(context, "values", VALUE_EXTENSIONS) else {
            log::debug!("no values for context '{context}'");
            return Ok(Value::mapping());
        };
        log::debug!("loading values from {}", path.display());
        Ok(parse_documents(&path)?
            .into_iter()
            .next()
            .unwrap_or_else(Value::mapping))
    }

    fn blueprint_overrides(&self, context: &str) -> Result<Vec<Value>> {
        match self.find(context, "blueprint", BLUEPRINT_EXTENSIONS) {
            Some(path) => {
                log::debug!("loading blueprint overrides from {}", path.display());
                parse_documents(&path)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(files: &[(&str, &str)]) -> (TempDir, DirStore) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("contexts").join("local");
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        let store = DirStore::new(tmp.path());
        (tmp, store)
    }

    #[test]
    fn test_missing_context_is_empty() {
        let (_tmp, store) = store_with(&[]);
        let values = store.context_values("staging").unwrap();
        assert!(values.as_mapping().is_some_and(|m| m.is_empty()));
        assert!(store.blueprint_overrides("staging").unwrap().is_empty());
    }

    #[test]
    fn test_yaml_values() {
        let (_tmp, store) = store_with(&[("values.yaml", "platform: local\nvm:\n  driver: colima\n")]);
        let values = store.context_values("local").unwrap();
        assert_eq!(values.get("platform").and_then(Value::as_str), Some("local"));
        assert_eq!(values.get_path("vm.driver").and_then(Value::as_str), Some("colima"));
    }

    #[test]
    fn test_toml_values() {
        let (_tmp, store) = store_with(&[("values.toml", "platform = \"aws\"\n\n[cluster]\nworkers = 3\n")]);
        let values = store.context_values("local").unwrap();
        assert_eq!(values.get("platform").and_then(Value::as_str), Some("aws"));
        assert_eq!(values.get_path("cluster.workers").and_then(Value::as_f64), Some(3.0));
    }

    #[test]
    fn test_yaml_preferred_over_json() {
        let (_tmp, store) = store_with(&[
            ("values.json", r#"{"platform": "azure"}"#),
            ("values.yaml", "platform: metal"),
        ]);
        let values = store.context_values("local").unwrap();
        assert_eq!(values.get("platform").and_then(Value::as_str), Some("metal"));
    }

    #[test]
    fn test_multi_document_overrides() {
        let (_tmp, store) = store_with(&[(
            "blueprint.yaml",
            "kustomize:\n  - name: app\n---\nterraform:\n  - path: cluster\n",
        )]);
        let overrides = store.blueprint_overrides("local").unwrap();
        assert_eq!(overrides.len(), 2);
        assert!(overrides[0].get("kustomize").is_some());
        assert!(overrides[1].get("terraform").is_some());
    }

    #[test]
    fn test_invalid_values() {
        let (_tmp, store) = store_with(&[("values.json", "{ nope")]);
        let err = store.context_values("local").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }
}
