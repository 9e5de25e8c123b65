//! kubectl as reconciler and status provider for Flux kustomizations

use anyhow::{Context, Result};
use blueprint::Kustomization;
use declarative::{Reconciler, StatusProvider, StatusReport, UnitState};
use serde::Deserialize;
use std::collections::HashMap;

use crate::runner;

const RESOURCE: &str = "kustomizations.kustomize.toolkit.fluxcd.io";

/// Ready=False reasons that mean "still working on it"
const PENDING_REASONS: &[&str] = &[
    "Progressing",
    "ProgressingWithRetry",
    "DependencyNotReady",
    "ReconciliationInProgress",
];

/// Submits kustomization documents with `kubectl apply -f -`
pub struct KubectlReconciler {
    bin: String,
    namespace: String,
}

impl KubectlReconciler {
    pub fn new(bin: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            namespace: namespace.into(),
        }
    }
}

impl Reconciler for KubectlReconciler {
    fn apply(&self, kustomization: &Kustomization, document: &[u8]) -> Result<()> {
        let output = runner::run_with_stdin(&self.bin, &["apply", "-f", "-"], document)
            .with_context(|| format!("kubectl apply failed for '{}'", kustomization.name))?;
        log::debug!("{output}");
        Ok(())
    }

    fn delete(&self, kustomization: &Kustomization) -> Result<()> {
        let output = runner::run_capture(
            &self.bin,
            &[
                "delete",
                RESOURCE,
                &kustomization.name,
                "-n",
                &self.namespace,
                "--ignore-not-found",
            ],
        )
        .with_context(|| format!("kubectl delete failed for '{}'", kustomization.name))?;
        log::debug!("{output}");
        Ok(())
    }
}

/// Reads kustomization conditions with one `kubectl get` per poll
pub struct KubectlStatus {
    bin: String,
    namespace: String,
}

impl KubectlStatus {
    pub fn new(bin: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            namespace: namespace.into(),
        }
    }
}

impl StatusProvider for KubectlStatus {
    fn statuses(&self, names: &[String]) -> Result<HashMap<String, StatusReport>> {
        let json = runner::run_capture(
            &self.bin,
            &["get", RESOURCE, "-n", &self.namespace, "-o", "json"],
        )?;
        parse_statuses(&json, names)
    }
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    items: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    metadata: ResourceMeta,
    #[serde(default)]
    status: ResourceStatus,
}

#[derive(Debug, Deserialize)]
struct ResourceMeta {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceStatus {
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Map a `kubectl get -o json` list onto reports for `names`.
///
/// Units absent from the list are left out, so the waiter sees them as
/// unobserved.
pub fn parse_statuses(json: &str, names: &[String]) -> Result<HashMap<String, StatusReport>> {
    let list: ResourceList =
        serde_json::from_str(json).context("Invalid kustomization list from kubectl")?;

    Ok(list
        .items
        .into_iter()
        .filter(|item| names.contains(&item.metadata.name))
        .map(|item| {
            let report = report_for(&item.status);
            (item.metadata.name, report)
        })
        .collect())
}

fn report_for(status: &ResourceStatus) -> StatusReport {
    let Some(ready) = status.conditions.iter().find(|c| c.kind == "Ready") else {
        return StatusReport::new(UnitState::InProgress);
    };
    match ready.status.as_str() {
        "True" => StatusReport::new(UnitState::Ready),
        "False" if !PENDING_REASONS.contains(&ready.reason.as_str()) => {
            StatusReport::with_message(UnitState::Failed, format!("{}: {}", ready.reason, ready.message))
        }
        _ => StatusReport::with_message(UnitState::InProgress, ready.message.clone()),
    }
}
