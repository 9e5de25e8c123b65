//! Process-backed collaborators for the orchestrator

pub mod kubectl;
pub mod store;
pub mod templates;
pub mod terraform;

use declarative::Collaborators;
use std::path::Path;
use std::sync::Arc;

use crate::config::CliConfig;

/// Wire terraform, kubectl and the project directory into collaborators
pub fn collaborators(config: &CliConfig, project_dir: &Path, stream: bool) -> Collaborators {
    Collaborators {
        infrastructure: Arc::new(terraform::TerraformCli::new(
            &config.terraform_bin,
            project_dir,
            stream,
        )),
        reconciler: Arc::new(kubectl::KubectlReconciler::new(
            &config.kubectl_bin,
            &config.namespace,
        )),
        status: Arc::new(kubectl::KubectlStatus::new(
            &config.kubectl_bin,
            &config.namespace,
        )),
        templates: Arc::new(templates::YamlTemplateEngine),
        store: Arc::new(store::DirStore::new(project_dir)),
    }
}
