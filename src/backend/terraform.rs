//! Terraform CLI as the infrastructure executor

use anyhow::{Context, Result};
use blueprint::TerraformComponent;
use declarative::InfrastructureExecutor;
use features::Mapping;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner;

/// Variables file terraform loads automatically from the working directory
pub const VARS_FILE: &str = "terraform.tfvars.json";

/// Runs `terraform` against `<project>/terraform/<component path>`
pub struct TerraformCli {
    bin: String,
    project_dir: PathBuf,
    /// Stream terraform's output instead of capturing it
    stream: bool,
}

impl TerraformCli {
    pub fn new(bin: impl Into<String>, project_dir: impl Into<PathBuf>, stream: bool) -> Self {
        Self {
            bin: bin.into(),
            project_dir: project_dir.into(),
            stream,
        }
    }

    pub fn working_dir(&self, component: &TerraformComponent) -> PathBuf {
        self.project_dir.join("terraform").join(&component.path)
    }

    /// Write `inputs` where terraform picks them up
    pub fn write_vars(dir: &Path, inputs: &Mapping) -> Result<PathBuf> {
        let path = dir.join(VARS_FILE);
        let content = serde_json::to_vec_pretty(inputs).context("Failed to serialize inputs")?;
        fs::write(&path, content).with_context(|| format!("Could not write {}", path.display()))?;
        Ok(path)
    }

    fn terraform(&self, dir: &Path, args: &[&str]) -> Result<()> {
        let chdir = format!("-chdir={}", dir.display());
        let mut full = vec![chdir.as_str()];
        full.extend_from_slice(args);

        if self.stream {
            runner::run(&self.bin, &full)
        } else {
            let output = runner::run_capture(&self.bin, &full)?;
            log::debug!("{} {}:\n{output}", self.bin, args.join(" "));
            Ok(())
        }
    }

    fn prepare(&self, component: &TerraformComponent, inputs: &Mapping) -> Result<PathBuf> {
        let dir = self.working_dir(component);
        if !dir.is_dir() {
            anyhow::bail!("Component directory not found: {}", dir.display());
        }
        Self::write_vars(&dir, inputs)?;
        self.terraform(&dir, &["init", "-input=false"])?;
        Ok(dir)
    }
}

impl InfrastructureExecutor for TerraformCli {
    fn apply(&self, component: &TerraformComponent, inputs: &Mapping) -> Result<()> {
        let dir = self.prepare(component, inputs)?;
        self.terraform(&dir, &["apply", "-auto-approve", "-input=false"])
            .with_context(|| format!("terraform apply failed for '{}'", component.path))
    }

    fn destroy(&self, component: &TerraformComponent, inputs: &Mapping) -> Result<()> {
        let dir = self.prepare(component, inputs)?;
        self.terraform(&dir, &["destroy", "-auto-approve", "-input=false"])
            .with_context(|| format!("terraform destroy failed for '{}'", component.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use features::Value;
    use tempfile::TempDir;

    #[test]
    fn test_working_dir() {
        let cli = TerraformCli::new("terraform", "/srv/infra", false);
        let component = TerraformComponent::new("network/vpc");
        assert_eq!(
            cli.working_dir(&component),
            PathBuf::from("/srv/infra/terraform/network/vpc")
        );
    }

    #[test]
    fn test_write_vars() {
        let tmp = TempDir::new().unwrap();
        let mut inputs = Mapping::new();
        inputs.insert("cidr".into(), Value::String("10.0.0.0/16".into()));
        inputs.insert("azs".into(), Value::Int(3));

        let path = TerraformCli::write_vars(tmp.path(), &inputs).unwrap();
        assert_eq!(path, tmp.path().join(VARS_FILE));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["cidr"], "10.0.0.0/16");
        assert_eq!(written["azs"], 3);
    }

    #[test]
    fn test_missing_component_dir() {
        let tmp = TempDir::new().unwrap();
        let cli = TerraformCli::new("terraform", tmp.path(), false);
        let err = cli
            .apply(&TerraformComponent::new("cluster"), &Mapping::new())
            .unwrap_err();
        assert!(err.to_string().contains("Component directory not found"));
    }
}
