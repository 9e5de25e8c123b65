//! `bpctl render` - print the resolved blueprint or its manifests

use anyhow::{Context as AnyhowContext, Result};
use blueprint::{Blueprint, DependencyGraph, KustomizationManifest, blueprint_encoder, manifest_encoder};

use crate::Context;
use crate::cli::RenderArgs;

pub fn run(ctx: &Context, args: &RenderArgs) -> Result<()> {
    let orchestrator = super::load(ctx, true)?;
    let output = if args.manifests {
        manifests(orchestrator.blueprint(), &ctx.config.namespace)?
    } else {
        let bytes = blueprint_encoder()
            .encode(orchestrator.blueprint())
            .context("Failed to encode blueprint")?;
        String::from_utf8(bytes).context("Blueprint encoded to invalid UTF-8")?
    };
    print!("{output}");
    Ok(())
}

/// Kustomization manifests in install order, as one multi-document YAML stream
pub fn manifests(blueprint: &Blueprint, namespace: &str) -> Result<String> {
    let encoder = manifest_encoder();
    let graph = DependencyGraph::from_kustomizations(&blueprint.kustomizations);

    let mut documents = Vec::new();
    for name in graph.install_order() {
        let Some(kustomization) = blueprint.find_kustomization(&name) else {
            continue;
        };
        let manifest = KustomizationManifest::new(blueprint, kustomization, namespace);
        let bytes = encoder
            .encode(&manifest)
            .with_context(|| format!("Failed to encode kustomization '{name}'"))?;
        documents.push(String::from_utf8(bytes).context("Manifest encoded to invalid UTF-8")?);
    }
    Ok(documents.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::project;

    #[test]
    fn test_manifests_follow_install_order() {
        let blueprint = Blueprint::from_yaml(
            r#"
metadata: {name: demo}
kustomize:
  - name: ingress
    path: ingress
    dependsOn: [policy]
  - name: policy
    path: policy
"#,
        )
        .unwrap();

        let out = manifests(&blueprint, "flux-system").unwrap();
        let docs: Vec<&str> = out.split("---\n").collect();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("name: policy"));
        assert!(docs[1].contains("name: ingress"));
        assert!(docs[1].contains("namespace: flux-system"));
        assert!(docs[1].contains("path: kustomize/ingress"));
    }

    #[test]
    fn test_render_local_blueprint() {
        let (_tmp, ctx) = project("platform: local\n", None);
        let orchestrator = crate::commands::load(&ctx, true).unwrap();
        let out = manifests(orchestrator.blueprint(), "system-gitops").unwrap();
        assert!(out.contains("kind: Kustomization"));
        assert!(out.find("name: policy-base").unwrap() < out.find("name: ingress").unwrap());
    }
}
