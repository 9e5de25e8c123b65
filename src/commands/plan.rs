//! `bpctl plan` - what install would do, without doing it

use anyhow::Result;
use blueprint::{Blueprint, DependencyGraph, format_duration};
use colored::Colorize;
use declarative::DEFAULT_PLATFORM;
use features::Value;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let orchestrator = super::load(ctx, true)?;
    let blueprint = orchestrator.blueprint();
    let graph = DependencyGraph::from_kustomizations(&blueprint.kustomizations);

    ui::header(&format!("Blueprint: {}", blueprint.metadata.name));
    ui::kv("Context", orchestrator.context());
    ui::kv(
        "Platform",
        orchestrator
            .values()
            .get("platform")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PLATFORM),
    );
    ui::kv("Project", &ctx.project_dir.display().to_string());

    ui::section("Terraform components");
    if blueprint.terraform.is_empty() {
        ui::dim("none");
    }
    let total = blueprint.terraform.len();
    for (i, component) in blueprint.terraform.iter().enumerate() {
        let mut line = component.path.clone();
        if !component.should_destroy() {
            line.push_str(&format!(" {}", "(kept on down)".dimmed()));
        }
        ui::step(i + 1, total, &line);
    }

    ui::section("Kustomizations (install order)");
    let order = graph.install_order();
    if order.is_empty() {
        ui::dim("none");
    }
    for (i, name) in order.iter().enumerate() {
        ui::step(i + 1, order.len(), &describe(blueprint, &graph, name));
    }

    ui::section("Wait budget");
    ui::kv("Longest dependency chain", &format_duration(graph.max_wait_time()));
    ui::kv("Waited", &blueprint.waited_kustomizations().len().to_string());

    let dangling = graph.dangling_references();
    if !dangling.is_empty() || graph.has_cycle() {
        ui::section("Diagnostics");
        for (name, missing) in dangling {
            ui::warn(&format!("'{name}' depends on unknown '{missing}'"));
        }
        if graph.has_cycle() {
            ui::warn("dependency cycle detected; install order is best-effort");
        }
    }

    Ok(())
}

fn describe(blueprint: &Blueprint, graph: &DependencyGraph, name: &str) -> String {
    let mut line = name.to_string();
    if let Some(kustomization) = blueprint.find_kustomization(name) {
        let mut notes = vec![format_duration(kustomization.effective_timeout())];
        if !kustomization.should_wait() {
            notes.push("no wait".to_string());
        }
        line.push_str(&format!(" {}", format!("({})", notes.join(", ")).dimmed()));
    }
    let deps = graph.dependencies_of(name);
    if !deps.is_empty() {
        line.push_str(&format!(" {}", format!("after {}", deps.join(", ")).dimmed()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint::Kustomization;

    #[test]
    fn test_describe() {
        colored::control::set_override(false);
        let blueprint = Blueprint {
            kustomizations: vec![
                Kustomization::new("policy"),
                Kustomization::new("ingress")
                    .depends_on(["policy"])
                    .with_timeout("10m"),
            ],
            ..Default::default()
        };
        let graph = DependencyGraph::from_kustomizations(&blueprint.kustomizations);

        assert_eq!(describe(&blueprint, &graph, "policy"), "policy (5m)");
        assert_eq!(
            describe(&blueprint, &graph, "ingress"),
            "ingress (10m) after policy"
        );
    }
}
