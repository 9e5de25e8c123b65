//! `bpctl install`, `bpctl down` and `bpctl wait`

use anyhow::{Result, bail};
use blueprint::Blueprint;

use crate::Context;
use crate::cli::{ApplyArgs, WaitArgs};
use crate::runner;
use crate::ui;

pub fn install(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let mut orchestrator = super::load(ctx, args.dry_run)?;
    if args.dry_run {
        ui::info("Dry run: terraform and kubectl will not be called");
    } else {
        require_tools(ctx, orchestrator.blueprint())?;
    }

    let summary = orchestrator.install().map_err(explain)?;
    if !ctx.quiet {
        ui::summary("Install", &summary);
    }
    Ok(())
}

pub fn down(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let mut orchestrator = super::load(ctx, args.dry_run)?;
    if args.dry_run {
        ui::info("Dry run: terraform and kubectl will not be called");
    } else {
        require_tools(ctx, orchestrator.blueprint())?;
    }

    let summary = orchestrator.down().map_err(explain)?;
    if !ctx.quiet {
        ui::summary("Teardown", &summary);
    }
    Ok(())
}

pub fn wait(ctx: &Context, args: &WaitArgs) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(secs) = args.timeout {
        config.wait_timeout_secs = Some(secs);
    }
    let scoped = Context {
        config,
        context: ctx.context.clone(),
        project_dir: ctx.project_dir.clone(),
        ..*ctx
    };

    let mut orchestrator = super::load(&scoped, false)?;
    let ready = orchestrator
        .wait_for_kustomizations("Waiting for kustomizations", &args.names)
        .map_err(explain)?;
    if !ctx.quiet {
        ui::success(&format!("{ready} kustomization(s) ready"));
    }
    Ok(())
}

/// Fail early when a binary the blueprint needs is missing
fn require_tools(ctx: &Context, blueprint: &Blueprint) -> Result<()> {
    let mut needed = Vec::new();
    if !blueprint.terraform.is_empty() {
        needed.push(ctx.config.terraform_bin.as_str());
    }
    if !blueprint.kustomizations.is_empty() {
        needed.push(ctx.config.kubectl_bin.as_str());
    }
    for bin in needed {
        if !runner::command_exists(bin) {
            bail!("'{bin}' not found in PATH");
        }
    }
    Ok(())
}

/// Print the error's advice and hand it on
fn explain(err: declarative::Error) -> anyhow::Error {
    let category = err.category();
    ui::error(category.description());
    ui::dim(category.advice());
    if category.is_retryable() {
        ui::dim("This is usually transient; retrying may help");
    }
    anyhow::Error::new(err)
}
