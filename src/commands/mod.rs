//! Command implementations

pub mod eval;
pub mod lifecycle;
pub mod plan;
pub mod platforms;
pub mod render;

use anyhow::{Context as AnyhowContext, Result};
use declarative::Orchestrator;

use crate::Context;
use crate::backend;
use crate::progress::CliProgress;

/// Build an orchestrator for the current context and load its blueprint
pub fn load(ctx: &Context, dry_run: bool) -> Result<Orchestrator> {
    let collaborators = backend::collaborators(&ctx.config, &ctx.project_dir, ctx.verbose > 0);
    let mut orchestrator = Orchestrator::new(
        ctx.context.as_str(),
        collaborators,
        ctx.config.orchestrator_options(dry_run),
    )
    .with_progress(Box::new(CliProgress::new(ctx.quiet)));

    orchestrator
        .load_config(true)
        .with_context(|| format!("Failed to load blueprint for context '{}'", ctx.context))?;
    Ok(orchestrator)
}
