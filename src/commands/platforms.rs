//! `bpctl platforms` - list built-in platform templates

use anyhow::Result;
use colored::Colorize;
use declarative::{DEFAULT_PLATFORM, PlatformTemplates};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let templates = PlatformTemplates::builtin();
    if !ctx.quiet {
        ui::header("Platforms");
    }
    for name in templates.names() {
        if name == DEFAULT_PLATFORM {
            println!("  {} {}", name, "(default)".dimmed());
        } else {
            println!("  {name}");
        }
    }
    if !ctx.quiet {
        println!();
        ui::info("Set `platform` in contexts/<name>/values.yaml to pick one");
    }
    Ok(())
}
