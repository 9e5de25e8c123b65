use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bpctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Roll out and tear down blueprints of terraform and kustomizations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Context to operate on (a directory under <project>/contexts)
    #[arg(short, long, global = true, env = "BPCTL_CONTEXT", default_value = "local")]
    pub context: String,

    /// Project root holding contexts/ and terraform/
    #[arg(long, global = true, env = "BPCTL_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the install order, wait budget and graph diagnostics
    Plan,

    /// Print the resolved blueprint
    Render(RenderArgs),

    /// Evaluate an expression against the context's values
    Eval {
        /// Expression, e.g. "vm.driver == 'docker-desktop'"
        expression: String,
    },

    /// Apply components and kustomizations, then wait for readiness
    Install(ApplyArgs),

    /// Delete kustomizations and destroy components in reverse order
    Down(ApplyArgs),

    /// Wait for kustomizations to become ready
    Wait(WaitArgs),

    /// List built-in platform templates
    Platforms,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

#[derive(Args)]
pub struct RenderArgs {
    /// Print kustomization manifests in install order instead
    #[arg(long)]
    pub manifests: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Show what would happen without calling terraform or kubectl
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct WaitArgs {
    /// Kustomizations to wait for (default: every one with wait enabled)
    pub names: Vec<String>,

    /// Give up after this many seconds, even if the wait budget is longer
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_wait_with_names() {
        let cli = Cli::parse_from(["bpctl", "-c", "prod", "wait", "ingress", "dns", "--timeout", "30"]);
        assert_eq!(cli.context, "prod");
        match cli.command {
            Command::Wait(args) => {
                assert_eq!(args.names, vec!["ingress", "dns"]);
                assert_eq!(args.timeout, Some(30));
            }
            _ => panic!("expected wait"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["bpctl", "install", "--dry-run", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Install(ApplyArgs { dry_run: true })));
    }
}
