use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "appsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile identity-provider application assignments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to config.toml in the config directory)
    #[arg(short, long, global = true, env = "APPSYNC_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the operations a sync would run
    Plan(PlanArgs),

    /// Reconcile assignments and status with the config
    Sync(SyncArgs),

    /// Show an application as the directory holds it
    Show(ShowArgs),

    /// Deactivate and delete an application
    Delete(DeleteArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Application id or label (all configured apps if omitted)
    pub app: Option<String>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Application id or label (all configured apps if omitted)
    pub app: Option<String>,

    /// Maximum operations in flight (overrides the config)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Show what would change without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Application id or configured label
    pub app: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Application id or configured label
    pub app: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
