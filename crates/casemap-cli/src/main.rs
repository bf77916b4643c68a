#![forbid(unsafe_code)]

mod cmd;
mod host;
mod output;
mod tui;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cmap: test-plan mind map with per-tester results",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Content location: HTTP base URL or directory holding cases/ and results/.
    #[arg(long, global = true, value_name = "LOCATION")]
    source: Option<String>,

    /// Use the built-in demo plan instead of any configured source.
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }

    fn context(&self) -> anyhow::Result<cmd::Context> {
        Ok(cmd::Context {
            project_root: env::current_dir()?,
            source: self.source.clone(),
            demo: self.demo,
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Build",
        about = "Merge case fragments into one document",
        long_about = "Concatenate every markdown fragment in cases/<version>/ into cases/<version>/_index.md, in filename order.",
        after_help = "EXAMPLES:\n    # Merge fragments for a version\n    cmap merge v1.2.0\n\n    # Use a different cases directory\n    cmap merge v1.2.0 --cases-dir docs/cases"
    )]
    Merge(cmd::merge::MergeArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a decorated test plan",
        long_about = "Load a version's plan and a tester's results, and print the decorated outline.",
        after_help = "EXAMPLES:\n    # Show results for a tester\n    cmap show v1.2.0 --user alice\n\n    # Emit machine-readable output\n    cmap show v1.2.0 --user alice --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Advance case statuses",
        long_about = "Click one or more cases in edit mode, advancing each through untested, pass, fail and blocked. Optionally save to the host.",
        after_help = "EXAMPLES:\n    # Mark TC-001 as passed\n    cmap cycle v1.2.0 --user alice TC-001\n\n    # Cycle twice and save to a JSON-lines host file\n    cmap cycle v1.2.0 --user alice TC-002 TC-002 --save --host-out saves.jsonl"
    )]
    Cycle(cmd::cycle::CycleArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Open the interactive tree view",
        long_about = "Browse a plan as a collapsible tree, toggle edit mode and click cases to record results.",
        after_help = "EXAMPLES:\n    # Open the configured default version\n    cmap tui\n\n    # Open a version as a tester\n    cmap tui v1.2.0 --user alice\n\n    # Try it without any files\n    cmap --demo tui"
    )]
    Tui(cmd::tui::TuiArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    cmap completions bash\n\n    # Generate zsh completions\n    cmap completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CASEMAP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "casemap=debug,info"
        } else {
            "casemap=info,warn"
        })
    });

    let format = env::var("CASEMAP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // stderr log lines would draw over the alternate screen
    if !matches!(cli.command, Commands::Tui(_)) {
        init_tracing();
    }

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let context = cli.context()?;

    match cli.command {
        Commands::Merge(ref args) => cmd::merge::run_merge(args, output, &context),
        Commands::Show(ref args) => cmd::show::run_show(args, output, &context),
        Commands::Cycle(ref args) => cmd::cycle::run_cycle(args, output, &context),
        Commands::Tui(ref args) => cmd::tui::run_tui(args, &context),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
