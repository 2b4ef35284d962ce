mod batch;
mod cache;
mod checker;
mod collector;
mod commands;
mod config;
mod corrector;
mod diagnostics;
mod error;
mod frontmatter;
mod git;
mod grammar;
mod headings;
mod markdown;
mod paths;
mod reference;
mod scanner;
mod slug;
mod status;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Format;

#[derive(Parser)]
#[command(
    name = "doclink",
    version,
    about = "Link integrity checks and anchor correction for translated markdown"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Silence everything below warnings
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Repository root holding .doclink.toml
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Log every file and rewritten link
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate links and git status of the source tree
    Check {
        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Worker threads (0 = available parallelism)
        #[arg(long)]
        jobs: Option<usize>,
        /// Skip the git status check
        #[arg(long)]
        no_git: bool,
    },
    /// Rewrite links of translated documents to match their tree
    Correct {
        /// Report what would change without writing files
        #[arg(long)]
        dry_run: bool,
        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Worker threads (0 = available parallelism)
        #[arg(long)]
        jobs: Option<usize>,
        /// Translated tree to correct, instead of the configured targets
        #[arg(long = "target")]
        targets: Vec<PathBuf>,
    },
    /// Record the current source commit in translated files
    Mark {
        /// Translated files to mark
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show which translations are missing or outdated
    Status {
        /// Print the source diff below outdated documents
        #[arg(long)]
        diff: bool,
        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Translated tree to report on, instead of the configured targets
        #[arg(long = "target")]
        targets: Vec<PathBuf>,
    },
    /// Re-run check whenever the source or target trees change
    Watch {
        /// Skip the git status check
        #[arg(long)]
        no_git: bool,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Check { format, jobs, no_git } => commands::check(&cli.root, format, no_git, jobs),
        Commands::Correct {
            dry_run,
            format,
            jobs,
            targets,
        } => commands::correct(&cli.root, &targets, dry_run, format, jobs),
        Commands::Mark { files } => commands::mark(&cli.root, &files),
        Commands::Status { diff, format, targets } => commands::status(&cli.root, &targets, diff, format),
        Commands::Watch { no_git } => watch::run(&cli.root, no_git),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}
