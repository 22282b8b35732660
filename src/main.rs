mod commands;
mod diagnostics;
mod virtual_paths;
mod watch;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Command line of the `aspref` binary.
#[derive(Parser)]
#[command(name = "aspref", about = "Code regions, symbols and includes for classic ASP / VBScript")]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Report include directives that point nowhere, for every template under ROOT
    Check {
        /// Directory to walk
        #[arg(default_value = ".")]
        root: String,
    },
    /// Completion candidates at a position
    Complete {
        /// Document path
        file: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },
    /// Where the symbol at a position is declared
    Definition {
        /// Document path
        file: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },
    /// Definition and documentation of the symbol at a position
    Hover {
        /// Document path
        file: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },
    /// Include directives of a document and where they resolve
    Includes {
        /// Document path
        file: String,
    },
    /// Look up a name as seen from a document
    Lookup {
        /// Document path
        file: String,
        /// Symbol name, any casing
        name: String,
        /// Owning class or procedure
        #[arg(long)]
        parent: Option<String>,
    },
    /// Code regions of a template
    Regions {
        /// Document path
        file: String,
    },
    /// Signatures of the call enclosing a position
    Signature {
        /// Document path
        file: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },
    /// Doc-comment skeleton for the declaration below LINE
    Snippet {
        /// Document path
        file: String,
        /// 1-based line above the declaration
        line: usize,
    },
    /// Outline of a document and the symbols its includes provide
    Symbols {
        /// Document path
        file: String,
        /// Print the full scan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage virtual include path mappings
    Virtual {
        /// What to do with the mappings
        #[command(subcommand)]
        action: VirtualAction,
    },
    /// Re-scan documents whenever they or their includes change
    Watch {
        /// Documents to scan
        #[arg(required = true)]
        files: Vec<String>,
    },
}

/// `aspref virtual` actions.
#[derive(Subcommand)]
enum VirtualAction {
    /// Map a virtual prefix onto a directory
    Add {
        /// Site path prefix such as `/shared`
        prefix: String,
        /// Directory, relative to the config file
        path: String,
    },
    /// List the mappings in effect
    List,
    /// Remove a mapping
    Remove {
        /// Site path prefix to drop
        prefix: String,
    },
}

/// Map a command result to an exit code, printing the diagnostic on failure.
fn finish(result: Result<ExitCode, aspref::Error>) -> ExitCode {
    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let succeed = |r: Result<(), aspref::Error>| return r.map(|()| return ExitCode::SUCCESS);

    return match cli.command {
        Commands::Check { root } => finish(commands::check(&root)),
        Commands::Complete { file, line, column } => {
            finish(succeed(commands::complete(&file, line, column)))
        },
        Commands::Definition { file, line, column } => {
            finish(commands::definition(&file, line, column))
        },
        Commands::Hover { file, line, column } => finish(commands::hover(&file, line, column)),
        Commands::Includes { file } => finish(succeed(commands::includes(&file))),
        Commands::Lookup { file, name, parent } => {
            finish(succeed(commands::lookup(&file, &name, parent.as_deref())))
        },
        Commands::Regions { file } => finish(succeed(commands::regions(&file))),
        Commands::Signature { file, line, column } => {
            finish(commands::signature(&file, line, column))
        },
        Commands::Snippet { file, line } => finish(commands::snippet(&file, line)),
        Commands::Symbols { file, json } => finish(succeed(commands::symbols(&file, json))),
        Commands::Virtual { action } => finish(succeed(match action {
            VirtualAction::Add { prefix, path } => virtual_paths::cmd_add(&prefix, &path),
            VirtualAction::List => virtual_paths::cmd_list(),
            VirtualAction::Remove { prefix } => virtual_paths::cmd_remove(&prefix),
        })),
        Commands::Watch { files } => finish(watch::run(&files)),
    };
}
