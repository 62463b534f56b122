//! extpack CLI - Build and package native extensions
//!
//! Commands:
//! - `extpack build` - Build the native crate and package the extension
//! - `extpack watch` - Rebuild whenever sources change
//! - `extpack list` - Show the contents of a packaged extension

use clap::{ArgAction, Parser, Subcommand};
use extpack_bundle::Selectors;
use std::path::PathBuf;

mod build;
mod list;
mod logging;
mod shutdown;
mod watch;

#[derive(Parser)]
#[command(name = "extpack")]
#[command(author, version, about = "Build tool for native host-application extensions", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the native library and package the extension
    Build {
        /// Path to the extension project (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Build in release mode
        #[arg(short, long)]
        release: bool,

        /// Package a prebuilt CI artifact for the given target (e.g., x86_64-pc-windows-msvc)
        #[arg(long, value_name = "TAG", num_args = 0..=1)]
        ci: Option<Option<String>>,

        /// Install the packaged extension into the host application
        #[arg(long)]
        replace: bool,
    },

    /// Watch sources and rebuild on change
    Watch {
        /// Path to the extension project (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Build in release mode
        #[arg(short, long)]
        release: bool,

        /// Install the packaged extension after every build
        #[arg(long)]
        replace: bool,
    },

    /// List the files of a packaged extension
    List {
        /// Path to a .zip or .aseprite-extension archive
        archive: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Build {
            path,
            release,
            ci,
            replace,
        } => {
            let selectors = Selectors {
                release,
                ci,
                install: replace,
            };
            build::run(path, &selectors)?;
        }
        Commands::Watch {
            path,
            release,
            replace,
        } => {
            let selectors = Selectors {
                release,
                ci: None,
                install: replace,
            };
            watch::run(path, selectors)?;
        }
        Commands::List { archive } => {
            list::run(&archive)?;
        }
    }

    Ok(())
}
