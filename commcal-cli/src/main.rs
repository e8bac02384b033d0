mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commcal_core::Settings;

#[derive(Parser)]
#[command(name = "commcal")]
#[command(about = "Merge per-source ICS feeds into one deduplicated community calendar")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: ~/.config/commcal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine every .ics file in a directory into one feed
    Combine {
        /// Directory of per-source .ics files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Combined .ics file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Calendar name (X-WR-CALNAME)
        #[arg(short, long, default_value = "Community Calendar")]
        name: String,

        /// Comma-separated source files to skip (e.g. "bohemian,pressdemocrat")
        #[arg(short = 'x', long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// Convert a combined .ics file to a JSON array
    Json {
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// City slug stored on every event
        #[arg(long)]
        city: Option<String>,

        /// Include past events
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Combine {
            input_dir,
            output,
            name,
            exclude,
        } => commands::combine::run(&input_dir, &output, name, exclude, settings),
        Commands::Json {
            input,
            output,
            city,
            all,
        } => commands::json::run(&input, output.as_deref(), city, all, &settings),
    }
}
