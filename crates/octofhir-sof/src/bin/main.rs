//! SQL-on-FHIR command-line interface

use clap::{Parser, Subcommand};
use octofhir_sof::cli::{output, run, validate};
use std::path::PathBuf;

/// SQL-on-FHIR command-line tool
#[derive(Parser)]
#[command(name = "sof")]
#[command(author, version, about = "Flatten FHIR resources with SQL-on-FHIR view definitions", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (csv, ndjson, json, table)
    #[arg(short = 'f', long, global = true)]
    format: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a view definition to resources
    Run {
        /// ViewDefinition JSON file
        view: PathBuf,

        /// Resources as NDJSON, a Bundle, an array or one resource (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Log and skip resources the view fails on
        #[arg(long)]
        skip_errors: bool,
    },

    /// Validate view definitions
    Validate {
        /// ViewDefinition JSON files to validate
        files: Vec<PathBuf>,
    },
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Run {
            view,
            input,
            skip_errors,
        } => run::run(run::RunConfig {
            view,
            input,
            skip_errors,
            output_format: cli.format,
            output_file: cli.output,
        }),

        Commands::Validate { files } => validate::validate(validate::ValidateConfig {
            files,
            verbose: cli.verbose,
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
