//! Compiles declaration files into one vocabulary and prints it as JSON.
//!
//!     clausal [--config FILE] [--pretty] FILES...
//!
//! Files are compiled in the order given. Compilation stops at the first
//! declaration that fails, and the process exits with a non-zero status.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use clausal::compiler::Compiler;
use clausal::config::Settings;
use clausal::error::{ClausalError, Result};

#[derive(Parser)]
#[command(name = "clausal")]
#[command(author, version, about = "Compile fact-oriented declarations into a vocabulary")]
struct Cli {
    /// Settings file, instead of an optional clausal.toml in the working directory.
    #[arg(long)]
    config: Option<String>,
    /// Pretty-print the vocabulary.
    #[arg(long)]
    pretty: bool,
    /// Declaration files to compile.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn run(cli: &Cli, settings: Settings) -> Result<String> {
    let pretty = cli.pretty || settings.pretty;
    let mut compiler = Compiler::with_settings(settings);
    for file in &cli.files {
        let script = fs::read_to_string(file).map_err(|e| ClausalError::Io {
            path: file.display().to_string(),
            message: e.to_string(),
        })?;
        let outcomes = compiler.compile(&script)?;
        info!(file = %file.display(), declarations = outcomes.len(), "file compiled");
    }
    let vocabulary = compiler.into_vocabulary();
    let json = if pretty {
        serde_json::to_string_pretty(&vocabulary)?
    } else {
        serde_json::to_string(&vocabulary)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(&cli, settings) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "compilation failed");
            ExitCode::FAILURE
        }
    }
}
