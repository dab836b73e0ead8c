use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sortable_sync::scenario::{self, Scenario};

#[derive(Parser)]
#[command(name = "sortable-sync")]
#[command(about = "Replay sortable-list scenarios")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print the final state as JSON
    Run {
        /// Path to the scenario .json file
        file: PathBuf,
        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a scenario without running it
    Check {
        /// Path to the scenario .json file
        file: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { file, pretty } => run(&file, pretty),
        Commands::Check { file } => check(&file),
    };
    if let Err(error) = result {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

fn load(file: &Path) -> Result<Scenario> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    Scenario::from_json(&source).with_context(|| format!("failed to parse {}", file.display()))
}

fn run(file: &Path, pretty: bool) -> Result<()> {
    let scenario = load(file)?;
    eprintln!("Running: {}", file.display());
    let report = scenario::run(&scenario)?;
    log::info!("{}: replayed {} step(s)", file.display(), report.steps.len());
    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn check(file: &Path) -> Result<()> {
    let scenario = load(file)?;
    scenario.validate()?;
    eprintln!(
        "OK: {} region(s), {} step(s)",
        scenario.regions.len(),
        scenario.steps.len()
    );
    Ok(())
}
