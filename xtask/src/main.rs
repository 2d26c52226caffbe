use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use trigmap::{Config, DuplicatePolicy, LogicalNameTable};

#[derive(Parser)]
#[command(name = "xtask", about = "trigmap workspace tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Check every trigger map entry of a config file (duplicates are rejected)
    CheckConfig { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::CheckConfig { file } => check_config(&file),
    }
}

fn check_config(path: &PathBuf) -> Result<()> {
    let cfg = Config::read_file(path)?.with_context(|| format!("{} does not exist", path.display()))?;
    let errors = LogicalNameTable::check(cfg.trigger.map.as_slice(), DuplicatePolicy::Reject);
    if !errors.is_empty() {
        eprintln!("Invalid: {}", path.display());
        for e in errors {
            eprintln!("- {}", e);
        }
        std::process::exit(1);
    }
    println!("OK: {} ({} triggers)", path.display(), cfg.trigger.map.len());
    Ok(())
}
