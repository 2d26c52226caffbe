// trigmap/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use trigmap::{ConfigManager, EventLoop, MenuIndex};

#[derive(Parser)]
#[command(name = "trigmap", version, about = "Logical HLT trigger ids for ntuple production")]
struct Cli {
    /// Config layers, lowest priority first. Defaults to system, user and ./.trigmap/config.toml
    #[arg(long = "config", global = true)]
    configs: Vec<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve a JSON-lines event stream into trigger columns
    Run {
        /// Input events, one JSON object per line
        #[arg(long)]
        events: PathBuf,
        /// Output records (default: output.events from config)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Trigger info table (default: output.info from config)
        #[arg(long)]
        info: Option<PathBuf>,
    },
    /// Print the configured logical trigger table
    Table,
    /// Print the logical ids matched by trigger-object path names
    Match { names: Vec<String> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cm = if cli.configs.is_empty() {
        ConfigManager::load(std::env::current_dir()?)?
    } else {
        ConfigManager::load_layers(cli.configs)?
    };
    let cfg = cm.get();

    match cli.cmd {
        Cmd::Run { events, out, info } => {
            let out = out
                .or_else(|| cfg.output.events.clone())
                .context("no output path: pass --out or set output.events")?;
            let mut el = EventLoop::from_config(&cfg.trigger)?;
            let n = el.run_files(&events, &out)?;
            info!(events = n, out = %out.display(), "done");
            if let Some(path) = info.or_else(|| cfg.output.info.clone()) {
                el.finish().save(&path)?;
            }
        }
        Cmd::Table => {
            let mut index = MenuIndex::default();
            index.build(cfg.trigger.map.as_slice(), cfg.trigger.duplicates())?;
            for row in index.export_table() {
                println!("{:>6}  {}", row.id, row.name);
            }
        }
        Cmd::Match { names } => {
            let mut index = MenuIndex::default();
            index.build(cfg.trigger.map.as_slice(), cfg.trigger.duplicates())?;
            let ids = index.match_path_names(names.as_slice());
            println!("{}", serde_json::to_string(&ids)?);
        }
    }
    Ok(())
}
