// trigmap/src/pipeline.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use tracing::{debug, info};

use crate::{
    columns::{TriggerColumns, TriggerInfoTable},
    config::TriggerConfig,
    error::TrigMapError,
    resolver::{CandidateObject, MenuSnapshot, TriggerResolver},
};

/// One input event. `menu` or `objects` absent means the upstream product
/// was not available for this event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub run: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lumi: Option<u32>,
    pub event: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<MenuSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<CandidateObject>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub run: u32,
    pub event: u64,
    #[serde(flatten)]
    pub trigger: TriggerColumns,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub run: u32,
    pub events: u64,
    /// Events with at least one fired logical trigger.
    pub fired_events: u64,
    pub rebuilds: u64,
}

pub struct EventLoop {
    resolver: Option<TriggerResolver>,
    prefix: String,
    stats: BTreeMap<u32, RunStats>,
}

impl EventLoop {
    pub fn from_config(cfg: &TriggerConfig) -> Result<Self> {
        let resolver = if cfg.enabled() {
            Some(TriggerResolver::from_entries(cfg.map.as_slice(), cfg.duplicates()).context("build trigger map")?)
        } else {
            info!("trigger columns disabled by config");
            None
        };
        Ok(Self { resolver, prefix: cfg.prefix().to_string(), stats: BTreeMap::new() })
    }

    pub fn process(&mut self, rec: &EventRecord) -> OutputRecord {
        let stats = self.stats.entry(rec.run).or_insert_with(|| RunStats { run: rec.run, ..RunStats::default() });
        stats.events += 1;

        let trigger = match self.resolver.as_mut() {
            Some(resolver) => {
                let before = resolver.index().rebuild_count();
                let resolved = resolver.resolve_available(rec.run, rec.menu.as_ref(), rec.objects.as_deref());
                stats.rebuilds += resolver.index().rebuild_count() - before;
                if !resolved.fired.is_empty() {
                    stats.fired_events += 1;
                }
                TriggerColumns::from(&resolved)
            }
            None => TriggerColumns::default(),
        };
        OutputRecord { run: rec.run, event: rec.event, trigger }
    }

    /// Process a JSON-lines stream, one output line per input event.
    /// Blank lines are skipped. Returns the number of events processed.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<u64> {
        let mut n = 0u64;
        for (i, line) in input.lines().enumerate() {
            let line = line.context("read event stream")?;
            if line.trim().is_empty() { continue; }
            let rec: EventRecord = serde_json::from_str(&line)
                .map_err(|source| TrigMapError::Json { line: i + 1, source })?;
            let out = self.process(&rec);
            serde_json::to_writer(&mut output, &out).context("write output record")?;
            output.write_all(b"\n")?;
            n += 1;
        }
        output.flush()?;
        for s in self.stats.values() {
            debug!(run = s.run, events = s.events, fired = s.fired_events, rebuilds = s.rebuilds, "run summary");
        }
        info!(events = n, runs = self.stats.len(), "event stream processed");
        Ok(n)
    }

    pub fn run_files(&mut self, events: &Path, out: &Path) -> Result<u64> {
        let input = fs::File::open(events).with_context(|| format!("open {}", events.display()))?;
        if let Some(dir) = out.parent() { fs::create_dir_all(dir)?; }
        let output = fs::File::create(out).with_context(|| format!("create {}", out.display()))?;
        self.run(BufReader::new(input), BufWriter::new(output))
    }

    /// End-of-processing metadata: the logical table as id/name rows.
    pub fn finish(&self) -> TriggerInfoTable {
        let rows = self.resolver.as_ref().map(TriggerResolver::export_table).unwrap_or_default();
        TriggerInfoTable::new(self.prefix.clone(), rows)
    }

    pub fn stats(&self) -> impl Iterator<Item = &RunStats> + '_ { self.stats.values() }
}
