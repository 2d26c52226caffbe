// trigmap/src/columns.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::{menu_index::TriggerInfo, resolver::ResolvedEvent};

/// Flat per-event trigger record. Object columns are parallel and
/// `HLTObj_n` long.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerColumns {
    #[serde(rename = "passedTriggers")]
    pub passed_triggers: Vec<i32>,
    #[serde(rename = "HLTObj_n")]
    pub obj_n: i32,
    #[serde(rename = "HLTObj_pt")]
    pub obj_pt: Vec<f64>,
    #[serde(rename = "HLTObj_eta")]
    pub obj_eta: Vec<f64>,
    #[serde(rename = "HLTObj_phi")]
    pub obj_phi: Vec<f64>,
    #[serde(rename = "HLTObj_e")]
    pub obj_e: Vec<f64>,
    #[serde(rename = "HLTObj_passTriggers")]
    pub obj_pass_triggers: Vec<Vec<i32>>,
}

impl From<&ResolvedEvent> for TriggerColumns {
    fn from(ev: &ResolvedEvent) -> Self {
        let mut cols = Self { passed_triggers: ev.fired.clone(), ..Self::default() };
        for obj in &ev.objects {
            cols.obj_n += 1;
            cols.obj_pt.push(obj.kinematics.pt);
            cols.obj_eta.push(obj.kinematics.eta);
            cols.obj_phi.push(obj.kinematics.phi);
            cols.obj_e.push(obj.kinematics.energy);
            cols.obj_pass_triggers.push(obj.trigger_ids.clone());
        }
        cols
    }
}

/// End-of-run id/name table, stored as parallel arrays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfoTable {
    pub prefix: String,
    pub generated_at: String,
    pub trigger_ids: Vec<i32>,
    pub trigger_names: Vec<String>,
}

impl TriggerInfoTable {
    pub fn new(prefix: impl Into<String>, rows: Vec<TriggerInfo>) -> Self {
        let mut table = Self {
            prefix: prefix.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            ..Self::default()
        };
        for row in rows {
            table.trigger_ids.push(row.id);
            table.trigger_names.push(row.name);
        }
        table
    }

    pub fn rows(&self) -> impl Iterator<Item = (i32, &str)> + '_ {
        self.trigger_ids.iter().copied().zip(self.trigger_names.iter().map(String::as_str))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
        let text = serde_json::to_string_pretty(self).context("serialize trigger info table")?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), triggers = self.trigger_ids.len(), "trigger info table written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).context("parse trigger info table")
    }
}
