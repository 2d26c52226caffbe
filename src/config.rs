// trigmap/src/config.rs

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::{Path, PathBuf}};
use tracing::debug;

use crate::{error::TrigMapError, menu_index::DuplicatePolicy};

pub const DEFAULT_PREFIX: &str = "passTrig";

/// Config is merged: system -> user -> workspace -> runtime (in memory)
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub trigger: TriggerConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TriggerConfig {
    pub enabled: Option<bool>,
    pub prefix: Option<String>,
    pub duplicates: Option<DuplicatePolicy>,
    /// `"<id>:<stripped path name>"` entries.
    pub map: Vec<String>,
}

impl TriggerConfig {
    pub fn enabled(&self) -> bool { self.enabled.unwrap_or(true) }
    pub fn prefix(&self) -> &str { self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX) }
    pub fn duplicates(&self) -> DuplicatePolicy { self.duplicates.unwrap_or_default() }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub events: Option<PathBuf>,
    pub info: Option<PathBuf>,
}

impl Config {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, TrigMapError> {
        toml::from_str(text).map_err(|source| TrigMapError::Config { path: origin.to_path_buf(), source })
    }

    /// Missing files are not an error; unreadable or malformed ones are.
    pub fn read_file(path: &Path) -> Result<Option<Self>, TrigMapError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, path).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TrigMapError::Io { path: path.to_path_buf(), source }),
        }
    }
}

fn merge(a: &mut Config, b: &Config) {
    // trigger
    if b.trigger.enabled.is_some() { a.trigger.enabled = b.trigger.enabled; }
    if b.trigger.prefix.is_some() { a.trigger.prefix = b.trigger.prefix.clone(); }
    if b.trigger.duplicates.is_some() { a.trigger.duplicates = b.trigger.duplicates; }
    if !b.trigger.map.is_empty() { a.trigger.map = b.trigger.map.clone(); }

    // output
    if b.output.events.is_some() { a.output.events = b.output.events.clone(); }
    if b.output.info.is_some() { a.output.info = b.output.info.clone(); }
}

/// Standard layer locations for a workspace.
pub fn config_paths(workspace_root: &Path) -> Result<Vec<PathBuf>> {
    let proj = ProjectDirs::from("org", "trigmap", "trigmap").context("ProjectDirs not available")?;
    let system = if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\ProgramData\trigmap\config.toml")
    } else {
        PathBuf::from("/etc/trigmap/config.toml")
    };
    let user = proj.config_dir().join("config.toml");
    let workspace = workspace_root.join(".trigmap").join("config.toml");
    Ok(vec![system, user, workspace])
}

#[derive(Clone, Debug, Default)]
pub struct ConfigManager {
    layers: Vec<PathBuf>,
    runtime_overlay: Config,
    merged: Config,
}

impl ConfigManager {
    pub fn load(workspace_root: impl AsRef<Path>) -> Result<Self> {
        Self::load_layers(config_paths(workspace_root.as_ref())?)
    }

    /// Load an explicit list of layers, lowest priority first.
    pub fn load_layers(layers: Vec<PathBuf>) -> Result<Self> {
        let mut me = Self { layers, ..Self::default() };
        me.reload_all()?;
        Ok(me)
    }

    pub fn reload_all(&mut self) -> Result<()> {
        let mut merged = Config::default();
        for path in &self.layers {
            if let Some(layer) = Config::read_file(path)? {
                debug!(path = %path.display(), "config layer loaded");
                merge(&mut merged, &layer);
            }
        }
        merge(&mut merged, &self.runtime_overlay);
        self.merged = merged;
        Ok(())
    }

    pub fn get(&self) -> &Config { &self.merged }
    pub fn layers(&self) -> &[PathBuf] { &self.layers }

    /// In-memory overlay (not persisted).
    pub fn apply_runtime_overlay(&mut self, patch: Config) -> Result<()> {
        merge(&mut self.runtime_overlay, &patch);
        self.reload_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, text).unwrap();
        p
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::default();
        assert!(cfg.trigger.enabled());
        assert_eq!(cfg.trigger.prefix(), "passTrig");
        assert_eq!(cfg.trigger.duplicates(), DuplicatePolicy::LastWriteWins);
    }

    #[test]
    fn later_layers_win() {
        let dir = tempfile::tempdir().unwrap();
        let sys = write(dir.path(), "sys.toml", r#"
            [trigger]
            prefix = "sysTrig"
            map = ["1:HLT_Mu17"]
        "#);
        let ws = write(dir.path(), "ws.toml", r#"
            [trigger]
            duplicates = "reject"
            map = ["1:HLT_Mu17", "2:HLT_Ele27"]
        "#);
        let missing = dir.path().join("nope.toml");

        let cm = ConfigManager::load_layers(vec![sys, missing, ws]).unwrap();
        let cfg = cm.get();
        assert_eq!(cfg.trigger.prefix(), "sysTrig");
        assert_eq!(cfg.trigger.duplicates(), DuplicatePolicy::Reject);
        assert_eq!(cfg.trigger.map.len(), 2);
    }

    #[test]
    fn runtime_overlay_is_applied_last() {
        let dir = tempfile::tempdir().unwrap();
        let ws = write(dir.path(), "ws.toml", "[trigger]\nenabled = true\n");
        let mut cm = ConfigManager::load_layers(vec![ws]).unwrap();

        let mut patch = Config::default();
        patch.trigger.enabled = Some(false);
        cm.apply_runtime_overlay(patch).unwrap();
        assert!(!cm.get().trigger.enabled());

        cm.reload_all().unwrap();
        assert!(!cm.get().trigger.enabled());
    }

    #[test]
    fn malformed_layer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "[trigger\nmap = 3");
        let err = ConfigManager::load_layers(vec![bad]).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrigMapError>(), Some(TrigMapError::Config { .. })));
    }
}
