// trigmap/src/menu_index.rs

use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::{debug, info};

use crate::error::{Result, TrigMapError};

/// Object path names must carry this prefix to be matched at all.
pub const HLT_PREFIX: &str = "HLT_";

/// Drop the trailing `_<version>` of a path name: `HLT_Mu17_v3` -> `HLT_Mu17`.
/// Names without an underscore are returned whole.
pub fn strip_version(name: &str) -> &str {
    match name.rfind('_') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// What to do when two entries share a stripped name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    LastWriteWins,
    Reject,
}

/// One row of the exported logical table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub id: i32,
    pub name: String,
}

fn parse_entry(entry: &str) -> Result<(i32, &str)> {
    let malformed = |reason: &str| TrigMapError::MalformedEntry {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };
    let (id, name) = entry.split_once(':').ok_or_else(|| malformed("missing ':' separator"))?;
    let id = id
        .trim()
        .parse::<i32>()
        .map_err(|e| malformed(&format!("id '{}' is not an integer ({e})", id.trim())))?;
    if name.is_empty() {
        return Err(malformed("empty trigger name"));
    }
    Ok((id, name))
}

/// Stripped path name -> logical id, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogicalNameTable {
    by_name: BTreeMap<String, i32>,
}

impl LogicalNameTable {
    /// Parse `"<id>:<name>"` entries, stopping at the first error.
    pub fn parse<S: AsRef<str>>(entries: &[S], policy: DuplicatePolicy) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries {
            let (id, name) = parse_entry(entry.as_ref())?;
            table.insert(name, id, policy)?;
        }
        Ok(table)
    }

    /// Parse every entry and collect all problems instead of stopping early.
    pub fn check<S: AsRef<str>>(entries: &[S], policy: DuplicatePolicy) -> Vec<TrigMapError> {
        let mut table = Self::default();
        let mut errors = Vec::new();
        for entry in entries {
            let res = parse_entry(entry.as_ref()).and_then(|(id, name)| table.insert(name, id, policy));
            if let Err(e) = res {
                errors.push(e);
            }
        }
        errors
    }

    fn insert(&mut self, name: &str, id: i32, policy: DuplicatePolicy) -> Result<()> {
        match self.by_name.entry(name.to_string()) {
            Entry::Vacant(v) => {
                v.insert(id);
            }
            Entry::Occupied(mut o) => {
                let first = *o.get();
                if first != id && policy == DuplicatePolicy::Reject {
                    return Err(TrigMapError::DuplicateName { name: name.to_string(), first, second: id });
                }
                if first != id {
                    debug!(trigger = name, first, second = id, "trigger name redefined, last entry wins");
                }
                o.insert(id);
            }
        }
        Ok(())
    }

    pub fn get(&self, stripped: &str) -> Option<i32> {
        self.by_name.get(stripped).copied()
    }

    pub fn len(&self) -> usize { self.by_name.len() }
    pub fn is_empty(&self) -> bool { self.by_name.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.by_name.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Ids for the `HLT_`-prefixed names that resolve after version stripping.
    /// Keeps input order and duplicates.
    pub fn match_path_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<i32> {
        names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| name.starts_with(HLT_PREFIX))
            .filter_map(|name| self.get(strip_version(name)))
            .collect()
    }
}

/// Logical table plus the positional map of the menu currently in use.
///
/// The positional map is keyed on the run number: a new run is assumed to be
/// the only way the menu can change.
#[derive(Clone, Debug, Default)]
pub struct MenuIndex {
    table: LogicalNameTable,
    positions: Vec<(usize, i32)>,
    last_run: Option<u32>,
    rebuilds: u64,
}

impl MenuIndex {
    pub fn new(table: LogicalNameTable) -> Self {
        Self { table, ..Self::default() }
    }

    /// Replace the logical table. The positional map is dropped so the next
    /// refresh rebuilds it against the new ids.
    pub fn build<S: AsRef<str>>(&mut self, entries: &[S], policy: DuplicatePolicy) -> Result<()> {
        let table = LogicalNameTable::parse(entries, policy)?;
        info!(triggers = table.len(), "logical trigger table built");
        self.table = table;
        self.positions.clear();
        self.last_run = None;
        Ok(())
    }

    /// Rebuild the positional map if it is empty or `run` differs from the
    /// last refreshed run. Returns whether a rebuild happened.
    pub fn refresh_if_stale<S: AsRef<str>>(&mut self, run: u32, live_paths: &[S]) -> bool {
        if !self.positions.is_empty() && self.last_run == Some(run) {
            return false;
        }
        self.positions = live_paths
            .iter()
            .enumerate()
            .filter_map(|(i, path)| self.table.get(strip_version(path.as_ref())).map(|id| (i, id)))
            .collect();
        self.last_run = Some(run);
        self.rebuilds += 1;
        debug!(run, live = live_paths.len(), mapped = self.positions.len(), "positional trigger map rebuilt");
        true
    }

    /// Logical ids of every mapped position whose accept flag is set, in map order.
    pub fn fired_ids(&self, accepted: impl Fn(usize) -> bool) -> Vec<i32> {
        self.positions
            .iter()
            .filter(|&&(pos, _)| accepted(pos))
            .map(|&(_, id)| id)
            .collect()
    }

    pub fn match_path_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<i32> {
        self.table.match_path_names(names)
    }

    pub fn export_table(&self) -> Vec<TriggerInfo> {
        self.table
            .iter()
            .map(|(name, id)| TriggerInfo { id, name: name.to_string() })
            .collect()
    }

    pub fn table(&self) -> &LogicalNameTable { &self.table }
    pub fn positions(&self) -> &[(usize, i32)] { &self.positions }
    pub fn last_run(&self) -> Option<u32> { self.last_run }
    pub fn rebuild_count(&self) -> u64 { self.rebuilds }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[&str]) -> MenuIndex {
        let mut idx = MenuIndex::default();
        idx.build(entries, DuplicatePolicy::LastWriteWins).unwrap();
        idx
    }

    #[test]
    fn strip_version_ignores_version_number() {
        assert_eq!(strip_version("HLT_Mu17_v3"), "HLT_Mu17");
        assert_eq!(strip_version("HLT_Mu17_v5"), "HLT_Mu17");
        assert_eq!(strip_version("HLTMu17"), "HLTMu17");
        assert_eq!(strip_version("HLT_"), "HLT");
    }

    #[test]
    fn parse_rejects_malformed_entries() {
        let err = LogicalNameTable::parse(&["x:HLT_Mu17"], DuplicatePolicy::LastWriteWins).unwrap_err();
        assert!(matches!(err, TrigMapError::MalformedEntry { .. }));
        let err = LogicalNameTable::parse(&["HLT_Mu17"], DuplicatePolicy::LastWriteWins).unwrap_err();
        assert!(matches!(err, TrigMapError::MalformedEntry { .. }));
        let err = LogicalNameTable::parse(&["3:"], DuplicatePolicy::LastWriteWins).unwrap_err();
        assert!(matches!(err, TrigMapError::MalformedEntry { .. }));
    }

    #[test]
    fn name_keeps_everything_after_first_colon() {
        let t = LogicalNameTable::parse(&[" 4:HLT_A:B"], DuplicatePolicy::LastWriteWins).unwrap();
        assert_eq!(t.get("HLT_A:B"), Some(4));
    }

    #[test]
    fn duplicates_last_write_wins_or_reject() {
        let entries = ["1:HLT_Mu17", "2:HLT_Mu17"];
        let t = LogicalNameTable::parse(&entries, DuplicatePolicy::LastWriteWins).unwrap();
        assert_eq!(t.get("HLT_Mu17"), Some(2));
        assert_eq!(t.len(), 1);

        let err = LogicalNameTable::parse(&entries, DuplicatePolicy::Reject).unwrap_err();
        match err {
            TrigMapError::DuplicateName { name, first, second } => {
                assert_eq!(name, "HLT_Mu17");
                assert_eq!((first, second), (1, 2));
            }
            other => panic!("unexpected error: {}", other),
        }

        // identical redefinition is harmless even when strict
        assert!(LogicalNameTable::parse(&["1:HLT_Mu17", "1:HLT_Mu17"], DuplicatePolicy::Reject).is_ok());
    }

    #[test]
    fn check_collects_every_problem() {
        let errors = LogicalNameTable::check(&["a:HLT_X", "1:HLT_Y", "2:HLT_Y", "nocolon"], DuplicatePolicy::Reject);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rebuilds_only_on_first_event_and_run_change() {
        let mut idx = index(&["1:HLT_Mu17"]);
        let menu = ["HLT_Mu17_v2"];
        let rebuilt: Vec<bool> = [1, 1, 1, 2, 2].iter().map(|&run| idx.refresh_if_stale(run, &menu)).collect();
        assert_eq!(rebuilt, vec![true, false, false, true, false]);
        assert_eq!(idx.rebuild_count(), 2);
        assert_eq!(idx.last_run(), Some(2));
    }

    #[test]
    fn empty_positional_map_is_always_stale() {
        let mut idx = index(&["1:HLT_Mu17"]);
        assert!(idx.refresh_if_stale(5, &["HLT_Other_v1"]));
        assert!(idx.refresh_if_stale(5, &["HLT_Other_v1"]));
        assert_eq!(idx.rebuild_count(), 2);
    }

    #[test]
    fn same_run_keeps_old_menu_mapping() {
        let mut idx = index(&["1:HLT_Mu17", "2:HLT_Ele27"]);
        idx.refresh_if_stale(1, &["HLT_Mu17_v1", "HLT_Ele27_v1"]);
        // a different menu under the same run is not noticed
        idx.refresh_if_stale(1, &["HLT_Ele27_v1"]);
        assert_eq!(idx.positions(), &[(0, 1), (1, 2)]);
    }

    #[test]
    fn fired_ids_keep_multiplicity() {
        let mut idx = index(&["7:HLT_Photon50"]);
        idx.refresh_if_stale(1, &["HLT_Photon50_v1", "HLT_Photon50_v2", "HLT_Photon50_v3"]);
        let flags = [true, true, false];
        let fired = idx.fired_ids(|i| flags[i]);
        assert_eq!(fired, vec![7, 7]);
    }

    #[test]
    fn match_path_names_requires_hlt_prefix() {
        let idx = index(&["1:HLT_Mu17", "2:Flag_goodVertices"]);
        let ids = idx.match_path_names(&["Flag_goodVertices_v1", "HLT_Mu17_v2", "hlt_Mu17_v2", "HLT_Mu17_v9"]);
        assert_eq!(ids, vec![1, 1]);
    }

    #[test]
    fn build_resets_positional_map() {
        let mut idx = index(&["1:HLT_Mu17"]);
        idx.refresh_if_stale(1, &["HLT_Mu17_v1"]);
        idx.build(&["5:HLT_Mu17"], DuplicatePolicy::LastWriteWins).unwrap();
        assert!(idx.positions().is_empty());
        assert!(idx.refresh_if_stale(1, &["HLT_Mu17_v1"]));
        assert_eq!(idx.fired_ids(|_| true), vec![5]);
    }

    #[test]
    fn export_is_ordered_by_name() {
        let idx = index(&["2:HLT_Ele27", "1:HLT_Mu17", "3:HLT_DoubleMu"]);
        let names: Vec<_> = idx.export_table().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["HLT_DoubleMu", "HLT_Ele27", "HLT_Mu17"]);
    }
}
