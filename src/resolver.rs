// trigmap/src/resolver.rs

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::{
    error::Result,
    menu_index::{DuplicatePolicy, MenuIndex, TriggerInfo},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub energy: f64,
}

/// A trigger object as handed over by the upstream matcher, with its
/// unstripped path names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateObject {
    #[serde(flatten)]
    pub kinematics: Kinematics,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// The menu as seen by one event: live path names and their accept bits,
/// both indexed by path position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSnapshot {
    pub paths: Vec<String>,
    #[serde(default)]
    pub accept: Vec<bool>,
}

impl MenuSnapshot {
    /// Positions past the end of `accept` count as not accepted.
    pub fn accepted(&self, pos: usize) -> bool {
        self.accept.get(pos).copied().unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerObjectAnnotation {
    pub kinematics: Kinematics,
    pub trigger_ids: Vec<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedEvent {
    /// Logical ids of the fired paths; may repeat an id.
    pub fired: Vec<i32>,
    /// Only objects that matched at least one id.
    pub objects: Vec<TriggerObjectAnnotation>,
}

impl ResolvedEvent {
    pub fn is_empty(&self) -> bool { self.fired.is_empty() && self.objects.is_empty() }
}

/// Drives a [`MenuIndex`] once per event.
#[derive(Clone, Debug, Default)]
pub struct TriggerResolver {
    index: MenuIndex,
}

impl TriggerResolver {
    pub fn new(index: MenuIndex) -> Self { Self { index } }

    pub fn from_entries<S: AsRef<str>>(entries: &[S], policy: DuplicatePolicy) -> Result<Self> {
        let mut index = MenuIndex::default();
        index.build(entries, policy)?;
        Ok(Self { index })
    }

    pub fn resolve_event<S: AsRef<str>>(
        &mut self,
        run: u32,
        live_paths: &[S],
        accepted: impl Fn(usize) -> bool,
        objects: &[CandidateObject],
    ) -> ResolvedEvent {
        self.index.refresh_if_stale(run, live_paths);
        let fired = self.index.fired_ids(accepted);
        for id in &fired {
            trace!(run, id, "trigger fired");
        }
        let objects = objects
            .iter()
            .filter_map(|obj| {
                let trigger_ids = self.index.match_path_names(obj.paths.as_slice());
                (!trigger_ids.is_empty()).then(|| TriggerObjectAnnotation { kinematics: obj.kinematics, trigger_ids })
            })
            .collect();
        ResolvedEvent { fired, objects }
    }

    /// Like [`Self::resolve_event`], but tolerates missing upstream products:
    /// without the menu or the object collection nothing is computed and the
    /// event resolves empty. The index is left untouched in that case.
    pub fn resolve_available(
        &mut self,
        run: u32,
        menu: Option<&MenuSnapshot>,
        objects: Option<&[CandidateObject]>,
    ) -> ResolvedEvent {
        match (menu, objects) {
            (Some(menu), Some(objects)) => self.resolve_event(run, menu.paths.as_slice(), |pos| menu.accepted(pos), objects),
            (menu, objects) => {
                warn!(
                    run,
                    menu = menu.is_some(),
                    objects = objects.is_some(),
                    "trigger products unavailable, event gets no trigger information"
                );
                ResolvedEvent::default()
            }
        }
    }

    pub fn export_table(&self) -> Vec<TriggerInfo> { self.index.export_table() }
    pub fn index(&self) -> &MenuIndex { &self.index }
}
