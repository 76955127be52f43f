//! State Compatibility & Change Classifier
//!
//! Decides whether a new model can be shown by re-highlighting the existing
//! selectors, or whether the UI has to be rebuilt.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use super::grouping::{ModeGroup, MonitorModel, PresentationModel};

/// Whether `new` has exactly the structure of `old`
///
/// Monitors, groups and entries are compared in order; current flags are not
/// compared. Stops at the first difference.
pub fn compatible(old: &PresentationModel, new: &PresentationModel) -> bool {
    old.monitors.len() == new.monitors.len()
        && old
            .monitors
            .iter()
            .zip(&new.monitors)
            .all(|(a, b)| monitors_compatible(a, b))
}

fn monitors_compatible(a: &MonitorModel, b: &MonitorModel) -> bool {
    a.connector == b.connector
        && a.mode_groups.len() == b.mode_groups.len()
        && a.mode_groups
            .iter()
            .zip(&b.mode_groups)
            .all(|(x, y)| groups_compatible(x, y))
}

fn groups_compatible(a: &ModeGroup, b: &ModeGroup) -> bool {
    a.label == b.label
        && a.entries.len() == b.entries.len()
        && a.entries.iter().zip(&b.entries).all(|(x, y)| {
            x.mode_id == y.mode_id && x.underscan == y.underscan && x.interlaced == y.interlaced
        })
}

/// Identifies one selector: monitor, mode and underscan state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SelectionKey {
    /// Monitor connector
    pub connector: String,
    /// Mutter mode id
    pub mode_id: String,
    /// Underscan variant
    pub underscan: bool,
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.connector, self.mode_id, self.underscan)
    }
}

/// Position of a selector within a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionPosition {
    /// Index into `PresentationModel::monitors`
    pub monitor: usize,
    /// Index into `MonitorModel::mode_groups`
    pub group: usize,
    /// Index into `ModeGroup::entries`
    pub entry: usize,
}

impl PresentationModel {
    /// Key of each monitor's current entry
    pub fn current_selections(&self) -> Vec<SelectionKey> {
        self.monitors
            .iter()
            .filter_map(|monitor| {
                monitor.current_position().map(|(g, e)| {
                    let entry = &monitor.mode_groups[g].entries[e];
                    SelectionKey {
                        connector: monitor.connector.clone(),
                        mode_id: entry.mode_id.clone(),
                        underscan: entry.underscan,
                    }
                })
            })
            .collect()
    }
}

/// Lookup from selection keys to selector positions, built when a UI is
/// (re)built and reused while following models stay compatible
#[derive(Debug, Clone, Default)]
pub struct SelectionIndex {
    positions: HashMap<SelectionKey, SelectionPosition>,
}

impl SelectionIndex {
    /// Index every entry of `model`
    pub fn new(model: &PresentationModel) -> Self {
        let mut positions = HashMap::new();
        for (m, monitor) in model.monitors.iter().enumerate() {
            for (g, group) in monitor.mode_groups.iter().enumerate() {
                for (e, entry) in group.entries.iter().enumerate() {
                    let key = SelectionKey {
                        connector: monitor.connector.clone(),
                        mode_id: entry.mode_id.clone(),
                        underscan: entry.underscan,
                    };
                    positions.entry(key).or_insert(SelectionPosition {
                        monitor: m,
                        group: g,
                        entry: e,
                    });
                }
            }
        }
        Self { positions }
    }

    /// Where the selector for `key` sits
    pub fn position(&self, key: &SelectionKey) -> Option<SelectionPosition> {
        self.positions.get(key).copied()
    }

    /// Number of indexed selectors
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// No selectors indexed
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions to activate for `model`'s current entries
    ///
    /// A current entry without a selector is logged and skipped; the stale
    /// selector stays as it is.
    pub fn highlight(&self, model: &PresentationModel) -> Vec<(SelectionKey, SelectionPosition)> {
        model
            .current_selections()
            .into_iter()
            .filter_map(|key| match self.position(&key) {
                Some(pos) => {
                    debug!("Activating selector for {}", key);
                    Some((key, pos))
                }
                None => {
                    warn!("No selector for {}", key);
                    None
                }
            })
            .collect()
    }
}
