//! Mode Grouping Engine
//!
//! Builds the list of refresh-rate choices presented for each monitor:
//!
//! 1. keep modes at the reference resolution (current, else preferred, else first)
//! 2. sort by refresh rate, highest first (stable)
//! 3. pair interlaced with progressive modes of the same or round-equal rate
//! 4. optionally duplicate every group for underscan on/off
//! 5. label each group with the fewest decimals that keep neighbours distinct

use serde::Serialize;
use tracing::{debug, warn};

use crate::display::{Monitor, MonitorsState};
use crate::error::{Result, SwitchError};
use crate::rounding::{distinguishing_decimals, fixed_label, lone_label, would_round_the_same};

/// One selectable mode within a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeEntry {
    /// Mutter mode id, e.g. `1920x1080@59.940`
    pub mode_id: String,
    /// Refresh rate in Hz
    pub refresh_rate: f64,
    /// Interlaced scan-out
    pub interlaced: bool,
    /// Selecting this entry enables underscanning
    pub underscan: bool,
    /// The monitor is in exactly this mode and underscan setting
    pub current: bool,
    /// The monitor prefers this mode
    pub preferred: bool,
}

/// One visually distinct refresh-rate choice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeGroup {
    /// Rounded rate shown to the user, unique within the monitor
    pub label: String,
    /// Rate of the leading entry
    pub refresh_rate: f64,
    /// Progressive entries first, then interlaced, then their underscan twins
    pub entries: Vec<ModeEntry>,
}

/// Presentation of one monitor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorModel {
    /// Connector name, e.g. `HDMI-1`
    pub connector: String,
    /// Human readable name when Mutter reports one
    pub display_name: Option<String>,
    /// Monitor supports underscanning
    pub can_underscan: bool,
    /// Choices, highest rate first
    pub mode_groups: Vec<ModeGroup>,
}

impl MonitorModel {
    /// Group and entry indices of the current entry
    pub fn current_position(&self) -> Option<(usize, usize)> {
        self.mode_groups.iter().enumerate().find_map(|(g, group)| {
            group
                .entries
                .iter()
                .position(|e| e.current)
                .map(|e| (g, e))
        })
    }

    /// Find the entry in the group labelled `label` with these flags
    ///
    /// Group and entry indices are returned so callers can go through the
    /// same selection path as a UI.
    pub fn find_entry(&self, label: &str, interlaced: bool, underscan: bool) -> Option<(usize, usize)> {
        let g = self.mode_groups.iter().position(|group| group.label == label)?;
        let e = self.mode_groups[g]
            .entries
            .iter()
            .position(|e| e.interlaced == interlaced && e.underscan == underscan)?;
        Some((g, e))
    }

    /// Whether there is anything to choose between
    pub fn has_choice(&self) -> bool {
        !(self.mode_groups.len() == 1 && self.mode_groups[0].entries.len() == 1)
    }
}

/// Everything a UI needs to render refresh-rate selectors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationModel {
    /// Serial of the state this model was built from
    pub serial: u32,
    /// Widest group over all monitors, for grid layouts
    pub columns: usize,
    /// Presented monitors, in state order
    pub monitors: Vec<MonitorModel>,
}

impl PresentationModel {
    /// Monitor presentation by connector
    pub fn monitor(&self, connector: &str) -> Option<&MonitorModel> {
        self.monitors.iter().find(|m| m.connector == connector)
    }
}

/// Knobs for building a [`PresentationModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    /// Also present monitors with a single mode to choose from
    pub include_fixed_monitors: bool,
    /// Duplicate groups for underscan on underscan-capable monitors
    pub offer_underscan: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            include_fixed_monitors: false,
            offer_underscan: true,
        }
    }
}

/// Build the presentation model for a whole state
///
/// Monitors without modes are skipped with a warning, and monitors without a
/// real choice are left out unless `include_fixed_monitors` is set.
pub fn build_model(state: &MonitorsState, options: &ModelOptions) -> PresentationModel {
    let mut monitors = Vec::with_capacity(state.monitors.len());

    for monitor in &state.monitors {
        let mode_groups = match group_modes(monitor, options) {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Not presenting {}: {}", monitor.connector(), e);
                continue;
            }
        };
        let model = MonitorModel {
            connector: monitor.connector().to_string(),
            display_name: monitor.display_name.clone(),
            can_underscan: monitor.can_underscan(),
            mode_groups,
        };
        if !model.has_choice() && !options.include_fixed_monitors {
            debug!("Monitor {} has a single mode, not presenting it", model.connector);
            continue;
        }
        monitors.push(model);
    }

    let columns = monitors
        .iter()
        .flat_map(|m| m.mode_groups.iter())
        .map(|g| g.entries.len())
        .max()
        .unwrap_or(1)
        .max(1);

    PresentationModel {
        serial: state.serial,
        columns,
        monitors,
    }
}

/// Group one monitor's modes into labelled refresh-rate choices
pub fn group_modes(monitor: &Monitor, options: &ModelOptions) -> Result<Vec<ModeGroup>> {
    if monitor.modes.is_empty() {
        return Err(SwitchError::NoModes(monitor.connector().to_string()));
    }

    let entries = sorted_entries(monitor);
    let mut groups = pair_entries(entries);

    if options.offer_underscan && monitor.can_underscan() {
        for group in &mut groups {
            let twins: Vec<ModeEntry> = group
                .iter()
                .map(|e| ModeEntry {
                    underscan: true,
                    ..e.clone()
                })
                .collect();
            group.extend(twins);
        }
    }

    // Entries carry the mode's own flag until here
    let underscanning = monitor.is_underscanning();
    for entry in groups.iter_mut().flatten() {
        entry.current = entry.current && entry.underscan == underscanning;
    }

    let rates: Vec<f64> = groups.iter().map(|g| g[0].refresh_rate).collect();
    let labels = assign_labels(&rates);

    Ok(groups
        .into_iter()
        .zip(labels)
        .map(|(entries, label)| ModeGroup {
            label,
            refresh_rate: entries[0].refresh_rate,
            entries,
        })
        .collect())
}

/// Modes at the reference resolution, highest rate first, exact duplicates folded
fn sorted_entries(monitor: &Monitor) -> Vec<ModeEntry> {
    let mut entries: Vec<ModeEntry> = monitor
        .modes_at_current_resolution()
        .into_iter()
        .map(|m| ModeEntry {
            mode_id: m.id.clone(),
            refresh_rate: m.refresh_rate,
            interlaced: m.interlaced,
            underscan: false,
            current: m.current,
            preferred: m.preferred,
        })
        .collect();
    entries.sort_by(|a, b| b.refresh_rate.total_cmp(&a.refresh_rate));

    let mut folded: Vec<ModeEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        let twin = folded
            .iter_mut()
            .find(|k| k.refresh_rate == entry.refresh_rate && k.interlaced == entry.interlaced);
        match twin {
            Some(kept) => {
                debug!(
                    "{}: mode {} duplicates {}, presenting it once",
                    monitor.connector(),
                    entry.mode_id,
                    kept.mode_id
                );
                if entry.current && !kept.current {
                    kept.mode_id = entry.mode_id;
                    kept.current = true;
                }
                kept.preferred |= entry.preferred;
            }
            None => folded.push(entry),
        }
    }
    folded
}

/// Exactly one interlaced and the rates are equal or round the same
fn pairable(a: &ModeEntry, b: &ModeEntry) -> bool {
    a.interlaced != b.interlaced && would_round_the_same(a.refresh_rate, b.refresh_rate)
}

/// Whether `this` should rather be left for `next` than paired with `prev`
fn defer_to_next(prev: &ModeEntry, this: &ModeEntry, next: Option<&ModeEntry>) -> bool {
    let Some(next) = next else {
        return false;
    };
    let closer_to_next = pairable(this, next)
        && this.refresh_rate - next.refresh_rate < prev.refresh_rate - this.refresh_rate;
    let ambiguous = this.refresh_rate != prev.refresh_rate
        && would_round_the_same(this.refresh_rate, next.refresh_rate);
    closer_to_next || ambiguous
}

/// Walk the sorted entries pairing interlaced with progressive neighbours
fn pair_entries(entries: Vec<ModeEntry>) -> Vec<Vec<ModeEntry>> {
    let mut groups: Vec<Vec<ModeEntry>> = Vec::with_capacity(entries.len());

    for (idx, this) in entries.iter().enumerate() {
        let join = match groups.last() {
            Some(group) if group.len() == 1 => {
                let prev = &group[0];
                pairable(prev, this) && !defer_to_next(prev, this, entries.get(idx + 1))
            }
            _ => false,
        };

        match groups.last_mut() {
            Some(group) if join => {
                if this.interlaced {
                    group.push(this.clone());
                } else {
                    group.insert(0, this.clone());
                }
            }
            _ => groups.push(vec![this.clone()]),
        }
    }

    groups
}

/// Label each leading rate, adding decimals only within runs that would
/// otherwise be shown the same
fn assign_labels(rates: &[f64]) -> Vec<String> {
    let mut labels = Vec::with_capacity(rates.len());
    let mut start = 0;

    while start < rates.len() {
        let mut end = start + 1;
        while end < rates.len() && same_display(rates[end - 1], rates[end]) {
            end += 1;
        }

        let run = &rates[start..end];
        if run.windows(2).any(|pair| pair[0] != pair[1]) {
            let decimals = distinguishing_decimals(run);
            labels.extend(run.iter().map(|&r| fixed_label(r, decimals)));
        } else {
            labels.extend(run.iter().map(|&r| lone_label(r)));
        }
        start = end;
    }

    labels
}

/// Rounded to the same integer, or equal once trimmed to the lone-rate decimals
fn same_display(a: f64, b: f64) -> bool {
    would_round_the_same(a, b) || lone_label(a) == lone_label(b)
}
