//! Text rendering of a presentation model, used by the CLI and in logs.

use std::fmt;

use super::grouping::{ModeEntry, ModeGroup, MonitorModel, PresentationModel};

/// Caption for the selector of entry `idx` in `group`
///
/// The leading entry carries the rate (`60Hz`, `60Hz (i)`, `60Hz (u)`,
/// `60Hz (iu)`); the others only name what differs from it.
pub fn entry_caption(group: &ModeGroup, idx: usize) -> String {
    let Some(entry) = group.entries.get(idx) else {
        return String::new();
    };
    if idx == 0 {
        let suffix = match (entry.interlaced, entry.underscan) {
            (false, false) => "",
            (true, false) => " (i)",
            (false, true) => " (u)",
            (true, true) => " (iu)",
        };
        format!("{}Hz{}", group.label, suffix)
    } else {
        match (entry.interlaced, entry.underscan) {
            (true, false) => "Interlaced",
            (false, true) => "Underscan",
            (true, true) => "I + U",
            (false, false) => "-",
        }
        .to_string()
    }
}

/// Caption with `*` for a preferred mode and `_..._` around the current one
pub fn marked_caption(group: &ModeGroup, idx: usize) -> String {
    let mut caption = entry_caption(group, idx);
    if let Some(ModeEntry {
        preferred,
        underscan,
        current,
        ..
    }) = group.entries.get(idx)
    {
        if *preferred && !*underscan {
            caption.push('*');
        }
        if *current {
            caption = format!("_{}_", caption);
        }
    }
    caption
}

struct GroupDisplay<'a>(&'a ModeGroup);

impl fmt::Display for GroupDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let captions: Vec<String> = (0..self.0.entries.len())
            .map(|idx| marked_caption(self.0, idx))
            .collect();
        write!(f, "{{{} [{}]}}", self.0.label, captions.join(", "))
    }
}

impl fmt::Display for MonitorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "  Monitor {} ({}) {{", self.connector, name)?,
            None => write!(f, "  Monitor {} {{", self.connector)?,
        }
        for group in &self.mode_groups {
            write!(f, "\n    {}", GroupDisplay(group))?;
        }
        write!(f, "\n  }}")
    }
}

impl fmt::Display for PresentationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model {{\n  serial: {}, columns: {}", self.serial, self.columns)?;
        for monitor in &self.monitors {
            write!(f, "\n{}", monitor)?;
        }
        write!(f, "\n}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(interlaced: bool, underscan: bool, current: bool, preferred: bool) -> ModeEntry {
        ModeEntry {
            mode_id: "m".to_string(),
            refresh_rate: 60.0,
            interlaced,
            underscan,
            current,
            preferred,
        }
    }

    fn full_group() -> ModeGroup {
        ModeGroup {
            label: "60".to_string(),
            refresh_rate: 60.0,
            entries: vec![
                entry(false, false, false, true),
                entry(true, false, false, false),
                entry(false, true, true, true),
                entry(true, true, false, false),
            ],
        }
    }

    #[test]
    fn test_entry_captions() {
        let group = full_group();
        let captions: Vec<_> = (0..4).map(|i| entry_caption(&group, i)).collect();
        assert_eq!(captions, vec!["60Hz", "Interlaced", "Underscan", "I + U"]);
        assert_eq!(entry_caption(&group, 9), "");
    }

    #[test]
    fn test_leading_entry_suffixes() {
        let group = ModeGroup {
            label: "50".to_string(),
            refresh_rate: 50.0,
            entries: vec![entry(true, false, false, false)],
        };
        assert_eq!(entry_caption(&group, 0), "50Hz (i)");
    }

    #[test]
    fn test_marked_captions() {
        let group = full_group();
        assert_eq!(marked_caption(&group, 0), "60Hz*");
        // Underscan twins never show the preferred mark
        assert_eq!(marked_caption(&group, 2), "_Underscan_");
    }

    #[test]
    fn test_describe_model() {
        let model = PresentationModel {
            serial: 4,
            columns: 4,
            monitors: vec![MonitorModel {
                connector: "HDMI-1".to_string(),
                display_name: None,
                can_underscan: true,
                mode_groups: vec![full_group()],
            }],
        };
        assert_eq!(
            model.to_string(),
            "Model {\n  serial: 4, columns: 4\n  Monitor HDMI-1 {\n    \
             {60 [60Hz*, Interlaced, _Underscan_, I + U]}\n  }\n}"
        );
    }
}
