//! Switcher Engine
//!
//! Holds the single live state and its presentation model. Every change goes
//! through [`RefreshSwitcher::change_mode`], which mutates a copy of the
//! state, commits it, arms the echo flag with the pre-change model and only
//! then awaits the compositor.
//! Because the engine is driven through `&mut self`, a notification cannot be
//! processed between the mutation and the arming of the flag.

use tracing::{debug, info, trace, warn};

use super::DisplayConfigBackend;
use crate::display::{ApplyMethod, MonitorsState};
use crate::error::{Result, SwitchError};
use crate::model::{build_model, compatible, ModelOptions, PresentationModel};

/// Outcome of processing one change notification
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The set of choices changed; selectors must be rebuilt from this model
    Rebuild(PresentationModel),

    /// Same choices, possibly a different current entry; re-highlight only
    Refresh(PresentationModel),

    /// Stale echo of our own apply request; the local state was kept
    EchoSuppressed,
}

impl Reconciliation {
    /// The new model, if the state was replaced
    pub fn model(&self) -> Option<&PresentationModel> {
        match self {
            Self::Rebuild(model) | Self::Refresh(model) => Some(model),
            Self::EchoSuppressed => None,
        }
    }
}

/// Refresh-rate and underscan switcher for one compositor
pub struct RefreshSwitcher<B> {
    backend: B,
    options: ModelOptions,
    method: ApplyMethod,
    state: MonitorsState,
    model: PresentationModel,
    /// Model from before our apply request, kept until the next notification
    echo_baseline: Option<PresentationModel>,
}

impl<B: DisplayConfigBackend> RefreshSwitcher<B> {
    /// Fetch the initial state and build its model
    pub async fn new(backend: B, options: ModelOptions, method: ApplyMethod) -> Result<Self> {
        let state = backend.get_current_state().await?;
        let model = build_model(&state, &options);

        info!(
            "Refresh switcher ready: serial {}, {} monitors, {} presented",
            state.serial,
            state.monitors.len(),
            model.monitors.len()
        );

        Ok(Self {
            backend,
            options,
            method,
            state,
            model,
            echo_baseline: None,
        })
    }

    /// Current state, including local changes not yet echoed back
    pub fn state(&self) -> &MonitorsState {
        &self.state
    }

    /// Presentation model of [`Self::state`]
    pub fn model(&self) -> &PresentationModel {
        &self.model
    }

    /// The transport
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the next notification may be suppressed as an echo
    pub fn is_awaiting_echo(&self) -> bool {
        self.echo_baseline.is_some()
    }

    /// Process a change notification: re-fetch and classify the new state
    ///
    /// The echo flag is consumed here whatever the outcome. When it was armed
    /// and the fetched state has the structure of the model from before our
    /// change, the fetched state is considered stale and dropped.
    pub async fn refresh(&mut self) -> Result<Reconciliation> {
        let baseline = self.echo_baseline.take();

        let fresh = self.backend.get_current_state().await?;
        let model = build_model(&fresh, &self.options);

        if baseline.is_some_and(|before| compatible(&before, &model)) {
            debug!(
                "Ignoring MonitorsChanged echo (serial {} -> {})",
                self.state.serial, fresh.serial
            );
            return Ok(Reconciliation::EchoSuppressed);
        }

        let same_structure = compatible(&self.model, &model);

        debug!(
            "State serial {} -> {}, {}",
            self.state.serial,
            fresh.serial,
            if same_structure { "refresh" } else { "rebuild" }
        );
        trace!("{}", model);
        self.state = fresh;
        self.model = model.clone();

        Ok(if same_structure {
            Reconciliation::Refresh(model)
        } else {
            Reconciliation::Rebuild(model)
        })
    }

    /// Switch `connector` to `mode_id` and ask the compositor to apply it
    ///
    /// Returns `false` without contacting the compositor when nothing would
    /// change. On an apply failure the local change stays in place so a
    /// retry can reuse it.
    pub async fn change_mode(&mut self, connector: &str, mode_id: &str, underscan: bool) -> Result<bool> {
        let mut next = self.state.clone();
        if !next.change_mode(connector, mode_id, underscan)? {
            return Ok(false);
        }
        let request = next.apply_request(self.method)?;

        let before = std::mem::replace(&mut self.model, build_model(&next, &self.options));
        self.state = next;
        self.echo_baseline = Some(before);

        if let Err(e) = self.backend.apply_monitors_config(&request).await {
            warn!("Apply for {} failed: {}", connector, e);
            self.echo_baseline = None;
            return Err(e);
        }

        Ok(true)
    }

    /// Ask the compositor whether `mode_id` would be accepted, changing nothing
    ///
    /// Returns `false` without contacting the compositor when the mode is
    /// already current.
    pub async fn verify_mode(&self, connector: &str, mode_id: &str, underscan: bool) -> Result<bool> {
        let mut candidate = self.state.clone();
        if !candidate.change_mode(connector, mode_id, underscan)? {
            return Ok(false);
        }
        let request = candidate.apply_request(ApplyMethod::Verify)?;
        self.backend.apply_monitors_config(&request).await?;

        Ok(true)
    }

    /// Apply the entry at `group`/`entry` of a presented monitor
    pub async fn select(&mut self, connector: &str, group: usize, entry: usize) -> Result<bool> {
        let (mode_id, underscan) = self.entry_at(connector, group, entry)?;
        self.change_mode(connector, &mode_id, underscan).await
    }

    /// Apply the entry of the group labelled `label` with the given flags
    ///
    /// A trailing `Hz` on the label is accepted.
    pub async fn select_label(
        &mut self,
        connector: &str,
        label: &str,
        interlaced: bool,
        underscan: bool,
    ) -> Result<bool> {
        let (mode_id, underscan) = self.resolve_label(connector, label, interlaced, underscan)?;
        self.change_mode(connector, &mode_id, underscan).await
    }

    /// Mode id and underscan setting of a labelled choice
    pub fn resolve_label(
        &self,
        connector: &str,
        label: &str,
        interlaced: bool,
        underscan: bool,
    ) -> Result<(String, bool)> {
        let label = label.trim();
        let label = label.strip_suffix("Hz").unwrap_or(label).trim_end();

        if self.state.monitor(connector).is_none() {
            return Err(SwitchError::UnknownMonitor(connector.to_string()));
        }
        // Monitors with a single choice are not presented and have no labels
        let (group, entry) = self
            .model
            .monitor(connector)
            .and_then(|monitor| monitor.find_entry(label, interlaced, underscan))
            .ok_or_else(|| SwitchError::UnknownLabel {
                connector: connector.to_string(),
                label: label.to_string(),
                detail: match (interlaced, underscan) {
                    (false, false) => String::new(),
                    (true, false) => " (interlaced)".to_string(),
                    (false, true) => " (underscan)".to_string(),
                    (true, true) => " (interlaced, underscan)".to_string(),
                },
            })?;

        self.entry_at(connector, group, entry)
    }

    fn entry_at(&self, connector: &str, group: usize, entry: usize) -> Result<(String, bool)> {
        self.model
            .monitor(connector)
            .ok_or_else(|| self.missing_monitor(connector, group, entry))?
            .mode_groups
            .get(group)
            .and_then(|g| g.entries.get(entry))
            .map(|e| (e.mode_id.clone(), e.underscan))
            .ok_or_else(|| SwitchError::UnknownSelection {
                connector: connector.to_string(),
                group,
                entry,
            })
    }

    /// Unknown connector, or a known monitor that is not presented
    fn missing_monitor(&self, connector: &str, group: usize, entry: usize) -> SwitchError {
        if self.state.monitor(connector).is_some() {
            SwitchError::UnknownSelection {
                connector: connector.to_string(),
                group,
                entry,
            }
        } else {
            SwitchError::UnknownMonitor(connector.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::decode::fixtures::*;
    use crate::display::decode_state;
    use crate::model::SelectionIndex;
    use crate::switcher::MockDisplayConfigBackend;

    fn tv_state(serial: u32) -> MonitorsState {
        decode_state(state(
            serial,
            vec![monitor(
                "HDMI-1",
                vec![
                    with_flags(mode("1920x1080@60", 60.0), &["is-current", "is-preferred"]),
                    with_flags(mode("1920x1080@60i", 59.94), &["is-interlaced"]),
                    mode("1920x1080@50", 50.0),
                ],
                Some(false),
            )],
        ))
        .unwrap()
    }

    fn fixed_state(serial: u32) -> MonitorsState {
        decode_state(state(
            serial,
            vec![monitor("eDP-1", vec![with_flags(mode("m", 60.0), &["is-current"])], None)],
        ))
        .unwrap()
    }

    async fn switcher_with(mut backend: MockDisplayConfigBackend, initial: MonitorsState) -> RefreshSwitcher<MockDisplayConfigBackend> {
        backend
            .expect_get_current_state()
            .times(1)
            .return_once(move || Ok(initial));
        RefreshSwitcher::new(backend, ModelOptions::default(), ApplyMethod::Temporary)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_change_mode_applies_and_suppresses_echo() {
        let mut backend = MockDisplayConfigBackend::new();
        backend
            .expect_apply_monitors_config()
            .withf(|req| {
                req.serial == 4
                    && req.method == ApplyMethod::Temporary
                    && req.logical_monitors[0].monitors[0].mode_id == "1920x1080@50"
                    && req.logical_monitors[0].monitors[0].underscan == Some(false)
            })
            .times(1)
            .returning(|_| Ok(()));
        let mut switcher = switcher_with(backend, tv_state(4)).await;

        assert!(switcher.change_mode("HDMI-1", "1920x1080@50", false).await.unwrap());
        assert!(switcher.is_awaiting_echo());
        assert_eq!(
            switcher.state().monitor("HDMI-1").unwrap().current_mode_id(),
            Some("1920x1080@50")
        );

        // Mutter echoes the old state right after applying
        let mut backend_calls = mockall::Sequence::new();
        let backend = &mut switcher.backend;
        backend
            .expect_get_current_state()
            .times(1)
            .in_sequence(&mut backend_calls)
            .returning(|| Ok(tv_state(4)));
        let mut applied = tv_state(5);
        applied.change_mode("HDMI-1", "1920x1080@50", false).unwrap();
        backend
            .expect_get_current_state()
            .times(1)
            .in_sequence(&mut backend_calls)
            .return_once(move || Ok(applied));

        assert_eq!(switcher.refresh().await.unwrap(), Reconciliation::EchoSuppressed);
        assert!(!switcher.is_awaiting_echo());
        assert_eq!(
            switcher.state().monitor("HDMI-1").unwrap().current_mode_id(),
            Some("1920x1080@50")
        );

        let reconciliation = switcher.refresh().await.unwrap();
        assert!(matches!(reconciliation, Reconciliation::Refresh(_)));
        assert_eq!(switcher.state().serial, 5);
    }

    /// TV at 1080p with a 720p mode set; `current` is flagged current
    fn two_resolution_state(serial: u32, current: &str) -> MonitorsState {
        let modes = [
            ("p60", 1920, 1080, 60.0),
            ("p50", 1920, 1080, 50.0),
            ("s60", 1280, 720, 60.0),
            ("s50", 1280, 720, 50.0),
            ("s30", 1280, 720, 30.0),
        ]
        .into_iter()
        .map(|(id, width, height, rate)| {
            let flags: &[&str] = if id == current { &["is-current"] } else { &[] };
            sized_mode(id, width, height, rate, flags)
        })
        .collect();
        decode_state(state(serial, vec![monitor("HDMI-1", modes, None)])).unwrap()
    }

    #[tokio::test]
    async fn test_echo_after_resolution_change_is_suppressed() {
        let mut backend = MockDisplayConfigBackend::new();
        backend
            .expect_apply_monitors_config()
            .withf(|req| req.logical_monitors[0].monitors[0].mode_id == "s50")
            .times(1)
            .returning(|_| Ok(()));
        let mut switcher = switcher_with(backend, two_resolution_state(4, "p60")).await;
        assert_eq!(switcher.model().monitors[0].mode_groups.len(), 2);

        assert!(switcher.change_mode("HDMI-1", "s50", false).await.unwrap());
        assert_eq!(switcher.model().monitors[0].mode_groups.len(), 3);

        let mut backend_calls = mockall::Sequence::new();
        switcher
            .backend
            .expect_get_current_state()
            .times(1)
            .in_sequence(&mut backend_calls)
            .returning(|| Ok(two_resolution_state(4, "p60")));
        switcher
            .backend
            .expect_get_current_state()
            .times(1)
            .in_sequence(&mut backend_calls)
            .returning(|| Ok(two_resolution_state(5, "s50")));

        assert_eq!(switcher.refresh().await.unwrap(), Reconciliation::EchoSuppressed);
        assert_eq!(
            switcher.state().monitor("HDMI-1").unwrap().current_mode_id(),
            Some("s50")
        );
        assert_eq!(switcher.model().monitors[0].current_position(), Some((1, 0)));

        assert!(matches!(
            switcher.refresh().await.unwrap(),
            Reconciliation::Refresh(_)
        ));
        assert_eq!(switcher.state().serial, 5);
    }

    #[tokio::test]
    async fn test_unchanged_mode_issues_no_request() {
        let mut backend = MockDisplayConfigBackend::new();
        backend.expect_apply_monitors_config().never();
        let mut switcher = switcher_with(backend, tv_state(1)).await;

        assert!(!switcher.change_mode("HDMI-1", "1920x1080@60", false).await.unwrap());
        assert!(!switcher.is_awaiting_echo());
    }

    #[tokio::test]
    async fn test_unknown_monitor_leaves_state_untouched() {
        let mut backend = MockDisplayConfigBackend::new();
        backend.expect_apply_monitors_config().never();
        let mut switcher = switcher_with(backend, tv_state(1)).await;
        let before = switcher.state().clone();

        let err = switcher.change_mode("DP-9", "1920x1080@50", false).await.unwrap_err();
        assert!(matches!(err, SwitchError::UnknownMonitor(_)));
        assert_eq!(switcher.state(), &before);
    }

    #[tokio::test]
    async fn test_apply_failure_keeps_local_change() {
        let mut backend = MockDisplayConfigBackend::new();
        backend
            .expect_apply_monitors_config()
            .times(1)
            .returning(|_| Err(SwitchError::Apply("stale serial".to_string())));
        let mut switcher = switcher_with(backend, tv_state(2)).await;

        let err = switcher.change_mode("HDMI-1", "1920x1080@50", false).await.unwrap_err();
        assert!(matches!(err, SwitchError::Apply(_)));
        assert!(!switcher.is_awaiting_echo());
        assert_eq!(
            switcher.state().monitor("HDMI-1").unwrap().current_mode_id(),
            Some("1920x1080@50")
        );
    }

    #[tokio::test]
    async fn test_structural_change_requires_rebuild() {
        let mut switcher = switcher_with(MockDisplayConfigBackend::new(), tv_state(1)).await;
        switcher
            .backend
            .expect_get_current_state()
            .times(1)
            .returning(|| Ok(fixed_state(2)));

        let reconciliation = switcher.refresh().await.unwrap();
        match reconciliation {
            Reconciliation::Rebuild(model) => assert!(model.monitors.is_empty()),
            other => panic!("expected rebuild, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_structural_change_is_not_suppressed() {
        let mut backend = MockDisplayConfigBackend::new();
        backend.expect_apply_monitors_config().returning(|_| Ok(()));
        let mut switcher = switcher_with(backend, tv_state(1)).await;
        switcher.change_mode("HDMI-1", "1920x1080@50", false).await.unwrap();

        switcher
            .backend
            .expect_get_current_state()
            .returning(|| Ok(fixed_state(2)));

        assert!(matches!(
            switcher.refresh().await.unwrap(),
            Reconciliation::Rebuild(_)
        ));
        assert_eq!(switcher.state().serial, 2);
    }

    #[tokio::test]
    async fn test_select_and_select_label() {
        let mut backend = MockDisplayConfigBackend::new();
        backend
            .expect_apply_monitors_config()
            .withf(|req| {
                let m = &req.logical_monitors[0].monitors[0];
                m.mode_id == "1920x1080@60i" && m.underscan == Some(true)
            })
            .times(1)
            .returning(|_| Ok(()));
        backend
            .expect_apply_monitors_config()
            .withf(|req| req.logical_monitors[0].monitors[0].mode_id == "1920x1080@50")
            .times(1)
            .returning(|_| Ok(()));
        let mut switcher = switcher_with(backend, tv_state(1)).await;

        // Group "60": p60, i60, p60 + underscan, i60 + underscan
        assert!(switcher.select("HDMI-1", 0, 3).await.unwrap());
        assert!(switcher.state().monitor("HDMI-1").unwrap().is_underscanning());

        assert!(switcher.select_label("HDMI-1", "50 Hz", false, false).await.unwrap());

        assert!(matches!(
            switcher.select("HDMI-1", 5, 0).await,
            Err(SwitchError::UnknownSelection { group: 5, .. })
        ));
        assert!(matches!(
            switcher.select_label("HDMI-1", "75", false, false).await,
            Err(SwitchError::UnknownLabel { .. })
        ));
        assert!(matches!(
            switcher.select("DP-9", 0, 0).await,
            Err(SwitchError::UnknownMonitor(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_mode_does_not_touch_state() {
        let mut backend = MockDisplayConfigBackend::new();
        backend
            .expect_apply_monitors_config()
            .withf(|req| req.method == ApplyMethod::Verify)
            .times(1)
            .returning(|_| Ok(()));
        let switcher = switcher_with(backend, tv_state(1)).await;

        assert!(switcher.verify_mode("HDMI-1", "1920x1080@50", false).await.unwrap());
        assert!(!switcher.is_awaiting_echo());
        assert_eq!(
            switcher.state().monitor("HDMI-1").unwrap().current_mode_id(),
            Some("1920x1080@60")
        );
    }

    #[tokio::test]
    async fn test_duplicate_rates_end_to_end() {
        let raw = state(
            1,
            vec![monitor(
                "DP-1",
                vec![
                    with_flags(mode("A", 144.0), &["is-current"]),
                    mode("B", 144.0),
                    mode("C", 72.0),
                ],
                None,
            )],
        );
        let mut backend = MockDisplayConfigBackend::new();
        backend
            .expect_apply_monitors_config()
            .withf(|req| {
                let m = &req.logical_monitors[0].monitors[0];
                m.mode_id == "C" && m.underscan.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));
        let mut switcher = switcher_with(backend, decode_state(raw).unwrap()).await;

        let labels: Vec<_> = switcher.model().monitors[0]
            .mode_groups
            .iter()
            .map(|g| g.label.clone())
            .collect();
        assert_eq!(labels, vec!["144", "72"]);

        assert!(switcher.change_mode("DP-1", "C", false).await.unwrap());
        let monitor = switcher.state().monitor("DP-1").unwrap();
        assert!(monitor.modes["C"].current);
        assert!(!monitor.modes["A"].current);
        assert_eq!(switcher.model().monitors[0].current_position(), Some((1, 0)));
    }

    #[tokio::test]
    async fn test_highlighted_duplicate_is_already_current() {
        let raw = state(
            1,
            vec![monitor(
                "DP-1",
                vec![
                    mode("A", 144.0),
                    with_flags(mode("B", 144.0), &["is-current"]),
                    mode("C", 72.0),
                ],
                None,
            )],
        );
        let mut backend = MockDisplayConfigBackend::new();
        backend.expect_apply_monitors_config().never();
        let mut switcher = switcher_with(backend, decode_state(raw).unwrap()).await;

        let index = SelectionIndex::new(switcher.model());
        let selected = switcher.model().current_selections();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].mode_id, "B");
        assert!(index.position(&selected[0]).is_some());

        assert!(!switcher.select("DP-1", 0, 0).await.unwrap());
        assert!(!switcher.is_awaiting_echo());
    }

    #[tokio::test]
    async fn test_label_on_hidden_monitor() {
        let mut switcher = switcher_with(MockDisplayConfigBackend::new(), fixed_state(1)).await;

        assert!(matches!(
            switcher.resolve_label("eDP-1", "60", false, false),
            Err(SwitchError::UnknownLabel { ref label, .. }) if label == "60"
        ));
        assert!(matches!(
            switcher.select_label("DP-9", "60", false, false).await,
            Err(SwitchError::UnknownMonitor(_))
        ));
    }
}
