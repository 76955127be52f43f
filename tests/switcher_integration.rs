//! End-to-end tests through the public API: raw reply -> model -> change ->
//! ApplyMonitorsConfig arguments, with an in-memory backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use zbus::zvariant::{OwnedValue, Value};

use refresh_switch::display::{
    decode_state, ApplyMethod, ApplyRequest, MonitorsState, RawMonitorsState,
};
use refresh_switch::model::{build_model, compatible, ModelOptions, SelectionIndex};
use refresh_switch::mutter::encode_request;
use refresh_switch::switcher::{DisplayConfigBackend, Reconciliation, RefreshSwitcher};
use refresh_switch::{Result, SwitchError};

type Props = HashMap<String, OwnedValue>;

fn owned(value: Value<'static>) -> OwnedValue {
    OwnedValue::try_from(value).unwrap()
}

fn flags(names: &[&str]) -> Props {
    names
        .iter()
        .map(|name| (name.to_string(), owned(Value::Bool(true))))
        .collect()
}

fn spec(connector: &str) -> (String, String, String, String) {
    (
        connector.to_string(),
        "SAM".to_string(),
        "TV".to_string(),
        "0x01".to_string(),
    )
}

/// A laptop panel with a single mode and a TV on HDMI-1 with underscan support
fn raw_state(serial: u32, current: &str, underscanning: bool) -> RawMonitorsState {
    let tv_modes = [
        ("1920x1080@60.000", 60.0, &[][..]),
        ("1920x1080@59.940i", 59.94, &["is-interlaced"][..]),
        ("1920x1080@50.000", 50.0, &[][..]),
        ("1280x720@60.000", 60.0, &[][..]),
    ]
    .into_iter()
    .map(|(id, rate, extra)| {
        let mut props = flags(extra);
        if id == current {
            props.extend(flags(&["is-current"]));
        }
        let (width, height) = if id.starts_with("1280") {
            (1280, 720)
        } else {
            (1920, 1080)
        };
        (id.to_string(), width, height, rate, 1.0, vec![1.0], props)
    })
    .collect();

    let mut tv_props = Props::new();
    tv_props.insert(
        "is-underscanning".to_string(),
        owned(Value::Bool(underscanning)),
    );
    tv_props.insert("display-name".to_string(), owned(Value::from("Samsung TV")));

    let panel_modes = vec![(
        "2560x1600@60.000".to_string(),
        2560,
        1600,
        60.0,
        2.0,
        vec![1.0, 2.0],
        flags(&["is-current", "is-preferred"]),
    )];

    let mut global = Props::new();
    global.insert("layout-mode".to_string(), owned(Value::U32(1)));
    global.insert(
        "supports-changing-layout-mode".to_string(),
        owned(Value::Bool(true)),
    );

    (
        serial,
        vec![
            (spec("eDP-1"), panel_modes, flags(&["is-builtin"])),
            (spec("HDMI-1"), tv_modes, tv_props),
        ],
        vec![
            (0, 0, 2.0, 0, true, vec![spec("eDP-1")], Props::new()),
            (1280, 0, 1.0, 0, false, vec![spec("HDMI-1")], Props::new()),
        ],
        global,
    )
}

/// Hands out queued states and records apply requests
#[derive(Default)]
struct FakeMutter {
    states: Mutex<Vec<MonitorsState>>,
    applied: Arc<Mutex<Vec<ApplyRequest>>>,
    reject: bool,
}

impl FakeMutter {
    fn with_states(states: Vec<RawMonitorsState>) -> Self {
        let mut states: Vec<_> = states
            .into_iter()
            .map(|raw| decode_state(raw).unwrap())
            .collect();
        states.reverse();
        Self {
            states: Mutex::new(states),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DisplayConfigBackend for FakeMutter {
    async fn get_current_state(&self) -> Result<MonitorsState> {
        self.states
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| SwitchError::Decode("no more states".to_string()))
    }

    async fn apply_monitors_config(&self, request: &ApplyRequest) -> Result<()> {
        if self.reject {
            return Err(SwitchError::Apply("Invalid serial".to_string()));
        }
        self.applied.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[test]
fn test_model_from_raw_state() {
    let state = decode_state(raw_state(3, "1920x1080@60.000", false)).unwrap();
    let model = build_model(&state, &ModelOptions::default());

    // The panel has nothing to choose from
    assert_eq!(model.monitors.len(), 1);
    let tv = model.monitor("HDMI-1").unwrap();
    assert_eq!(tv.display_name.as_deref(), Some("Samsung TV"));

    let labels: Vec<_> = tv.mode_groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, vec!["60", "50"]);
    assert_eq!(tv.mode_groups[0].entries.len(), 4);
    assert_eq!(model.columns, 4);
    assert_eq!(tv.current_position(), Some((0, 0)));

    let with_fixed = build_model(
        &state,
        &ModelOptions {
            include_fixed_monitors: true,
            ..Default::default()
        },
    );
    assert_eq!(with_fixed.monitors.len(), 2);
    assert!(!compatible(&model, &with_fixed));
}

#[tokio::test]
async fn test_switch_and_encode() {
    let backend = FakeMutter::with_states(vec![raw_state(3, "1920x1080@60.000", false)]);
    let applied = backend.applied.clone();
    let mut switcher =
        RefreshSwitcher::new(backend, ModelOptions::default(), ApplyMethod::Persistent)
            .await
            .unwrap();

    assert!(switcher
        .select_label("HDMI-1", "50Hz", false, true)
        .await
        .unwrap());

    let requests = applied.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (serial, method, logical_monitors, properties) = encode_request(&requests[0]);
    assert_eq!(serial, 3);
    assert_eq!(method, 2);
    assert_eq!(properties.get("layout-mode"), Some(&Value::U32(1)));

    assert_eq!(logical_monitors.len(), 2);
    let (_, _, scale, _, primary, panel) = &logical_monitors[0];
    assert_eq!((*scale, *primary), (2.0, true));
    assert_eq!(panel[0].1, "2560x1600@60.000");
    assert!(panel[0].2.is_empty());

    let (x, _, _, _, _, tv) = &logical_monitors[1];
    assert_eq!(*x, 1280);
    assert_eq!(tv[0].0, "HDMI-1");
    assert_eq!(tv[0].1, "1920x1080@50.000");
    assert_eq!(
        tv[0].2.get("enable-underscanning"),
        Some(&Value::Bool(true))
    );
}

#[tokio::test]
async fn test_echo_then_external_change() {
    let backend = FakeMutter::with_states(vec![
        raw_state(3, "1920x1080@60.000", false),
        // Stale echo right after our apply
        raw_state(3, "1920x1080@60.000", false),
        raw_state(4, "1920x1080@50.000", false),
        // Switched to 720p from Settings
        raw_state(5, "1280x720@60.000", false),
    ]);
    let mut switcher =
        RefreshSwitcher::new(backend, ModelOptions::default(), ApplyMethod::Temporary)
            .await
            .unwrap();
    let index = SelectionIndex::new(switcher.model());

    assert!(switcher
        .change_mode("HDMI-1", "1920x1080@50.000", false)
        .await
        .unwrap());
    assert_eq!(
        switcher.refresh().await.unwrap(),
        Reconciliation::EchoSuppressed
    );
    assert_eq!(
        switcher.state().monitor("HDMI-1").unwrap().current_mode_id(),
        Some("1920x1080@50.000")
    );

    match switcher.refresh().await.unwrap() {
        Reconciliation::Refresh(model) => {
            let highlighted = index.highlight(&model);
            assert_eq!(highlighted.len(), 1);
            assert_eq!(highlighted[0].0.mode_id, "1920x1080@50.000");
            assert_eq!((highlighted[0].1.group, highlighted[0].1.entry), (1, 0));
        }
        other => panic!("expected refresh, got {:?}", other),
    }

    // Only 720p@60 exists at the new resolution: one group, underscan on or off
    assert!(matches!(
        switcher.refresh().await.unwrap(),
        Reconciliation::Rebuild(model) if model.monitors[0].mode_groups.len() == 1
    ));
}

#[tokio::test]
async fn test_rejected_apply() {
    let mut backend = FakeMutter::with_states(vec![raw_state(3, "1920x1080@60.000", true)]);
    backend.reject = true;
    let mut switcher =
        RefreshSwitcher::new(backend, ModelOptions::default(), ApplyMethod::Temporary)
            .await
            .unwrap();

    let err = switcher.select("HDMI-1", 1, 0).await.unwrap_err();
    assert!(matches!(err, SwitchError::Apply(_)));
    assert!(!switcher.is_awaiting_echo());
}
