//! Property tests for page versioning
//!
//! Undoing a version must restore the page to the state it had before the
//! version was opened, and every version inside the retention window must be
//! reconstructible while older ones are reported as unavailable.

use proptest::prelude::*;

use pagekeep_core::{ComponentId, Model, ModelValue, Page, PageSettings};

/// A mutation applied to whichever component `target` selects
#[derive(Debug, Clone)]
enum Op {
    Add { target: usize, name: u8 },
    Remove { target: usize },
    SetModel { target: usize, value: i64 },
    ClearModel { target: usize },
    SetState { target: usize, key: u8, value: i64 },
    Hide { target: usize },
    Disable { target: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), 0u8..6).prop_map(|(target, name)| Op::Add { target, name }),
        1 => any::<usize>().prop_map(|target| Op::Remove { target }),
        2 => (any::<usize>(), any::<i64>()).prop_map(|(target, value)| Op::SetModel { target, value }),
        1 => any::<usize>().prop_map(|target| Op::ClearModel { target }),
        2 => (any::<usize>(), 0u8..3, any::<i64>()).prop_map(|(target, key, value)| Op::SetState { target, key, value }),
        1 => any::<usize>().prop_map(|target| Op::Hide { target }),
        1 => any::<usize>().prop_map(|target| Op::Disable { target }),
    ]
}

fn pick(page: &Page, target: usize) -> ComponentId {
    let ids: Vec<ComponentId> = page.tree().ids().collect();
    ids[target % ids.len()]
}

/// Apply an operation; rejected operations leave the page untouched
fn apply(page: &mut Page, op: &Op) {
    let _ = match op {
        Op::Add { target, name } => {
            let parent = pick(page, *target);
            page.add(parent, &format!("n{}", name)).map(|_| ())
        }
        Op::Remove { target } => {
            let component = pick(page, *target);
            page.remove(component)
        }
        Op::SetModel { target, value } => {
            let component = pick(page, *target);
            page.set_model_object(component, *value)
        }
        Op::ClearModel { target } => {
            let component = pick(page, *target);
            page.set_model(component, None)
        }
        Op::SetState { target, key, value } => {
            let component = pick(page, *target);
            page.set_state(component, &format!("k{}", key), *value)
        }
        Op::Hide { target } => {
            let component = pick(page, *target);
            page.set_visible(component, false)
        }
        Op::Disable { target } => {
            let component = pick(page, *target);
            page.set_enabled(component, false)
        }
    };
}

fn baseline() -> Page {
    let mut page = Page::new(1, "PropertyPage");
    let root = page.root();
    let form = page.add(root, "form").unwrap();
    page.add_with_model(form, "name", Some(Model::new("alice"))).unwrap();
    page.add(form, "submit").unwrap();
    let list = page.add(root, "list").unwrap();
    page.add_with_model(list, "row", Some(Model::new(7))).unwrap();
    page.track_changes();
    page
}

proptest! {
    #[test]
    fn undo_restores_state_before_version(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut page = baseline();
        let before = page.hierarchy_as_string();
        let version = page.current_version();

        for op in &ops {
            apply(&mut page, op);
        }
        page.end_version().unwrap();

        let rewound = page.get_version(version).expect("previous version is retained");
        prop_assert_eq!(rewound.hierarchy_as_string(), before);
        prop_assert_eq!(rewound.current_version(), version);
    }

    #[test]
    fn versions_inside_window_are_reconstructible(max_versions in 0usize..6, rounds in 1u32..12) {
        let settings = PageSettings::new().with_max_versions(max_versions);
        let mut page = Page::with_settings(1, "WindowPage", &settings);
        let root = page.root();
        let counter = page.add_with_model(root, "counter", Some(Model::new(0))).unwrap();
        page.track_changes();

        // snapshots[v] is the state right after version v was closed; version 0 is the built page
        let mut snapshots = vec![page.hierarchy_as_string()];
        for round in 0..rounds {
            page.set_model_object(counter, i64::from(round) + 1).unwrap();
            page.end_version().unwrap();
            snapshots.push(page.hierarchy_as_string());
        }
        let current = page.current_version();
        prop_assert_eq!(current, rounds);

        let oldest = current.saturating_sub(max_versions as u32);
        for version in 0..=current {
            let mut copy = page.clone();
            let rewound = copy.get_version(version);
            if version >= oldest {
                let rewound = rewound.expect("version inside the window");
                prop_assert_eq!(&rewound.hierarchy_as_string(), &snapshots[version as usize]);
                prop_assert!(rewound.get("counter").is_some());
            } else {
                prop_assert!(rewound.is_none());
                prop_assert_eq!(copy.current_version(), current);
                prop_assert_eq!(&copy.hierarchy_as_string(), &snapshots[current as usize]);
            }
        }
    }
}

#[test]
fn version_numbers_increase_by_one() {
    let mut page = Page::new(9, "CounterPage");
    page.track_changes();
    let root = page.root();
    let mut seen = vec![page.end_version().unwrap()];
    for i in 0..5 {
        page.add(root, &format!("c{}", i)).unwrap();
        seen.push(page.end_version().unwrap());
    }
    // nothing was recorded before the first add
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn construction_edits_belong_to_version_zero() {
    let mut page = Page::new(2, "BuiltPage");
    let root = page.root();
    let name = page.add_with_model(root, "name", Some(Model::new("built"))).unwrap();
    assert_eq!(page.end_version().unwrap(), 0);
    page.track_changes();

    page.set_model_object(name, "edited").unwrap();
    assert_eq!(page.end_version().unwrap(), 1);

    let constructed = page.get_version(0).expect("version 0 is retained");
    assert_eq!(constructed.get("name"), Some(name));
    assert_eq!(constructed.model_object(name), Some(&ModelValue::from("built")));
}
