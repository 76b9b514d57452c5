//! Placement engine tests

use conjurer::errors::ConjureError;
use tokio_test::{assert_err, assert_ok};
use conjurer::placement::assignment::{AssignmentType, PlacementAction};
use conjurer::placement::controller::{ArchitectureView, PlacementController};
use conjurer::placement::engine::{PlacementEngine, RowAction};
use conjurer::placement::machine::{Application, Machine, Pin};

fn engine() -> PlacementEngine {
    let mut engine = PlacementEngine::new();
    engine.add_application(Application::new("mysql", 2).with_allowed([AssignmentType::Lxd, AssignmentType::Kvm]));
    engine.add_application(Application::new("wordpress", 1));
    engine.insert_machine(Machine::new("0"));
    engine.insert_machine(Machine::new("1"));
    engine
}

#[test]
fn test_disallowed_select_leaves_working_set_unchanged() {
    let mut engine = engine();
    engine.select("mysql", "0", AssignmentType::Lxd).unwrap();
    let before = engine.working_placements("mysql").to_vec();

    let err = assert_err!(engine.select("mysql", "1", AssignmentType::BareMetal));

    assert!(matches!(
        err,
        ConjureError::InvalidAssignment { ref application, .. } if application == "mysql"
    ));
    assert!(!err.is_fatal());
    assert_eq!(engine.working_placements("mysql"), before.as_slice());
}

#[test]
fn test_commit_is_visible_to_other_applications() {
    let mut engine = engine();
    assert_ok!(engine.select("mysql", "0", AssignmentType::Kvm));

    // Not committed yet: wordpress sees nothing
    assert!(engine.all_placements_for("wordpress", "0").is_empty());

    engine.commit("mysql").unwrap();
    let seen = engine.all_placements_for("wordpress", "0");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].application, "mysql");
    assert_eq!(seen[0].assignment_type, AssignmentType::Kvm);
}

#[test]
fn test_unselect_before_commit() {
    let mut engine = engine();
    engine.select("mysql", "0", AssignmentType::Kvm).unwrap();
    engine.select("mysql", "0", AssignmentType::Lxd).unwrap();
    engine.select("mysql", "1", AssignmentType::Lxd).unwrap();

    assert_eq!(engine.unselect("mysql", "0"), 2);
    engine.commit("mysql").unwrap();

    assert!(engine.all_placements_for("wordpress", "0").is_empty());
    assert_eq!(engine.all_placements_for("wordpress", "1").len(), 1);
}

#[test]
fn test_recommit_replaces_previous() {
    let mut engine = engine();
    engine.select("mysql", "0", AssignmentType::Kvm).unwrap();
    engine.commit("mysql").unwrap();

    engine.unselect("mysql", "0");
    engine.select("mysql", "1", AssignmentType::Lxd).unwrap();
    engine.commit("mysql").unwrap();

    assert!(engine.all_placements_for("wordpress", "0").is_empty());
    assert_eq!(engine.placement_directives("mysql"), vec!["lxd:1"]);
}

#[test]
fn test_own_view_combines_committed_others_and_working() {
    let mut engine = engine();
    engine.select("wordpress", "0", AssignmentType::BareMetal).unwrap();
    engine.commit("wordpress").unwrap();
    engine.select("mysql", "0", AssignmentType::Lxd).unwrap();

    let apps: Vec<_> = engine
        .all_placements_for("mysql", "0")
        .into_iter()
        .map(|p| p.application)
        .collect();
    assert_eq!(apps, vec!["wordpress", "mysql"]);
}

#[test]
fn test_pin_round_trip() {
    let mut engine = engine();
    assert_eq!(engine.get_pin("0"), Pin::Unset);

    engine.set_pin("0", "maas-node-4");
    assert_eq!(engine.get_pin("0"), Pin::Pinned("maas-node-4".to_string()));

    engine.unset_pin("0");
    assert_eq!(engine.get_pin("0"), Pin::Unset);
}

#[test]
fn test_actions_track_allowed_types() {
    let mut engine = engine();
    assert_eq!(
        engine.actions("mysql").unwrap(),
        vec![
            PlacementAction::Assign(AssignmentType::Lxd),
            PlacementAction::Assign(AssignmentType::Kvm),
            PlacementAction::Cancel,
        ]
    );

    engine.add_application(Application::new("mysql", 2).with_allowed([AssignmentType::BareMetal]));
    assert_eq!(
        engine.actions("mysql").unwrap(),
        vec![PlacementAction::Assign(AssignmentType::BareMetal), PlacementAction::Cancel]
    );
}

#[test]
fn test_added_machine_is_selectable() {
    let mut engine = engine();
    let id = engine.add_machine().id.clone();
    assert_eq!(id, "2");
    assert_eq!(engine.machine(&id).unwrap().constraints.cores(), "");

    engine.select("wordpress", &id, AssignmentType::BareMetal).unwrap();
    assert!(engine.all_assigned("wordpress"));
}

#[test]
fn test_rows_hide_select_once_assigned() {
    let mut engine = engine();
    engine.select("wordpress", "1", AssignmentType::BareMetal).unwrap();

    let rows = engine.machine_rows("wordpress");
    assert_eq!(rows[0].action, RowAction::Hidden);
    assert_eq!(rows[1].action, RowAction::Remove);
    assert_eq!(rows[1].summary(), "BareMetal: wordpress");
}

#[test]
fn test_view_cancel_discards_changes() {
    let mut engine = engine();
    {
        let mut view = ArchitectureView::new(&mut engine, "mysql").unwrap();
        view.select("0", AssignmentType::Lxd).unwrap();
        view.show_pin_chooser("1");
        assert_eq!(view.pin("1"), Pin::Unset);
        view.cancel();
    }
    assert!(engine.working_placements("mysql").is_empty());
    assert!(engine.committed_for("mysql").is_empty());
}
