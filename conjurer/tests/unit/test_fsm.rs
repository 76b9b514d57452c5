//! FSM unit tests

use conjurer::deploy::fsm::{StepEvent, StepFsm, StepState};

#[test]
fn test_fsm_initial_state() {
    let fsm = StepFsm::new();
    assert_eq!(fsm.state(), StepState::Pending);
    assert!(fsm.error().is_none());
    assert!(!fsm.is_terminal());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = StepFsm::new();

    // Pending -> Running
    fsm.process(StepEvent::Start).unwrap();
    assert_eq!(fsm.state(), StepState::Running);

    // Running -> Completed
    fsm.process(StepEvent::Complete).unwrap();
    assert_eq!(fsm.state(), StepState::Completed);
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_failure_flow() {
    let mut fsm = StepFsm::new();

    fsm.process(StepEvent::Start).unwrap();
    fsm.process(StepEvent::Fail("test error".to_string())).unwrap();

    assert_eq!(fsm.state(), StepState::Failed);
    assert_eq!(fsm.error(), Some("test error"));
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_cannot_complete_before_start() {
    let mut fsm = StepFsm::new();
    assert!(fsm.process(StepEvent::Complete).is_err());
    assert_eq!(fsm.state(), StepState::Pending);
}

#[test]
fn test_fsm_no_rerun() {
    let mut fsm = StepFsm::new();
    fsm.process(StepEvent::Start).unwrap();
    fsm.process(StepEvent::Fail("boom".to_string())).unwrap();

    // Failed is terminal
    assert!(fsm.process(StepEvent::Start).is_err());
    assert_eq!(fsm.state(), StepState::Failed);

    let mut fsm = StepFsm::new();
    fsm.process(StepEvent::Start).unwrap();
    fsm.process(StepEvent::Complete).unwrap();
    assert!(fsm.process(StepEvent::Start).is_err());
}
