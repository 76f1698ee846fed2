use qf_model::status::{allowed_transitions, validate_transition};
use qf_model::ExecutionStatus;
use proptest::prelude::*;

#[test]
fn test_running_transitions() {
    assert!(validate_transition(ExecutionStatus::Running, ExecutionStatus::Completed).is_ok());
    assert!(validate_transition(ExecutionStatus::Running, ExecutionStatus::Failed).is_ok());
    assert!(validate_transition(ExecutionStatus::Running, ExecutionStatus::Cancelled).is_ok());

    // No regression to pending
    assert!(validate_transition(ExecutionStatus::Running, ExecutionStatus::Pending).is_err());
}

fn any_status() -> impl Strategy<Value = ExecutionStatus> {
    prop_oneof![
        Just(ExecutionStatus::Pending),
        Just(ExecutionStatus::Running),
        Just(ExecutionStatus::Completed),
        Just(ExecutionStatus::Failed),
        Just(ExecutionStatus::Cancelled),
    ]
}

proptest! {
    #[test]
    fn prop_validation_matches_allowed_set(from in any_status(), to in any_status()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_no_exit_from_terminal(from in any_status(), to in any_status()) {
        if from.is_terminal() {
            prop_assert!(validate_transition(from, to).is_err());
        }
    }

    /// Any accepted walk from PENDING is a prefix of PENDING -> RUNNING -> terminal.
    #[test]
    fn prop_walks_are_forward_only(steps in proptest::collection::vec(any_status(), 0..8)) {
        let mut current = ExecutionStatus::Pending;
        let mut path = vec![current];
        for next in steps {
            if validate_transition(current, next).is_ok() {
                current = next;
                path.push(current);
            }
        }
        prop_assert!(path.len() <= 3);
        if path.len() >= 2 {
            prop_assert_eq!(path[1], ExecutionStatus::Running);
        }
        if path.len() == 3 {
            prop_assert!(path[2].is_terminal());
        }
    }
}
