//! Custom assertion helpers for workflow state.

use sw_protocol::{WorkflowStatus, WorkflowView};

/// Assert that a stage shows up exactly once in the completed list.
pub fn assert_completed_once(view: &WorkflowView, stage: &str) {
    let count = view.completed_agents.iter().filter(|s| *s == stage).count();
    assert_eq!(
        count, 1,
        "expected {stage} exactly once in {:?}",
        view.completed_agents
    );
}

/// Assert that once a terminal status was observed, nothing else followed.
pub fn assert_never_leaves_terminal(history: &[WorkflowStatus]) {
    if let Some(first) = history.iter().position(|s| s.is_terminal()) {
        let terminal = history[first];
        for later in &history[first..] {
            assert_eq!(
                *later, terminal,
                "workflow status left {terminal:?}: {history:?}"
            );
        }
    }
}

/// Assert that the status never went back to `idle` or `connecting` after
/// the workflow started running.
pub fn assert_never_regresses_to_connecting(history: &[WorkflowStatus]) {
    if let Some(first) = history.iter().position(|s| *s == WorkflowStatus::Running) {
        assert!(
            history[first..]
                .iter()
                .all(|s| !matches!(s, WorkflowStatus::Idle | WorkflowStatus::Connecting)),
            "workflow status regressed: {history:?}"
        );
    }
}
