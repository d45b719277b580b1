//! The only place session state changes.
//!
//! `reduce` is total over [`BaseAction`] and never fails. Calls into the
//! engine handles (interpreter, stepping, watches) are forwarded requests;
//! whatever they report is re-read immediately afterwards.

use vcide_engine::{EngineError, VcRef};

use crate::action::BaseAction;
use crate::state::{AppState, InteractiveVc, Tracked};

pub fn reduce(state: AppState, action: BaseAction) -> AppState {
    tracing::debug!(action = action.kind(), "reduce");
    match action {
        BaseAction::SelectExample { selected, source } => AppState {
            selected,
            selected_line: None,
            source_code: source,
            message: None,
            vcs: Vec::new(),
            selected_vc: None,
            ..state
        },
        BaseAction::ChangeSource { new_source } => AppState {
            source_code: new_source,
            selected_line: None,
            message: None,
            vcs: Vec::new(),
            selected_vc: None,
            running: false,
            run_message: None,
            ..state
        },
        BaseAction::Verify { vcs } => AppState {
            vcs: vcs.into_iter().map(InteractiveVc::new).collect(),
            message: None,
            selected_vc: None,
            ..state
        },
        BaseAction::VerificationDone => state,
        BaseAction::VerificationError { message } => AppState {
            vcs: Vec::new(),
            message: Some(message),
            selected_vc: None,
            ..state
        },
        BaseAction::SelectLine { line } => {
            let mut state = state;
            let found = line.and_then(|l| state.vcs.iter().position(|ivc| ivc.line() == l));
            state.selected_line = line;
            state.selected_vc = found;
            if let Some(idx) = found {
                interpret(&mut state.vcs[idx]);
            }
            state
        }
        BaseAction::SelectVc { selected } => {
            let mut state = state;
            match state.vcs.iter().position(|ivc| ivc.vc.id == selected) {
                Some(idx) => {
                    interpret(&mut state.vcs[idx]);
                    state.selected_line = Some(state.vcs[idx].line());
                    state.selected_vc = Some(idx);
                }
                None => state.selected_vc = None,
            }
            state
        }
        BaseAction::SetSourceAnnotations { enabled } => AppState {
            show_source_annotations: enabled,
            ..state
        },
        BaseAction::SelectAssertion { selected } => with_selected(state, |ivc| {
            if selected.is_some_and(|i| i >= ivc.other_assertions.len()) {
                return;
            }
            ivc.selected_assertion = selected;
            ivc.selected_frame = innermost_frame(&ivc.current().handle);
        }),
        BaseAction::RemoveAssertion { index } => with_selected(state, |ivc| {
            if index >= ivc.other_assertions.len() {
                return;
            }
            let previous = ivc
                .selected_assertion
                .and_then(|i| ivc.other_assertions.get(i))
                .map(|t| t.id);
            let removed = ivc.other_assertions.remove(index);
            ivc.interpreted.remove(&removed.id);
            ivc.selected_assertion =
                previous.and_then(|id| ivc.other_assertions.iter().position(|t| t.id == id));
            if previous == Some(removed.id) {
                ivc.selected_frame = innermost_frame(&ivc.current().handle);
            }
        }),
        BaseAction::InputAssertion { source } => with_selected(state, |ivc| {
            ivc.input_assertion = source;
            ivc.input_assertion_error = None;
        }),
        BaseAction::AddAssertion { vc } => with_selected(state, |ivc| {
            ivc.input_assertion.clear();
            match vc {
                Err(error) => ivc.input_assertion_error = Some(error),
                Ok(tracked) => {
                    ivc.selected_frame = innermost_frame(&tracked.handle);
                    ivc.other_assertions.push(tracked);
                    ivc.selected_assertion = Some(ivc.other_assertions.len() - 1);
                    ivc.input_assertion_error = None;
                }
            }
        }),
        BaseAction::InputAssumption { source } => with_selected(state, |ivc| {
            ivc.input_assumption = source;
            ivc.input_assumption_error = None;
        }),
        BaseAction::UpdateAssumptions { error } => with_selected(state, |ivc| {
            ivc.input_assumption.clear();
            match error {
                None => {
                    ivc.input_assumption_error = None;
                    ivc.selected_frame = innermost_frame(&ivc.current().handle);
                }
                Some(error) => ivc.input_assumption_error = Some(error),
            }
        }),
        BaseAction::InputWatch { source } => with_selected(state, |ivc| {
            ivc.input_watch = source;
            ivc.input_watch_error = None;
        }),
        BaseAction::AddWatch => with_selected(state, add_watch),
        BaseAction::RemoveWatch { index } => with_selected(state, |ivc| {
            for member in family_current_first(ivc) {
                if let Err(e) = member.handle.remove_watch(index) {
                    tracing::debug!(vc = %member.id, error = %e, "remove_watch ignored");
                }
            }
        }),
        BaseAction::SelectFrame { frame } => with_selected(state, |ivc| {
            let vc = &ivc.current().handle;
            if vc.has_model() && frame < vc.callstack().len() {
                ivc.selected_frame = Some(frame);
            }
        }),
        BaseAction::RestartInterpreter => navigate(state, |vc| vc.restart()),
        BaseAction::StepInto => navigate(state, |vc| vc.step_into()),
        BaseAction::StepOver => navigate(state, |vc| vc.step_over()),
        BaseAction::StepOut => navigate(state, |vc| vc.step_out()),
        BaseAction::InterpreterReady { id } => {
            let mut state = state;
            for ivc in &mut state.vcs {
                if ivc.family().any(|t| t.id == id && t.handle.has_model()) {
                    ivc.interpreted.insert(id);
                }
                if ivc.current().id == id {
                    ivc.selected_frame = innermost_frame(&ivc.current().handle);
                }
            }
            state
        }
        BaseAction::RunStart => AppState {
            running: true,
            run_message: None,
            ..state
        },
        BaseAction::RunDone { message } => {
            if !state.running {
                tracing::debug!("stale run result dropped");
                return state;
            }
            AppState {
                running: false,
                run_message: Some(message),
                ..state
            }
        }
        BaseAction::UserStudyNext => {
            let mut state = state;
            state.user_study.step = state.user_study.step.next();
            state.user_study.show_modal = true;
            state
        }
        BaseAction::UserStudyCloseModal => {
            let mut state = state;
            state.user_study.show_modal = false;
            state
        }
    }
}

/// Last call-stack index when a model exists.
pub(crate) fn innermost_frame(vc: &VcRef) -> Option<usize> {
    if vc.has_model() {
        vc.callstack().len().checked_sub(1)
    } else {
        None
    }
}

/// Runs the interpreter the first time a condition with a model is shown.
fn interpret(ivc: &mut InteractiveVc) {
    ivc.input_assertion.clear();
    ivc.input_assertion_error = None;
    ivc.input_watch.clear();
    ivc.input_watch_error = None;

    let current = ivc.current().clone();
    let vc = &current.handle;
    if !vc.has_model() {
        ivc.selected_frame = None;
        return;
    }
    if ivc.interpreted.contains(&current.id) {
        return;
    }
    match vc.run_with_interpreter() {
        Ok(()) => {
            ivc.interpreted.insert(current.id);
            ivc.selected_frame = innermost_frame(vc);
        }
        Err(e) => {
            tracing::warn!(vc = %current.id, error = %e, "interpreter failed");
            ivc.selected_frame = None;
        }
    }
}

fn with_selected(mut state: AppState, f: impl FnOnce(&mut InteractiveVc)) -> AppState {
    if let Some(ivc) = state.selected_vc.and_then(|idx| state.vcs.get_mut(idx)) {
        f(ivc);
    }
    state
}

fn navigate(state: AppState, step: impl FnOnce(&VcRef) -> Result<(), EngineError>) -> AppState {
    with_selected(state, |ivc| {
        let vc = ivc.current().handle.clone();
        if let Err(e) = step(&vc) {
            tracing::debug!(vc = %ivc.current().id, error = %e, "interpreter navigation refused");
        }
        ivc.selected_frame = innermost_frame(&vc);
    })
}

/// The active condition, then the rest of its family.
fn family_current_first(ivc: &InteractiveVc) -> Vec<Tracked> {
    let current = ivc.current().clone();
    let mut out = vec![current.clone()];
    out.extend(ivc.family().filter(|t| t.id != current.id).cloned());
    out
}

fn add_watch(ivc: &mut InteractiveVc) {
    let expr = std::mem::take(&mut ivc.input_watch);
    let mut members = family_current_first(ivc).into_iter();
    let Some(active) = members.next() else {
        return;
    };
    if let Err(e) = active.handle.add_watch(&expr) {
        ivc.input_watch_error = Some(e.to_string());
        return;
    }
    for sibling in members {
        if let Err(e) = sibling.handle.add_watch(&expr) {
            tracing::warn!(vc = %sibling.id, error = %e, "watch not propagated");
        }
    }
    ivc.input_watch_error = None;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vcide_engine::{Outcome, ScriptedCondition, SourceLocation, TraceFrame, TraceStep, VerificationCondition};

    use super::*;
    use crate::state::VcId;

    fn cond(line: u32, outcome: Outcome) -> Arc<ScriptedCondition> {
        Arc::new(ScriptedCondition::new(
            SourceLocation::on_line("t.js", line, 2, 10),
            format!("assert: line {line}"),
            outcome,
        ))
    }

    fn failing() -> Outcome {
        let main = TraceFrame::new("main", 1);
        let f = TraceFrame::new("f()", 4).bind("x", vcide_engine::Value::num(0.0));
        Outcome::Unverified {
            trace: vec![
                TraceStep { frames: vec![main.clone()] },
                TraceStep { frames: vec![main, f] },
            ],
        }
    }

    fn with_vcs(conds: &[Arc<ScriptedCondition>]) -> AppState {
        let vcs = conds.iter().map(|c| Tracked::new(c.clone())).collect();
        reduce(AppState::default(), BaseAction::Verify { vcs })
    }

    fn selected(state: &AppState) -> &InteractiveVc {
        &state.vcs[state.selected_vc.expect("a selected vc")]
    }

    #[test]
    fn select_line_without_match_clears_selection() {
        let state = with_vcs(&[cond(3, Outcome::Verified)]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        assert_eq!(state.selected_vc, Some(0));
        let state = reduce(state, BaseAction::SelectLine { line: Some(9) });
        assert_eq!(state.selected_vc, None);
        assert_eq!(state.selected_line, Some(9));
    }

    #[test]
    fn select_vc_with_unknown_id_clears_selection() {
        let state = with_vcs(&[cond(3, Outcome::Verified)]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        let state = reduce(state, BaseAction::SelectVc { selected: VcId::fresh() });
        assert_eq!(state.selected_vc, None);
    }

    #[test]
    fn selection_is_spliced_back_into_vcs() {
        let state = with_vcs(&[cond(3, Outcome::Verified), cond(5, Outcome::Verified)]);
        let id = state.vcs[1].vc.id;
        let state = reduce(state, BaseAction::SelectVc { selected: id });
        let state = reduce(state, BaseAction::InputAssumption { source: "x > 0".into() });
        assert_eq!(state.selected_vc, Some(1));
        assert_eq!(state.selected_line, Some(5));
        assert_eq!(state.vcs[1].input_assumption, "x > 0");
        assert_eq!(state.vcs[0].input_assumption, "");
    }

    #[test]
    fn remove_assertion_keeps_identity() {
        let c = cond(3, Outcome::Verified);
        let state = with_vcs(&[c.clone()]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        let mut state = state;
        for expr in ["a", "b", "c"] {
            let vc = c.assert(expr).unwrap();
            state = reduce(state, BaseAction::AddAssertion { vc: Ok(Tracked::new(vc)) });
        }
        let ids: Vec<VcId> = selected(&state).other_assertions.iter().map(|t| t.id).collect();

        let state = reduce(state, BaseAction::SelectAssertion { selected: Some(1) });
        let state = reduce(state, BaseAction::RemoveAssertion { index: 0 });
        let ivc = selected(&state);
        assert_eq!(ivc.other_assertions.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[1], ids[2]]);
        assert_eq!(ivc.selected_assertion, Some(0));
        assert_eq!(ivc.current().id, ids[1]);

        let state = reduce(state, BaseAction::RemoveAssertion { index: 0 });
        let ivc = selected(&state);
        assert_eq!(ivc.selected_assertion, None);
        assert_eq!(ivc.current().id, ivc.vc.id);
    }

    #[test]
    fn select_assertion_out_of_range_is_ignored() {
        let state = with_vcs(&[cond(3, Outcome::Verified)]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        let state = reduce(state, BaseAction::SelectAssertion { selected: Some(4) });
        assert_eq!(selected(&state).selected_assertion, None);
    }

    #[test]
    fn rejected_assertion_sets_error_and_clears_buffer() {
        let state = with_vcs(&[cond(3, Outcome::Verified)]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        let state = reduce(state, BaseAction::InputAssertion { source: "x >".into() });
        let state = reduce(state, BaseAction::AddAssertion { vc: Err("bad".into()) });
        let ivc = selected(&state);
        assert!(ivc.other_assertions.is_empty());
        assert_eq!(ivc.input_assertion, "");
        assert_eq!(ivc.input_assertion_error.as_deref(), Some("bad"));
    }

    #[test]
    fn actions_without_selection_are_noops() {
        let state = with_vcs(&[cond(3, failing())]);
        for action in [
            BaseAction::StepInto,
            BaseAction::StepOver,
            BaseAction::StepOut,
            BaseAction::RestartInterpreter,
            BaseAction::SelectFrame { frame: 0 },
            BaseAction::AddWatch,
            BaseAction::RemoveWatch { index: 0 },
            BaseAction::RemoveAssertion { index: 0 },
        ] {
            let before = state.clone();
            assert_eq!(reduce(state.clone(), action), before);
        }
    }

    #[tokio::test]
    async fn interpretation_runs_once() {
        let c = cond(3, failing());
        c.verify().await;
        let state = with_vcs(&[c.clone()]);
        let id = state.vcs[0].vc.id;
        let once = reduce(state, BaseAction::SelectVc { selected: id });
        let twice = reduce(once.clone(), BaseAction::SelectVc { selected: id });
        assert_eq!(once, twice);
        assert_eq!(c.interpreter_runs(), 1);
        assert_eq!(selected(&twice).selected_frame, Some(1));
    }

    #[tokio::test]
    async fn select_frame_accepts_only_valid_indices() {
        let c = cond(3, failing());
        c.verify().await;
        let state = with_vcs(&[c.clone()]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        let state = reduce(state, BaseAction::SelectFrame { frame: 0 });
        assert_eq!(selected(&state).selected_frame, Some(0));
        let state = reduce(state, BaseAction::SelectFrame { frame: 7 });
        assert_eq!(selected(&state).selected_frame, Some(0));
    }

    #[tokio::test]
    async fn watches_propagate_across_family() {
        let c = cond(3, failing());
        c.verify().await;
        let state = with_vcs(&[c.clone()]);
        let state = reduce(state, BaseAction::SelectLine { line: Some(3) });
        let sibling = c.assert("y").unwrap();
        let state = reduce(state, BaseAction::AddAssertion { vc: Ok(Tracked::new(sibling.clone())) });

        let state = reduce(state, BaseAction::InputWatch { source: "x".into() });
        let state = reduce(state, BaseAction::AddWatch);
        assert_eq!(c.watches().len(), 1);
        assert_eq!(sibling.watches().len(), 1);
        assert_eq!(selected(&state).input_watch, "");

        let state = reduce(state, BaseAction::InputWatch { source: "(".into() });
        let state = reduce(state, BaseAction::AddWatch);
        assert!(selected(&state).input_watch_error.is_some());
        assert_eq!(c.watches().len(), 1);

        let state = reduce(state, BaseAction::RemoveWatch { index: 0 });
        assert!(c.watches().is_empty());
        assert!(sibling.watches().is_empty());
        assert!(selected(&state).input_watch_error.is_some());
    }

    #[test]
    fn run_done_after_source_change_is_dropped() {
        let state = reduce(AppState::default(), BaseAction::RunStart);
        assert!(state.running);
        let state = reduce(state, BaseAction::ChangeSource { new_source: "x".into() });
        let state = reduce(state, BaseAction::RunDone { message: "late".into() });
        assert!(!state.running);
        assert_eq!(state.run_message, None);
    }

    #[test]
    fn user_study_advances_to_survey() {
        let mut state = reduce(AppState::default(), BaseAction::UserStudyCloseModal);
        assert!(!state.user_study.show_modal);
        for _ in 0..20 {
            state = reduce(state, BaseAction::UserStudyNext);
        }
        assert!(state.user_study.show_modal);
        assert_eq!(state.user_study.step, crate::state::UserStudyStep::Survey);
    }
}
