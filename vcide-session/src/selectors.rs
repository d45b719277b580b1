//! Pure derivations for the rendering layer.

use serde::Serialize;
use vcide_engine::{Frame, Scope, SourceLocation, VcRef, WatchValue};

use crate::state::{AppState, InteractiveVc};

/// True while any obligation is still waiting for its verdict.
pub fn verification_in_progress(state: &AppState) -> bool {
    state.vcs.iter().any(|ivc| ivc.vc.handle.result().is_none())
}

pub fn current_ivc(state: &AppState) -> Option<&InteractiveVc> {
    state.selected_vc.and_then(|idx| state.vcs.get(idx))
}

pub fn current_vc(state: &AppState) -> Option<&VcRef> {
    current_ivc(state).map(current_vc_of)
}

pub fn current_vc_of(ivc: &InteractiveVc) -> &VcRef {
    &ivc.current().handle
}

/// Obligations located on the selected line, in emission order.
pub fn available_verification_conditions(state: &AppState) -> Vec<&InteractiveVc> {
    let Some(line) = state.selected_line else {
        return Vec::new();
    };
    state.vcs.iter().filter(|ivc| ivc.line() == line).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DebuggerView {
    pub callstack: Vec<Frame>,
    pub selected_frame: Option<usize>,
    pub scopes: Vec<Scope>,
    pub watches: Vec<WatchValue>,
    pub assumptions: Vec<String>,
}

/// Interpreter state of the current condition; `None` without a model.
pub fn debugger_view(state: &AppState) -> Option<DebuggerView> {
    let ivc = current_ivc(state)?;
    let vc = current_vc_of(ivc);
    if !vc.has_model() {
        return None;
    }
    let scopes = ivc
        .selected_frame
        .map(|frame| vc.scopes(frame))
        .unwrap_or_default();
    Some(DebuggerView {
        callstack: vc.callstack(),
        selected_frame: ivc.selected_frame,
        scopes,
        watches: vc.watches(),
        assumptions: ivc.vc.handle.assumptions(),
    })
}

/// Source position of the inspected frame, for the editor's pc marker.
pub fn program_counter(state: &AppState) -> Option<SourceLocation> {
    let ivc = current_ivc(state)?;
    let vc = current_vc_of(ivc);
    let frame = ivc.selected_frame?;
    if !vc.has_model() {
        return None;
    }
    vc.callstack().into_iter().nth(frame).map(|f| f.location)
}
