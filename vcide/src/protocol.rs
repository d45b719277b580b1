//! Line protocol spoken on stdin/stdout.
//!
//! Commands arrive as one JSON object per line, tagged by `cmd`. Every
//! reduction produces a `VCIDE_EVENT {json}` line carrying a full snapshot.

use serde::{Deserialize, Serialize};
use vcide_engine::{Message, MessageStatus, VcRef};
use vcide_session::{
    Annotation, AppState, Catalog, DebuggerView, ExampleName, InteractiveVc, Tracked, UserStudy, VcId, annotations,
    debugger_view, verification_in_progress,
};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum SessionCommand {
    SelectExample { name: ExampleName },
    ChangeSource { source: String },
    /// Verify the current editor contents.
    Verify,
    SelectLine {
        #[serde(default)]
        line: Option<u32>,
    },
    SelectVc { id: VcId },
    SetSourceAnnotations { enabled: bool },
    SelectAssertion {
        #[serde(default)]
        index: Option<usize>,
    },
    RemoveAssertion { index: usize },
    InputAssertion { source: String },
    AddAssertion,
    InputAssumption { source: String },
    AddAssumption,
    RemoveAssumption { index: usize },
    InputWatch { source: String },
    AddWatch,
    RemoveWatch { index: usize },
    SelectFrame { frame: usize },
    Restart,
    StepInto,
    StepOver,
    StepOut,
    Run,
    UserStudyNext,
    UserStudyCloseModal,
    Quit,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExampleSummary {
    pub name: ExampleName,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionSummary {
    pub id: VcId,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl AssertionSummary {
    fn of(tracked: &Tracked) -> Self {
        Self {
            id: tracked.id,
            description: tracked.handle.description(),
            status: status(&tracked.handle),
        }
    }
}

fn status(vc: &VcRef) -> Option<MessageStatus> {
    vc.result().map(|m| m.status)
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VcSummary {
    pub id: VcId,
    pub line: u32,
    pub description: String,
    /// Absent while verification is pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    pub assertions: Vec<AssertionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_assertion: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumption_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_error: Option<String>,
}

impl VcSummary {
    fn of(ivc: &InteractiveVc) -> Self {
        Self {
            id: ivc.vc.id,
            line: ivc.line(),
            description: ivc.vc.handle.description(),
            status: status(&ivc.vc.handle),
            assertions: ivc.other_assertions.iter().map(AssertionSummary::of).collect(),
            selected_assertion: ivc.selected_assertion,
            assertion_error: ivc.input_assertion_error.clone(),
            assumption_error: ivc.input_assumption_error.clone(),
            watch_error: ivc.input_watch_error.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub example: ExampleName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    pub vcs: Vec<VcSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_vc: Option<VcId>,
    pub verifying: bool,
    /// Empty when source annotations are switched off.
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger: Option<DebuggerView>,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_message: Option<String>,
    pub user_study: UserStudy,
}

impl Snapshot {
    pub fn of(state: &AppState) -> Self {
        Self {
            example: state.selected.clone(),
            selected_line: state.selected_line,
            message: state.message.clone(),
            vcs: state.vcs.iter().map(VcSummary::of).collect(),
            selected_vc: state.selected_vc.and_then(|i| state.vcs.get(i)).map(|ivc| ivc.vc.id),
            verifying: verification_in_progress(state),
            annotations: if state.show_source_annotations {
                annotations(state)
            } else {
                Vec::new()
            },
            debugger: debugger_view(state),
            running: state.running,
            run_message: state.run_message.clone(),
            user_study: state.user_study,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    Hello {
        protocol: u32,
        examples: Vec<ExampleSummary>,
    },
    State {
        action: &'static str,
        snapshot: Box<Snapshot>,
    },
    Error {
        message: String,
    },
}

impl SessionEvent {
    pub fn hello(catalog: &Catalog) -> Self {
        SessionEvent::Hello {
            protocol: PROTOCOL_VERSION,
            examples: catalog
                .iter()
                .map(|e| ExampleSummary {
                    name: e.name.clone(),
                    description: e.description.clone(),
                })
                .collect(),
        }
    }

    pub fn state(action: &'static str, state: &AppState) -> Self {
        SessionEvent::State {
            action,
            snapshot: Box::new(Snapshot::of(state)),
        }
    }
}
