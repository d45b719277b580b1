use std::future::Future;
use std::pin::Pin;

use vcide_engine::Message;

use crate::catalog::ExampleName;
use crate::state::{Tracked, VcId};

/// Every event the reducer understands.
#[derive(Clone, Debug)]
pub enum BaseAction {
    SelectExample { selected: ExampleName, source: String },
    ChangeSource { new_source: String },
    Verify { vcs: Vec<Tracked> },
    /// Completion marker of one sequencer step; changes nothing.
    VerificationDone,
    VerificationError { message: Message },
    SelectLine { line: Option<u32> },
    SelectVc { selected: VcId },
    SetSourceAnnotations { enabled: bool },
    SelectAssertion { selected: Option<usize> },
    RemoveAssertion { index: usize },
    InputAssertion { source: String },
    /// `Err` carries the engine's rejection of the entered expression.
    AddAssertion { vc: Result<Tracked, String> },
    InputAssumption { source: String },
    UpdateAssumptions { error: Option<String> },
    InputWatch { source: String },
    AddWatch,
    RemoveWatch { index: usize },
    SelectFrame { frame: usize },
    RestartInterpreter,
    StepInto,
    StepOver,
    StepOut,
    /// The interpreter ran for `id` after a (re-)verification.
    InterpreterReady { id: VcId },
    RunStart,
    RunDone { message: String },
    UserStudyNext,
    UserStudyCloseModal,
}

impl BaseAction {
    pub fn kind(&self) -> &'static str {
        match self {
            BaseAction::SelectExample { .. } => "SELECT_EXAMPLE",
            BaseAction::ChangeSource { .. } => "CHANGE_SOURCE",
            BaseAction::Verify { .. } => "VERIFY",
            BaseAction::VerificationDone => "VERIFICATION_DONE",
            BaseAction::VerificationError { .. } => "VERIFICATION_ERROR",
            BaseAction::SelectLine { .. } => "SELECT_LINE",
            BaseAction::SelectVc { .. } => "SELECT_VC",
            BaseAction::SetSourceAnnotations { .. } => "SET_SOURCE_ANNOTATIONS",
            BaseAction::SelectAssertion { .. } => "SELECT_ASSERTION",
            BaseAction::RemoveAssertion { .. } => "REMOVE_ASSERTION",
            BaseAction::InputAssertion { .. } => "INPUT_ASSERTION",
            BaseAction::AddAssertion { .. } => "ADD_ASSERTION",
            BaseAction::InputAssumption { .. } => "INPUT_ASSUMPTION",
            BaseAction::UpdateAssumptions { .. } => "UPDATE_ASSUMPTIONS",
            BaseAction::InputWatch { .. } => "INPUT_WATCH",
            BaseAction::AddWatch => "ADD_WATCH",
            BaseAction::RemoveWatch { .. } => "REMOVE_WATCH",
            BaseAction::SelectFrame { .. } => "SELECT_FRAME",
            BaseAction::RestartInterpreter => "RESTART_INTERPRETER",
            BaseAction::StepInto => "STEP_INTO",
            BaseAction::StepOver => "STEP_OVER",
            BaseAction::StepOut => "STEP_OUT",
            BaseAction::InterpreterReady { .. } => "INTERPRETER_READY",
            BaseAction::RunStart => "RUN_START",
            BaseAction::RunDone { .. } => "RUN_DONE",
            BaseAction::UserStudyNext => "USER_STUDY_NEXT",
            BaseAction::UserStudyCloseModal => "USER_STUDY_CLOSE_MODAL",
        }
    }
}

/// The not-yet-resolved half of an asynchronous action.
pub type Deferred = Pin<Box<dyn Future<Output = Action> + Send + 'static>>;

/// An immediate transition plus the action produced once `end` resolves.
pub struct AsyncAction {
    pub start: BaseAction,
    pub end: Deferred,
}

impl std::fmt::Debug for AsyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncAction")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Action {
    Base(BaseAction),
    Async(AsyncAction),
}

impl Action {
    pub fn deferred(start: BaseAction, end: impl Future<Output = Action> + Send + 'static) -> Self {
        Action::Async(AsyncAction {
            start,
            end: Box::pin(end),
        })
    }
}

impl From<BaseAction> for Action {
    fn from(base: BaseAction) -> Self {
        Action::Base(base)
    }
}
