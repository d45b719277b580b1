use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use vcide_engine::{Message, VcRef};

use crate::catalog::{Example, ExampleName};

/// Session-local identity of a verification condition.
///
/// Assigned once when a condition enters the session; identity lookups never
/// compare handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VcId(u64);

static NEXT_VC_ID: AtomicU64 = AtomicU64::new(1);

impl VcId {
    pub fn fresh() -> Self {
        VcId(NEXT_VC_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for VcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vc#{}", self.0)
    }
}

/// An engine handle paired with its session identity.
#[derive(Clone, Debug)]
pub struct Tracked {
    pub id: VcId,
    pub handle: VcRef,
}

impl Tracked {
    pub fn new(handle: VcRef) -> Self {
        Self {
            id: VcId::fresh(),
            handle,
        }
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl From<VcRef> for Tracked {
    fn from(handle: VcRef) -> Self {
        Tracked::new(handle)
    }
}

/// One proof obligation plus everything the user explored around it.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractiveVc {
    pub vc: Tracked,
    /// Family members whose counterexample the interpreter has already
    /// replayed, by id.
    pub interpreted: BTreeSet<VcId>,
    /// User-entered assertions checked under the same assumptions as `vc`.
    pub other_assertions: Vec<Tracked>,
    /// Index into `other_assertions`; `None` selects `vc` itself.
    pub selected_assertion: Option<usize>,
    pub input_assertion: String,
    pub input_assertion_error: Option<String>,
    pub input_assumption: String,
    pub input_assumption_error: Option<String>,
    pub input_watch: String,
    pub input_watch_error: Option<String>,
    /// Call-stack index being inspected; `None` without a model.
    pub selected_frame: Option<usize>,
}

impl InteractiveVc {
    pub fn new(vc: Tracked) -> Self {
        Self {
            vc,
            interpreted: BTreeSet::new(),
            other_assertions: Vec::new(),
            selected_assertion: None,
            input_assertion: String::new(),
            input_assertion_error: None,
            input_assumption: String::new(),
            input_assumption_error: None,
            input_watch: String::new(),
            input_watch_error: None,
            selected_frame: None,
        }
    }

    /// The condition currently shown: the selected assertion or `vc`.
    pub fn current(&self) -> &Tracked {
        self.selected_assertion
            .and_then(|i| self.other_assertions.get(i))
            .unwrap_or(&self.vc)
    }

    /// `vc` followed by every user assertion; they share one assumption context.
    pub fn family(&self) -> impl Iterator<Item = &Tracked> {
        std::iter::once(&self.vc).chain(self.other_assertions.iter())
    }

    pub fn line(&self) -> u32 {
        self.vc.handle.location().line()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserStudyStep {
    Tutorial1,
    Tutorial2,
    Tutorial3,
    Tutorial4,
    Experiment1,
    Experiment2,
    Experiment3,
    Survey,
}

impl UserStudyStep {
    pub const ALL: [UserStudyStep; 8] = [
        UserStudyStep::Tutorial1,
        UserStudyStep::Tutorial2,
        UserStudyStep::Tutorial3,
        UserStudyStep::Tutorial4,
        UserStudyStep::Experiment1,
        UserStudyStep::Experiment2,
        UserStudyStep::Experiment3,
        UserStudyStep::Survey,
    ];

    /// The survey is terminal.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL.get(idx + 1).copied().unwrap_or(UserStudyStep::Survey)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStudy {
    pub step: UserStudyStep,
    pub show_modal: bool,
}

impl Default for UserStudy {
    fn default() -> Self {
        Self {
            step: UserStudyStep::Tutorial1,
            show_modal: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    pub selected: ExampleName,
    pub selected_line: Option<u32>,
    pub source_code: String,
    /// Top-level diagnostic; replaces the VC list in the annotation view.
    pub message: Option<Message>,
    /// One entry per proof obligation, in engine emission order.
    pub vcs: Vec<InteractiveVc>,
    /// Index into `vcs`.
    pub selected_vc: Option<usize>,
    pub show_source_annotations: bool,
    pub running: bool,
    pub run_message: Option<String>,
    pub user_study: UserStudy,
}

impl AppState {
    pub fn initial(example: &Example) -> Self {
        Self {
            selected: example.name.clone(),
            selected_line: None,
            source_code: example.source.clone(),
            message: None,
            vcs: Vec::new(),
            selected_vc: None,
            show_source_annotations: true,
            running: false,
            run_message: None,
            user_study: UserStudy::default(),
        }
    }
}
