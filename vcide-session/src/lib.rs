#![forbid(unsafe_code)]

//! Client-side session controller for the interactive verification
//! environment: application state, the action vocabulary, a pure reducer,
//! and the asynchronous driver that feeds engine results back into it.

pub mod action;
pub mod annotations;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod ops;
pub mod reducer;
pub mod selectors;
pub mod sequencer;
pub mod state;

pub use action::{Action, AsyncAction, BaseAction, Deferred};
pub use annotations::{Annotation, AnnotationKind, annotations};
pub use catalog::{Catalog, Example, ExampleName};
pub use config::SessionConfig;
pub use driver::Driver;
pub use error::SessionError;
pub use ops::{Actions, RUN_SUCCESS, add_assertion, add_assumption, remove_assumption};
pub use reducer::reduce;
pub use selectors::{
    DebuggerView, available_verification_conditions, current_ivc, current_vc, current_vc_of, debugger_view,
    program_counter, verification_in_progress,
};
pub use sequencer::{verify_all, verify_and_interpret_all};
pub use state::{AppState, InteractiveVc, Tracked, UserStudy, UserStudyStep, VcId};
