#![allow(unused_assignments)]

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::types::{Frame, Message, Scope, SourceLocation, WatchValue};

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid expression `{expr}`: {reason}")]
    #[diagnostic(code(vcide::engine::expr))]
    InvalidExpression { expr: String, reason: String },

    #[error("no counterexample model available")]
    #[diagnostic(code(vcide::engine::model))]
    NoModel,

    #[error("index {index} out of range (len {len})")]
    #[diagnostic(code(vcide::engine::index))]
    IndexOutOfRange { index: usize, len: usize },

    #[error("solver error: {0}")]
    #[diagnostic(code(vcide::engine::solver))]
    Solver(String),
}

/// One proof obligation owned by the verification engine.
///
/// Handles are shared: the engine mutates them in place (verification
/// results, assumptions, watches, interpreter position), so every method takes
/// `&self` and implementations are expected to synchronise internally.
#[async_trait]
pub trait VerificationCondition: Send + Sync {
    fn location(&self) -> SourceLocation;
    fn description(&self) -> String;

    /// `None` while the condition has not been verified yet.
    fn result(&self) -> Option<Message>;

    /// Runs (or re-runs) the solver; the verdict is also retained for `result`.
    async fn verify(&self) -> Message;

    fn has_model(&self) -> bool;

    /// Replays the counterexample through the interpreter, populating the
    /// call stack. Requires a model.
    fn run_with_interpreter(&self) -> Result<(), EngineError>;

    fn callstack(&self) -> Vec<Frame>;
    fn scopes(&self, frame: usize) -> Vec<Scope>;

    fn watches(&self) -> Vec<WatchValue>;
    fn add_watch(&self, expr: &str) -> Result<(), EngineError>;
    fn remove_watch(&self, index: usize) -> Result<(), EngineError>;

    fn assumptions(&self) -> Vec<String>;
    fn add_assumption(&self, expr: &str) -> Result<(), EngineError>;
    fn remove_assumption(&self, index: usize) -> Result<(), EngineError>;

    /// A sibling condition proving `expr` under this condition's assumptions.
    fn assert(&self, expr: &str) -> Result<VcRef, EngineError>;

    fn restart(&self) -> Result<(), EngineError>;
    fn step_into(&self) -> Result<(), EngineError>;
    fn step_over(&self) -> Result<(), EngineError>;
    fn step_out(&self) -> Result<(), EngineError>;
}

pub type VcRef = Arc<dyn VerificationCondition>;

impl std::fmt::Debug for dyn VerificationCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationCondition({} @ {})", self.description(), self.location())
    }
}

/// Source-level entry point of the verification engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Extracts the proof obligations of `source` in emission order, or a
    /// single diagnostic when the source cannot be processed.
    fn verification_conditions(&self, source: &str) -> Result<Vec<VcRef>, Message>;

    /// Executes `source` (the run button of the execution demo).
    async fn run(&self, source: &str) -> Result<(), String>;
}
