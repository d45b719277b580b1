#![forbid(unsafe_code)]

pub mod condition;
pub mod scripted;
pub mod types;
pub mod value;

pub use condition::{Engine, EngineError, VcRef, VerificationCondition};
pub use scripted::{
    AssertionScript, EngineStats, ObligationScript, Outcome, Script, ScriptedCondition, ScriptedEngine,
    TraceFrame, TraceStep, validate_expression,
};
pub use types::{Binding, Frame, Message, MessageStatus, Position, Scope, SourceLocation, WatchValue};
pub use value::Value;
