use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 1-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    /// A location covering `len` columns of a single line.
    pub fn on_line(file: impl Into<String>, line: u32, column: u32, len: u32) -> Self {
        Self {
            file: file.into(),
            start: Position::new(line, column),
            end: Position::new(line, column + len),
        }
    }

    pub fn line(&self) -> u32 {
        self.start.line
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.column)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Verified,
    Unverified,
    Timeout,
    Unknown,
    Error,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Verified => "verified",
            MessageStatus::Unverified => "unverified",
            MessageStatus::Timeout => "timeout",
            MessageStatus::Unknown => "unknown",
            MessageStatus::Error => "error",
        }
    }
}

/// Verdict for one verification condition, or a top-level diagnostic when
/// the source could not be turned into conditions at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub status: MessageStatus,
    pub loc: SourceLocation,
    pub description: String,
    /// Error class for `MessageStatus::Error`, e.g. "SyntaxError".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Message {
    pub fn new(status: MessageStatus, loc: SourceLocation, description: impl Into<String>) -> Self {
        Self {
            status,
            loc,
            description: description.into(),
            kind: None,
        }
    }

    pub fn error(kind: impl Into<String>, loc: SourceLocation, description: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Error,
            loc,
            description: description.into(),
            kind: Some(kind.into()),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.kind) {
            (MessageStatus::Error, Some(kind)) => write!(f, "error: {} {}", kind, self.description),
            (status, _) => write!(f, "{}: {}", status.as_str(), self.description),
        }
    }
}

/// One entry of the counterexample interpreter's call stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub description: String,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    /// Value observed by the interpreter at this point of the trace.
    pub dynamic_value: Option<Value>,
    /// Value the solver model assigns, when it differs from the dynamic one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_value: Option<Value>,
}

pub type Scope = Vec<Binding>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchValue {
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
