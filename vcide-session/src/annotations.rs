// Gutter annotations for the editor.
//
// A top-level message hides every per-VC annotation; otherwise each
// obligation contributes one entry, pending ones rendered as "loading...".

use serde::Serialize;
use vcide_engine::{Message, MessageStatus, SourceLocation};

use crate::state::{AppState, InteractiveVc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Info,
    Warning,
    Error,
}

impl From<MessageStatus> for AnnotationKind {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Verified => AnnotationKind::Info,
            MessageStatus::Unverified | MessageStatus::Timeout => AnnotationKind::Warning,
            MessageStatus::Unknown | MessageStatus::Error => AnnotationKind::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// 0-based editor row.
    pub row: u32,
    pub column: u32,
    pub text: String,
    pub kind: AnnotationKind,
}

fn at(loc: &SourceLocation, text: String, kind: AnnotationKind) -> Annotation {
    Annotation {
        row: loc.start.line.saturating_sub(1),
        column: loc.start.column,
        text,
        kind,
    }
}

pub fn message_annotation(msg: &Message) -> Annotation {
    at(&msg.loc, msg.to_string(), msg.status.into())
}

fn vc_annotation(ivc: &InteractiveVc) -> Annotation {
    match ivc.vc.handle.result() {
        Some(msg) => message_annotation(&msg),
        None => at(
            &ivc.vc.handle.location(),
            "loading...".to_string(),
            AnnotationKind::Warning,
        ),
    }
}

pub fn annotations(state: &AppState) -> Vec<Annotation> {
    match &state.message {
        Some(msg) => vec![message_annotation(msg)],
        None => state.vcs.iter().map(vc_annotation).collect(),
    }
}
