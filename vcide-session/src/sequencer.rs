//! One-at-a-time verification.
//!
//! Each step awaits a single solver round trip and then hands the remainder
//! back to the driver as a fresh asynchronous action, so the reducer (and the
//! renderer) observe every verdict as it lands.

use vcide_engine::{MessageStatus, VcRef};

use crate::action::{Action, BaseAction, Deferred};
use crate::state::Tracked;

pub fn verify_all(vcs: Vec<VcRef>) -> Deferred {
    Box::pin(async move {
        let mut queue = vcs.into_iter();
        let Some(vc) = queue.next() else {
            return BaseAction::VerificationDone.into();
        };
        let verdict = vc.verify().await;
        log_verdict(&vc, verdict.status);

        let rest: Vec<VcRef> = queue.collect();
        if rest.is_empty() {
            BaseAction::VerificationDone.into()
        } else {
            Action::deferred(BaseAction::VerificationDone, verify_all(rest))
        }
    })
}

/// Like [`verify_all`], additionally replaying every counterexample through
/// the interpreter. Each step reports `InterpreterReady` for its condition.
pub fn verify_and_interpret_all(vcs: Vec<Tracked>) -> Deferred {
    Box::pin(async move {
        let mut queue = vcs.into_iter();
        let Some(tracked) = queue.next() else {
            return BaseAction::VerificationDone.into();
        };
        let verdict = tracked.handle.verify().await;
        log_verdict(&tracked.handle, verdict.status);
        if tracked.handle.has_model() {
            if let Err(e) = tracked.handle.run_with_interpreter() {
                tracing::warn!(vc = %tracked.id, error = %e, "interpreter failed after verification");
            }
        }

        let ready = BaseAction::InterpreterReady { id: tracked.id };
        let rest: Vec<Tracked> = queue.collect();
        if rest.is_empty() {
            ready.into()
        } else {
            Action::deferred(ready, verify_and_interpret_all(rest))
        }
    })
}

fn log_verdict(vc: &VcRef, status: MessageStatus) {
    tracing::info!(
        location = %vc.location(),
        status = status.as_str(),
        "verified {}",
        vc.description()
    );
}
