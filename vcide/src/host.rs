//! Runs one session over the line protocol.

use std::io::Write;
use std::sync::{Arc, Mutex};

use miette::IntoDiagnostic;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use vcide_session::{
    Action, Actions, BaseAction, Driver, SessionError, add_assertion, add_assumption, current_ivc, remove_assumption,
};

use crate::protocol::{SessionCommand, SessionEvent};

/// Serialises events onto a shared writer, one `VCIDE_EVENT` line each.
pub struct EventSink<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for EventSink<W> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

impl<W: Write> EventSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    pub fn emit(&self, event: &SessionEvent) {
        let json = encode(event);
        let mut out = self.out.lock().expect("event sink poisoned");
        let _ = writeln!(out, "VCIDE_EVENT {json}");
        let _ = out.flush();
    }
}

/// JSON for one event line; `{}` when serialisation fails.
fn encode<T: serde::Serialize>(event: &T) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "event not serialisable; emitting an empty object");
        "{}".to_string()
    })
}

/// Emits a state snapshot after every reduction, including late completions.
pub fn attach<W: Write + Send + 'static>(driver: &mut Driver, sink: EventSink<W>) {
    driver.subscribe(move |action, state| sink.emit(&SessionEvent::state(action.kind(), state)));
}

/// Maps a command onto the action it stands for. `None` when the command
/// needs a selected condition and there is none.
pub fn command_action(
    driver: &Driver,
    actions: &Actions,
    cmd: SessionCommand,
) -> Result<Option<Action>, SessionError> {
    let state = driver.state();
    let base = match cmd {
        SessionCommand::SelectExample { name } => return actions.select_example(&name).map(Some),
        SessionCommand::Verify => return Ok(Some(actions.verify(&state.source_code))),
        SessionCommand::Run => return Ok(Some(actions.run_code(&state.source_code))),
        SessionCommand::AddAssertion => return Ok(current_ivc(state).map(add_assertion)),
        SessionCommand::AddAssumption => return Ok(current_ivc(state).map(add_assumption)),
        SessionCommand::RemoveAssumption { index } => {
            return Ok(current_ivc(state).map(|ivc| remove_assumption(ivc, index)));
        }
        SessionCommand::ChangeSource { source } => BaseAction::ChangeSource { new_source: source },
        SessionCommand::SelectLine { line } => BaseAction::SelectLine { line },
        SessionCommand::SelectVc { id } => BaseAction::SelectVc { selected: id },
        SessionCommand::SetSourceAnnotations { enabled } => BaseAction::SetSourceAnnotations { enabled },
        SessionCommand::SelectAssertion { index } => BaseAction::SelectAssertion { selected: index },
        SessionCommand::RemoveAssertion { index } => BaseAction::RemoveAssertion { index },
        SessionCommand::InputAssertion { source } => BaseAction::InputAssertion { source },
        SessionCommand::InputAssumption { source } => BaseAction::InputAssumption { source },
        SessionCommand::InputWatch { source } => BaseAction::InputWatch { source },
        SessionCommand::AddWatch => BaseAction::AddWatch,
        SessionCommand::RemoveWatch { index } => BaseAction::RemoveWatch { index },
        SessionCommand::SelectFrame { frame } => BaseAction::SelectFrame { frame },
        SessionCommand::Restart => BaseAction::RestartInterpreter,
        SessionCommand::StepInto => BaseAction::StepInto,
        SessionCommand::StepOver => BaseAction::StepOver,
        SessionCommand::StepOut => BaseAction::StepOut,
        SessionCommand::UserStudyNext => BaseAction::UserStudyNext,
        SessionCommand::UserStudyCloseModal => BaseAction::UserStudyCloseModal,
        SessionCommand::Quit => return Ok(None),
    };
    Ok(Some(base.into()))
}

/// Reads commands until `quit` or end of input, interleaving them with
/// completions of deferred work, then drains what is still pending.
pub async fn run_session<R, W>(
    mut driver: Driver,
    actions: &Actions,
    input: R,
    sink: &EventSink<W>,
) -> miette::Result<Driver>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.into_diagnostic()? else {
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let cmd = match serde_json::from_str::<SessionCommand>(trimmed) {
                    Ok(SessionCommand::Quit) => break,
                    Ok(cmd) => cmd,
                    Err(e) => {
                        tracing::warn!(error = %e, line = trimmed, "ignored invalid command");
                        continue;
                    }
                };
                match command_action(&driver, actions, cmd) {
                    Ok(Some(action)) => driver.dispatch(action),
                    Ok(None) => tracing::debug!("command ignored without a selected condition"),
                    Err(e) => {
                        tracing::warn!(error = %e, "command rejected");
                        sink.emit(&SessionEvent::Error { message: e.to_string() });
                    }
                }
            }
            _ = driver.next_completion(), if driver.pending() > 0 => {}
        }
    }
    tracing::debug!(pending = driver.pending(), "input closed; settling");
    driver.settle().await;
    Ok(driver)
}
