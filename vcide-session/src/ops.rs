//! Turning user gestures into actions.
//!
//! Engine exceptions stop here: a rejected expression becomes the
//! error-carrying variant of its action, never a failure in the reducer.

use std::sync::Arc;
use std::time::Duration;

use vcide_engine::Engine;

use crate::action::{Action, BaseAction};
use crate::catalog::{Catalog, ExampleName};
use crate::error::SessionError;
use crate::sequencer::{verify_all, verify_and_interpret_all};
use crate::state::{InteractiveVc, Tracked};

pub const RUN_SUCCESS: &str = "code ran successfully";

#[derive(Clone)]
pub struct Actions {
    engine: Arc<dyn Engine>,
    catalog: Arc<Catalog>,
    verify_delay: Duration,
}

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actions")
            .field("examples", &self.catalog.len())
            .field("verify_delay", &self.verify_delay)
            .finish_non_exhaustive()
    }
}

impl Actions {
    pub fn new(engine: Arc<dyn Engine>, catalog: Arc<Catalog>, verify_delay: Duration) -> Self {
        Self {
            engine,
            catalog,
            verify_delay,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Loads the example now and verifies it after `verify_delay`, giving the
    /// loading indicator a chance to paint.
    pub fn select_example(&self, name: &ExampleName) -> Result<Action, SessionError> {
        let example = self.catalog.get(name)?;
        let start = BaseAction::SelectExample {
            selected: example.name.clone(),
            source: example.source.clone(),
        };
        let this = self.clone();
        let source = example.source.clone();
        Ok(Action::deferred(start, async move {
            tokio::time::sleep(this.verify_delay).await;
            this.verify(&source)
        }))
    }

    pub fn verify(&self, source: &str) -> Action {
        match self.engine.verification_conditions(source) {
            Ok(vcs) => {
                tracing::info!(count = vcs.len(), "verification started");
                let tracked: Vec<Tracked> = vcs.into_iter().map(Tracked::new).collect();
                let handles = tracked.iter().map(|t| t.handle.clone()).collect();
                Action::deferred(BaseAction::Verify { vcs: tracked }, verify_all(handles))
            }
            Err(message) => {
                tracing::info!(%message, "source rejected by engine");
                BaseAction::VerificationError { message }.into()
            }
        }
    }

    pub fn run_code(&self, source: &str) -> Action {
        let engine = Arc::clone(&self.engine);
        let source = source.to_string();
        Action::deferred(BaseAction::RunStart, async move {
            let message = match engine.run(&source).await {
                Ok(()) => RUN_SUCCESS.to_string(),
                Err(e) => e,
            };
            BaseAction::RunDone { message }.into()
        })
    }
}

pub fn add_assertion(ivc: &InteractiveVc) -> Action {
    match ivc.vc.handle.assert(&ivc.input_assertion) {
        Err(e) => BaseAction::AddAssertion { vc: Err(e.to_string()) }.into(),
        Ok(vc) => {
            let tracked = Tracked::new(vc);
            let id = tracked.id;
            let handle = tracked.handle.clone();
            Action::deferred(BaseAction::AddAssertion { vc: Ok(tracked) }, async move {
                handle.verify().await;
                if handle.has_model() {
                    if let Err(e) = handle.run_with_interpreter() {
                        tracing::warn!(vc = %id, error = %e, "interpreter failed for new assertion");
                    }
                }
                BaseAction::InterpreterReady { id }.into()
            })
        }
    }
}

/// Adds the entered assumption to every member of the family, then
/// re-verifies them all.
pub fn add_assumption(ivc: &InteractiveVc) -> Action {
    update_assumptions(ivc, |member| member.handle.add_assumption(&ivc.input_assumption))
}

pub fn remove_assumption(ivc: &InteractiveVc, index: usize) -> Action {
    update_assumptions(ivc, |member| member.handle.remove_assumption(index))
}

fn update_assumptions(
    ivc: &InteractiveVc,
    apply: impl Fn(&Tracked) -> Result<(), vcide_engine::EngineError>,
) -> Action {
    let family: Vec<Tracked> = ivc.family().cloned().collect();
    // The original condition validates first; siblings share its context.
    if let Err(e) = apply(&family[0]) {
        return BaseAction::UpdateAssumptions {
            error: Some(e.to_string()),
        }
        .into();
    }
    for member in &family[1..] {
        if let Err(e) = apply(member) {
            tracing::warn!(vc = %member.id, error = %e, "assumption change not propagated");
        }
    }
    Action::deferred(
        BaseAction::UpdateAssumptions { error: None },
        verify_and_interpret_all(family),
    )
}
