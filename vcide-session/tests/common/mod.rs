#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vcide_engine::{
    AssertionScript, ObligationScript, Outcome, Script, ScriptedCondition, ScriptedEngine, TraceFrame, TraceStep,
    Value,
};
use vcide_session::{Action, Actions, AppState, BaseAction, Catalog, Driver, Tracked, verify_all};

/// Line 2 fails with a counterexample, line 3 holds.
pub const TWO_ASSERTS: &str = "let x = f(1);\nassert(x === 2);\nassert(x === 1);\n";

/// Three nested frames; the final step is the deepest.
pub fn nested_trace() -> Outcome {
    let main = TraceFrame::new("main", 1).bind("x", Value::num(1.0));
    let f = TraceFrame::new("f(n)", 5).bind("n", Value::num(1.0));
    let g = TraceFrame::new("g(m)", 9).bind("m", Value::num(2.0));
    Outcome::Unverified {
        trace: vec![
            TraceStep { frames: vec![main.clone()] },
            TraceStep { frames: vec![main.clone(), f.clone()] },
            TraceStep { frames: vec![main, f, g] },
        ],
    }
}

pub fn obligation(line: u32, outcome: Outcome, latency_ms: u64) -> ObligationScript {
    ObligationScript {
        line,
        outcome,
        latency_ms: Some(latency_ms),
        discharged_by: Vec::new(),
    }
}

pub fn assertion(expr: &str, outcome: Outcome) -> AssertionScript {
    AssertionScript {
        expr: expr.to_string(),
        outcome,
        discharged_by: Vec::new(),
    }
}

/// Failing line 2 (slow), holding line 3 (fast).
pub fn two_asserts_script() -> Script {
    Script {
        obligations: vec![obligation(2, nested_trace(), 30), obligation(3, Outcome::Verified, 5)],
        ..Script::default()
    }
}

pub fn actions(engine: Arc<ScriptedEngine>, verify_delay: Duration) -> Actions {
    Actions::new(engine, Arc::new(Catalog::builtin()), verify_delay)
}

pub fn session(source: &str) -> Driver {
    Driver::new(AppState {
        source_code: source.to_string(),
        ..AppState::default()
    })
}

/// Dispatches a VERIFY built from typed handles so tests can read the
/// interpreter counters afterwards.
pub fn verify_scripted(driver: &mut Driver, engine: &ScriptedEngine, source: &str) -> Vec<Arc<ScriptedCondition>> {
    let conds = engine.scripted_conditions(source).expect("source parses");
    let tracked: Vec<Tracked> = conds.iter().map(|c| Tracked::new(c.clone())).collect();
    let handles = tracked.iter().map(|t| t.handle.clone()).collect();
    driver.dispatch(Action::deferred(BaseAction::Verify { vcs: tracked }, verify_all(handles)));
    conds
}

/// Verifies `source` to completion and selects `line`.
pub async fn verified_and_selected(
    engine: &ScriptedEngine,
    source: &str,
    line: u32,
) -> (Driver, Vec<Arc<ScriptedCondition>>) {
    let mut driver = session(source);
    let conds = verify_scripted(&mut driver, engine, source);
    driver.settle().await;
    driver.dispatch(BaseAction::SelectLine { line: Some(line) });
    (driver, conds)
}
