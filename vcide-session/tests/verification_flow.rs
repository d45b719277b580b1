use std::sync::{Arc, Mutex};
use std::time::Duration;

use vcide_engine::{MessageStatus, Outcome, Script, ScriptedEngine};
use vcide_session::{
    AnnotationKind, BaseAction, ExampleName, RUN_SUCCESS, SessionError, annotations, verification_in_progress,
};

mod common;
use common::{TWO_ASSERTS, actions, obligation, session, two_asserts_script, verify_scripted};

#[tokio::test(start_paused = true)]
async fn verdicts_arrive_one_at_a_time_in_order() {
    let engine = Arc::new(ScriptedEngine::from_script(two_asserts_script()));
    let mut driver = session(TWO_ASSERTS);
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&kinds);
    driver.subscribe(move |action, _| log.lock().expect("log poisoned").push(action.kind()));

    driver.dispatch(actions(engine.clone(), Duration::ZERO).verify(TWO_ASSERTS));
    let state = driver.state();
    assert_eq!(state.vcs.len(), 2);
    assert!(state.vcs.iter().all(|ivc| ivc.vc.handle.result().is_none()));
    assert!(verification_in_progress(state));
    assert!(annotations(state).iter().all(|a| a.text == "loading..."));

    // The slow first obligation lands before the fast second one is even asked.
    assert!(driver.next_completion().await);
    let state = driver.state();
    assert!(state.vcs[0].vc.handle.result().is_some());
    assert!(state.vcs[1].vc.handle.result().is_none());

    driver.settle().await;
    let state = driver.state();
    let lines: Vec<u32> = state.vcs.iter().map(|ivc| ivc.line()).collect();
    assert_eq!(lines, vec![2, 3]);
    let statuses: Vec<_> = state
        .vcs
        .iter()
        .map(|ivc| ivc.vc.handle.result().map(|m| m.status))
        .collect();
    assert_eq!(statuses, vec![Some(MessageStatus::Unverified), Some(MessageStatus::Verified)]);
    assert!(state.message.is_none());
    assert!(!verification_in_progress(state));
    assert_eq!(engine.stats().peak_in_flight(), 1);
    assert_eq!(engine.stats().verifications(), 2);

    let kinds = kinds.lock().expect("log poisoned");
    assert_eq!(*kinds, vec!["VERIFY", "VERIFICATION_DONE", "VERIFICATION_DONE"]);
}

#[tokio::test(start_paused = true)]
async fn selecting_vc_while_verification_is_running_keeps_going() {
    let engine = ScriptedEngine::from_script(two_asserts_script());
    let mut driver = session(TWO_ASSERTS);
    verify_scripted(&mut driver, &engine, TWO_ASSERTS);
    driver.dispatch(BaseAction::SelectLine { line: Some(3) });
    assert_eq!(driver.state().selected_vc, Some(1));

    driver.settle().await;
    assert_eq!(driver.state().selected_vc, Some(1));
    assert!(!verification_in_progress(driver.state()));
}

#[tokio::test]
async fn syntax_error_becomes_top_level_message() {
    let engine = Arc::new(ScriptedEngine::new());
    let mut driver = session("function f( {\n");
    driver.dispatch(actions(engine, Duration::ZERO).verify("function f( {\n"));

    let state = driver.state();
    assert_eq!(driver.pending(), 0);
    assert!(state.vcs.is_empty());
    let message = state.message.as_ref().expect("syntax error reported");
    assert_eq!(message.status, MessageStatus::Error);
    assert_eq!(message.kind.as_deref(), Some("SyntaxError"));

    let notes = annotations(state);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, AnnotationKind::Error);
}

#[tokio::test(start_paused = true)]
async fn selecting_example_verifies_after_the_delay() {
    let engine = Arc::new(ScriptedEngine::new());
    let actions = actions(engine, Duration::from_millis(300));
    let mut driver = session("");

    driver.dispatch(actions.select_example(&ExampleName::new("inc")).unwrap());
    let state = driver.state();
    assert_eq!(state.selected.as_str(), "inc");
    assert!(state.source_code.contains("assert(j === 4);"));
    assert!(state.vcs.is_empty());

    driver.settle().await;
    let state = driver.state();
    assert_eq!(state.vcs.len(), 1);
    let verdict = state.vcs[0].vc.handle.result().expect("verified");
    // no solver behind the default engine
    assert_eq!(verdict.status, MessageStatus::Unknown);
    assert_eq!(annotations(state)[0].kind, AnnotationKind::Error);
}

#[test]
fn unknown_example_is_reported() {
    let actions = actions(Arc::new(ScriptedEngine::new()), Duration::ZERO);
    let err = actions.select_example(&ExampleName::new("missing")).unwrap_err();
    assert!(matches!(err, SessionError::UnknownExample { .. }));
}

#[tokio::test(start_paused = true)]
async fn editing_source_makes_late_verdicts_harmless() {
    let engine = Arc::new(ScriptedEngine::from_script(two_asserts_script()));
    let mut driver = session(TWO_ASSERTS);
    driver.dispatch(actions(engine, Duration::ZERO).verify(TWO_ASSERTS));
    driver.dispatch(BaseAction::ChangeSource {
        new_source: "let y = 2;".to_string(),
    });

    driver.settle().await;
    let state = driver.state();
    assert!(state.vcs.is_empty());
    assert_eq!(state.selected_vc, None);
    assert!(state.message.is_none());
    assert_eq!(state.source_code, "let y = 2;");
}

#[tokio::test(start_paused = true)]
async fn running_code_reports_outcome() {
    let ok = Arc::new(ScriptedEngine::new());
    let mut driver = session(TWO_ASSERTS);
    driver.dispatch(actions(ok, Duration::ZERO).run_code(TWO_ASSERTS));
    assert!(driver.state().running);
    driver.settle().await;
    assert!(!driver.state().running);
    assert_eq!(driver.state().run_message.as_deref(), Some(RUN_SUCCESS));

    let failing = Arc::new(ScriptedEngine::from_script(Script {
        run_error: Some("ReferenceError: f is not defined".to_string()),
        latency_ms: 20,
        ..Script::default()
    }));
    driver.dispatch(actions(failing.clone(), Duration::ZERO).run_code(TWO_ASSERTS));
    assert_eq!(driver.state().run_message, None);
    driver.settle().await;
    assert_eq!(
        driver.state().run_message.as_deref(),
        Some("ReferenceError: f is not defined")
    );

    // An edit during the run discards its result.
    driver.dispatch(actions(failing, Duration::ZERO).run_code(TWO_ASSERTS));
    driver.dispatch(BaseAction::ChangeSource {
        new_source: "let z;".to_string(),
    });
    driver.settle().await;
    assert!(!driver.state().running);
    assert_eq!(driver.state().run_message, None);
}

#[tokio::test(start_paused = true)]
async fn staggered_latencies_never_reorder_the_list() {
    let source = "assert(a);\nassert(b);\nassert(c);\n";
    let script = Script {
        obligations: vec![
            obligation(1, Outcome::Verified, 50),
            obligation(2, Outcome::Verified, 5),
            obligation(3, Outcome::Timeout, 20),
        ],
        ..Script::default()
    };
    let engine = Arc::new(ScriptedEngine::from_script(script));
    let mut driver = session(source);
    let ids: Vec<_> = {
        driver.dispatch(actions(engine.clone(), Duration::ZERO).verify(source));
        driver.state().vcs.iter().map(|ivc| ivc.vc.id).collect()
    };

    let start = tokio::time::Instant::now();
    driver.settle().await;
    // one solver call at a time, so the latencies add up
    assert!(start.elapsed() >= Duration::from_millis(75));
    assert_eq!(engine.stats().peak_in_flight(), 1);

    let state = driver.state();
    let after: Vec<_> = state.vcs.iter().map(|ivc| ivc.vc.id).collect();
    assert_eq!(after, ids);
    let lines: Vec<u32> = state.vcs.iter().map(|ivc| ivc.line()).collect();
    assert_eq!(lines, vec![1, 2, 3]);
    assert_eq!(
        state.vcs[2].vc.handle.result().map(|m| m.status),
        Some(MessageStatus::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn late_assertion_result_after_reverify_is_ignored() {
    let engine = ScriptedEngine::from_script(two_asserts_script());
    let mut driver = session(TWO_ASSERTS);
    verify_scripted(&mut driver, &engine, TWO_ASSERTS);
    driver.settle().await;
    driver.dispatch(BaseAction::SelectLine { line: Some(2) });
    driver.dispatch(BaseAction::InputAssertion {
        source: "x > 5".to_string(),
    });
    let ivc = vcide_session::current_ivc(driver.state()).unwrap();
    let action = vcide_session::add_assertion(ivc);
    driver.dispatch(action);

    // A fresh verification replaces every entry before the assertion lands.
    verify_scripted(&mut driver, &engine, TWO_ASSERTS);
    driver.settle().await;
    let state = driver.state();
    assert_eq!(state.vcs.len(), 2);
    assert!(state.vcs.iter().all(|ivc| ivc.other_assertions.is_empty()));
    assert_eq!(state.selected_vc, None);
    assert!(!verification_in_progress(state));
}
