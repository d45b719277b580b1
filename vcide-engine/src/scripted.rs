// Deterministic in-process engine.
//
// Obligations are found by scanning the source for `assert(`, `ensures(` and
// `invariant(` markers; their verdicts and counterexample traces come from a
// `Script` (usually a TOML file). Without a script every obligation resolves
// to `unknown`, the same way a build without a solver backend behaves.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::condition::{Engine, EngineError, VcRef, VerificationCondition};
use crate::types::{Binding, Frame, Message, MessageStatus, Scope, SourceLocation, WatchValue};
use crate::value::Value;

const MARKERS: [&str; 3] = ["assert", "ensures", "invariant"];

fn default_file() -> String {
    "main.js".to_string()
}

fn default_outcome() -> Outcome {
    Outcome::Verified
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Script {
    #[serde(default = "default_file")]
    pub file: String,

    /// Simulated solver round trip per verification.
    #[serde(default)]
    pub latency_ms: u64,

    /// Outcome for obligations without an entry in `obligations`.
    #[serde(default = "default_outcome")]
    pub default_outcome: Outcome,

    #[serde(default)]
    pub obligations: Vec<ObligationScript>,

    /// Outcomes for user-entered assertions, matched on the trimmed expression.
    #[serde(default)]
    pub assertions: Vec<AssertionScript>,

    /// When set, running the program fails with this message.
    #[serde(default)]
    pub run_error: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            file: default_file(),
            latency_ms: 0,
            default_outcome: default_outcome(),
            obligations: Vec::new(),
            assertions: Vec::new(),
            run_error: None,
        }
    }
}

impl Script {
    pub fn from_toml(text: &str) -> Result<Self, miette::Report> {
        toml::from_str(text).map_err(|e| miette::Report::msg(format!("invalid script: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, miette::Report> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| miette::Report::msg(format!("failed to read script {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObligationScript {
    pub line: u32,
    pub outcome: Outcome,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    /// Assumptions that make this obligation hold once added.
    #[serde(default)]
    pub discharged_by: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssertionScript {
    pub expr: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub discharged_by: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Verified,
    Timeout,
    Unknown,
    Unverified {
        #[serde(default)]
        trace: Vec<TraceStep>,
    },
}

/// Interpreter state at one point of a counterexample run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Outermost first.
    pub frames: Vec<TraceFrame>,
}

impl TraceStep {
    fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub description: String,
    pub line: u32,
    #[serde(default)]
    pub bindings: BTreeMap<String, Value>,
    /// Values assigned by the solver model, shown beside dynamic values.
    #[serde(default)]
    pub model: BTreeMap<String, Value>,
}

impl TraceFrame {
    pub fn new(description: impl Into<String>, line: u32) -> Self {
        Self {
            description: description.into(),
            line,
            ..Default::default()
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }
}

/// Counters shared by every condition of one engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    verifications: AtomicUsize,
}

impl EngineStats {
    fn begin(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        self.verifications.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ScriptedEngine {
    script: Script,
    stats: Arc<EngineStats>,
    unscripted: bool,
}

impl ScriptedEngine {
    /// Engine with no solver behind it: every obligation is `unknown`.
    pub fn new() -> Self {
        Self {
            script: Script {
                default_outcome: Outcome::Unknown,
                ..Script::default()
            },
            stats: Arc::new(EngineStats::default()),
            unscripted: true,
        }
    }

    pub fn from_script(script: Script) -> Self {
        Self {
            script,
            stats: Arc::new(EngineStats::default()),
            unscripted: false,
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    fn obligation(&self, line: u32) -> Option<&ObligationScript> {
        self.script.obligations.iter().find(|o| o.line == line)
    }

    /// Typed handles, for callers that want to observe interpreter counters.
    pub fn scripted_conditions(&self, source: &str) -> Result<Vec<Arc<ScriptedCondition>>, Message> {
        check_delimiters(source).map_err(|(line, column, what)| {
            Message::error(
                "SyntaxError",
                SourceLocation::on_line(&self.script.file, line, column, 1),
                what,
            )
        })?;

        let assertions = Arc::new(self.script.assertions.clone());
        let mut out = Vec::new();
        for found in scan_obligations(source) {
            let (outcome, latency, discharged_by) = match self.obligation(found.line) {
                Some(o) => (
                    o.outcome.clone(),
                    o.latency_ms.unwrap_or(self.script.latency_ms),
                    o.discharged_by.clone(),
                ),
                None => (self.script.default_outcome.clone(), self.script.latency_ms, Vec::new()),
            };
            let location = SourceLocation::on_line(
                &self.script.file,
                found.line,
                found.column,
                found.len,
            );
            let cond = ScriptedCondition::new(location, format!("{}: {}", found.marker, found.expr), outcome)
                .with_latency(Duration::from_millis(latency))
                .with_discharged_by(discharged_by)
                .with_assertions(Arc::clone(&assertions))
                .with_stats(Arc::clone(&self.stats));
            out.push(Arc::new(cond));
        }
        tracing::debug!(count = out.len(), unscripted = self.unscripted, "extracted verification conditions");
        Ok(out)
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn verification_conditions(&self, source: &str) -> Result<Vec<VcRef>, Message> {
        Ok(self
            .scripted_conditions(source)?
            .into_iter()
            .map(|c| c as VcRef)
            .collect())
    }

    async fn run(&self, source: &str) -> Result<(), String> {
        if let Err((line, column, what)) = check_delimiters(source) {
            return Err(format!("SyntaxError: {what} ({line}:{column})"));
        }
        if self.script.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.script.latency_ms)).await;
        }
        match &self.script.run_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct ConditionState {
    result: Option<Message>,
    assumptions: Vec<String>,
    watches: Vec<String>,
    interpreted: bool,
    cursor: usize,
    interpreter_runs: usize,
    verify_calls: usize,
}

#[derive(Debug)]
pub struct ScriptedCondition {
    location: SourceLocation,
    description: String,
    outcome: Outcome,
    discharged_by: Vec<String>,
    latency: Duration,
    assertions: Arc<Vec<AssertionScript>>,
    stats: Arc<EngineStats>,
    state: Mutex<ConditionState>,
}

impl ScriptedCondition {
    pub fn new(location: SourceLocation, description: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            location,
            description: description.into(),
            outcome,
            discharged_by: Vec::new(),
            latency: Duration::ZERO,
            assertions: Arc::new(Vec::new()),
            stats: Arc::new(EngineStats::default()),
            state: Mutex::new(ConditionState::default()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_discharged_by(mut self, assumptions: Vec<String>) -> Self {
        self.discharged_by = assumptions;
        self
    }

    pub fn with_assertions(mut self, assertions: Arc<Vec<AssertionScript>>) -> Self {
        self.assertions = assertions;
        self
    }

    pub fn with_stats(mut self, stats: Arc<EngineStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn interpreter_runs(&self) -> usize {
        self.lock().interpreter_runs
    }

    pub fn verify_calls(&self) -> usize {
        self.lock().verify_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConditionState> {
        self.state.lock().expect("scripted condition state poisoned")
    }

    fn trace(&self) -> &[TraceStep] {
        match &self.outcome {
            Outcome::Unverified { trace } => trace,
            _ => &[],
        }
    }

    fn discharged(&self, st: &ConditionState) -> bool {
        self.discharged_by
            .iter()
            .any(|d| st.assumptions.iter().any(|a| a.trim() == d.trim()))
    }

    fn verdict(&self, st: &ConditionState) -> Message {
        let loc = self.location.clone();
        if self.discharged(st) {
            return Message::new(MessageStatus::Verified, loc, self.description.clone());
        }
        match &self.outcome {
            Outcome::Verified => Message::new(MessageStatus::Verified, loc, self.description.clone()),
            Outcome::Timeout => Message::new(MessageStatus::Timeout, loc, self.description.clone()),
            Outcome::Unknown => Message::new(
                MessageStatus::Unknown,
                loc,
                format!("{} (no solver configured)", self.description),
            ),
            Outcome::Unverified { .. } => {
                Message::new(MessageStatus::Unverified, loc, self.description.clone())
            }
        }
    }

    fn model_present(&self, st: &ConditionState) -> bool {
        matches!(&st.result, Some(m) if m.status == MessageStatus::Unverified) && !self.trace().is_empty()
    }

    fn current_step<'a>(&'a self, st: &ConditionState) -> Option<&'a TraceStep> {
        if st.interpreted && self.model_present(st) {
            self.trace().get(st.cursor)
        } else {
            None
        }
    }

    fn step_with(&self, pick: impl Fn(usize, &TraceStep) -> bool) -> Result<(), EngineError> {
        let mut st = self.lock();
        if !self.model_present(&st) {
            return Err(EngineError::NoModel);
        }
        let trace = self.trace();
        let last = trace.len() - 1;
        let from = st.cursor.min(last);
        let depth = trace[from].depth();
        st.interpreted = true;
        st.cursor = (from + 1..trace.len())
            .find(|&i| pick(depth, &trace[i]))
            .unwrap_or(last);
        Ok(())
    }

    fn invalidate(st: &mut ConditionState) {
        st.result = None;
        st.interpreted = false;
        st.cursor = 0;
    }
}

#[async_trait]
impl VerificationCondition for ScriptedCondition {
    fn location(&self) -> SourceLocation {
        self.location.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn result(&self) -> Option<Message> {
        self.lock().result.clone()
    }

    async fn verify(&self) -> Message {
        self.stats.begin();
        {
            let mut st = self.lock();
            st.verify_calls += 1;
            Self::invalidate(&mut st);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut st = self.lock();
        let msg = self.verdict(&st);
        st.result = Some(msg.clone());
        self.stats.end();
        msg
    }

    fn has_model(&self) -> bool {
        self.model_present(&self.lock())
    }

    fn run_with_interpreter(&self) -> Result<(), EngineError> {
        let mut st = self.lock();
        if !self.model_present(&st) {
            return Err(EngineError::NoModel);
        }
        st.interpreted = true;
        st.cursor = self.trace().len() - 1;
        st.interpreter_runs += 1;
        Ok(())
    }

    fn callstack(&self) -> Vec<Frame> {
        let st = self.lock();
        let Some(step) = self.current_step(&st) else {
            return Vec::new();
        };
        step.frames
            .iter()
            .map(|f| Frame {
                description: f.description.clone(),
                location: SourceLocation::on_line(&self.location.file, f.line, 0, 0),
            })
            .collect()
    }

    fn scopes(&self, frame: usize) -> Vec<Scope> {
        let st = self.lock();
        let Some(f) = self.current_step(&st).and_then(|s| s.frames.get(frame)) else {
            return Vec::new();
        };
        let scope: Scope = f
            .bindings
            .iter()
            .map(|(name, v)| Binding {
                name: name.clone(),
                dynamic_value: Some(v.clone()),
                static_value: f.model.get(name).cloned(),
            })
            .collect();
        vec![scope]
    }

    fn watches(&self) -> Vec<WatchValue> {
        let st = self.lock();
        let innermost = self.current_step(&st).and_then(|s| s.frames.last());
        st.watches
            .iter()
            .map(|expr| {
                let key = expr.trim();
                match innermost {
                    None => WatchValue {
                        expr: expr.clone(),
                        value: None,
                        error: Some("no active frame".to_string()),
                    },
                    Some(f) => match f.bindings.get(key) {
                        Some(v) => WatchValue {
                            expr: expr.clone(),
                            value: Some(v.clone()),
                            error: None,
                        },
                        None => WatchValue {
                            expr: expr.clone(),
                            value: None,
                            error: Some(format!("{key} is not defined")),
                        },
                    },
                }
            })
            .collect()
    }

    fn add_watch(&self, expr: &str) -> Result<(), EngineError> {
        validate_expression(expr)?;
        self.lock().watches.push(expr.trim().to_string());
        Ok(())
    }

    fn remove_watch(&self, index: usize) -> Result<(), EngineError> {
        let mut st = self.lock();
        if index >= st.watches.len() {
            return Err(EngineError::IndexOutOfRange { index, len: st.watches.len() });
        }
        st.watches.remove(index);
        Ok(())
    }

    fn assumptions(&self) -> Vec<String> {
        self.lock().assumptions.clone()
    }

    fn add_assumption(&self, expr: &str) -> Result<(), EngineError> {
        validate_expression(expr)?;
        let mut st = self.lock();
        st.assumptions.push(expr.trim().to_string());
        Self::invalidate(&mut st);
        Ok(())
    }

    fn remove_assumption(&self, index: usize) -> Result<(), EngineError> {
        let mut st = self.lock();
        if index >= st.assumptions.len() {
            return Err(EngineError::IndexOutOfRange { index, len: st.assumptions.len() });
        }
        st.assumptions.remove(index);
        Self::invalidate(&mut st);
        Ok(())
    }

    fn assert(&self, expr: &str) -> Result<VcRef, EngineError> {
        validate_expression(expr)?;
        let expr = expr.trim();
        let (outcome, discharged_by) = match self.assertions.iter().find(|a| a.expr.trim() == expr) {
            Some(a) => (a.outcome.clone(), a.discharged_by.clone()),
            None => (Outcome::Verified, Vec::new()),
        };
        let st = self.lock();
        let sibling = ScriptedCondition::new(self.location.clone(), format!("assert: {expr}"), outcome)
            .with_latency(self.latency)
            .with_discharged_by(discharged_by)
            .with_assertions(Arc::clone(&self.assertions))
            .with_stats(Arc::clone(&self.stats));
        {
            let mut sib = sibling.lock();
            sib.assumptions = st.assumptions.clone();
            sib.watches = st.watches.clone();
        }
        Ok(Arc::new(sibling))
    }

    fn restart(&self) -> Result<(), EngineError> {
        let mut st = self.lock();
        if !self.model_present(&st) {
            return Err(EngineError::NoModel);
        }
        st.interpreted = true;
        st.cursor = 0;
        Ok(())
    }

    fn step_into(&self) -> Result<(), EngineError> {
        self.step_with(|_, _| true)
    }

    fn step_over(&self) -> Result<(), EngineError> {
        self.step_with(|depth, s| s.depth() <= depth)
    }

    fn step_out(&self) -> Result<(), EngineError> {
        self.step_with(|depth, s| s.depth() < depth)
    }
}

/// Rejects empty expressions and unbalanced delimiters.
pub fn validate_expression(expr: &str) -> Result<(), EngineError> {
    if expr.trim().is_empty() {
        return Err(EngineError::InvalidExpression {
            expr: expr.to_string(),
            reason: "expression is empty".to_string(),
        });
    }
    check_delimiters(expr).map_err(|(_, _, reason)| EngineError::InvalidExpression {
        expr: expr.to_string(),
        reason,
    })
}

/// Returns `(line, column, description)` of the first delimiter error.
fn check_delimiters(source: &str) -> Result<(), (u32, u32, String)> {
    let mut stack: Vec<(char, u32, u32)> = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let mut quote: Option<char> = None;
        let mut chars = line.char_indices().peekable();
        while let Some((col, c)) = chars.next() {
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '/' if matches!(chars.peek(), Some((_, '/'))) => break,
                '"' | '\'' | '`' => quote = Some(c),
                '(' | '[' | '{' => stack.push((c, line_no, col as u32)),
                ')' | ']' | '}' => {
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((o, _, _)) if o == open => {}
                        _ => return Err((line_no, col as u32, format!("unexpected `{c}`"))),
                    }
                }
                _ => {}
            }
        }
    }
    match stack.pop() {
        Some((c, line, col)) => Err((line, col, format!("unclosed `{c}`"))),
        None => Ok(()),
    }
}

struct FoundObligation {
    marker: &'static str,
    expr: String,
    line: u32,
    column: u32,
    len: u32,
}

fn scan_obligations(source: &str) -> Vec<FoundObligation> {
    let mut out = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let code = line.split("//").next().unwrap_or("");
        let mut hits: Vec<(usize, &'static str)> = Vec::new();
        for marker in MARKERS {
            let pat = format!("{marker}(");
            let mut from = 0;
            while let Some(rel) = code[from..].find(&pat) {
                let at = from + rel;
                let preceded_by_ident = code[..at]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.');
                if !preceded_by_ident {
                    hits.push((at, marker));
                }
                from = at + pat.len();
            }
        }
        hits.sort_by_key(|(at, _)| *at);
        for (at, marker) in hits {
            let open = at + marker.len();
            let expr = balanced_argument(&code[open..]).unwrap_or_else(|| code[open + 1..].trim().to_string());
            out.push(FoundObligation {
                marker,
                len: (marker.len() + expr.len() + 2) as u32,
                expr,
                line: idx as u32 + 1,
                column: at as u32,
            });
        }
    }
    out
}

/// Contents of the parenthesised group starting at `s[0] == '('`.
fn balanced_argument(s: &str) -> Option<String> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[1..i].trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}
