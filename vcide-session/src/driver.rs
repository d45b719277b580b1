//! The dispatch loop.
//!
//! Plain actions are reduced immediately. An asynchronous action has its
//! `start` reduced right away while its `end` runs on the tokio runtime; the
//! resolved action comes back through a channel and is dispatched in turn,
//! recursively, so long-running work never blocks the state.

use tokio::sync::mpsc;

use crate::action::{Action, AsyncAction, BaseAction};
use crate::reducer::reduce;
use crate::state::AppState;

type Listener = Box<dyn FnMut(&BaseAction, &AppState) + Send>;

pub struct Driver {
    state: AppState,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Action>,
    pending: usize,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Driver {
    pub fn new(state: AppState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state,
            tx,
            rx,
            pending: 0,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Deferred halves spawned but not yet reduced.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Called after every reduction with the action just applied and the new state.
    pub fn subscribe(&mut self, listener: impl FnMut(&BaseAction, &AppState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Must be called from within a tokio runtime when `action` is asynchronous.
    pub fn dispatch(&mut self, action: impl Into<Action>) {
        match action.into() {
            Action::Base(base) => self.apply(base),
            Action::Async(AsyncAction { start, end }) => {
                self.apply(start);
                self.pending += 1;
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let resolved = end.await;
                    if tx.send(resolved).is_err() {
                        tracing::warn!("session closed before deferred action resolved");
                    }
                });
            }
        }
    }

    fn apply(&mut self, action: BaseAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action.clone());
        for listener in &mut self.listeners {
            listener(&action, &self.state);
        }
    }

    /// Waits for the next deferred half to resolve and dispatches it.
    ///
    /// Returns `false` immediately when nothing is pending. Cancel-safe, so it
    /// can sit in a `tokio::select!` next to other event sources.
    pub async fn next_completion(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(action) => {
                self.pending -= 1;
                self.dispatch(action);
                true
            }
            None => false,
        }
    }

    /// Drives deferred work until none is left.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }
}
