//! Worker lifecycle state.
//!
//! A worker moves `parsed → installing → installed → activating → activated`
//! and becomes `redundant` once a newer worker replaces it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use swcache_core::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    fn next(&self) -> Option<WorkerState> {
        match self {
            WorkerState::Parsed => Some(WorkerState::Installing),
            WorkerState::Installing => Some(WorkerState::Installed),
            WorkerState::Installed => Some(WorkerState::Activating),
            WorkerState::Activating => Some(WorkerState::Activated),
            WorkerState::Activated | WorkerState::Redundant => None,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle flags of one worker.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self { state, skip_waiting: AtomicBool::new(false), clients_claimed: AtomicBool::new(false) }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Advance to `to`, which must be the next state in order.
    ///
    /// The check and the transition happen under one lock, so of two racing
    /// callers only one moves the worker.
    pub fn advance(&self, to: WorkerState) -> Result<(), Error> {
        let mut from = WorkerState::Parsed;
        let moved = self.state.send_if_modified(|state| {
            from = *state;
            if state.next() == Some(to) {
                *state = to;
                true
            } else {
                false
            }
        });
        if !moved {
            return Err(Error::InvalidState(format!("cannot move worker from {from} to {to}")));
        }
        tracing::debug!(%from, %to, "worker state changed");
        Ok(())
    }

    /// Mark the worker as superseded. Terminal.
    pub fn mark_redundant(&self) {
        self.state.send_replace(WorkerState::Redundant);
    }

    /// Ask to activate without waiting for open clients to close.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Take control of already-open clients.
    pub fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::SeqCst);
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), WorkerState::Parsed);
        for state in
            [WorkerState::Installing, WorkerState::Installed, WorkerState::Activating, WorkerState::Activated]
        {
            lifecycle.advance(state).unwrap();
            assert_eq!(lifecycle.state(), state);
        }
    }

    #[test]
    fn test_rejects_skipping_states() {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.advance(WorkerState::Activating);
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert_eq!(lifecycle.state(), WorkerState::Parsed);
    }

    #[test]
    fn test_concurrent_advance_moves_once() {
        let lifecycle = Lifecycle::new();

        let results: Vec<Result<(), Error>> = std::thread::scope(|scope| {
            let handles: Vec<_> =
                (0..8).map(|_| scope.spawn(|| lifecycle.advance(WorkerState::Installing))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(lifecycle.state(), WorkerState::Installing);
    }

    #[test]
    fn test_redundant_is_terminal() {
        let lifecycle = Lifecycle::new();
        lifecycle.mark_redundant();
        assert!(lifecycle.advance(WorkerState::Installing).is_err());
    }

    #[test]
    fn test_flags() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.skip_waiting_requested());
        assert!(!lifecycle.clients_claimed());
        lifecycle.skip_waiting();
        lifecycle.claim_clients();
        assert!(lifecycle.skip_waiting_requested());
        assert!(lifecycle.clients_claimed());
    }

    #[tokio::test]
    async fn test_subscribe_sees_changes() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.subscribe();
        lifecycle.advance(WorkerState::Installing).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), WorkerState::Installing);
    }
}
