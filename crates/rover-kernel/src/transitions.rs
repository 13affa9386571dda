//! [`StateMachine`] – legal transitions between [`NavigationState`]s.
//!
//! The supervisor owns one machine and moves it through
//! `Scanning → {Moving | Turning | EmergencyStopped} → Scanning` every cycle.
//! `BatteryCritical` only leads to `ShuttingDown`, and `ShuttingDown` is
//! terminal. Any other move is refused.

use std::collections::VecDeque;

use rover_types::NavigationState;
use thiserror::Error;
use tracing::{error, info};

/// Number of past states kept for diagnostics.
pub const HISTORY_LEN: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal navigation transition {from} -> {to}")]
pub struct TransitionRefused {
    pub from: NavigationState,
    pub to: NavigationState,
}

/// `true` if `from → to` is a legal move. Self-transitions are not.
pub fn is_allowed(from: NavigationState, to: NavigationState) -> bool {
    use NavigationState::*;
    match (from, to) {
        (ShuttingDown, _) => false,
        (_, ShuttingDown) => true,
        (BatteryCritical, _) => false,
        (Scanning, EmergencyStopped | Moving | Turning | BatteryCritical) => true,
        (EmergencyStopped | Moving | Turning, Scanning) => true,
        _ => false,
    }
}

/// Current navigation state plus a bounded history of where it has been.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: NavigationState,
    history: VecDeque<NavigationState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        let mut history = VecDeque::with_capacity(HISTORY_LEN);
        history.push_back(NavigationState::Scanning);
        Self {
            state: NavigationState::Scanning,
            history,
        }
    }
}

impl StateMachine {
    /// A machine in the initial `Scanning` state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// States visited so far, oldest first, including the current one.
    pub fn history(&self) -> impl Iterator<Item = NavigationState> + '_ {
        self.history.iter().copied()
    }

    /// Move to `to`, logging the transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionRefused`] and leaves the state unchanged when the
    /// move is not in the transition table.
    pub fn transition(&mut self, to: NavigationState) -> Result<(), TransitionRefused> {
        let from = self.state;
        if !is_allowed(from, to) {
            error!(%from, %to, "refused illegal navigation transition");
            return Err(TransitionRefused { from, to });
        }
        info!(%from, %to, "navigation state transition");
        self.state = to;
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(to);
        Ok(())
    }
}
