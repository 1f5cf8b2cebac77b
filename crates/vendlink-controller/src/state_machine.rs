//! Transaction phase machine.
//!
//! This module tracks where the controller is in its fixed cycle and rejects
//! any move the cycle does not allow.
//!
//! # Phases
//!
//! - `Init`: bootstrap and post-cycle reset
//! - `WaitingForCard`: polling the peripheral for a command frame
//! - `CardDetected`: a transaction has been decoded
//! - `Validating`: the balance check is in progress
//! - `ValidatingWait`: authorized, waiting for dispensing to start
//! - `Dispensing`: waiting for the completion code
//!
//! # Valid Transitions
//!
//! - Init → WaitingForCard → CardDetected → Validating
//! - Validating → ValidatingWait → Dispensing → Init
//! - Validating → Init (denied)
//! - CardDetected → Init (unknown command)
//! - ValidatingWait → Init, Dispensing → Init (watchdog expired)
//!
//! There is no terminal phase. `Init` is both where the machine starts and
//! where every cycle ends.
//!
//! # Examples
//!
//! ```
//! use vendlink_controller::{Phase, PhaseMachine};
//!
//! let mut machine = PhaseMachine::new();
//! assert_eq!(machine.current_phase(), Phase::Init);
//!
//! machine.transition_to(Phase::WaitingForCard).unwrap();
//! assert!(machine.transition_to(Phase::Dispensing).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use vendlink_core::{Error, Result};

/// Maximum number of transitions kept in history.
///
/// A full cycle is six transitions, so this covers the last sixteen or so
/// transactions.
const MAX_HISTORY_SIZE: usize = 100;

/// Position of the controller in its transaction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Bootstrap and reset point; renders the waiting prompt.
    Init,

    /// Polling the peripheral for a card command.
    WaitingForCard,

    /// A transaction was decoded and is about to be checked.
    CardDetected,

    /// Waiting on the balance service.
    Validating,

    /// Authorized; waiting for the peripheral to start dispensing.
    ValidatingWait,

    /// Dispensing; waiting for the completion code.
    Dispensing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "Init",
            Phase::WaitingForCard => "WaitingForCard",
            Phase::CardDetected => "CardDetected",
            Phase::Validating => "Validating",
            Phase::ValidatingWait => "ValidatingWait",
            Phase::Dispensing => "Dispensing",
        };
        f.write_str(name)
    }
}

impl Phase {
    /// Check if the cycle allows moving from this phase to `target`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vendlink_controller::Phase;
    ///
    /// assert!(Phase::Validating.can_transition_to(Phase::Init));
    /// assert!(!Phase::WaitingForCard.can_transition_to(Phase::Validating));
    /// ```
    pub fn can_transition_to(self, target: Phase) -> bool {
        matches!(
            (self, target),
            (Phase::Init, Phase::WaitingForCard)
                | (Phase::WaitingForCard, Phase::CardDetected)
                | (Phase::CardDetected, Phase::Validating | Phase::Init)
                | (Phase::Validating, Phase::ValidatingWait | Phase::Init)
                | (Phase::ValidatingWait, Phase::Dispensing | Phase::Init)
                | (Phase::Dispensing, Phase::Init)
        )
    }

    /// Whether the phase waits on the peripheral with no built-in bound.
    ///
    /// Only these phases are subject to the optional watchdog.
    pub fn is_guarded(self) -> bool {
        matches!(self, Phase::ValidatingWait | Phase::Dispensing)
    }

    /// Whether a transaction is live in this phase.
    pub fn holds_transaction(self) -> bool {
        !matches!(self, Phase::Init | Phase::WaitingForCard)
    }
}

/// A single recorded phase change.
///
/// `timestamp` is a monotonic instant and is not serialized; `at` carries
/// the wall-clock time for logs and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// Phase left.
    pub from: Phase,

    /// Phase entered.
    pub to: Phase,

    /// Wall-clock time of the change.
    pub at: DateTime<Local>,

    /// Monotonic time of the change. Reset to "now" on deserialization.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl PhaseTransition {
    /// Record a transition happening now.
    pub fn new(from: Phase, to: Phase) -> Self {
        Self {
            from,
            to,
            at: Local::now(),
            timestamp: Instant::now(),
        }
    }

    /// Time since the transition.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Phase tracker with validated transitions, bounded history and an
/// optional per-phase timeout.
///
/// The machine is owned by the control loop and is not shared.
///
/// # Examples
///
/// ```
/// use vendlink_controller::{Phase, PhaseMachine};
///
/// let mut machine = PhaseMachine::new();
/// machine.transition_to(Phase::WaitingForCard).unwrap();
/// machine.transition_to(Phase::CardDetected).unwrap();
/// machine.transition_to(Phase::Validating).unwrap();
///
/// assert_eq!(machine.history().len(), 3);
/// ```
#[derive(Debug)]
pub struct PhaseMachine {
    current: Phase,
    entered_at: Instant,
    history: VecDeque<PhaseTransition>,
    timeout: Option<Duration>,
}

impl PhaseMachine {
    /// Create a machine in `Init`.
    pub fn new() -> Self {
        Self {
            current: Phase::Init,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            timeout: None,
        }
    }

    /// Current phase.
    pub fn current_phase(&self) -> Phase {
        self.current
    }

    /// Time spent in the current phase.
    pub fn time_in_current_phase(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Whether a timeout is set and has been reached.
    pub fn has_timed_out(&self) -> bool {
        self.timeout
            .is_some_and(|timeout| self.time_in_current_phase() >= timeout)
    }

    /// Time left before the timeout, if one is set and not yet reached.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.timeout
            .and_then(|timeout| timeout.checked_sub(self.time_in_current_phase()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Arm a timeout for the current phase. It is cleared on the next
    /// transition.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> &VecDeque<PhaseTransition> {
        &self.history
    }

    /// The most recent `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<PhaseTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Move to `next`, validating the move first.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPhaseTransition` if the cycle does not allow
    /// the move. The machine is left unchanged.
    pub fn transition_to(&mut self, next: Phase) -> Result<PhaseTransition> {
        if !self.current.can_transition_to(next) {
            return Err(Error::InvalidPhaseTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }

        let transition = PhaseTransition::new(self.current, next);
        self.enter(next, transition.clone());
        Ok(transition)
    }

    /// If a guarded phase has outlived its timeout, return to `Init`.
    ///
    /// Returns `Ok(None)` when no timeout is armed, it has not expired, or
    /// the current phase is not guarded.
    ///
    /// # Errors
    ///
    /// Propagates a rejected transition, which cannot happen for guarded
    /// phases.
    pub fn check_and_handle_timeout(&mut self) -> Result<Option<PhaseTransition>> {
        if !self.has_timed_out() || !self.current.is_guarded() {
            return Ok(None);
        }

        self.transition_to(Phase::Init).map(Some)
    }

    /// Force the machine back to `Init` from any phase.
    pub fn reset(&mut self) -> PhaseTransition {
        let transition = PhaseTransition::new(self.current, Phase::Init);
        self.enter(Phase::Init, transition.clone());
        transition
    }

    fn enter(&mut self, phase: Phase, transition: PhaseTransition) {
        self.current = phase;
        self.entered_at = Instant::now();
        self.timeout = None;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
