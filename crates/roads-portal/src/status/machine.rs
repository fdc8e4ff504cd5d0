use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transition table and ordering for a status enum.
///
/// Implementors describe a forward-only lifecycle: every state has a rank, progress only moves to
/// higher ranks, and `REJECTED` is reachable from any state that is not terminal.
pub trait Lifecycle: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// State assigned to freshly created entities.
    const INITIAL: Self;
    /// State entered when an in-flight progress reaches 100%.
    const SUCCESS: Self;
    /// Absorbing failure state.
    const REJECTED: Self;

    fn rank(self) -> u8;

    fn is_terminal(self) -> bool;

    /// States animated by a progress timer.
    fn is_in_flight(self) -> bool;

    /// Stable kebab-case key used for serialization and display lookups.
    fn key(self) -> &'static str;

    fn allows(self, next: Self) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        next == Self::REJECTED || next.rank() > self.rank()
    }
}

/// Percentage clamped to `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn saturating_add(self, increment: u8) -> Self {
        Self::new(self.0.saturating_add(increment))
    }

    pub const fn is_complete(self) -> bool {
        self.0 >= 100
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Outcome of a single timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The status is not in flight; nothing changed.
    Ignored,
    Advanced(Progress),
    /// Progress reached 100% and the status moved to the success state.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("status '{from}' is terminal")]
    Terminal { from: &'static str },
    #[error("transition from '{from}' to '{to}' is not allowed")]
    NotAllowed {
        from: &'static str,
        to: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange<S> {
    pub from: S,
    pub to: S,
    pub at: DateTime<Utc>,
}

/// Status plus progress for one entity, enforcing the lifecycle's transition table.
///
/// Invariants:
/// - an in-flight status always carries progress below 100;
/// - progress never decreases while in flight;
/// - terminal states accept no transitions and ignore ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMachine<S: Lifecycle> {
    status: S,
    progress: Option<Progress>,
    history: Vec<StatusChange<S>>,
}

impl<S: Lifecycle> Default for StatusMachine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Lifecycle> StatusMachine<S> {
    pub fn new() -> Self {
        Self::seeded(S::INITIAL, None)
    }

    /// Builds a machine already sitting in `status`, as mock data does at start-up.
    pub fn seeded(status: S, progress: Option<u8>) -> Self {
        let progress = if status.is_in_flight() {
            Some(Progress::new(progress.unwrap_or(0).min(99)))
        } else if status == S::SUCCESS {
            Some(Progress::COMPLETE)
        } else {
            None
        };

        Self {
            status,
            progress,
            history: Vec::new(),
        }
    }

    pub fn status(&self) -> S {
        self.status
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub fn history(&self) -> &[StatusChange<S>] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }

    pub fn transition(&mut self, next: S) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal {
                from: self.status.key(),
            });
        }
        if !self.status.allows(next) {
            return Err(TransitionError::NotAllowed {
                from: self.status.key(),
                to: next.key(),
            });
        }
        self.apply(next);
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), TransitionError> {
        self.transition(S::REJECTED)
    }

    /// Applies one progress increment.
    pub fn advance(&mut self, increment: u8) -> Tick {
        if !self.status.is_in_flight() {
            return Tick::Ignored;
        }

        let next = self.progress.unwrap_or(Progress::ZERO).saturating_add(increment);
        if next.is_complete() {
            self.apply(S::SUCCESS);
            Tick::Completed
        } else {
            self.progress = Some(next);
            Tick::Advanced(next)
        }
    }

    fn apply(&mut self, next: S) {
        self.history.push(StatusChange {
            from: self.status,
            to: next,
            at: Utc::now(),
        });
        self.status = next;
        self.progress = if next.is_in_flight() {
            Some(Progress::ZERO)
        } else if next == S::SUCCESS {
            Some(Progress::COMPLETE)
        } else {
            None
        };
    }
}
