//! Change aggregation with a trailing-edge debounce.
//!
//! Every qualifying event pushes the flush a full window into the future.
//! There is no maximum wait: a file that is rewritten more often than the
//! window never gets flushed until the writes stop.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use filesync_protocol::ChangeBatch;
use tokio::time::Instant;
use tracing::debug;

use crate::filter::ExtensionFilter;

/// Default quiescence window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Default sleep while nothing is pending.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(86_400);

/// Upper bound for how far ahead a deadline is placed.
const MAX_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(now: Instant, wait: Duration) -> Instant {
    now.checked_add(wait.min(MAX_WAIT))
        .or_else(|| now.checked_add(DEFAULT_IDLE))
        .unwrap_or(now)
}

/// Timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Long sleep, waiting for the next event.
    Idle,
    /// Short countdown towards a flush.
    Armed,
}

/// Single timer with an idle and an armed mode.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    mode: TimerMode,
    deadline: Instant,
    window: Duration,
    idle: Duration,
}

impl DebounceTimer {
    /// Create an idle timer.
    pub fn new(window: Duration, idle: Duration, now: Instant) -> Self {
        Self {
            mode: TimerMode::Idle,
            deadline: deadline_after(now, idle),
            window,
            idle,
        }
    }

    /// Restart the short countdown, discarding whatever was left.
    pub fn arm(&mut self, now: Instant) {
        self.mode = TimerMode::Armed;
        self.deadline = deadline_after(now, self.window);
    }

    /// Go back to the long sleep.
    pub fn idle(&mut self, now: Instant) {
        self.mode = TimerMode::Idle;
        self.deadline = deadline_after(now, self.idle);
    }

    /// When the timer next fires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Current mode.
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Whether the countdown is running.
    pub fn is_armed(&self) -> bool {
        self.mode == TimerMode::Armed
    }

    /// Whether `now` is at or past the deadline.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Pending change set plus the timer that decides when to flush it.
pub struct ChangeAggregator {
    pending: BTreeSet<PathBuf>,
    timer: DebounceTimer,
    extensions: ExtensionFilter,
}

impl ChangeAggregator {
    /// Create an aggregator with an empty set and an idle timer.
    pub fn new(extensions: ExtensionFilter, window: Duration, idle: Duration, now: Instant) -> Self {
        Self {
            pending: BTreeSet::new(),
            timer: DebounceTimer::new(window, idle, now),
            extensions,
        }
    }

    /// Record a created or written file.
    ///
    /// Paths without an eligible extension are refused and leave the timer
    /// alone. Accepted paths re-arm the timer even if already pending.
    pub fn record_change(&mut self, path: &Path, now: Instant) -> bool {
        if !self.extensions.is_eligible(path) {
            debug!("Ignoring change to {}", path.display());
            return false;
        }
        if self.pending.insert(path.to_path_buf()) {
            debug!("Pending change: {}", path.display());
        }
        self.timer.arm(now);
        true
    }

    /// Handle the timer firing.
    ///
    /// Drains the pending set into a batch. The timer returns to idle either
    /// way; an empty set yields `None`.
    pub fn on_timer_fired(&mut self, now: Instant) -> Option<ChangeBatch> {
        self.timer.idle(now);
        if self.pending.is_empty() {
            return None;
        }
        let batch = ChangeBatch::new(std::mem::take(&mut self.pending));
        debug!("Flushing {} changed files", batch.len());
        Some(batch)
    }

    /// When the loop must next call [`Self::on_timer_fired`].
    pub fn deadline(&self) -> Instant {
        self.timer.deadline()
    }

    /// The debounce timer.
    pub fn timer(&self) -> &DebounceTimer {
        &self.timer
    }

    /// Paths waiting for the next flush.
    pub fn pending(&self) -> &BTreeSet<PathBuf> {
        &self.pending
    }

    /// Get the number of pending paths.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
