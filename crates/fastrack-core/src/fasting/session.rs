//! Fasting session state machine.
//!
//! The session is a wall-clock-based state machine. It holds no timer of its
//! own - every command takes the current instant, and the owner is
//! responsible for calling `tick()` periodically while a fast is active.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active -> Complete -> Idle
//!           \----- stop ------> Idle
//! ```
//!
//! Elapsed time is always recomputed as `now - start_time`. A tick never adds
//! a delta, so missed ticks (suspension, a killed process) cost nothing.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = FastingSession::new(DEFAULT_HOURS);
//! session.start(16, Utc::now())?;
//! // Once per second:
//! if let Some(Event::FastCompleted { .. }) = session.tick(Utc::now()) { /* stop ticking */ }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::display::{format_hms, FastingPhase, PhaseIcon};
use crate::error::ValidationError;
use crate::events::Event;

/// Quick-pick fast lengths, in hours.
pub const PRESET_HOURS: [u32; 6] = [12, 14, 16, 18, 20, 24];

/// Preset selected when nothing else is configured.
pub const DEFAULT_HOURS: u32 = 16;

/// Longest fast accepted, one year.
pub const MAX_HOURS: u32 = 24 * 365;

const HOUR_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastState {
    Idle,
    Active,
    /// Target reached but not yet acknowledged.
    Complete,
}

impl FastState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Complete => "complete",
        }
    }
}

/// A single fast, from start instant to target duration.
#[derive(Debug, Clone)]
pub struct FastingSession {
    selected_hours: u32,
    state: FastState,
    /// Set iff state is Active or Complete.
    start_time: Option<DateTime<Utc>>,
    /// Elapsed time as of the last recompute.
    elapsed_ms: u64,
    /// Bumped on every transition that starts, finishes or clears a fast.
    /// Tickers capture it and stop when it no longer matches.
    generation: u64,
}

impl FastingSession {
    /// Create an idle session with `default_hours` preselected.
    ///
    /// A default outside `1..=MAX_HOURS` falls back to [`DEFAULT_HOURS`].
    pub fn new(default_hours: u32) -> Self {
        Self {
            selected_hours: if check_hours(default_hours).is_ok() {
                default_hours
            } else {
                DEFAULT_HOURS
            },
            state: FastState::Idle,
            start_time: None,
            elapsed_ms: 0,
            generation: 0,
        }
    }

    /// Rebuild a session from persisted values.
    ///
    /// Returns `None` for a duration outside `1..=MAX_HOURS` or a target
    /// that falls off the calendar. Otherwise the session is `Active`, or
    /// `Complete` if the target already passed while the process was gone.
    pub fn restore(start_time: DateTime<Utc>, hours: u32, now: DateTime<Utc>) -> Option<Self> {
        check_hours(hours).ok()?;
        target_after(start_time, hours)?;
        let mut session = Self {
            selected_hours: hours,
            state: FastState::Active,
            start_time: Some(start_time),
            elapsed_ms: 0,
            generation: 1,
        };
        session.recompute(now);
        if session.elapsed_ms >= session.target_ms() {
            session.state = FastState::Complete;
        }
        Some(session)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> FastState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == FastState::Idle
    }

    pub fn is_active(&self) -> bool {
        self.state == FastState::Active
    }

    pub fn is_complete(&self) -> bool {
        self.state == FastState::Complete
    }

    pub fn selected_hours(&self) -> u32 {
        self.selected_hours
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn target_ms(&self) -> u64 {
        u64::from(self.selected_hours) * HOUR_MS
    }

    pub fn target_duration(&self) -> Duration {
        Duration::hours(i64::from(self.selected_hours))
    }

    /// Instant the target is reached, if a fast is running or complete.
    pub fn target_at(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .and_then(|start| target_after(start, self.selected_hours))
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn time_elapsed(&self) -> Duration {
        Duration::milliseconds(self.elapsed_ms as i64)
    }

    pub fn remaining_ms(&self) -> u64 {
        self.target_ms().saturating_sub(self.elapsed_ms)
    }

    pub fn time_remaining(&self) -> Duration {
        Duration::milliseconds(self.remaining_ms() as i64)
    }

    /// 0.0 ..= 1.0 progress towards the target.
    pub fn progress(&self) -> f64 {
        let target = self.target_ms();
        if target == 0 {
            return 0.0;
        }
        (self.elapsed_ms as f64 / target as f64).min(1.0)
    }

    pub fn elapsed_string(&self) -> String {
        format_hms(self.elapsed_ms)
    }

    pub fn remaining_string(&self) -> String {
        format_hms(self.remaining_ms())
    }

    pub fn phase(&self) -> FastingPhase {
        FastingPhase::from_elapsed_ms(self.elapsed_ms)
    }

    pub fn phase_icon(&self) -> PhaseIcon {
        PhaseIcon::from_elapsed_ms(self.elapsed_ms)
    }

    /// Build a full state snapshot event as of `now`.
    ///
    /// An active session's elapsed time is recomputed for the snapshot only;
    /// the state is not advanced, so completion is still left to `tick()`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        let mut view = self.clone();
        if view.is_active() {
            view.recompute(now);
        }
        let phase = view.phase();
        Event::StateSnapshot {
            state: view.state,
            selected_hours: view.selected_hours,
            start_time: view.start_time,
            elapsed_ms: view.elapsed_ms,
            remaining_ms: view.remaining_ms(),
            progress: view.progress(),
            elapsed: view.elapsed_string(),
            remaining: view.remaining_string(),
            phase,
            phase_label: phase.label().to_string(),
            phase_icon: view.phase_icon(),
            at: now,
        }
    }

    /// Event describing a session produced by [`FastingSession::restore`].
    pub fn restored_event(&self, now: DateTime<Utc>) -> Option<Event> {
        Some(Event::FastRestored {
            state: self.state,
            hours: self.selected_hours,
            start_time: self.start_time?,
            elapsed_ms: self.elapsed_ms,
            at: now,
        })
    }

    pub fn progress_event(&self, now: DateTime<Utc>) -> Event {
        Event::FastProgress {
            elapsed_ms: self.elapsed_ms,
            remaining_ms: self.remaining_ms(),
            progress: self.progress(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fast of `hours` at `now`.
    ///
    /// Starting while a fast is running or complete begins a new one from
    /// `now`.
    pub fn start(&mut self, hours: u32, now: DateTime<Utc>) -> Result<Event, ValidationError> {
        check_hours(hours)?;
        let target_at = target_after(now, hours).ok_or_else(|| ValidationError::InvalidValue {
            field: "hours".into(),
            message: format!("a {hours}-hour fast starting at {now} ends past the supported calendar"),
        })?;
        self.selected_hours = hours;
        self.state = FastState::Active;
        self.start_time = Some(now);
        self.elapsed_ms = 0;
        self.generation += 1;
        Ok(Event::FastStarted {
            hours,
            start_time: now,
            target_at,
            at: now,
        })
    }

    /// Call periodically. Returns `Some(Event::FastCompleted)` on the tick
    /// that reaches the target; every other tick returns `None`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != FastState::Active {
            return None;
        }
        self.recompute(now);
        if self.elapsed_ms < self.target_ms() {
            return None;
        }
        self.state = FastState::Complete;
        self.generation += 1;
        Some(Event::FastCompleted {
            hours: self.selected_hours,
            start_time: self.start_time?,
            elapsed_ms: self.elapsed_ms,
            at: now,
        })
    }

    /// Abandon the current fast. A no-op when already idle.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let start_time = self.start_time?;
        if self.is_active() {
            self.recompute(now);
        }
        let event = Event::FastStopped {
            hours: self.selected_hours,
            start_time,
            elapsed_ms: self.elapsed_ms,
            reached_target: self.is_complete(),
            at: now,
        };
        self.clear();
        Some(event)
    }

    /// Acknowledge a complete fast. A no-op unless the state is `Complete`.
    pub fn reset_after_complete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.is_complete() {
            return None;
        }
        let start_time = self.start_time?;
        let event = Event::FastReset {
            hours: self.selected_hours,
            start_time,
            at: now,
        };
        self.clear();
        Some(event)
    }

    /// Change the preset for the next fast. Only allowed while idle.
    pub fn select_hours(
        &mut self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Event, ValidationError> {
        check_hours(hours)?;
        if !self.is_idle() {
            return Err(ValidationError::InvalidState {
                action: "change the fast duration".into(),
                state: self.state.as_str().into(),
            });
        }
        self.selected_hours = hours;
        Ok(Event::PresetSelected { hours, at: now })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn recompute(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.start_time {
            // A clock that moved backwards reads as zero elapsed.
            self.elapsed_ms = (now - start).num_milliseconds().max(0) as u64;
        }
    }

    /// Back to idle. `selected_hours` is kept as the preset for the next fast.
    fn clear(&mut self) {
        self.state = FastState::Idle;
        self.start_time = None;
        self.elapsed_ms = 0;
        self.generation += 1;
    }
}

impl Default for FastingSession {
    fn default() -> Self {
        Self::new(DEFAULT_HOURS)
    }
}

/// Reject fast lengths outside `1..=MAX_HOURS`.
pub fn check_hours(hours: u32) -> Result<(), ValidationError> {
    let message = if hours == 0 {
        "fast duration must be greater than zero".to_string()
    } else if hours > MAX_HOURS {
        format!("fast duration must be at most {MAX_HOURS} hours")
    } else {
        return Ok(());
    };
    Err(ValidationError::InvalidValue {
        field: "hours".into(),
        message,
    })
}

/// `start + hours`, or `None` past the end of the representable calendar.
fn target_after(start: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    start.checked_add_signed(Duration::hours(i64::from(hours)))
}
