use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fasting::{FastState, FastingPhase, PhaseIcon};

/// Every state change of a fast produces an Event.
/// The CLI prints them; tracker subscribers receive them over a broadcast
/// channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    FastStarted {
        hours: u32,
        start_time: DateTime<Utc>,
        /// When the target is reached and the completion notification fires.
        target_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// Emitted by the ticker while a fast is running.
    FastProgress {
        elapsed_ms: u64,
        remaining_ms: u64,
        progress: f64,
        at: DateTime<Utc>,
    },
    FastCompleted {
        hours: u32,
        start_time: DateTime<Utc>,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    /// A running (or unacknowledged complete) fast was abandoned.
    FastStopped {
        hours: u32,
        start_time: DateTime<Utc>,
        elapsed_ms: u64,
        reached_target: bool,
        at: DateTime<Utc>,
    },
    /// A complete fast was acknowledged and the tracker returned to idle.
    FastReset {
        hours: u32,
        start_time: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A persisted fast was picked up after a restart.
    FastRestored {
        state: FastState,
        hours: u32,
        start_time: DateTime<Utc>,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    PresetSelected {
        hours: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: FastState,
        selected_hours: u32,
        start_time: Option<DateTime<Utc>>,
        elapsed_ms: u64,
        remaining_ms: u64,
        progress: f64,
        elapsed: String,
        remaining: String,
        phase: FastingPhase,
        phase_label: String,
        phase_icon: PhaseIcon,
        at: DateTime<Utc>,
    },
}
