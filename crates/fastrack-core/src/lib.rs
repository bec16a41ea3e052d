//! # Fastrack Core Library
//!
//! This library provides the core logic for Fastrack, an intermittent-fasting
//! timer. Every operation is available through the standalone CLI binary,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Fasting session**: A wall-clock-based state machine (idle, active,
//!   complete). Progress is always recomputed from the start instant, never
//!   accumulated from ticks.
//! - **Tracker**: Owns a session, ticks it once per second on a tokio task,
//!   persists the running fast and schedules the completion notification.
//! - **Storage**: SQLite key-value store and fast history, TOML configuration.
//!
//! ## Key Components
//!
//! - [`FastingSession`]: Core state machine
//! - [`FastingTracker`]: Live owner with restart recovery
//! - [`Database`]: History and key-value persistence
//! - [`Config`]: Application configuration management
//! - [`Notifier`]: Seam for local notification delivery

pub mod clock;
pub mod error;
pub mod events;
pub mod fasting;
pub mod notify;
pub mod storage;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, ValidationError};
pub use events::Event;
pub use fasting::{
    FastState, FastingPhase, FastingSession, PhaseIcon, DEFAULT_HOURS, MAX_HOURS, PRESET_HOURS,
};
pub use notify::{NoopNotifier, Notifier, FASTING_COMPLETE_ID};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, PersistedFast};
pub use tracker::{FastingTracker, TrackerOptions};
