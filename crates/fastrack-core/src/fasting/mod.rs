mod display;
mod session;

pub use display::{format_hms, FastingPhase, PhaseIcon};
pub use session::{check_hours, FastState, FastingSession, DEFAULT_HOURS, MAX_HOURS, PRESET_HOURS};
