//! Property tests for the fasting session state machine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fastrack_core::{FastState, FastingPhase, FastingSession};
use proptest::prelude::*;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 18, 0, 0).unwrap()
}

proptest! {
    #[test]
    fn start_always_begins_at_zero(hours in 1u32..=72) {
        let mut session = FastingSession::default();
        session.start(hours, t0()).unwrap();
        prop_assert!(session.is_active());
        prop_assert!(!session.is_complete());
        prop_assert_eq!(session.progress(), 0.0);
        prop_assert_eq!(session.selected_hours(), hours);
    }

    #[test]
    fn progress_is_clamped_ratio_of_elapsed(hours in 1u32..=48, elapsed_secs in 0i64..400_000) {
        let mut session = FastingSession::default();
        session.start(hours, t0()).unwrap();
        session.tick(t0() + Duration::seconds(elapsed_secs));

        let expected = (elapsed_secs as f64 / (f64::from(hours) * 3600.0)).min(1.0);
        prop_assert_eq!(session.progress(), expected);
        prop_assert_eq!(
            session.is_complete(),
            elapsed_secs >= i64::from(hours) * 3600
        );
    }

    #[test]
    fn restore_matches_ticking_to_the_same_instant(hours in 1u32..=48, elapsed_secs in 0i64..400_000) {
        let now = t0() + Duration::seconds(elapsed_secs);

        let restored = FastingSession::restore(t0(), hours, now).unwrap();

        let mut live = FastingSession::default();
        live.start(hours, t0()).unwrap();
        live.tick(now);

        prop_assert_eq!(restored.state(), live.state());
        prop_assert_eq!(restored.elapsed_ms(), live.elapsed_ms());
        prop_assert_eq!(restored.progress(), live.progress());
    }

    #[test]
    fn remaining_plus_elapsed_is_target_until_complete(hours in 1u32..=48, elapsed_secs in 0i64..400_000) {
        let mut session = FastingSession::default();
        session.start(hours, t0()).unwrap();
        session.tick(t0() + Duration::seconds(elapsed_secs));

        if session.state() == FastState::Active {
            prop_assert_eq!(session.elapsed_ms() + session.remaining_ms(), session.target_ms());
        } else {
            prop_assert_eq!(session.remaining_ms(), 0);
        }
    }

    #[test]
    fn phase_never_moves_backwards(a in 0u64..200_000_000, b in 0u64..200_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |p: FastingPhase| p as u8;
        prop_assert!(rank(FastingPhase::from_elapsed_ms(lo)) <= rank(FastingPhase::from_elapsed_ms(hi)));
    }
}
