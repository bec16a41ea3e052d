//! The two keys that carry a running fast across restarts.

use chrono::{DateTime, Utc};

use super::kv::KeyValueStore;
use crate::error::DatabaseError;
use crate::fasting::MAX_HOURS;

pub const START_TIME_KEY: &str = "fasting_start_time";
pub const DURATION_KEY: &str = "fasting_duration_hours";

/// Start instant and target of a fast that was active (or complete but not
/// yet acknowledged) when last persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedFast {
    pub start_time: DateTime<Utc>,
    pub hours: u32,
}

impl PersistedFast {
    /// Read the persisted fast.
    ///
    /// Anything missing or malformed (unparsable timestamp, hours that are
    /// unparsable or outside `1..=MAX_HOURS`) reads as "no fast".
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, DatabaseError> {
        let Some(raw_start) = store.get(START_TIME_KEY)? else {
            return Ok(None);
        };
        let Some(raw_hours) = store.get(DURATION_KEY)? else {
            return Ok(None);
        };

        let start_time = match DateTime::parse_from_rfc3339(raw_start.trim()) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(value = %raw_start, error = %e, "ignoring unparsable fast start time");
                return Ok(None);
            }
        };
        let hours = match raw_hours.trim().parse::<i64>() {
            Ok(h) if h > 0 && h <= i64::from(MAX_HOURS) => h as u32,
            _ => {
                tracing::warn!(value = %raw_hours, "ignoring out-of-range fast duration");
                return Ok(None);
            }
        };

        Ok(Some(Self { start_time, hours }))
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), DatabaseError> {
        store.set(START_TIME_KEY, &self.start_time.to_rfc3339())?;
        store.set(DURATION_KEY, &self.hours.to_string())?;
        Ok(())
    }

    /// Remove both keys. Attempts the second removal even if the first fails.
    pub fn clear(store: &mut dyn KeyValueStore) -> Result<(), DatabaseError> {
        let first = store.remove(START_TIME_KEY);
        let second = store.remove(DURATION_KEY);
        first.and(second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 21, 15, 0).unwrap()
    }

    #[test]
    fn save_load_clear() {
        let mut store = MemoryStore::new();
        let fast = PersistedFast {
            start_time: start(),
            hours: 18,
        };
        fast.save(&mut store).unwrap();
        assert_eq!(PersistedFast::load(&store).unwrap(), Some(fast));

        PersistedFast::clear(&mut store).unwrap();
        assert!(!store.contains(START_TIME_KEY));
        assert!(!store.contains(DURATION_KEY));
        assert_eq!(PersistedFast::load(&store).unwrap(), None);
    }

    #[test]
    fn partial_or_malformed_state_reads_as_none() {
        let mut store = MemoryStore::new();
        store.set(START_TIME_KEY, &start().to_rfc3339()).unwrap();
        assert_eq!(PersistedFast::load(&store).unwrap(), None);

        for bad_hours in ["0", "-3", "sixteen", "", "8761", "4294967295", "99999999999"] {
            store.set(DURATION_KEY, bad_hours).unwrap();
            assert_eq!(PersistedFast::load(&store).unwrap(), None, "hours={bad_hours:?}");
        }

        store.set(DURATION_KEY, "16").unwrap();
        store.set(START_TIME_KEY, "yesterday evening").unwrap();
        assert_eq!(PersistedFast::load(&store).unwrap(), None);

        let mut only_hours = MemoryStore::new();
        only_hours.set(DURATION_KEY, "16").unwrap();
        assert_eq!(PersistedFast::load(&only_hours).unwrap(), None);
    }
}
