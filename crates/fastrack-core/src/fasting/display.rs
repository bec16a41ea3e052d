//! Display values derived from elapsed fasting time.
//!
//! Everything here is a pure function of an elapsed duration so it can never
//! drift from the session it describes.

use serde::{Deserialize, Serialize};

const HOUR_MS: u64 = 3_600_000;

/// Physiological phase label shown while fasting.
///
/// Informational only. Boundaries are lower-inclusive: exactly 4h00m00s is
/// already `PostAbsorptive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FastingPhase {
    FedState,
    PostAbsorptive,
    EarlyFasting,
    FatBurningBegins,
    DeepFatBurning,
    ExtendedFast,
}

impl FastingPhase {
    pub fn from_elapsed_ms(elapsed_ms: u64) -> Self {
        match elapsed_ms / HOUR_MS {
            0..=3 => Self::FedState,
            4..=7 => Self::PostAbsorptive,
            8..=11 => Self::EarlyFasting,
            12..=15 => Self::FatBurningBegins,
            16..=19 => Self::DeepFatBurning,
            _ => Self::ExtendedFast,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FedState => "Fed State",
            Self::PostAbsorptive => "Post-Absorptive",
            Self::EarlyFasting => "Early Fasting",
            Self::FatBurningBegins => "Fat Burning Begins",
            Self::DeepFatBurning => "Deep Fat Burning",
            Self::ExtendedFast => "Extended Fast",
        }
    }
}

impl std::fmt::Display for FastingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Icon bucket for the current phase. Coarser than [`FastingPhase`]: three
/// buckets split at 8h and 14h.
///
/// Serialized as its symbol name, e.g. `"moon.fill"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseIcon {
    #[serde(rename = "fork.knife")]
    ForkKnife,
    #[serde(rename = "moon.fill")]
    Moon,
    #[serde(rename = "moon.stars.fill")]
    MoonStars,
}

impl PhaseIcon {
    pub fn from_elapsed_ms(elapsed_ms: u64) -> Self {
        match elapsed_ms / HOUR_MS {
            0..=7 => Self::ForkKnife,
            8..=13 => Self::Moon,
            _ => Self::MoonStars,
        }
    }

    /// Symbol name understood by the clients that render the icon.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::ForkKnife => "fork.knife",
            Self::Moon => "moon.fill",
            Self::MoonStars => "moon.stars.fill",
        }
    }
}

impl std::fmt::Display for PhaseIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Format milliseconds as `HH:MM:SS`, truncating sub-second remainders.
///
/// Hours are not wrapped, so a 30-hour fast reads `30:00:00`.
pub fn format_hms(ms: u64) -> String {
    let total = ms / 1000;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u64, m: u64, s: u64) -> u64 {
        ((h * 60 + m) * 60 + s) * 1000
    }

    #[test]
    fn phase_boundary_at_four_hours() {
        assert_eq!(
            FastingPhase::from_elapsed_ms(hms(3, 59, 59)),
            FastingPhase::FedState
        );
        assert_eq!(
            FastingPhase::from_elapsed_ms(hms(4, 0, 0)),
            FastingPhase::PostAbsorptive
        );
        assert_eq!(FastingPhase::from_elapsed_ms(hms(4, 0, 0)).label(), "Post-Absorptive");
    }

    #[test]
    fn phase_labels_cover_every_bucket() {
        let cases = [
            (0, "Fed State"),
            (5, "Post-Absorptive"),
            (8, "Early Fasting"),
            (12, "Fat Burning Begins"),
            (16, "Deep Fat Burning"),
            (20, "Extended Fast"),
            (500, "Extended Fast"),
        ];
        for (hours, label) in cases {
            assert_eq!(FastingPhase::from_elapsed_ms(hms(hours, 0, 0)).label(), label);
        }
    }

    #[test]
    fn icon_buckets_are_independent_of_phase() {
        assert_eq!(PhaseIcon::from_elapsed_ms(hms(7, 59, 59)).symbol(), "fork.knife");
        assert_eq!(PhaseIcon::from_elapsed_ms(hms(8, 0, 0)).symbol(), "moon.fill");
        assert_eq!(PhaseIcon::from_elapsed_ms(hms(13, 59, 59)).symbol(), "moon.fill");
        assert_eq!(PhaseIcon::from_elapsed_ms(hms(14, 0, 0)).symbol(), "moon.stars.fill");
        assert_eq!(PhaseIcon::from_elapsed_ms(hms(72, 0, 0)).symbol(), "moon.stars.fill");
    }

    #[test]
    fn icon_serializes_as_symbol_name() {
        for icon in [PhaseIcon::ForkKnife, PhaseIcon::Moon, PhaseIcon::MoonStars] {
            let json = serde_json::to_value(icon).unwrap();
            assert_eq!(json, icon.symbol());
            assert_eq!(icon.to_string(), icon.symbol());
        }
    }

    #[test]
    fn format_truncates_and_does_not_wrap() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(hms(1, 2, 3) + 500), "01:02:03");
        assert_eq!(format_hms(hms(30, 0, 0)), "30:00:00");
    }
}
