//! Quality ratings for air-quality readings
//!
//! The ENS160 reports AQI on the UBA 1..=5 scale and eCO2 in ppm. These
//! enums turn the raw numbers into the qualitative labels shown next to the
//! values and mirrored in the console log.

use serde::{Deserialize, Serialize};

/// Rating attached to a UBA air quality index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiRating {
    Excellent,
    Good,
    Moderate,
    Poor,
    Unhealthy,
    /// The sensor reported a value outside 1..=5 (usually during start-up).
    Unknown,
}

impl AqiRating {
    /// Rate a UBA index value.
    pub const fn assess(value: u8) -> Self {
        match value {
            1 => Self::Excellent,
            2 => Self::Good,
            3 => Self::Moderate,
            4 => Self::Poor,
            5 => Self::Unhealthy,
            _ => Self::Unknown,
        }
    }

    /// Get the display label for this rating
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Poor => "poor",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

/// Rating attached to an equivalent CO2 concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eco2Rating {
    Excellent,
    Good,
    Fair,
    Poor,
    Unhealthy,
}

impl Eco2Rating {
    /// Rate an eCO2 concentration in ppm.
    ///
    /// Excellent: below 600 ppm
    /// Good: 600-799 ppm
    /// Fair: 800-999 ppm
    /// Poor: 1000-1499 ppm
    /// Unhealthy: 1500 ppm and above
    pub const fn assess(ppm: u16) -> Self {
        if ppm < 600 {
            Self::Excellent
        } else if ppm < 800 {
            Self::Good
        } else if ppm < 1000 {
            Self::Fair
        } else if ppm < 1500 {
            Self::Poor
        } else {
            Self::Unhealthy
        }
    }

    /// Get the display label for this rating
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Operating status decoded from the sensor's validity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingStatus {
    Normal,
    WarmUp,
    InitialStartUp,
    InvalidOutput,
}

impl OperatingStatus {
    /// Decode the two-bit validity flag (0..=3). Higher bits are ignored.
    pub const fn from_validity_flag(flag: u8) -> Self {
        match flag & 0b11 {
            0 => Self::Normal,
            1 => Self::WarmUp,
            2 => Self::InitialStartUp,
            _ => Self::InvalidOutput,
        }
    }

    /// Text shown on the status line of the sensor screen
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "operating ok",
            Self::WarmUp => "warm-up",
            Self::InitialStartUp => "initial start-up",
            Self::InvalidOutput => "no valid output",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aqi_scale_maps_every_uba_level() {
        assert_eq!(AqiRating::assess(1), AqiRating::Excellent);
        assert_eq!(AqiRating::assess(2), AqiRating::Good);
        assert_eq!(AqiRating::assess(3), AqiRating::Moderate);
        assert_eq!(AqiRating::assess(4), AqiRating::Poor);
        assert_eq!(AqiRating::assess(5), AqiRating::Unhealthy);
        assert_eq!(AqiRating::assess(0), AqiRating::Unknown);
    }

    #[test]
    fn eco2_thresholds_are_lower_inclusive() {
        assert_eq!(Eco2Rating::assess(450), Eco2Rating::Excellent);
        assert_eq!(Eco2Rating::assess(600), Eco2Rating::Good);
        assert_eq!(Eco2Rating::assess(800), Eco2Rating::Fair);
        assert_eq!(Eco2Rating::assess(1000), Eco2Rating::Poor);
        assert_eq!(Eco2Rating::assess(1500), Eco2Rating::Unhealthy);
    }

    #[test]
    fn validity_flag_ignores_reserved_bits() {
        assert_eq!(OperatingStatus::from_validity_flag(0), OperatingStatus::Normal);
        assert_eq!(OperatingStatus::from_validity_flag(0b101), OperatingStatus::WarmUp);
        assert_eq!(OperatingStatus::from_validity_flag(3).label(), "no valid output");
    }
}
