//! Deterministic clothing rules.
//!
//! Everything here is pure: the same forecast point always produces the same
//! time-of-day bucket and advice, whichever way the forecast was queried.

use chrono::Timelike;

use crate::models::{ForecastPoint, TimeOfDay};

/// Advice derived from a single forecast point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub time_of_day: TimeOfDay,
    pub advice_text: &'static str,
}

/// Buckets an hour of the day (0..24). Hours outside the named ranges are night.
pub fn time_of_day(hour: u32) -> TimeOfDay {
    match hour {
        5..=8 => TimeOfDay::EarlyMorning,
        9..=11 => TimeOfDay::Morning,
        12..=14 => TimeOfDay::EarlyAfternoon,
        15..=17 => TimeOfDay::LateAfternoon,
        18..=20 => TimeOfDay::Evening,
        _ => TimeOfDay::Night,
    }
}

/// Temperature bands, checked in ascending order. Comparisons are strict, so a
/// value on a boundary belongs to the warmer band.
const ADVICE_BANDS: &[(f64, &str)] = &[
    (10.0, "Wear a heavy coat, it will be cold"),
    (15.0, "Wear a warm jacket or sweater"),
    (20.0, "Wear a light jacket or long sleeves"),
    (25.0, "T-shirt with light pants is perfect"),
];

const HOT_ADVICE: &str = "T-shirt and shorts, it will be hot!";

/// Clothing advice for a temperature in Celsius.
pub fn advice_for(temperature_celsius: f64) -> &'static str {
    ADVICE_BANDS
        .iter()
        .find(|(upper, _)| temperature_celsius < *upper)
        .map(|(_, advice)| *advice)
        .unwrap_or(HOT_ADVICE)
}

/// Derives the time-of-day bucket and advice for one forecast point.
pub fn derive(point: &ForecastPoint) -> Advice {
    Advice {
        time_of_day: time_of_day(point.timestamp.hour()),
        advice_text: advice_for(point.temperature_celsius),
    }
}
