use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// A location after interpretation: either coordinates or a canonical place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedLocation {
    Coordinate { lat: f64, lon: f64 },
    LocationLabel { text: String },
}

impl ResolvedLocation {
    /// Builds a label location.
    pub fn label(text: impl Into<String>) -> Self {
        ResolvedLocation::LocationLabel { text: text.into() }
    }

    /// Coordinates, if this is a coordinate location.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match self {
            ResolvedLocation::Coordinate { lat, lon } => Some((*lat, *lon)),
            ResolvedLocation::LocationLabel { .. } => None,
        }
    }
}

impl fmt::Display for ResolvedLocation {
    /// Coordinates render in the same `lat:..,lon:..` token users type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedLocation::Coordinate { lat, lon } => write!(f, "lat:{},lon:{}", lat, lon),
            ResolvedLocation::LocationLabel { text } => f.write_str(text),
        }
    }
}

/// One time-stamped prediction from the forecast provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub temperature_celsius: f64,
    pub weather_description: String,
}

/// Forecast as returned by a provider, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// City name reported by the provider, when it has one.
    pub city_name: Option<String>,
    pub points: Vec<ForecastPoint>,
}

/// Coarse part of the day a forecast point falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    #[serde(rename = "Early Morning")]
    EarlyMorning,
    Morning,
    #[serde(rename = "Early Afternoon")]
    EarlyAfternoon,
    #[serde(rename = "Late Afternoon")]
    LateAfternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::EarlyMorning => "Early Morning",
            TimeOfDay::Morning => "Morning",
            TimeOfDay::EarlyAfternoon => "Early Afternoon",
            TimeOfDay::LateAfternoon => "Late Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Early Morning" => Ok(TimeOfDay::EarlyMorning),
            "Morning" => Ok(TimeOfDay::Morning),
            "Early Afternoon" => Ok(TimeOfDay::EarlyAfternoon),
            "Late Afternoon" => Ok(TimeOfDay::LateAfternoon),
            "Evening" => Ok(TimeOfDay::Evening),
            "Night" => Ok(TimeOfDay::Night),
            other => Err(AppError::Generic(format!("unknown time of day: {}", other))),
        }
    }
}

/// Clothing advice for a single forecast point, fully enriched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingRecommendation {
    pub timestamp: NaiveDateTime,
    pub time_of_day: TimeOfDay,
    pub temperature_celsius: f64,
    pub weather_description: String,
    pub location: String,
    pub advice_text: String,
    pub shopping_link: String,
    pub icon_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fallback_note: Option<String>,
}

/// Search data handed to the persistence gateway before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearch {
    pub user_id: Option<String>,
    pub location_label: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A stored search with its recommendations in original order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub location_label: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub recommendations: Vec<ClothingRecommendation>,
    pub created_at: DateTime<Utc>,
}

/// Result of judging an outfit photo against the weather.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitVerdict {
    pub is_appropriate: bool,
    pub feedback_text: String,
}

/// Durable outfit verdict, keyed by `(user_id, image_url)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitAnalysisRecord {
    pub user_id: String,
    pub image_url: String,
    pub is_appropriate: bool,
    pub feedback_text: String,
}
