//! Location interpretation.
//!
//! Raw input takes one of four shapes: a `lat:..,lon:..` token, a canonical
//! "City, Country" string, a free-form description, or a plain name. Only
//! descriptions go through the landmark dictionary and, failing that, the
//! text-generation backend.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Landmark;
use crate::models::ResolvedLocation;
use crate::ports::{ChatPrompt, TextGenerator};

const UNKNOWN_LOCATION: &str = "Unknown location";

const INTERPRET_INSTRUCTION: &str = "You are a location recognition assistant. Extract the most likely city and country name from the given description. Respond with ONLY the city name followed by a comma and the country/state. For example: 'New York, USA' or 'Paris, France'. If you can't determine a location, respond with 'Unknown location'.";

/// Descriptions must be longer than this many characters.
const MIN_DESCRIPTION_LEN: usize = 10;

/// Shape of a raw location query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryShape {
    Coordinate { lat: f64, lon: f64 },
    Canonical,
    Description,
    Plain,
}

/// Classifies trimmed input. Coordinate tokens are case-insensitive.
///
/// # Examples
///
/// ```
/// use drape_core::location::{classify, QueryShape};
///
/// assert_eq!(classify("Paris, France"), QueryShape::Canonical);
/// assert_eq!(classify("the windy city"), QueryShape::Description);
/// assert_eq!(classify("Paris"), QueryShape::Plain);
/// ```
pub fn classify(raw: &str) -> QueryShape {
    let text = raw.trim();
    if let Some((lat, lon)) = parse_coordinates(text) {
        return QueryShape::Coordinate { lat, lon };
    }
    if text.contains(',') {
        QueryShape::Canonical
    } else if text.contains(char::is_whitespace) && text.chars().count() > MIN_DESCRIPTION_LEN {
        QueryShape::Description
    } else {
        QueryShape::Plain
    }
}

fn coordinate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)lat:(-?\d+\.\d+),lon:(-?\d+\.\d+)")
            .expect("coordinate regex must compile")
    })
}

/// Finds a `lat:<decimal>,lon:<decimal>` token anywhere in the text.
fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let caps = coordinate_re().captures(text)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some((lat, lon))
}

/// Why interpretation of a description was inconclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFailureReason {
    /// Nothing to interpret.
    EmptyInput,
    /// The backend answered with the "Unknown location" sentinel.
    Unknown,
    /// The backend answered with nothing.
    EmptyResponse,
    /// The backend call failed.
    Backend(String),
}

/// Inconclusive interpretation. Callers fall back to the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not interpret location '{raw}': {reason:?}")]
pub struct ResolutionSoftFailure {
    pub raw: String,
    pub reason: SoftFailureReason,
}

impl ResolutionSoftFailure {
    /// The location the pipeline should continue with: the raw input itself.
    pub fn into_fallback(self) -> ResolvedLocation {
        ResolvedLocation::label(self.raw.trim())
    }
}

/// Resolves raw location text using an ordered landmark dictionary and a
/// text-generation backend.
#[derive(Clone)]
pub struct LocationResolver<T> {
    landmarks: Vec<Landmark>,
    generator: T,
    model_temperature: f32,
}

impl<T: TextGenerator> LocationResolver<T> {
    pub fn new(landmarks: Vec<Landmark>, generator: T) -> Self {
        Self {
            landmarks,
            generator,
            model_temperature: 0.3,
        }
    }

    /// Returns the first landmark, in definition order, whose phrase occurs in
    /// the normalized description.
    pub fn match_landmark(&self, description: &str) -> Option<&str> {
        let normalized = description.trim().to_lowercase();
        self.landmarks
            .iter()
            .find(|l| normalized.contains(&l.phrase.to_lowercase()))
            .map(|l| l.location.as_str())
    }

    pub async fn resolve(&self, raw: &str) -> Result<ResolvedLocation, ResolutionSoftFailure> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(self.soft_failure(raw, SoftFailureReason::EmptyInput));
        }

        match classify(text) {
            QueryShape::Coordinate { lat, lon } => Ok(ResolvedLocation::Coordinate { lat, lon }),
            QueryShape::Canonical => Ok(ResolvedLocation::label(raw)),
            QueryShape::Plain => Ok(ResolvedLocation::label(text)),
            QueryShape::Description => {
                if let Some(location) = self.match_landmark(text) {
                    info!("Matched known description \"{}\" → \"{}\"", text, location);
                    return Ok(ResolvedLocation::label(location));
                }
                self.interpret(raw).await
            }
        }
    }

    async fn interpret(&self, raw: &str) -> Result<ResolvedLocation, ResolutionSoftFailure> {
        info!("Using AI to interpret location: \"{}\"", raw.trim());
        let prompt = ChatPrompt {
            system: INTERPRET_INSTRUCTION.to_string(),
            user: format!("Identify the location described by: \"{}\"", raw.trim()),
            temperature: Some(self.model_temperature),
            max_tokens: 50,
        };

        let reply = match self.generator.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                return Err(self.soft_failure(raw, SoftFailureReason::Backend(e.to_string())))
            }
        };

        let reply = reply.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
        if reply.is_empty() {
            return Err(self.soft_failure(raw, SoftFailureReason::EmptyResponse));
        }
        if reply
            .trim_end_matches('.')
            .eq_ignore_ascii_case(UNKNOWN_LOCATION)
        {
            return Err(self.soft_failure(raw, SoftFailureReason::Unknown));
        }

        info!("AI interpreted location: \"{}\" → \"{}\"", raw.trim(), reply);
        Ok(ResolvedLocation::label(reply))
    }

    fn soft_failure(&self, raw: &str, reason: SoftFailureReason) -> ResolutionSoftFailure {
        let failure = ResolutionSoftFailure {
            raw: raw.to_string(),
            reason,
        };
        warn!("{}; continuing with the original input", failure);
        failure
    }
}
