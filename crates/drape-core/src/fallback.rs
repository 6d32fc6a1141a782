//! Forecast → advice → enrichment, with a single recovery to a known city.
//!
//! The first attempt uses the resolved location. If the provider fails, one
//! more attempt runs against a substitute picked from the fallback list, and
//! every resulting recommendation is annotated. There is no third attempt.

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::enrich::EnrichmentService;
use crate::error::AppError;
use crate::filter::DateRange;
use crate::models::{ClothingRecommendation, ResolvedLocation};
use crate::ports::{ForecastProvider, TextGenerator};

/// Recommendations for one location, in forecast order.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    /// Human-readable label of the location the forecast is for.
    pub location: String,
    pub items: Vec<ClothingRecommendation>,
}

/// How the recommendations were obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    /// The requested location worked.
    Direct(Recommendations),
    /// The requested location failed; these are for `substitute`.
    Substituted {
        recommendations: Recommendations,
        substitute: String,
    },
}

impl ForecastOutcome {
    pub fn recommendations(&self) -> &Recommendations {
        match self {
            ForecastOutcome::Direct(r) => r,
            ForecastOutcome::Substituted {
                recommendations, ..
            } => recommendations,
        }
    }

    pub fn into_recommendations(self) -> Recommendations {
        match self {
            ForecastOutcome::Direct(r) => r,
            ForecastOutcome::Substituted {
                recommendations, ..
            } => recommendations,
        }
    }

    pub fn substitute(&self) -> Option<&str> {
        match self {
            ForecastOutcome::Direct(_) => None,
            ForecastOutcome::Substituted { substitute, .. } => Some(substitute),
        }
    }
}

/// Picks the substitute for a failed location.
///
/// The city hint is the text before the first comma. The first list entry
/// containing the hint (case-insensitively) wins; otherwise the first entry.
/// Returns `None` only for an empty list.
///
/// # Examples
///
/// ```
/// use drape_core::fallback::pick_fallback;
///
/// let cities = vec!["New York, US".to_string(), "London, UK".to_string()];
/// assert_eq!(pick_fallback(&cities, "london, ontario"), Some("London, UK"));
/// assert_eq!(pick_fallback(&cities, "Nowhereville"), Some("New York, US"));
/// ```
pub fn pick_fallback<'a>(cities: &'a [String], failed_location: &str) -> Option<&'a str> {
    let hint = failed_location
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    cities
        .iter()
        .find(|city| city.to_lowercase().contains(&hint))
        .or_else(|| cities.first())
        .map(String::as_str)
}

/// Note appended to advice produced for a substitute location.
pub fn fallback_note(substitute: &str) -> String {
    format!("Note: Showing results for {} as fallback", substitute)
}

/// Label shown for a location once the provider has answered.
fn display_label(location: &ResolvedLocation, city_name: Option<String>) -> String {
    match location {
        ResolvedLocation::LocationLabel { text } => text.clone(),
        ResolvedLocation::Coordinate { lat, lon } => city_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Location ({:.2}, {:.2})", lat, lon)),
    }
}

/// Runs the forecast pipeline with at most one substitute-location retry.
pub struct FallbackCoordinator<F, T> {
    provider: F,
    enrichment: EnrichmentService<T>,
    fallback_cities: Vec<String>,
    concurrency: usize,
}

impl<F: ForecastProvider, T: TextGenerator> FallbackCoordinator<F, T> {
    pub fn new(
        provider: F,
        enrichment: EnrichmentService<T>,
        fallback_cities: Vec<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            enrichment,
            fallback_cities,
            concurrency: concurrency.max(1),
        }
    }

    /// Produces recommendations for `location` within `range`.
    ///
    /// # Errors
    ///
    /// Non-upstream errors from the first attempt are returned as-is. An
    /// upstream error from the substitute attempt is returned to the caller.
    pub async fn run(
        &self,
        location: &ResolvedLocation,
        range: &DateRange,
    ) -> Result<ForecastOutcome, AppError> {
        let first_error = match self.attempt(location, range).await {
            Ok(recommendations) => return Ok(ForecastOutcome::Direct(recommendations)),
            Err(e) if e.is_upstream() => e,
            Err(e) => return Err(e),
        };

        warn!("Weather provider failed for '{}': {}", location, first_error);
        let failed = location.to_string();
        let substitute = match pick_fallback(&self.fallback_cities, &failed) {
            Some(city) => city.to_string(),
            None => return Err(first_error),
        };
        info!("Using fallback location: {}", substitute);

        let mut recommendations = self
            .attempt(&ResolvedLocation::label(substitute.as_str()), range)
            .await
            .map_err(|e| {
                error!("Fallback location '{}' also failed: {}", substitute, e);
                e
            })?;

        let note = fallback_note(&substitute);
        for rec in &mut recommendations.items {
            rec.advice_text = format!("{} ({})", rec.advice_text, note);
            rec.location = substitute.clone();
            rec.fallback_note = Some(note.clone());
        }
        recommendations.location = substitute.clone();

        Ok(ForecastOutcome::Substituted {
            recommendations,
            substitute,
        })
    }

    /// One fetch → filter → advise → enrich pass.
    ///
    /// Enrichment runs concurrently but results keep forecast order.
    async fn attempt(
        &self,
        location: &ResolvedLocation,
        range: &DateRange,
    ) -> Result<Recommendations, AppError> {
        let forecast = self.provider.fetch(location).await?;
        let label = display_label(location, forecast.city_name);
        let points = range.filter(forecast.points);

        let items: Vec<ClothingRecommendation> = stream::iter(points.iter())
            .map(|point| self.enrichment.enrich(point, &label))
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(Recommendations {
            location: label,
            items,
        })
    }
}
