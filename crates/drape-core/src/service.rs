//! Request-level orchestration of the recommendation pipeline.
//!
//! validate → resolve → forecast with fallback → best-effort persistence.

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::fallback::{FallbackCoordinator, ForecastOutcome};
use crate::filter::DateRange;
use crate::location::LocationResolver;
use crate::models::{ClothingRecommendation, NewSearch, ResolvedLocation};
use crate::ports::{ForecastProvider, SearchStore, TextGenerator};

/// Default number of searches returned by history listings.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A recommendation request as received from the outside.
#[derive(Debug, Clone, Default)]
pub struct RecommendationRequest {
    pub location: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Verified user id, if the caller is signed in.
    pub user_id: Option<String>,
}

/// What the caller gets back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitute: Option<String>,
    pub recommendations: Vec<ClothingRecommendation>,
    /// Id of the stored search, when persistence succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<Uuid>,
}

/// Entry point for recommendation requests.
pub struct RecommendationService<F, T, S> {
    resolver: LocationResolver<T>,
    coordinator: FallbackCoordinator<F, T>,
    store: S,
}

impl<F, T, S> RecommendationService<F, T, S>
where
    F: ForecastProvider,
    T: TextGenerator,
    S: SearchStore,
{
    pub fn new(
        resolver: LocationResolver<T>,
        coordinator: FallbackCoordinator<F, T>,
        store: S,
    ) -> Self {
        Self {
            resolver,
            coordinator,
            store,
        }
    }

    /// Runs the full pipeline for one request.
    ///
    /// # Errors
    ///
    /// `AppError::ValidationError` for a blank location or bad dates; the
    /// upstream error when both the requested and the substitute location
    /// fail. Interpretation and storage failures never surface.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, AppError> {
        if request.location.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Location is required".to_string(),
            ));
        }
        let range = DateRange::parse(request.start_date.as_deref(), request.end_date.as_deref())?;

        let location = self.interpret(&request.location).await;
        info!("Resolved location: {}", location);

        let outcome = self.coordinator.run(&location, &range).await?;
        let substitute = outcome.substitute().map(str::to_string);
        let coordinates = match &outcome {
            ForecastOutcome::Direct(_) => location.coordinates(),
            ForecastOutcome::Substituted { .. } => None,
        };
        let recommendations = outcome.into_recommendations();

        let search = NewSearch {
            user_id: request.user_id.clone(),
            location_label: recommendations.location.clone(),
            start_date: range.start,
            end_date: range.end,
            lat: coordinates.map(|(lat, _)| lat),
            lon: coordinates.map(|(_, lon)| lon),
        };
        let search_id = self.persist(&search, &recommendations.items).await;

        Ok(RecommendationResponse {
            location: recommendations.location,
            substitute,
            recommendations: recommendations.items,
            search_id,
        })
    }

    /// Best-effort write of a search and its recommendations.
    async fn persist(
        &self,
        search: &NewSearch,
        recommendations: &[ClothingRecommendation],
    ) -> Option<Uuid> {
        let search_id = match self.store.create_search(search).await {
            Ok(id) => id,
            Err(e) => {
                error!("Error saving search to database: {}", e);
                return None;
            }
        };

        match self.store.add_recommendations(search_id, recommendations).await {
            Ok(()) => {
                info!(
                    "Saved search {} with {} recommendations",
                    search_id,
                    recommendations.len()
                );
                Some(search_id)
            }
            Err(e) => {
                error!("Error saving recommendations for search {}: {}", search_id, e);
                None
            }
        }
    }

    /// Resolves a location, falling back to the raw text when interpretation
    /// is inconclusive.
    pub async fn interpret(&self, raw: &str) -> ResolvedLocation {
        match self.resolver.resolve(raw).await {
            Ok(location) => location,
            Err(soft_failure) => soft_failure.into_fallback(),
        }
    }
}
