//! Traits for the external collaborators the pipeline talks to.
//!
//! Implementations live in `drape-client` (HTTP providers, identity) and
//! `drape-db` (persistence). The composition root constructs them and hands
//! them to the pipeline components explicitly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ClothingRecommendation, Forecast, NewSearch, OutfitVerdict, ResolvedLocation, SearchRecord,
};

/// Weather forecast provider. Temperatures are always Celsius.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetches the forecast for a coordinate pair or a place name.
    ///
    /// Any transport or API failure, including an unknown location, is an error
    /// for which [`AppError::is_upstream`] returns true.
    async fn fetch(&self, location: &ResolvedLocation) -> Result<Forecast, AppError>;
}

/// A single-turn chat request for a text-generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

/// Generative text backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model's reply text, trimmed.
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String, AppError>;
}

/// Vision-capable generative backend.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the model's free-text reply about the image at `image_url`.
    async fn describe_image(
        &self,
        system: &str,
        text: &str,
        image_url: &str,
        max_tokens: u32,
    ) -> Result<String, AppError>;
}

/// Durable storage for searches and outfit verdicts.
#[async_trait]
pub trait SearchStore: Send + Sync {
    async fn create_search(&self, search: &NewSearch) -> Result<Uuid, AppError>;

    /// Stores recommendations under `search_id`, preserving slice order.
    async fn add_recommendations(
        &self,
        search_id: Uuid,
        recommendations: &[ClothingRecommendation],
    ) -> Result<(), AppError>;

    /// Inserts or overwrites the verdict for `(user_id, image_url)`.
    async fn upsert_outfit_analysis(
        &self,
        user_id: &str,
        image_url: &str,
        verdict: &OutfitVerdict,
    ) -> Result<(), AppError>;

    /// Most recent searches first, each with recommendations in original order.
    async fn list_recent_searches(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, AppError>;
}

/// Turns a session token into a verified user id.
pub trait IdentityProvider: Send + Sync {
    /// Fails with [`AppError::Unauthorized`] for missing or invalid tokens.
    fn verify(&self, token: &str) -> Result<String, AppError>;
}
