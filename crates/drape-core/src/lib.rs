//! Drape Core - Domain types, clothing rules and the recommendation pipeline.

pub mod advice;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fallback;
pub mod filter;
pub mod location;
pub mod models;
pub mod outfit;
pub mod ports;
pub mod service;

pub use config::{
    default_config_path, load_catalog, parse_catalog, Catalog, DbConfig, HttpConfig, Landmark,
    PipelineConfig,
};
pub use enrich::EnrichmentService;
pub use error::{AppError, ErrorClass};
pub use fallback::{FallbackCoordinator, ForecastOutcome, Recommendations};
pub use filter::DateRange;
pub use location::{LocationResolver, ResolutionSoftFailure};
pub use models::{
    ClothingRecommendation, Forecast, ForecastPoint, NewSearch, OutfitAnalysisRecord,
    OutfitVerdict, ResolvedLocation, SearchRecord, TimeOfDay,
};
pub use outfit::OutfitAnalyzer;
pub use ports::{ChatPrompt, ForecastProvider, IdentityProvider, SearchStore, TextGenerator, VisionModel};
pub use service::{RecommendationRequest, RecommendationResponse, RecommendationService};
