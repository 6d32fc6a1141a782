//! Configuration types for Drape components.
//!
//! Runtime knobs (`HttpConfig`, `DbConfig`, `PipelineConfig`) carry defaults;
//! the lookup tables used by location resolution and forecast fallback live in
//! [`Catalog`], which can be overridden by a TOML file.
//!
//! # Catalog file
//!
//! ```toml
//! fallback_cities = ["Lisbon, Portugal", "Porto, Portugal"]
//!
//! [[landmarks]]
//! phrase = "city of seven hills"
//! location = "Lisbon, Portugal"
//! ```
//!
//! Entries are matched in file order, so earlier entries win ties.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

/// Database connection pool configuration.
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// HTTP client configuration for external API calls.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Recommendation pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of forecast points enriched at the same time.
    pub enrichment_concurrency: usize,
    /// Chat model used for location interpretation and shopping links.
    pub text_model: String,
    /// Vision-capable model used for outfit analysis.
    pub vision_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enrichment_concurrency: 8,
            text_model: "gpt-3.5-turbo".to_string(),
            vision_model: "gpt-4o".to_string(),
        }
    }
}

/// A descriptive phrase that maps to a known place.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Landmark {
    pub phrase: String,
    pub location: String,
}

const DEFAULT_LANDMARKS: &[(&str, &str)] = &[
    (
        "often world champs and home of the school that's better than yale",
        "Cambridge, US",
    ),
    ("home of the school that's better than yale", "Cambridge, US"),
    ("home of the red sox", "Boston, US"),
    ("city of lights", "Paris, France"),
    ("city of lights and love", "Paris, France"),
    ("big apple", "New York, US"),
    ("windy city", "Chicago, US"),
    ("city by the bay", "San Francisco, US"),
    ("emerald city", "Seattle, US"),
];

const DEFAULT_FALLBACK_CITIES: &[&str] = &[
    "New York, US",
    "London, UK",
    "Paris, France",
    "Boston, US",
    "Cambridge, US",
    "San Francisco, US",
    "Los Angeles, US",
    "Chicago, US",
    "Seattle, US",
    "Toronto, Canada",
];

/// Ordered lookup tables. Iteration order is significant: the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub landmarks: Vec<Landmark>,
    pub fallback_cities: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            landmarks: DEFAULT_LANDMARKS
                .iter()
                .map(|(phrase, location)| Landmark {
                    phrase: phrase.to_string(),
                    location: location.to_string(),
                })
                .collect(),
            fallback_cities: DEFAULT_FALLBACK_CITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// On-disk shape of the catalog file. Absent tables keep their defaults.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    landmarks: Option<Vec<Landmark>>,
    fallback_cities: Option<Vec<String>>,
}

/// Returns the default catalog location: `~/.config/drape/catalog.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("drape").join("catalog.toml"))
}

/// Parses catalog TOML text on top of the embedded defaults.
pub fn parse_catalog(text: &str) -> Result<Catalog, AppError> {
    let file: CatalogFile =
        toml::from_str(text).map_err(|e| AppError::ConfigError(e.to_string()))?;

    let mut catalog = Catalog::default();
    if let Some(landmarks) = file.landmarks {
        catalog.landmarks = landmarks
            .into_iter()
            .map(|l| {
                let phrase = l.phrase.trim().to_lowercase();
                if phrase.is_empty() {
                    return Err(AppError::ConfigError(format!(
                        "landmark phrase for '{}' must not be empty",
                        l.location
                    )));
                }
                Ok(Landmark {
                    phrase,
                    location: l.location,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
    }
    if let Some(cities) = file.fallback_cities {
        if cities.is_empty() {
            return Err(AppError::ConfigError(
                "fallback_cities must contain at least one city".to_string(),
            ));
        }
        catalog.fallback_cities = cities;
    }

    Ok(catalog)
}

/// Loads the catalog from `path`, or from the default path when `None`.
///
/// A missing default file is not an error; a missing explicit path is.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, AppError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(Catalog::default()),
        },
    };

    if !path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "catalog file not found: {}",
                path.display()
            )));
        }
        return Ok(Catalog::default());
    }

    let text = std::fs::read_to_string(&path)
        .map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))?;
    tracing::info!("Loaded catalog from {}", path.display());
    parse_catalog(&text)
}
