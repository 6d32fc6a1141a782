//! Per-point enrichment: a shopping link and a weather icon.
//!
//! Neither step can fail from the caller's point of view. The shopping link
//! degrades to a locally built search URL, the icon to a fixed default.

use tracing::{debug, warn};
use url::Url;

use crate::advice;
use crate::models::{ClothingRecommendation, ForecastPoint};
use crate::ports::{ChatPrompt, TextGenerator};

/// Vendor search URL template prefix; the search terms follow it.
pub const SHOPPING_SEARCH_PREFIX: &str = "https://www.amazon.com/s?k=";

/// Icon used when the icon cannot be computed at all.
pub const DEFAULT_ICON_URL: &str = "https://openweathermap.org/img/wn/01d@2x.png";

const SHOPPING_INSTRUCTION: &str = "You are a shopping assistant. Given a clothing recommendation, respond with ONLY one Amazon search URL of the form https://www.amazon.com/s?k=<url-encoded search terms> for the item it recommends. Do not add any other text.";

/// Description fragments and their icon codes, matched in this order.
const ICON_CODES: &[(&str, &str)] = &[
    ("clear sky", "01"),
    ("few clouds", "02"),
    ("scattered clouds", "03"),
    ("broken clouds", "04"),
    ("shower rain", "09"),
    ("rain", "10"),
    ("thunderstorm", "11"),
    ("snow", "13"),
    ("mist", "50"),
];

const DEFAULT_ICON_CODE: &str = "01";

/// Builds the vendor search URL for `item` without any backend call.
///
/// # Examples
///
/// ```
/// use drape_core::enrich::fallback_shopping_link;
///
/// assert_eq!(
///     fallback_shopping_link("heavy coat"),
///     "https://www.amazon.com/s?k=heavy+coat"
/// );
/// ```
pub fn fallback_shopping_link(item: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(item.as_bytes()).collect();
    format!("{}{}", SHOPPING_SEARCH_PREFIX, encoded)
}

/// Accepts a backend reply only if it is a single well-formed template URL.
fn accept_shopping_link(reply: &str) -> Option<String> {
    let candidate = reply.trim();
    let terms = candidate.strip_prefix(SHOPPING_SEARCH_PREFIX)?;
    if terms.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }
    Url::parse(candidate).ok()?;
    Some(candidate.to_string())
}

/// Maps a weather description to its icon code, defaulting to clear sky.
pub fn icon_code(description: &str) -> &'static str {
    let lower = description.to_lowercase();
    ICON_CODES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_ICON_CODE)
}

/// Day icons for warm weather or clear/cloudy skies, night icons otherwise.
pub fn is_day_icon(description: &str, temperature_celsius: f64) -> bool {
    let lower = description.to_lowercase();
    temperature_celsius > 15.0 || lower.contains("clear") || lower.contains("clouds")
}

/// Full icon URL for a forecast point. Always a valid URL.
pub fn icon_url(description: &str, temperature_celsius: f64) -> String {
    if !temperature_celsius.is_finite() {
        warn!(
            "Non-finite temperature for \"{}\", using default icon",
            description
        );
        return DEFAULT_ICON_URL.to_string();
    }
    let suffix = if is_day_icon(description, temperature_celsius) {
        'd'
    } else {
        'n'
    };
    format!(
        "https://openweathermap.org/img/wn/{}{}@2x.png",
        icon_code(description),
        suffix
    )
}

/// Turns forecast points into fully enriched recommendations.
#[derive(Clone)]
pub struct EnrichmentService<T> {
    generator: T,
}

impl<T: TextGenerator> EnrichmentService<T> {
    pub fn new(generator: T) -> Self {
        Self { generator }
    }

    /// Asks the backend for a search URL, falling back to the local template.
    /// Never returns an empty string.
    pub async fn shopping_link(&self, advice_text: &str) -> String {
        let prompt = ChatPrompt {
            system: SHOPPING_INSTRUCTION.to_string(),
            user: advice_text.to_string(),
            temperature: Some(0.2),
            max_tokens: 100,
        };

        match self.generator.complete(&prompt).await {
            Ok(reply) => accept_shopping_link(&reply).unwrap_or_else(|| {
                debug!("Rejected shopping link reply {:?}, using template", reply);
                fallback_shopping_link(advice_text)
            }),
            Err(e) => {
                warn!("Shopping link generation failed: {}", e);
                fallback_shopping_link(advice_text)
            }
        }
    }

    /// Derives advice for `point` and attaches the link and icon.
    pub async fn enrich(&self, point: &ForecastPoint, location: &str) -> ClothingRecommendation {
        let advice = advice::derive(point);
        let shopping_link = self.shopping_link(advice.advice_text).await;

        ClothingRecommendation {
            timestamp: point.timestamp,
            time_of_day: advice.time_of_day,
            temperature_celsius: point.temperature_celsius,
            weather_description: point.weather_description.clone(),
            location: location.to_string(),
            advice_text: advice.advice_text.to_string(),
            shopping_link,
            icon_url: icon_url(&point.weather_description, point.temperature_celsius),
            fallback_note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::TimeOfDay;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    struct FixedReply(Result<&'static str, ()>);

    #[async_trait]
    impl TextGenerator for FixedReply {
        async fn complete(&self, _prompt: &ChatPrompt) -> Result<String, AppError> {
            self.0
                .map(str::to_string)
                .map_err(|_| AppError::OpenAiError("500 Internal Server Error".to_string()))
        }
    }

    #[test]
    fn test_fallback_link_is_form_encoded() {
        assert!(fallback_shopping_link("heavy coat").ends_with("heavy+coat"));
        assert_eq!(
            fallback_shopping_link("Wear a heavy coat, it will be cold"),
            "https://www.amazon.com/s?k=Wear+a+heavy+coat%2C+it+will+be+cold"
        );
    }

    #[test]
    fn test_accept_shopping_link() {
        assert_eq!(
            accept_shopping_link(" https://www.amazon.com/s?k=wool+coat\n"),
            Some("https://www.amazon.com/s?k=wool+coat".to_string())
        );
        assert_eq!(accept_shopping_link("https://www.amazon.com/s?k="), None);
        assert_eq!(accept_shopping_link("Try https://www.amazon.com/s?k=coat"), None);
        assert_eq!(accept_shopping_link("https://example.com/?k=coat"), None);
        assert_eq!(accept_shopping_link(""), None);
    }

    #[tokio::test]
    async fn test_shopping_link_uses_valid_reply() {
        let service = EnrichmentService::new(FixedReply(Ok("https://www.amazon.com/s?k=parka")));
        assert_eq!(
            service.shopping_link("Wear a heavy coat, it will be cold").await,
            "https://www.amazon.com/s?k=parka"
        );
    }

    #[tokio::test]
    async fn test_shopping_link_falls_back_on_error_and_junk() {
        let failing = EnrichmentService::new(FixedReply(Err(())));
        assert_eq!(
            failing.shopping_link("heavy coat").await,
            "https://www.amazon.com/s?k=heavy+coat"
        );

        let chatty = EnrichmentService::new(FixedReply(Ok("I recommend a nice coat!")));
        let link = chatty.shopping_link("heavy coat").await;
        assert!(!link.is_empty());
        assert!(link.ends_with("heavy+coat"));
    }

    #[test]
    fn test_icon_codes_follow_table_order() {
        assert_eq!(icon_code("Clear Sky"), "01");
        assert_eq!(icon_code("few clouds"), "02");
        assert_eq!(icon_code("overcast clouds"), "01");
        assert_eq!(icon_code("shower rain"), "09");
        assert_eq!(icon_code("light rain"), "10");
        assert_eq!(icon_code("thunderstorm"), "11");
        assert_eq!(icon_code("heavy snow"), "13");
        assert_eq!(icon_code("mist"), "50");
        assert_eq!(icon_code("volcanic ash"), "01");
    }

    #[test]
    fn test_icon_day_night_suffix() {
        assert_eq!(
            icon_url("light rain", 8.0),
            "https://openweathermap.org/img/wn/10n@2x.png"
        );
        assert_eq!(
            icon_url("light rain", 16.0),
            "https://openweathermap.org/img/wn/10d@2x.png"
        );
        assert_eq!(
            icon_url("broken clouds", -3.0),
            "https://openweathermap.org/img/wn/04d@2x.png"
        );
        assert_eq!(
            icon_url("clear sky", 2.0),
            "https://openweathermap.org/img/wn/01d@2x.png"
        );
    }

    #[test]
    fn test_icon_default_on_non_finite_temperature() {
        assert_eq!(icon_url("snow", f64::NAN), DEFAULT_ICON_URL);
    }

    #[tokio::test]
    async fn test_enrich_builds_full_recommendation() {
        let service = EnrichmentService::new(FixedReply(Err(())));
        let point = ForecastPoint {
            timestamp: NaiveDateTime::parse_from_str("2024-01-15 06:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            temperature_celsius: -2.0,
            weather_description: "light snow".to_string(),
        };

        let rec = service.enrich(&point, "Boston, US").await;

        assert_eq!(rec.time_of_day, TimeOfDay::EarlyMorning);
        assert_eq!(rec.advice_text, "Wear a heavy coat, it will be cold");
        assert_eq!(rec.location, "Boston, US");
        assert_eq!(
            rec.shopping_link,
            "https://www.amazon.com/s?k=Wear+a+heavy+coat%2C+it+will+be+cold"
        );
        assert_eq!(rec.icon_url, "https://openweathermap.org/img/wn/13n@2x.png");
        assert!(rec.fallback_note.is_none());
    }
}
