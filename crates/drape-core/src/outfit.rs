//! Outfit appropriateness judgment.

use tracing::{error, info};

use crate::error::AppError;
use crate::models::OutfitVerdict;
use crate::ports::{SearchStore, VisionModel};

const FASHION_INSTRUCTION: &str = "You are a fashion expert. Analyze the outfit in the image and determine if it's appropriate for the given weather conditions. Consider the temperature and weather description. Provide specific feedback about what works and what doesn't, and suggest improvements if needed.";

const MAX_FEEDBACK_TOKENS: u32 = 300;

/// Reads an appropriateness verdict out of free-text feedback.
///
/// Positive wording ("appropriate", "suitable") means appropriate. Without it,
/// the reply is still appropriate unless it says "not appropriate" or
/// "not suitable". Because each negative phrase contains a positive word, any
/// reply containing a negative phrase also matches the first rule.
pub fn classify_appropriateness(feedback: &str) -> bool {
    let lower = feedback.to_lowercase();
    lower.contains("appropriate")
        || lower.contains("suitable")
        || !(lower.contains("not appropriate") || lower.contains("not suitable"))
}

/// Judges outfit photos with a vision model and records the verdicts.
pub struct OutfitAnalyzer<V, S> {
    vision: V,
    store: S,
}

impl<V: VisionModel, S: SearchStore> OutfitAnalyzer<V, S> {
    pub fn new(vision: V, store: S) -> Self {
        Self { vision, store }
    }

    /// Analyzes the outfit at `image_url` for the given weather.
    ///
    /// # Errors
    ///
    /// `AppError::ValidationError` for a blank image URL. A failed vision call
    /// is returned unchanged: there is no retry and no substitute feedback.
    /// Storage failures are logged and do not affect the verdict.
    pub async fn analyze(
        &self,
        image_url: &str,
        temperature_celsius: f64,
        weather_description: &str,
        user_id: &str,
    ) -> Result<OutfitVerdict, AppError> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Err(AppError::ValidationError(
                "Image URL is required".to_string(),
            ));
        }

        let question = format!(
            "Analyze this outfit for the following weather conditions: Temperature: {}°C, Weather: {}. Is this outfit appropriate?",
            temperature_celsius, weather_description
        );
        let feedback = self
            .vision
            .describe_image(FASHION_INSTRUCTION, &question, image_url, MAX_FEEDBACK_TOKENS)
            .await?;

        let verdict = OutfitVerdict {
            is_appropriate: classify_appropriateness(&feedback),
            feedback_text: feedback,
        };
        info!(
            "Outfit {} judged appropriate={}",
            image_url, verdict.is_appropriate
        );

        if let Err(e) = self
            .store
            .upsert_outfit_analysis(user_id, image_url, &verdict)
            .await
        {
            error!("Error saving outfit analysis for {}: {}", image_url, e);
        }

        Ok(verdict)
    }
}
