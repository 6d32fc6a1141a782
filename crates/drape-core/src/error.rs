use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents every error that can leave a Drape operation. It uses the
/// `thiserror` crate for ergonomic error handling and automatic conversion from
/// underlying library errors.
///
/// # Error Conversion
///
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// Location interpretation failures are deliberately absent: they are recovered
/// locally and are modelled by [`crate::location::ResolutionSoftFailure`].
///
/// # Examples
///
/// ```
/// use drape_core::error::AppError;
///
/// let err = AppError::LocationNotFound("Nowhereville".to_string());
/// assert!(err.is_upstream());
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Writes from the pipeline are best effort, so callers usually log this
    /// variant instead of returning it.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client request failed or the provider answered with an error status.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// OpenAI API call failed.
    #[error("OpenAI error: {0}")]
    OpenAiError(String),

    /// The forecast provider does not know the requested location.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Missing or malformed request input.
    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// Missing or invalid session token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Catalog or settings file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// API response contained no data.
    #[error("Empty response from API")]
    EmptyResponse,

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

/// How an error should surface to whoever issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was wrong (HTTP 400 equivalent).
    Client,
    /// Missing or invalid credentials (HTTP 401 equivalent).
    Unauthorized,
    /// Something failed on our side or upstream (HTTP 500 equivalent).
    Server,
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check DATABASE_URL."
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::ClientError(msg) => {
                if msg.contains("401") {
                    "The weather provider rejected the API key.\n   Check OPENWEATHER_API_KEY."
                        .to_string()
                } else {
                    format!("Weather provider error: {}", msg)
                }
            }
            AppError::OpenAiError(msg) => {
                if msg.contains("401") || msg.contains("invalid_api_key") {
                    "Invalid OpenAI API key.\n   Check your OPENAI_API_KEY environment variable."
                        .to_string()
                } else if msg.contains("insufficient_quota") {
                    "OpenAI quota exceeded.\n   Check your account billing.".to_string()
                } else {
                    format!("OpenAI error: {}", msg)
                }
            }
            AppError::LocationNotFound(location) => format!(
                "No forecast is available for '{}'.\n   Try a city name such as \"Paris, France\".",
                location
            ),
            AppError::ValidationError(msg) => msg.clone(),
            AppError::Unauthorized(_) => {
                "You need to be signed in.\n   Pass a valid session token with --token.".to_string()
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The provider may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::EmptyResponse => {
                "The provider returned no data. It may be temporarily unavailable.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error came from an unreliable upstream provider.
    ///
    /// Only these errors make the forecast pipeline try a substitute location.
    ///
    /// # Examples
    ///
    /// ```
    /// use drape_core::error::AppError;
    ///
    /// assert!(AppError::Timeout(30).is_upstream());
    /// assert!(!AppError::ValidationError("location is required".to_string()).is_upstream());
    /// ```
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::ClientError(_)
                | AppError::OpenAiError(_)
                | AppError::LocationNotFound(_)
                | AppError::SerializationError(_)
                | AppError::EmptyResponse
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::RateLimitExceeded
        )
    }

    /// Classifies the error for response mapping.
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::ValidationError(_) | AppError::InvalidUrl(_) => ErrorClass::Client,
            AppError::Unauthorized(_) => ErrorClass::Unauthorized,
            _ => ErrorClass::Server,
        }
    }
}
