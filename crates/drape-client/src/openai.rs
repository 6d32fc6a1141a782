use async_trait::async_trait;
use drape_core::config::HttpConfig;
use drape_core::error::AppError;
use drape_core::ports::{ChatPrompt, TextGenerator, VisionModel};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/";

const COMPLETIONS_PATH: &str = "v1/chat/completions";

/// HTTP client for the OpenAI chat completions API.
///
/// One client is bound to one model. The pipeline uses a text model for
/// location interpretation and shopping links, and a vision-capable model for
/// outfit analysis, so the composition root builds two clients.
///
/// # Examples
///
/// ```no_run
/// use drape_client::OpenAiClient;
/// use drape_core::{ChatPrompt, HttpConfig, TextGenerator};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OpenAiClient::new("your-api-key", "gpt-3.5-turbo", &HttpConfig::default())?;
/// let reply = client
///     .complete(&ChatPrompt {
///         system: "You are terse.".to_string(),
///         user: "Name a warm fabric.".to_string(),
///         temperature: None,
///         max_tokens: 10,
///     })
///     .await?;
/// println!("{}", reply);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

/// Request body for the chat completions API
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

/// Plain text, or a list of typed parts for multimodal input.
#[derive(Serialize, Debug)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageRef<'a> },
}

#[derive(Serialize, Debug)]
struct ImageRef<'a> {
    url: &'a str,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Error response from the OpenAI API
#[derive(Deserialize)]
struct OpenAiErrorBody {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[allow(dead_code)]
    code: Option<String>,
}

impl OpenAiClient {
    /// Creates a client for the public OpenAI API bound to `model`.
    pub fn new(api_key: &str, model: &str, http: &HttpConfig) -> Result<Self, AppError> {
        Self::new_with_base_url(api_key, model, DEFAULT_BASE_URL, http)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new_with_base_url(
        api_key: &str,
        model: &str,
        base_url_str: &str,
        http: &HttpConfig,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url_str)
            .map_err(|_| AppError::InvalidUrl(format!("Invalid OpenAI URL: {}", base_url_str)))?;

        let client = Client::builder()
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: http.timeout.as_secs(),
        })
    }

    /// Sends one chat request and returns the first choice's text, trimmed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::OpenAiError` for API errors (including a bad key),
    /// `AppError::RateLimitExceeded` for HTTP 429, `AppError::EmptyResponse`
    /// when the reply has no text, and network/timeout errors for transport
    /// failures.
    async fn send(&self, request: &ChatRequest<'_>) -> Result<String, AppError> {
        let url = self
            .base_url
            .join(COMPLETIONS_PATH)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;

        debug!("Chat completion with {} ({} tokens max)", self.model, request.max_tokens);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {}", e))
                } else {
                    AppError::ClientError(e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::RateLimitExceeded);
            }
            if status == StatusCode::UNAUTHORIZED {
                return Err(AppError::OpenAiError(
                    "401 Unauthorized - Invalid API key".to_string(),
                ));
            }

            let error_text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<OpenAiErrorBody>(&error_text) {
                return Err(AppError::OpenAiError(body.error.message));
            }
            return Err(AppError::OpenAiError(format!("HTTP {}", status)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("Failed to parse response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AppError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String, AppError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(&prompt.system),
                },
                Message {
                    role: "user",
                    content: MessageContent::Text(&prompt.user),
                },
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        };
        self.send(&request).await
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn describe_image(
        &self,
        system: &str,
        text: &str,
        image_url: &str,
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: MessageContent::Text(system),
                },
                Message {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text { text },
                        ContentPart::ImageUrl {
                            image_url: ImageRef { url: image_url },
                        },
                    ]),
                },
            ],
            temperature: None,
            max_tokens,
        };
        self.send(&request).await
    }
}
