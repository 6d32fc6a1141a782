use async_trait::async_trait;
use chrono::NaiveDateTime;
use drape_core::config::HttpConfig;
use drape_core::error::AppError;
use drape_core::models::{Forecast, ForecastPoint, ResolvedLocation};
use drape_core::ports::ForecastProvider;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/";

const FORECAST_PATH: &str = "data/2.5/forecast";

/// Timestamp format of `dt_txt`, always UTC.
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Response of the 5 day / 3 hour forecast endpoint.
///
/// API reference: <https://openweathermap.org/forecast5>
///
/// Only the fields Drape uses are modelled:
/// ```json
/// {
///     "list": [
///         {
///             "dt_txt": "2024-03-01 12:00:00",
///             "main": { "temp": 7.4 },
///             "weather": [{ "description": "light rain" }]
///         }
///     ],
///     "city": { "name": "Boston" }
/// }
/// ```
#[derive(Deserialize, Debug)]
pub struct ForecastResponse {
    pub list: Vec<ForecastEntry>,
    pub city: Option<CityInfo>,
}

/// One three-hour slot of the forecast.
#[derive(Deserialize, Debug, Clone)]
pub struct ForecastEntry {
    pub dt_txt: String,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<WeatherSummary>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MainReadings {
    pub temp: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WeatherSummary {
    pub description: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CityInfo {
    pub name: Option<String>,
}

/// HTTP client for the OpenWeatherMap forecast API.
///
/// All requests use metric units, so temperatures are Celsius whether the
/// location is a place name or a coordinate pair.
///
/// # Examples
///
/// ```no_run
/// use drape_client::OpenWeatherClient;
/// use drape_core::{HttpConfig, ResolvedLocation};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OpenWeatherClient::new("your-api-key", &HttpConfig::default())?;
/// let forecast = client
///     .fetch_forecast(&ResolvedLocation::label("Boston, US"))
///     .await?;
/// println!("{} forecast points", forecast.points.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout_secs: u64,
}

impl OpenWeatherClient {
    /// Creates a client for the public OpenWeatherMap API.
    pub fn new(api_key: &str, http: &HttpConfig) -> Result<Self, AppError> {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL, http)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new_with_base_url(
        api_key: &str,
        base_url_str: &str,
        http: &HttpConfig,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url_str)
            .map_err(|_| AppError::InvalidUrl(format!("Invalid forecast URL: {}", base_url_str)))?;

        let client = Client::builder()
            .user_agent("Drape/0.1 (clothing-recommendations)")
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            timeout_secs: http.timeout.as_secs(),
        })
    }

    /// Builds the forecast URL for a place name or a coordinate pair.
    fn forecast_url(&self, location: &ResolvedLocation) -> Result<Url, AppError> {
        let mut url = self
            .base_url
            .join(FORECAST_PATH)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            match location {
                ResolvedLocation::Coordinate { lat, lon } => {
                    query
                        .append_pair("lat", &lat.to_string())
                        .append_pair("lon", &lon.to_string());
                }
                ResolvedLocation::LocationLabel { text } => {
                    query.append_pair("q", text);
                }
            }
            query
                .append_pair("appid", &self.api_key)
                .append_pair("units", "metric");
        }

        Ok(url)
    }

    /// Fetches the forecast for `location`, in provider (chronological) order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LocationNotFound` for HTTP 404,
    /// `AppError::RateLimitExceeded` for HTTP 429, `AppError::ClientError` for
    /// other error statuses or malformed payloads, and network/timeout errors
    /// for transport failures. No request is retried.
    pub async fn fetch_forecast(&self, location: &ResolvedLocation) -> Result<Forecast, AppError> {
        let url = self.forecast_url(location)?;
        debug!("Fetching forecast for {}", location);

        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {}", e))
            } else {
                AppError::ClientError(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => AppError::LocationNotFound(location.to_string()),
                StatusCode::TOO_MANY_REQUESTS => AppError::RateLimitExceeded,
                _ => AppError::ClientError(format!("HTTP {} for {}", status.as_u16(), location)),
            });
        }

        let body: ForecastResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("Failed to parse forecast: {}", e)))?;

        Self::into_forecast(body)
    }

    /// Converts the provider payload into Drape's forecast model.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` for unparseable timestamps or
    /// non-finite temperatures, and `AppError::EmptyResponse` when the
    /// forecast has no points.
    pub fn into_forecast(body: ForecastResponse) -> Result<Forecast, AppError> {
        if body.list.is_empty() {
            return Err(AppError::EmptyResponse);
        }

        let points = body
            .list
            .into_iter()
            .map(|entry| {
                let timestamp = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT)
                    .map_err(|_| {
                        AppError::ClientError(format!("Malformed forecast time: {}", entry.dt_txt))
                    })?;
                if !entry.main.temp.is_finite() {
                    return Err(AppError::ClientError(format!(
                        "Malformed temperature at {}",
                        entry.dt_txt
                    )));
                }
                Ok(ForecastPoint {
                    timestamp,
                    temperature_celsius: entry.main.temp,
                    weather_description: entry
                        .weather
                        .into_iter()
                        .next()
                        .map(|w| w.description)
                        .unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Forecast {
            city_name: body.city.and_then(|c| c.name),
            points,
        })
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherClient {
    async fn fetch(&self, location: &ResolvedLocation) -> Result<Forecast, AppError> {
        self.fetch_forecast(location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast_body() -> serde_json::Value {
        serde_json::json!({
            "cod": "200",
            "list": [
                {
                    "dt": 1709272800,
                    "dt_txt": "2024-03-01 06:00:00",
                    "main": { "temp": 3.2, "humidity": 80 },
                    "weather": [{ "id": 600, "main": "Snow", "description": "light snow" }]
                },
                {
                    "dt": 1709283600,
                    "dt_txt": "2024-03-01 09:00:00",
                    "main": { "temp": 5.9 },
                    "weather": [{ "description": "broken clouds" }]
                }
            ],
            "city": { "name": "Boston", "country": "US" }
        })
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = OpenWeatherClient::new_with_base_url("key", "not a url", &HttpConfig::default());
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn test_forecast_url_by_label() {
        let client = OpenWeatherClient::new("abc", &HttpConfig::default()).unwrap();
        let url = client
            .forecast_url(&ResolvedLocation::label("Paris, France"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/forecast?q=Paris%2C+France&appid=abc&units=metric"
        );
    }

    #[test]
    fn test_forecast_url_by_coordinates() {
        let client = OpenWeatherClient::new("abc", &HttpConfig::default()).unwrap();
        let url = client
            .forecast_url(&ResolvedLocation::Coordinate {
                lat: 40.7128,
                lon: -74.006,
            })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/forecast?lat=40.7128&lon=-74.006&appid=abc&units=metric"
        );
    }

    #[test]
    fn test_into_forecast() {
        let body: ForecastResponse = serde_json::from_value(forecast_body()).unwrap();
        let forecast = OpenWeatherClient::into_forecast(body).unwrap();

        assert_eq!(forecast.city_name.as_deref(), Some("Boston"));
        assert_eq!(forecast.points.len(), 2);
        assert_eq!(forecast.points[0].weather_description, "light snow");
        assert_eq!(forecast.points[1].temperature_celsius, 5.9);
        assert_eq!(
            forecast.points[1].timestamp.to_string(),
            "2024-03-01 09:00:00"
        );
    }

    #[test]
    fn test_into_forecast_rejects_bad_timestamp() {
        let body: ForecastResponse = serde_json::from_value(serde_json::json!({
            "list": [{ "dt_txt": "yesterday", "main": { "temp": 1.0 } }]
        }))
        .unwrap();
        assert!(matches!(
            OpenWeatherClient::into_forecast(body),
            Err(AppError::ClientError(_))
        ));
    }

    #[test]
    fn test_into_forecast_empty_list() {
        let body: ForecastResponse =
            serde_json::from_value(serde_json::json!({ "list": [] })).unwrap();
        assert!(matches!(
            OpenWeatherClient::into_forecast(body),
            Err(AppError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_fetch_by_label() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("q", "Boston, US"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new_with_base_url("test-key", &mock_server.uri(), &HttpConfig::default())
                .unwrap();
        let forecast = client
            .fetch(&ResolvedLocation::label("Boston, US"))
            .await
            .unwrap();

        assert_eq!(forecast.points.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_unknown_city_is_upstream_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new_with_base_url("test-key", &mock_server.uri(), &HttpConfig::default())
                .unwrap();
        let err = client
            .fetch(&ResolvedLocation::label("Nowhereville"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::LocationNotFound(ref l) if l == "Nowhereville"));
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new_with_base_url("test-key", &mock_server.uri(), &HttpConfig::default())
                .unwrap();
        let err = client
            .fetch(&ResolvedLocation::label("Boston, US"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ClientError(_)));
    }
}
