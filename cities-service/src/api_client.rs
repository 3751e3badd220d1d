use async_trait::async_trait;
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::Coordinates;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Outcome of a single forecast-provider call
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Ok(f64),
    UpstreamError(String),
    Timeout,
    MalformedResponse,
}

impl From<Result<f64, AppError>> for FetchResult {
    fn from(result: Result<f64, AppError>) -> Self {
        match result {
            Ok(temperature) => FetchResult::Ok(temperature),
            Err(AppError::TimeoutError(_)) => FetchResult::Timeout,
            Err(AppError::ParseError(_)) => FetchResult::MalformedResponse,
            Err(e) => FetchResult::UpstreamError(e.to_string()),
        }
    }
}

/// Current-temperature lookup for one coordinate pair. No retries.
#[async_trait]
pub trait ForecastClient: Send + Sync {
    async fn fetch_current_temperature(&self, coords: Coordinates) -> FetchResult;
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
}

pub struct OpenMeteoClient {
    http_client: HttpClient,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url,
        })
    }

    fn forecast_url(&self, coords: Coordinates) -> String {
        format!(
            "{}?latitude={}&longitude={}&current_weather=true",
            self.base_url, coords.latitude, coords.longitude
        )
    }
}

#[async_trait]
impl ForecastClient for OpenMeteoClient {
    #[instrument(skip(self), fields(lat = coords.latitude, lon = coords.longitude))]
    async fn fetch_current_temperature(&self, coords: Coordinates) -> FetchResult {
        let url = self.forecast_url(coords);

        let result: FetchResult = self
            .http_client
            .get_json::<OpenMeteoResponse>(&url)
            .await
            .map(|body| body.current_weather.temperature)
            .into();

        match &result {
            FetchResult::Ok(temperature) => info!(temperature, "Fetched current temperature"),
            FetchResult::Timeout => warn!(
                timeout_ms = self.http_client.timeout().as_millis() as u64,
                "Forecast request timed out"
            ),
            FetchResult::MalformedResponse => warn!("Forecast response lacked a temperature"),
            FetchResult::UpstreamError(reason) => warn!(reason = %reason, "Forecast request failed"),
        }

        result
    }
}
