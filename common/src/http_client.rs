use crate::errors::AppError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// HTTP client with a hard per-request timeout.
///
/// Performs exactly one attempt per call; callers own any retry policy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch JSON from URL, distinguishing timeouts, HTTP status failures,
    /// transport errors and undecodable bodies.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T>(&self, url: &str) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| AppError::timeout(format!("Request to {} timed out", url)))?
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(format!("Request to {} timed out", url))
                } else {
                    AppError::NetworkError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned non-success status");
            return Err(AppError::http(
                status.as_u16(),
                format!("HTTP error: {}", status),
            ));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::timeout(format!("Reading body from {} timed out", url))
            } else {
                AppError::NetworkError(e)
            }
        })?;
        let json: T = serde_json::from_str(&text).map_err(AppError::ParseError)?;

        debug!(bytes = text.len(), "Request successful");
        Ok(json)
    }
}
