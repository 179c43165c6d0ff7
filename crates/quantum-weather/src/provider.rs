//! Open-Meteo forecast client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::instrument;

use crate::error::WeatherError;
use crate::payload::ForecastPayload;
use crate::request::{ForecastRequest, OPEN_METEO_URL};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("quantum/", env!("CARGO_PKG_VERSION"));

/// Anything that can turn a request into a payload.
///
/// The refresh controller is generic over this so scheduling can be
/// exercised without a network.
pub trait ForecastSource: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &ForecastRequest,
    ) -> impl Future<Output = Result<ForecastPayload, WeatherError>> + Send;
}

impl<T: ForecastSource> ForecastSource for Arc<T> {
    fn fetch(
        &self,
        request: &ForecastRequest,
    ) -> impl Future<Output = Result<ForecastPayload, WeatherError>> + Send {
        (**self).fetch(request)
    }
}

/// HTTP client for the forecast endpoint.
///
/// Issues exactly one GET per call and never retries.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Arc<Client>,
    base_url: String,
}

impl ForecastClient {
    /// Client against the public Open-Meteo endpoint.
    ///
    /// # Errors
    /// Returns `WeatherError::Transport` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_URL, timeout)
    }

    /// Client against an arbitrary endpoint (mirrors, mock servers).
    ///
    /// # Errors
    /// Returns `WeatherError::Transport` if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and decode the forecast for `request`.
    ///
    /// # Errors
    /// `Transport` when no response arrives, `Upstream` on a non-2xx status,
    /// `Schema` when the body is not a well-formed forecast.
    #[instrument(skip(self, request), fields(location = %request.location().label()), level = "info")]
    pub async fn fetch_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastPayload, WeatherError> {
        let url = request.url(&self.base_url).map_err(|e| {
            WeatherError::Transport(format!("invalid endpoint {}: {}", self.base_url, e))
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Forecast endpoint returned {}", status);
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;
        let payload = ForecastPayload::from_slice(&body)?;

        tracing::info!(
            hours = payload.hourly.len(),
            days = payload.daily.len(),
            "Forecast fetched"
        );
        Ok(payload)
    }
}

impl ForecastSource for ForecastClient {
    fn fetch(
        &self,
        request: &ForecastRequest,
    ) -> impl Future<Output = Result<ForecastPayload, WeatherError>> + Send {
        self.fetch_forecast(request)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::location::Location;
    use crate::request::{DAILY_VARIABLES, HOURLY_VARIABLES};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ForecastRequest {
        ForecastRequest::new(Location::new(48.9523, 89.1462, "Asia/Ulaanbaatar").unwrap())
    }

    fn client(server: &MockServer) -> ForecastClient {
        ForecastClient::with_base_url(
            &format!("{}/v1/forecast", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn body() -> serde_json::Value {
        serde_json::json!({
            "hourly": {"time": ["2025-11-06T00:00"], "temperature_2m": [-4.2]},
            "daily": {
                "time": ["2025-11-06", "2025-11-07"],
                "temperature_2m_max": [5, 3],
                "temperature_2m_min": [-10, -12]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_sends_fixed_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "48.9523"))
            .and(query_param("longitude", "89.1462"))
            .and(query_param("timezone", "Asia/Ulaanbaatar"))
            .and(query_param("hourly", HOURLY_VARIABLES.join(",")))
            .and(query_param("daily", DAILY_VARIABLES.join(",")))
            .and(query_param("forecast_days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .expect(1)
            .mount(&server)
            .await;

        let payload = client(&server).fetch_forecast(&request()).await.unwrap();

        let days = payload.daily_summaries();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].temperature_max, Some(5.0));
        assert_eq!(days[0].temperature_min, Some(-10.0));
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch_forecast(&request()).await.unwrap_err();

        assert_eq!(
            err,
            WeatherError::Upstream {
                status: 503,
                body: "busy".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_schema_error_on_missing_daily() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {"time": [], "temperature_2m": []}
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_forecast(&request()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Schema(_)));
    }

    #[tokio::test]
    async fn test_transport_error_when_unreachable() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let client =
            ForecastClient::with_base_url("http://127.0.0.1:9/v1/forecast", Duration::from_secs(2))
                .unwrap();

        let err = client.fetch_forecast(&request()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Transport(_)));
    }

    #[tokio::test]
    async fn test_through_source_trait() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .expect(1)
            .mount(&server)
            .await;

        let source = client(&server);
        let payload = source.fetch(&request()).await.unwrap();
        assert_eq!(payload.hourly.len(), 1);
    }
}
