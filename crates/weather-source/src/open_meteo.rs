//! Open-Meteo forecast API client.
//!
//! One request returns hourly temperature, humidity, wind speed and cloud
//! cover for `past_days` before and `forecast_days` after today, in UTC.
//! Any of the four arrays may be missing from the response; individual
//! readings may be `null`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use weather_common::time::parse_timestamp;
use weather_common::WeatherSeries;

use crate::error::{FetchError, FetchResult};
use crate::{FetchRequest, WeatherSource};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly variables requested, in [`weather_common::Column::ALL`] order.
const HOURLY_VARIABLES: [&str; 4] = [
    "temperature_2m",
    "relative_humidity_2m",
    "wind_speed_10m",
    "cloud_cover",
];

#[derive(Debug, Clone)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("weather-art/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct OpenMeteoClient {
    client: Client,
    config: OpenMeteoConfig,
}

impl OpenMeteoClient {
    pub fn new(config: OpenMeteoConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenMeteoConfig {
        &self.config
    }
}

/// Query parameters for a request.
pub fn build_query(request: &FetchRequest) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", request.location.latitude.to_string()),
        ("longitude", request.location.longitude.to_string()),
        ("past_days", request.window.past_days.to_string()),
        ("forecast_days", request.window.forecast_days.to_string()),
        ("hourly", HOURLY_VARIABLES.join(",")),
        ("timezone", "UTC".to_string()),
        ("wind_speed_unit", "ms".to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Option<Vec<Option<f32>>>,
    relative_humidity_2m: Option<Vec<Option<f32>>>,
    wind_speed_10m: Option<Vec<Option<f32>>>,
    cloud_cover: Option<Vec<Option<f32>>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    reason: String,
}

/// Turn a forecast response body into an ordered series.
///
/// Rows are sorted by time and duplicate timestamps dropped (first wins);
/// `null` readings become NaN; a missing array becomes an absent column.
pub fn parse_response(body: &str) -> FetchResult<WeatherSeries> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let hourly = response
        .hourly
        .ok_or_else(|| FetchError::Decode("response has no 'hourly' block".to_string()))?;

    let timestamps = hourly
        .time
        .iter()
        .map(|s| parse_timestamp(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    let column = |values: Option<Vec<Option<f32>>>| {
        values.map(|v| v.into_iter().map(|x| x.unwrap_or(f32::NAN)).collect())
    };
    let columns = [
        column(hourly.temperature_2m),
        column(hourly.relative_humidity_2m),
        column(hourly.wind_speed_10m),
        column(hourly.cloud_cover),
    ];

    Ok(WeatherSeries::from_unordered(timestamps, columns)?)
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    fn name(&self) -> &str {
        "open-meteo"
    }

    #[instrument(skip(self, request), fields(location = %request.location.name))]
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<WeatherSeries> {
        debug!(url = %self.config.base_url, "Requesting forecast");

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&build_query(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.reason)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let series = parse_response(&body)?;
        info!(
            samples = series.len(),
            missing = ?series.missing_columns(),
            "Forecast received"
        );
        Ok(series)
    }
}
