use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{Error, Result, ToolError},
    plan::Units,
    tools::{USER_AGENT, WeatherApi, WeatherReading, request_error},
};

const API_BASE: &str = "https://api.openweathermap.org/data/2.5";

/// Current-weather lookups backed by the OpenWeather API.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    name: String,
    #[serde(default)]
    sys: Sys,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    dt: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Sys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    feels_like: f64,
    humidity: u64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("OpenWeather API key is required".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn current(&self, city: &str, units: Units) -> Result<WeatherReading, ToolError> {
        if city.trim().is_empty() {
            return Err(ToolError::invalid("city cannot be empty"));
        }
        info!(city, %units, "fetching current weather");

        let response = self
            .client
            .get(format!("{API_BASE}/weather"))
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", &units.to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                404 => ToolError::not_found(format!(
                    "city '{city}' not found, check the spelling or add a country code (e.g. 'London,GB')"
                )),
                401 => ToolError::invalid("invalid OpenWeather API key"),
                429 => ToolError::rate_limited("openweather api rate limit exceeded"),
                s if (500..600).contains(&s) => {
                    ToolError::network(format!("openweather api server error: {status}"))
                }
                _ => ToolError::other(format!("openweather api error: {status}")),
            });
        }

        let payload: WeatherResponse = response
            .json()
            .await
            .map_err(|e| ToolError::other(format!("failed to decode weather response: {e}")))?;

        let reading = WeatherReading {
            city: payload.name,
            country: payload.sys.country,
            temperature: payload.main.temp,
            feels_like: payload.main.feels_like,
            conditions: payload
                .weather
                .first()
                .map(|c| c.description.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            humidity: payload.main.humidity,
            wind_speed: payload.wind.speed,
            timestamp: payload.dt,
            units,
            error: None,
        };

        debug!(city = %reading.city, temperature = reading.temperature, "weather fetched");
        Ok(reading)
    }

    async fn compare(
        &self,
        cities: &[String],
        units: Units,
    ) -> Result<Vec<WeatherReading>, ToolError> {
        info!(count = cities.len(), "comparing weather across cities");
        let mut results = Vec::with_capacity(cities.len());

        for city in cities {
            match self.current(city, units).await {
                Ok(reading) => results.push(reading),
                Err(err) => {
                    debug!("weather for '{city}' failed: {err}");
                    results.push(WeatherReading::placeholder(city, err.to_string()));
                }
            }
        }

        Ok(results)
    }
}
