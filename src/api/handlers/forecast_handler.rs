//! Sample protected resource.
//!
//! A small forecast-shaped payload gated behind bearer authentication,
//! useful for exercising the authorization flow end to end.

use axum::{response::Json, routing::get, Router};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::errors::AppResult;

const SUMMARIES: &[&str] = &[
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot", "Sweltering",
    "Scorching",
];

/// A single day's forecast
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherForecast {
    /// Forecast date
    #[schema(example = "2024-01-16")]
    pub date: chrono::NaiveDate,
    /// Temperature in Celsius
    #[schema(example = 21)]
    pub temperature_c: i32,
    /// Temperature in Fahrenheit
    #[schema(example = 69)]
    pub temperature_f: i32,
    /// One-word description
    #[schema(example = "Mild")]
    pub summary: &'static str,
}

impl WeatherForecast {
    fn random(days_ahead: i64) -> Self {
        let mut rng = rand::thread_rng();
        let temperature_c = rng.gen_range(-20..=55);
        Self {
            date: (Utc::now() + Duration::days(days_ahead)).date_naive(),
            temperature_c,
            temperature_f: 32 + (temperature_c as f64 / 0.5556) as i32,
            summary: SUMMARIES[rng.gen_range(0..SUMMARIES.len())],
        }
    }
}

/// Create forecast routes (mounted behind the authentication gate)
pub fn forecast_routes() -> Router<AppState> {
    Router::new().route("/weatherforecast", get(get_forecast))
}

/// Get a five-day forecast
#[utoipa::path(
    get,
    path = "/weatherforecast",
    tag = "Sample",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Five-day forecast", body = [WeatherForecast]),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn get_forecast() -> AppResult<Json<Vec<WeatherForecast>>> {
    let forecast = (1..=5).map(WeatherForecast::random).collect();
    Ok(Json(forecast))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forecast_returns_five_days_in_range() {
        let Json(forecast) = get_forecast().await.unwrap();

        assert_eq!(forecast.len(), 5);
        for day in &forecast {
            assert!((-20..=55).contains(&day.temperature_c));
            assert!(SUMMARIES.contains(&day.summary));
        }
    }
}
