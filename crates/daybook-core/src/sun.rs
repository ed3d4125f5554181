//! Sunrise and sunset lookup.
//!
//! Sun times are decoration on a timeline. Every failure here is reported
//! as a [`SunInfoError`] and the caller decides to carry on without them.

use crate::models::SunInfo;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tracing::debug;

/// Public endpoint used when no other is configured.
pub const DEFAULT_SUN_API_URL: &str = "https://api.sunrise-sunset.org/json";

#[derive(Error, Debug)]
pub enum SunInfoError {
    #[error("Sun info lookup is disabled")]
    Disabled,

    #[error("No coordinates configured for sun info lookup")]
    NoCoordinates,

    #[error("Sun info request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Sun info service answered with status {0}")]
    Status(String),

    #[error("Malformed sun info payload: {0}")]
    Payload(String),

    #[error("Sun info lookup timed out")]
    Timeout,
}

/// Anything that can tell sunrise and sunset for a place and day.
#[async_trait]
pub trait SunInfoSource: Send + Sync {
    async fn fetch_sun_info(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> Result<SunInfo, SunInfoError>;
}

/// A source that never answers. Used when sun lookup is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSunInfoSource;

#[async_trait]
impl SunInfoSource for DisabledSunInfoSource {
    async fn fetch_sun_info(&self, _: NaiveDate, _: f64, _: f64) -> Result<SunInfo, SunInfoError> {
        Err(SunInfoError::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct SunApiResponse {
    status: String,
    results: Option<SunApiResults>,
}

#[derive(Debug, Deserialize)]
struct SunApiResults {
    sunrise: String,
    sunset: String,
    day_length: i64,
}

/// Client for the sunrise-sunset.org JSON API (or anything speaking its
/// format with `formatted=0`).
#[derive(Debug, Clone)]
pub struct HttpSunInfoSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSunInfoSource {
    pub fn new(base_url: impl Into<String>, timeout: StdDuration) -> Result<Self, SunInfoError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SunInfoSource for HttpSunInfoSource {
    async fn fetch_sun_info(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> Result<SunInfo, SunInfoError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lng", longitude.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("formatted", "0".to_string()),
            ])
            .send()
            .await?;

        let http_status = response.status();
        let text = response.text().await?;
        if !http_status.is_success() {
            return Err(SunInfoError::Status(http_status.to_string()));
        }

        let sun_info = parse_sun_payload(&text)?;
        debug!(%date, sunrise = %sun_info.sunrise, sunset = %sun_info.sunset, "fetched sun info");
        Ok(sun_info)
    }
}

fn parse_sun_payload(text: &str) -> Result<SunInfo, SunInfoError> {
    let parsed: SunApiResponse =
        serde_json::from_str(text).map_err(|e| SunInfoError::Payload(e.to_string()))?;

    if parsed.status != "OK" {
        return Err(SunInfoError::Status(parsed.status));
    }
    let results = parsed
        .results
        .ok_or_else(|| SunInfoError::Payload("missing results".to_string()))?;

    Ok(SunInfo {
        sunrise: parse_instant(&results.sunrise)?,
        sunset: parse_instant(&results.sunset)?,
        day_length: Duration::seconds(results.day_length),
    })
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, SunInfoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SunInfoError::Payload(format!("bad timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    const OK_BODY: &str = r#"{
        "results": {
            "sunrise": "2024-01-03T12:19:43+00:00",
            "sunset": "2024-01-03T21:41:27+00:00",
            "solar_noon": "2024-01-03T17:00:35+00:00",
            "day_length": 33704
        },
        "status": "OK",
        "tzid": "UTC"
    }"#;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
    }

    #[test]
    fn test_parse_sun_payload() {
        let info = parse_sun_payload(OK_BODY).unwrap();
        assert_eq!(info.sunrise, Utc.with_ymd_and_hms(2024, 1, 3, 12, 19, 43).unwrap());
        assert_eq!(info.sunset, Utc.with_ymd_and_hms(2024, 1, 3, 21, 41, 27).unwrap());
        assert_eq!(info.day_length, Duration::seconds(33704));
    }

    #[test]
    fn test_parse_sun_payload_rejects_bad_status() {
        let err = parse_sun_payload(r#"{"results": null, "status": "INVALID_REQUEST"}"#).unwrap_err();
        assert!(matches!(err, SunInfoError::Status(s) if s == "INVALID_REQUEST"));
    }

    #[test]
    fn test_parse_sun_payload_rejects_garbage() {
        assert!(matches!(parse_sun_payload("not json"), Err(SunInfoError::Payload(_))));
        let bad_time = OK_BODY.replace("2024-01-03T12:19:43+00:00", "sometime");
        assert!(matches!(parse_sun_payload(&bad_time), Err(SunInfoError::Payload(_))));
    }

    #[tokio::test]
    async fn test_http_source_sends_query_and_parses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "40.7".into()),
                Matcher::UrlEncoded("lng".into(), "-74".into()),
                Matcher::UrlEncoded("date".into(), "2024-01-03".into()),
                Matcher::UrlEncoded("formatted".into(), "0".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let source = HttpSunInfoSource::new(format!("{}/json", server.url()), StdDuration::from_secs(2)).unwrap();
        let info = source.fetch_sun_info(day(), 40.7, -74.0).await.unwrap();

        mock.assert_async().await;
        assert_eq!(info.day_length, Duration::seconds(33704));
    }

    #[tokio::test]
    async fn test_http_source_reports_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let source = HttpSunInfoSource::new(format!("{}/json", server.url()), StdDuration::from_secs(2)).unwrap();
        let err = source.fetch_sun_info(day(), 0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, SunInfoError::Status(_)));
    }

    #[test]
    fn test_disabled_source() {
        let err = tokio_test::block_on(DisabledSunInfoSource.fetch_sun_info(day(), 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, SunInfoError::Disabled));
    }
}
