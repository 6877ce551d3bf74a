use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use vigil_common::Coordinates;

use crate::cache::DEFAULT_STALE_AFTER;
use crate::location::FALLBACK_LOCATION;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Feed engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    // Incident store
    pub store_url: String,
    pub store_token: Option<String>,

    // Feed
    pub refresh_interval: Duration,
    pub stale_after: Duration,

    // Location
    pub fallback_location: Coordinates,
    pub device_location: Option<Coordinates>,
    pub geocoder_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_token: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            fallback_location: FALLBACK_LOCATION,
            device_location: None,
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let device_location = match (optional_f64("DEVICE_LAT")?, optional_f64("DEVICE_LNG")?) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };

        let config = Self {
            store_url: env::var("INCIDENT_STORE_URL").context("INCIDENT_STORE_URL is required")?,
            store_token: env::var("INCIDENT_STORE_TOKEN").ok().filter(|t| !t.is_empty()),
            refresh_interval: optional_secs("FEED_REFRESH_INTERVAL_SECS")?
                .unwrap_or(defaults.refresh_interval),
            stale_after: optional_secs("FEED_STALE_AFTER_SECS")?.unwrap_or(defaults.stale_after),
            fallback_location: Coordinates::new(
                optional_f64("FALLBACK_LAT")?.unwrap_or(defaults.fallback_location.lat),
                optional_f64("FALLBACK_LNG")?.unwrap_or(defaults.fallback_location.lng),
            ),
            device_location,
            geocoder_url: env::var("GEOCODER_URL").unwrap_or(defaults.geocoder_url),
        };
        anyhow::ensure!(
            !config.refresh_interval.is_zero(),
            "FEED_REFRESH_INTERVAL_SECS must be greater than zero"
        );

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  INCIDENT_STORE_URL: {}", self.store_url);
        tracing::info!(
            "  INCIDENT_STORE_TOKEN: {}",
            if self.store_token.is_some() { "<set>" } else { "<not set>" }
        );
        tracing::info!("  FEED_REFRESH_INTERVAL_SECS: {}", self.refresh_interval.as_secs());
        tracing::info!("  FEED_STALE_AFTER_SECS: {}", self.stale_after.as_secs());
        tracing::info!("  GEOCODER_URL: {}", self.geocoder_url);
        tracing::info!(
            "  DEVICE_LAT/DEVICE_LNG: {}",
            if self.device_location.is_some() { "<set>" } else { "<not set>" }
        );
    }
}

fn optional_f64(key: &str) -> Result<Option<f64>> {
    match env::var(key) {
        Ok(raw) => {
            let value: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a number, got {raw:?}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn optional_secs(key: &str) -> Result<Option<Duration>> {
    match env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_feed_policy() {
        let config = FeedConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.stale_after, Duration::from_secs(60));
        assert_eq!(config.fallback_location, Coordinates::new(18.9712, -72.2852));
        assert!(config.device_location.is_none());
    }
}
