use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use incident_store_client::IncidentStoreClient;
use vigil_feed::geocode::NominatimGeocoder;
use vigil_feed::location::{FixedGeolocation, NoGeolocation};
use vigil_feed::traits::GeolocationProvider;
use vigil_feed::{FeedConfig, FeedController, FeedStatus};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vigil=info".parse()?)
                .add_directive("incident_store_client=info".parse()?),
        )
        .init();

    let config = FeedConfig::from_env()?;

    let store = IncidentStoreClient::new(&config.store_url, config.store_token.as_deref())
        .context("Failed to build incident store client")?;
    let geocoder = NominatimGeocoder::new(&config.geocoder_url)?;
    let geolocation: Arc<dyn GeolocationProvider> = match config.device_location {
        Some(position) => Arc::new(FixedGeolocation::new(position)),
        None => Arc::new(NoGeolocation),
    };

    let feed = Arc::new(FeedController::new(
        Arc::new(store),
        geolocation,
        Arc::new(geocoder),
        &config,
    ));

    let status = feed.start().await;
    log_feed(&feed, &status);

    let refresh_loop = feed.spawn_refresh_loop();
    let mut ticker = tokio::time::interval(config.refresh_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down feed");
                break;
            }
            _ = ticker.tick() => {
                log_feed(&feed, &feed.status());
            }
        }
    }

    refresh_loop.stop();
    Ok(())
}

fn log_feed(feed: &FeedController, status: &FeedStatus) {
    match status {
        FeedStatus::Loading => info!("Feed loading"),
        FeedStatus::Ready { fetched_at } => {
            let views = feed.incident_views();
            info!(count = views.len(), %fetched_at, "Feed ready");
            for view in views.iter().take(5) {
                info!(
                    id = %view.id,
                    category = view.category_label,
                    severity = %view.severity,
                    zone = view.zone.as_deref().unwrap_or("-"),
                    up = view.upvotes,
                    down = view.downvotes,
                    media = view.media_count,
                    "Nearby incident"
                );
            }
        }
        FeedStatus::Unavailable { error, since } if feed.cache().is_empty() => {
            warn!(%error, %since, "Feed unavailable, nothing cached yet");
        }
        FeedStatus::Unavailable { error, since } => {
            warn!(%error, %since, cached = feed.cache().len(), "Feed unavailable, showing last snapshot");
        }
    }
}
