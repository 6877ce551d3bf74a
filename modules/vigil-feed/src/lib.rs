pub mod cache;
pub mod config;
pub mod controller;
pub mod geocode;
pub mod location;
pub mod ranker;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod vote;

pub use cache::FeedCache;
pub use config::FeedConfig;
pub use controller::{FeedController, FeedStatus, RefreshLoop};
pub use location::{LocationError, ReportLocator, FALLBACK_LOCATION};
pub use ranker::rank;
pub use vote::{VoteMutator, VoteOutcome};
