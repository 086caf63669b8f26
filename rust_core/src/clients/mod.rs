//! External data clients.

pub mod api_football;
pub mod feed;

pub use api_football::{ApiFootballClient, ApiUsage, LiveFixture};
pub use feed::{LiveFeedProvider, ThrottledFeed};
