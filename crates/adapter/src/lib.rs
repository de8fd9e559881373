mod error;
mod live;
mod rest;
mod traits;

#[cfg(test)]
mod testing;

pub use error::ApiError;
pub use live::{live_url, WsFeed};
pub use rest::RestClient;
pub use traits::{CommentApi, FeedSignal, LiveFeed};
