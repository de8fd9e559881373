use anyhow::Result;
use async_trait::async_trait;
use domain::{CaptchaChallenge, CommentPage, PageQuery, Submission};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ApiError;

#[async_trait]
pub trait CommentApi: Send + Sync {
    async fn list_comments(&self, query: &PageQuery) -> Result<CommentPage, ApiError>;

    async fn create_comment(&self, submission: Submission) -> Result<(), ApiError>;

    async fn fetch_captcha(&self) -> Result<CaptchaChallenge, ApiError>;
}

/// What a live-push driver reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSignal {
    Connected,
    Message(String),
    Disconnected,
}

#[async_trait]
pub trait LiveFeed: Send + Sync {
    /// Runs until cancelled or until the receiving side is dropped.
    async fn run(&self, tx: mpsc::Sender<FeedSignal>, cancel: CancellationToken) -> Result<()>;
}
