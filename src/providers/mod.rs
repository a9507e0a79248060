pub mod github;

use async_trait::async_trait;

use crate::model::remote_issue::RemoteIssue;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error: HTTP {status} — {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl TrackerError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, TrackerError::RateLimited(_))
    }
}

/// The service issues are migrated into.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    fn name(&self) -> &str;
    /// Every issue of the target project, open or closed.
    async fn list_issues(&self) -> Result<Vec<RemoteIssue>, TrackerError>;
    async fn create_issue(&self, title: &str, body: &str) -> Result<RemoteIssue, TrackerError>;
}

#[cfg(test)]
pub mod mock;
