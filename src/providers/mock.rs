use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{IssueTracker, TrackerError};
use crate::model::remote_issue::RemoteIssue;

/// Scripted outcome of one `create_issue` call.
pub enum CreateOutcome {
    Created,
    RateLimited,
    Fail(u16),
}

/// An in-memory tracker that records every create call.
pub struct MockTracker {
    pub existing: Vec<RemoteIssue>,
    /// Titles of every create call, successful or not, in call order.
    pub attempts: Arc<Mutex<Vec<String>>>,
    /// Titles of issues that were actually created.
    pub created: Arc<Mutex<Vec<String>>>,
    script: Mutex<VecDeque<CreateOutcome>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self {
            existing: Vec::new(),
            attempts: Arc::new(Mutex::new(Vec::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_existing(mut self, titles: &[&str]) -> Self {
        let start = self.existing.len() as u64;
        self.existing.extend(titles.iter().enumerate().map(|(i, title)| RemoteIssue {
            number: start + i as u64 + 1,
            title: title.to_string(),
            url: None,
        }));
        self
    }

    /// Queue outcomes for the next create calls. Once exhausted, calls succeed.
    pub fn with_script(self, outcomes: Vec<CreateOutcome>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueTracker for MockTracker {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn list_issues(&self) -> Result<Vec<RemoteIssue>, TrackerError> {
        Ok(self.existing.clone())
    }

    async fn create_issue(&self, title: &str, _body: &str) -> Result<RemoteIssue, TrackerError> {
        self.attempts.lock().unwrap().push(title.to_string());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CreateOutcome::Created);

        match outcome {
            CreateOutcome::Created => {
                let mut created = self.created.lock().unwrap();
                created.push(title.to_string());
                Ok(RemoteIssue {
                    number: (self.existing.len() + created.len()) as u64,
                    title: title.to_string(),
                    url: None,
                })
            }
            CreateOutcome::RateLimited => Err(TrackerError::RateLimited(
                "API rate limit exceeded".into(),
            )),
            CreateOutcome::Fail(status) => Err(TrackerError::Api {
                status,
                message: "Mock failure".into(),
            }),
        }
    }
}
