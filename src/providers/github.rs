use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IssueTracker, TrackerError};
use crate::model::remote_issue::RemoteIssue;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!("jira-import/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client scoped to one repository.
pub struct GitHubTracker {
    api_url: String,
    repo: String,
    auth_header: String,
    client: reqwest::Client,
}

impl GitHubTracker {
    /// `repo` is `owner/name`. A personal access token works as `password`.
    pub fn new(
        api_url: &str,
        repo: String,
        username: &str,
        password: &str,
    ) -> Result<Self, TrackerError> {
        let creds = format!("{username}:{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            repo,
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.api_url, self.repo)
    }
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    html_url: Option<String>,
}

impl From<GhIssue> for RemoteIssue {
    fn from(issue: GhIssue) -> Self {
        RemoteIssue {
            number: issue.number,
            title: issue.title,
            url: issue.html_url,
        }
    }
}

#[derive(Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct GhErrorBody {
    message: Option<String>,
}

/// Turn a non-success response into a [`TrackerError`].
///
/// GitHub reports both the primary and the secondary rate limit as 403; the
/// former sets `x-ratelimit-remaining: 0`, the latter only says so in the
/// message.
async fn error_from_response(resp: reqwest::Response) -> TrackerError {
    let status = resp.status();
    let exhausted = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GhErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(text);

    let rate_limited = status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || (status == reqwest::StatusCode::FORBIDDEN
            && (exhausted || message.to_lowercase().contains("rate limit")));

    if rate_limited {
        TrackerError::RateLimited(message)
    } else {
        TrackerError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn list_issues(&self) -> Result<Vec<RemoteIssue>, TrackerError> {
        let mut issues = Vec::new();

        for page in 1u32.. {
            let resp = self
                .client
                .get(self.issues_url())
                .header("Authorization", &self.auth_header)
                .header("Accept", "application/vnd.github+json")
                .query(&[("state", "all")])
                .query(&[("per_page", PAGE_SIZE as u32), ("page", page)])
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(error_from_response(resp).await);
            }

            let batch: Vec<GhIssue> = resp
                .json()
                .await
                .map_err(|e| TrackerError::Decode(format!("issue list: {e}")))?;
            let count = batch.len();
            debug!(repo = %self.repo, page, count, "fetched issue page");

            issues.extend(batch.into_iter().map(RemoteIssue::from));
            if count < PAGE_SIZE {
                break;
            }
        }

        Ok(issues)
    }

    async fn create_issue(&self, title: &str, body: &str) -> Result<RemoteIssue, TrackerError> {
        let resp = self
            .client
            .post(self.issues_url())
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/vnd.github+json")
            .json(&NewIssue { title, body })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let issue: GhIssue = resp
            .json()
            .await
            .map_err(|e| TrackerError::Decode(format!("created issue: {e}")))?;
        debug!(repo = %self.repo, number = issue.number, "created issue");
        Ok(issue.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header, header_exists, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const ISSUES_PATH: &str = "/repos/octo/kadeutsch/issues";

    fn tracker(server: &MockServer) -> GitHubTracker {
        GitHubTracker::new(&server.uri(), "octo/kadeutsch".into(), "user", "secret").unwrap()
    }

    fn issue_json(number: u64, title: &str) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "title": title,
            "html_url": format!("https://github.com/octo/kadeutsch/issues/{number}"),
            "state": "open",
        })
    }

    fn rate_limit_body() -> serde_json::Value {
        serde_json::json!({
            "message": "API rate limit exceeded for user ID 1.",
            "documentation_url": "https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting",
        })
    }

    // ── list_issues() ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn list_issues_requests_all_states_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .and(query_param("state", "all"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "1"))
            .and(header("Authorization", "Basic dXNlcjpzZWNyZXQ="))
            .and(header_exists("User-Agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                issue_json(1, "[KA-1] First"),
                issue_json(2, "Unrelated"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let issues = tracker(&server).list_issues().await.unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].number, 1);
        assert_eq!(issues[0].title, "[KA-1] First");
        assert_eq!(
            issues[0].url.as_deref(),
            Some("https://github.com/octo/kadeutsch/issues/1")
        );
    }

    #[tokio::test]
    async fn list_issues_follows_pages_until_short_page() {
        let server = MockServer::start().await;
        let full_page: Vec<serde_json::Value> = (1..=100)
            .map(|n| issue_json(n, &format!("[KA-{n}] Item")))
            .collect();

        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([issue_json(101, "[KA-101] Last")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let issues = tracker(&server).list_issues().await.unwrap();
        assert_eq!(issues.len(), 101);
        assert_eq!(issues[100].tracker_key(), Some("KA-101".to_string()));
    }

    #[tokio::test]
    async fn list_issues_empty_repository() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let issues = tracker(&server).list_issues().await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn list_issues_not_found_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "message": "Not Found" })),
            )
            .mount(&server)
            .await;

        let err = tracker(&server).list_issues().await.unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Api { status: 404, ref message } if message == "Not Found"
        ));
    }

    #[tokio::test]
    async fn list_issues_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = tracker(&server).list_issues().await.unwrap_err();
        assert!(matches!(err, TrackerError::Decode(_)));
    }

    // ── create_issue() ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_issue_posts_title_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ISSUES_PATH))
            .and(header("Authorization", "Basic dXNlcjpzZWNyZXQ="))
            .and(body_json(serde_json::json!({
                "title": "[KA-5] Broken link",
                "body": "Created: today\n",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(issue_json(42, "[KA-5] Broken link")))
            .expect(1)
            .mount(&server)
            .await;

        let issue = tracker(&server)
            .create_issue("[KA-5] Broken link", "Created: today\n")
            .await
            .unwrap();
        assert_eq!(issue.number, 42);
        assert_eq!(issue.tracker_key(), Some("KA-5".to_string()));
    }

    #[tokio::test]
    async fn exhausted_quota_is_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ISSUES_PATH))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .set_body_json(rate_limit_body()),
            )
            .mount(&server)
            .await;

        let err = tracker(&server).create_issue("t", "b").await.unwrap_err();
        assert!(err.is_rate_limit());
        assert!(err.to_string().contains("API rate limit exceeded"));
    }

    #[tokio::test]
    async fn secondary_rate_limit_is_detected_from_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ISSUES_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "You have exceeded a secondary rate limit. Please wait a few minutes before you try again.",
            })))
            .mount(&server)
            .await;

        let err = tracker(&server).create_issue("t", "b").await.unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ISSUES_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = tracker(&server).create_issue("t", "b").await.unwrap_err();
        assert!(matches!(err, TrackerError::RateLimited(ref m) if m == "slow down"));
    }

    #[tokio::test]
    async fn forbidden_without_rate_limit_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ISSUES_PATH))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "4999")
                    .set_body_json(serde_json::json!({ "message": "Resource not accessible by integration" })),
            )
            .mount(&server)
            .await;

        let err = tracker(&server).create_issue("t", "b").await.unwrap_err();
        assert!(!err.is_rate_limit());
        assert!(matches!(err, TrackerError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn validation_failure_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ISSUES_PATH))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({ "message": "Validation Failed" })),
            )
            .mount(&server)
            .await;

        let err = tracker(&server).create_issue("", "b").await.unwrap_err();
        assert_eq!(err.to_string(), "API error: HTTP 422 — Validation Failed");
    }

    #[test]
    fn trailing_slash_in_api_url_is_ignored() {
        let t = GitHubTracker::new("https://ghe.example.org/api/v3/", "a/b".into(), "u", "p")
            .unwrap();
        assert_eq!(t.issues_url(), "https://ghe.example.org/api/v3/repos/a/b/issues");
    }
}
