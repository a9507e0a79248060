use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::model::jira_item::JiraItem;
use crate::model::remote_issue::RemoteIssue;
use crate::providers::IssueTracker;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Pause after every successfully created issue.
    pub delay: Duration,
    /// Pause after a rate-limit error before the same item is tried again.
    pub rate_limit_delay: Duration,
}

/// What a run is going to do, computed before anything is created.
#[derive(Debug)]
pub struct ImportPlan<'a> {
    /// Items to create, in export order.
    pub to_create: Vec<&'a JiraItem>,
    /// Number of export items that already exist on the target.
    pub already_present: usize,
    /// Keys found on the target that are not in the export. Never acted on.
    pub orphaned: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    /// Keys of the created issues, in creation order.
    pub created: Vec<String>,
    pub rate_limit_retries: u32,
}

/// Keys present on exactly one side.
pub fn missing_keys(source: &BTreeSet<String>, target: &BTreeSet<String>) -> BTreeSet<String> {
    source.symmetric_difference(target).cloned().collect()
}

/// Keys recovered from the titles of the target's issues.
pub fn existing_keys(issues: &[RemoteIssue]) -> BTreeSet<String> {
    issues.iter().filter_map(RemoteIssue::tracker_key).collect()
}

pub fn plan_import<'a>(items: &'a [JiraItem], existing: &[RemoteIssue]) -> ImportPlan<'a> {
    let source: BTreeSet<String> = items.iter().map(|i| i.id.clone()).collect();
    let target = existing_keys(existing);
    let missing = missing_keys(&source, &target);

    let mut seen = BTreeSet::new();
    let mut to_create = Vec::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            warn!(key = %item.id, "duplicate key in export, keeping the first occurrence");
            continue;
        }
        if missing.contains(&item.id) {
            to_create.push(item);
        }
    }

    let orphaned: Vec<String> = missing
        .iter()
        .filter(|key| !source.contains(*key))
        .cloned()
        .collect();

    ImportPlan {
        already_present: source.len() - to_create.len(),
        to_create,
        orphaned,
    }
}

/// Create every planned item, one after the other.
///
/// A rate-limit error pauses and retries the same item for as long as it
/// takes. Any other error aborts the run; issues created so far stay created.
pub async fn run_import(
    tracker: &dyn IssueTracker,
    plan: &ImportPlan<'_>,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for item in &plan.to_create {
        let title = item.issue_title();
        if title != item.title {
            warn!(key = %item.id, "exported title lacks its key, prefixing it");
        }
        let body = item.format_body();
        loop {
            match tracker.create_issue(&title, &body).await {
                Ok(issue) => {
                    summary.created.push(item.id.clone());
                    println!("Created issue #{}: {}", summary.created.len(), title);
                    debug!(key = %item.id, number = issue.number, url = ?issue.url, "issue created");
                    tokio::time::sleep(options.delay).await;
                    break;
                }
                Err(e) if e.is_rate_limit() => {
                    summary.rate_limit_retries += 1;
                    warn!(
                        key = %item.id,
                        error = %e,
                        retry_in = ?options.rate_limit_delay,
                        "rate limited, retrying the same item"
                    );
                    tokio::time::sleep(options.rate_limit_delay).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "Failed to create {} issue for {} after {} were created",
                            tracker.name(),
                            item.id,
                            summary.created.len()
                        )
                    });
                }
            }
        }
    }

    info!(
        created = summary.created.len(),
        retries = summary.rate_limit_retries,
        "import finished"
    );
    Ok(summary)
}
