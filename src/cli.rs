use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::{self, Settings};
use crate::export;
use crate::import;
use crate::providers::github::GitHubTracker;
use crate::providers::IssueTracker;

/// Parsed command line of `jira-import`.
#[derive(Debug)]
pub struct ImportArgs {
    pub export_path: PathBuf,
    pub delay: Option<Duration>,
    pub repo: Option<String>,
    pub credentials: Option<PathBuf>,
    pub retry_delay: Option<Duration>,
    pub dry_run: bool,
}

/// Parse the command line, load everything and run the import against GitHub.
pub async fn handle_import(args: &[String]) -> Result<()> {
    let args = parse_import_args(args)?;
    let config = config::load_config()?;
    let settings = config::resolve_settings(args, &config)?;

    let credentials = config::load_credentials(&settings.credentials_path)?;
    let tracker = GitHubTracker::new(
        &settings.api_url,
        settings.repo.clone(),
        &credentials.username,
        &credentials.password,
    )?;

    run(&settings, &tracker).await
}

/// Parse the export, diff it against `tracker` and create what is missing.
pub async fn run(settings: &Settings, tracker: &dyn IssueTracker) -> Result<()> {
    let items = export::parse_export_file(&settings.export_path)?;
    info!(count = items.len(), path = %settings.export_path.display(), "parsed export");

    let existing = tracker
        .list_issues()
        .await
        .with_context(|| format!("Failed to list {} issues of {}", tracker.name(), settings.repo))?;
    info!(count = existing.len(), repo = %settings.repo, "fetched existing issues");

    let plan = import::plan_import(&items, &existing);
    if !plan.orphaned.is_empty() {
        warn!(
            count = plan.orphaned.len(),
            keys = ?plan.orphaned,
            "issues on the target have no counterpart in the export"
        );
    }

    if settings.dry_run {
        println!(
            "Would create {} new issues on {} ({} already present):",
            plan.to_create.len(),
            tracker.name(),
            plan.already_present
        );
        for item in &plan.to_create {
            println!("  {}", item.issue_title());
        }
        return Ok(());
    }

    println!(
        "Creating {} new issues on {}...\n",
        plan.to_create.len(),
        tracker.name()
    );
    let summary = import::run_import(tracker, &plan, &settings.options).await?;
    println!(
        "\nDone: {} created, {} already present, {} rate-limit retries",
        summary.created.len(),
        plan.already_present,
        summary.rate_limit_retries
    );

    Ok(())
}

/// Parse `jira-import` arguments.
///
/// Supported forms:
///   jira-import export.xml
///   jira-import export.xml 5
///   jira-import export.xml 2.5 --repo owner/name -c creds.json
///   jira-import export.xml --retry-delay 120 --dry-run
pub fn parse_import_args(args: &[String]) -> Result<ImportArgs> {
    if args.is_empty() {
        bail!("Usage: jira-import <export.xml> [delay-seconds] [options]\n\nRun `jira-import --help` for details.");
    }

    let mut positional: Vec<&str> = Vec::new();
    let mut repo = None;
    let mut credentials = None;
    let mut retry_delay = None;
    let mut dry_run = false;
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-r" | "--repo" | "-c" | "--credentials" | "--retry-delay" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for {arg}");
                };
                match arg {
                    "-r" | "--repo" => repo = Some(value.clone()),
                    "-c" | "--credentials" => credentials = Some(PathBuf::from(value)),
                    _ => retry_delay = Some(parse_seconds(value, "--retry-delay")?),
                }
            }
            "-n" | "--dry-run" => dry_run = true,
            s if s.starts_with('-') && s.parse::<f64>().is_err() => {
                bail!("Unknown option {s}");
            }
            s => positional.push(s),
        }
        i += 1;
    }

    let (export_path, delay) = match positional.as_slice() {
        [] => bail!("Missing path to the JIRA XML export"),
        [path] => (PathBuf::from(path), None),
        [path, delay] => (PathBuf::from(path), Some(parse_seconds(delay, "delay")?)),
        [_, _, extra, ..] => bail!("Unexpected argument {extra}"),
    };

    Ok(ImportArgs {
        export_path,
        delay,
        repo,
        credentials,
        retry_delay,
        dry_run,
    })
}

fn parse_seconds(value: &str, what: &str) -> Result<Duration> {
    let secs: f64 = value
        .parse()
        .with_context(|| format!("{what} must be a number of seconds, got \"{value}\""))?;
    config::seconds(secs, what)
}

pub fn print_help() {
    println!("jira-import — create GitHub issues from a JIRA XML export\n");
    println!("USAGE:");
    println!("  jira-import <export.xml> [delay-seconds] [options]");
    println!();
    println!("Items whose key already appears as [KEY] in a GitHub issue title are skipped.");
    println!("After each created issue the tool waits delay-seconds (default 10).");
    println!();
    println!("OPTIONS:");
    println!("  -r, --repo <owner/name>    Target repository");
    println!("  -c, --credentials <path>   Credentials file (default: credentials.json)");
    println!("      --retry-delay <secs>   Pause after a rate-limit error (default: 60)");
    println!("  -n, --dry-run              List what would be created, create nothing");
    println!("  -h, --help                 Print this help");
    println!();
    println!("CREDENTIALS:");
    println!("  {{\"username\": \"you\", \"password\": \"<personal access token>\"}}");
    println!();
    println!("CONFIG (~/.jira-import/config.toml):");
    println!("  [github]  repo, api_url");
    println!("  [import]  credentials, delay_secs, rate_limit_delay_secs");
}
