use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ImportArgs;
use crate::import::ImportOptions;
use crate::providers::github::DEFAULT_API_URL;

pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_DELAY_SECS: f64 = 10.0;
pub const DEFAULT_RATE_LIMIT_DELAY_SECS: f64 = 60.0;

/// Optional `~/.jira-import/config.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub github: Option<GitHubConfig>,
    pub import: Option<ImportConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GitHubConfig {
    pub repo: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImportConfig {
    pub credentials: Option<PathBuf>,
    pub delay_secs: Option<f64>,
    pub rate_limit_delay_secs: Option<f64>,
}

/// Contents of the credentials file: `{"username": "...", "password": "..."}`.
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a run needs, after merging command line, config file and defaults.
#[derive(Debug)]
pub struct Settings {
    pub export_path: PathBuf,
    pub repo: String,
    pub api_url: String,
    pub credentials_path: PathBuf,
    pub options: ImportOptions,
    pub dry_run: bool,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jira-import")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

pub fn load_credentials(path: &Path) -> Result<Credentials> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
    let credentials: Credentials = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse credentials in {}", path.display()))?;
    Ok(credentials)
}

/// A non-negative, finite number of seconds.
pub fn seconds(value: f64, what: &str) -> Result<Duration> {
    if !value.is_finite() || value < 0.0 {
        bail!("{what} must be a non-negative number of seconds, got {value}");
    }
    Ok(Duration::from_secs_f64(value))
}

fn validate_repo(repo: &str) -> Result<()> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => bail!("Repository must look like owner/name, got \"{repo}\""),
    }
}

/// Command line wins over the config file, which wins over built-in defaults.
pub fn resolve_settings(args: ImportArgs, config: &AppConfig) -> Result<Settings> {
    let github = config.github.as_ref();
    let import = config.import.as_ref();

    let repo = args
        .repo
        .or_else(|| github.and_then(|g| g.repo.clone()))
        .context("No target repository. Pass --repo owner/name or set [github] repo in ~/.jira-import/config.toml")?;
    validate_repo(&repo)?;

    let api_url = github
        .and_then(|g| g.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let credentials_path = args
        .credentials
        .or_else(|| import.and_then(|i| i.credentials.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE));

    let delay = match args.delay {
        Some(d) => d,
        None => seconds(
            import.and_then(|i| i.delay_secs).unwrap_or(DEFAULT_DELAY_SECS),
            "delay_secs",
        )?,
    };
    let rate_limit_delay = match args.retry_delay {
        Some(d) => d,
        None => seconds(
            import
                .and_then(|i| i.rate_limit_delay_secs)
                .unwrap_or(DEFAULT_RATE_LIMIT_DELAY_SECS),
            "rate_limit_delay_secs",
        )?,
    };

    Ok(Settings {
        export_path: args.export_path,
        repo,
        api_url,
        credentials_path,
        options: ImportOptions {
            delay,
            rate_limit_delay,
        },
        dry_run: args.dry_run,
    })
}
