//! Configuration management for byelinear
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (BYELINEAR_*)
//! 3. Config file (~/.config/byelinear/config.toml)
//! 4. Default values
//!
//! The resulting [`Config`] is built once at startup and passed by reference;
//! nothing below the CLI reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::IdentityMap;
use crate::{Error, Result};

/// Default corpus directory, relative to the working directory
pub const DEFAULT_CORPUS: &str = "linear-corpus";

/// Default number of records per source page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page the source API accepts
pub const MAX_PAGE_SIZE: usize = 250;

/// Destination repository settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Organization that owns the repository and its projects
    pub org: Option<String>,

    /// Repository name, `owner/repo`, or a GitHub URL
    pub repo: Option<String>,
}

/// Pauses, backoff and deadline for both phases
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause between source pages
    #[serde(with = "humantime_serde")]
    pub page_pause: Duration,

    /// Pause between exported records
    #[serde(with = "humantime_serde")]
    pub record_pause: Duration,

    /// Fixed wait before retrying a failed page or record
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Upper bound on a single phase
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_pause: Duration::from_secs(1),
            record_pause: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(5 * 60),
            deadline: Duration::from_secs(24 * 3600),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `state.json` and the per-record files
    pub corpus: PathBuf,

    /// Records per source page
    pub page_size: usize,

    /// Restrict both phases to the record with this number
    pub issue_number: Option<u64>,

    /// Explicit source cursor to resume fetching from
    pub cursor: Option<String>,

    /// Destination settings
    pub github: GitHubConfig,

    /// Timing settings
    pub timing: TimingConfig,

    /// Source address to destination login table
    pub identities: IdentityMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from(DEFAULT_CORPUS),
            page_size: DEFAULT_PAGE_SIZE,
            issue_number: None,
            cursor: None,
            github: GitHubConfig::default(),
            timing: TimingConfig::default(),
            identities: IdentityMap::default(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub corpus: Option<PathBuf>,
    pub issue_number: Option<u64>,
    pub page_size: Option<usize>,
    pub cursor: Option<String>,
    pub org: Option<String>,
    pub repo: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/byelinear/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("byelinear").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - BYELINEAR_CORPUS: corpus directory
    /// - BYELINEAR_ORG / BYELINEAR_REPO: destination repository
    /// - BYELINEAR_ISSUE_NUMBER: single-record filter
    /// - BYELINEAR_PAGE_SIZE: records per page
    /// - BYELINEAR_CURSOR: explicit resume cursor
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(corpus) = var("BYELINEAR_CORPUS") {
            self.corpus = PathBuf::from(corpus);
        }
        if let Some(org) = var("BYELINEAR_ORG") {
            self.github.org = Some(org);
        }
        if let Some(repo) = var("BYELINEAR_REPO") {
            self.github.repo = Some(repo);
        }
        if let Some(number) = var("BYELINEAR_ISSUE_NUMBER") {
            self.issue_number = Some(parse_number("BYELINEAR_ISSUE_NUMBER", &number)?);
        }
        if let Some(size) = var("BYELINEAR_PAGE_SIZE") {
            self.page_size = parse_number("BYELINEAR_PAGE_SIZE", &size)?;
        }
        if let Some(cursor) = var("BYELINEAR_CURSOR") {
            self.cursor = Some(cursor);
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(corpus) = overrides.corpus {
            self.corpus = corpus;
        }
        if overrides.issue_number.is_some() {
            self.issue_number = overrides.issue_number;
        }
        if let Some(size) = overrides.page_size {
            self.page_size = size;
        }
        if overrides.cursor.is_some() {
            self.cursor = overrides.cursor;
        }
        if overrides.org.is_some() {
            self.github.org = overrides.org;
        }
        if overrides.repo.is_some() {
            self.github.repo = overrides.repo;
        }

        self
    }

    /// Load configuration with all overrides applied and validated
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(overrides: CliOverrides) -> Result<Self> {
        let config = Self::load()?
            .with_env_overrides()?
            .with_cli_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail deep inside a phase
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.timing.deadline.is_zero() {
            return Err(Error::Config("deadline must be positive".to_string()));
        }
        Ok(())
    }

    /// Resolve the destination repository; required for the export phase
    pub fn destination(&self) -> Result<RepoRef> {
        let repo = self
            .github
            .repo
            .as_deref()
            .ok_or_else(|| Error::Config("$BYELINEAR_REPO is required".to_string()))?;

        if repo.contains('/') || repo.contains(':') {
            return RepoRef::parse(repo);
        }

        let org = self
            .github
            .org
            .as_deref()
            .ok_or_else(|| Error::Config("$BYELINEAR_ORG is required".to_string()))?;
        Ok(RepoRef::new(org, repo))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("${} must be a number: {}", key, e)))
}

/// Destination repository reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Whether `owner/repo` names this repository (case-insensitive, as on GitHub)
    pub fn is(&self, owner: &str, repo: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.repo.eq_ignore_ascii_case(repo)
    }

    /// Parse a repository reference
    ///
    /// Supports formats:
    /// - owner/repo
    /// - https://github.com/owner/repo
    /// - git@github.com:owner/repo.git
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("Invalid repository format: {}. Expected owner/repo", spec));

        if spec.starts_with("https://") || spec.starts_with("http://") {
            let url = url::Url::parse(spec).map_err(|e| Error::Config(e.to_string()))?;
            let path = url.path().trim_start_matches('/').trim_end_matches(".git");
            return match path.split('/').collect::<Vec<_>>().as_slice() {
                [owner, repo, ..] if !owner.is_empty() && !repo.is_empty() => {
                    Ok(Self::new(*owner, *repo))
                }
                _ => Err(Error::Config(format!("Invalid GitHub URL path: {}", path))),
            };
        }

        if let Some(rest) = spec.strip_prefix("git@") {
            let path = rest.split_once(':').map(|(_, p)| p).ok_or_else(invalid)?;
            return match path.trim_end_matches(".git").split('/').collect::<Vec<_>>().as_slice() {
                [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
                    Ok(Self::new(*owner, *repo))
                }
                _ => Err(invalid()),
            };
        }

        match spec.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self::new(*owner, repo.trim_end_matches(".git")))
            }
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
