use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which backing store is active. Exactly one per running instance.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Github,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Github => "github",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub local: Option<LocalSourceConfig>,
    pub github: Option<GithubSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalSourceConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubSourceConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Folder inside the repository holding the rules; empty means the root.
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl GithubSourceConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
            path: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// `owner/repo@branch:path`, used in logs and status output.
    pub fn label(&self) -> String {
        format!("{}/{}@{}:{}", self.owner, self.repo, self.branch, self.path)
    }
}

fn default_branch() -> String {
    "main".to_string()
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_user_agent() -> String {
    format!("rules-mcp/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Config serving a local directory with every other setting defaulted.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceConfig {
                kind: SourceKind::Local,
                local: Some(LocalSourceConfig { dir: dir.into() }),
                github: None,
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Config polling a GitHub folder with every other setting defaulted.
    pub fn github(github: GithubSourceConfig) -> Self {
        Self {
            source: SourceConfig {
                kind: SourceKind::Github,
                local: None,
                github: Some(github),
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.source.kind {
        SourceKind::Local => {
            if config.source.local.is_none() {
                bail!("source.kind is 'local' but [source.local] is missing");
            }
        }
        SourceKind::Github => {
            let Some(github) = &config.source.github else {
                bail!("source.kind is 'github' but [source.github] is missing");
            };
            if github.owner.trim().is_empty() {
                bail!("source.github.owner must not be empty");
            }
            if github.repo.trim().is_empty() {
                bail!("source.github.repo must not be empty");
            }
            if github.branch.trim().is_empty() {
                bail!("source.github.branch must not be empty");
            }
            if github.poll_interval_secs == 0 {
                bail!("source.github.poll_interval_secs must be > 0");
            }
        }
    }

    tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .with_context(|| format!("Invalid logging.level: '{}'", config.logging.level))?;

    Ok(())
}
