use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static DEFAULT_DB_NAME: &str = "taskflow.sqlite3";
static ENV_DATA_DIR: &str = "TASKFLOW_DATA_DIR";
static ENV_API_URL: &str = "TASKFLOW_API_URL";
static ENV_API_TOKEN: &str = "TASKFLOW_API_TOKEN";
static ENV_API_TIMEOUT: &str = "TASKFLOW_API_TIMEOUT";
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "taskflow", "taskflow"));

/// Which record store backs the repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Local,
    Remote {
        base_url: String,
        token: Option<String>,
        timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    backend: StoreBackend,
    remote_timeout: Duration,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults. A remote backend is picked up from
    /// `TASKFLOW_API_URL` when set, with its request timeout from `TASKFLOW_API_TIMEOUT`.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let mut config = Self::from_data_dir(data_dir)?;
        if let Ok(raw) = env::var(ENV_API_TIMEOUT) {
            if !raw.trim().is_empty() {
                let timeout = parse_timeout_secs(&raw)
                    .with_context(|| format!("Invalid {ENV_API_TIMEOUT}"))?;
                config = config.with_remote_timeout(timeout);
            }
        }
        match env::var(ENV_API_URL) {
            Ok(url) if !url.trim().is_empty() => {
                Ok(config.with_remote(url, Self::env_api_token()))
            }
            _ => Ok(config),
        }
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        Ok(Self {
            data_dir,
            db_path,
            backend: StoreBackend::Local,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        })
    }

    /// Point the repositories at a remote record API instead of the local store.
    pub fn with_remote(mut self, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let token = token.filter(|value| !value.trim().is_empty());
        self.backend = StoreBackend::Remote {
            base_url,
            token,
            timeout: self.remote_timeout,
        };
        self
    }

    /// Request timeout for the remote record API, applied now or when a remote is chosen.
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        if let StoreBackend::Remote { timeout: current, .. } = &mut self.backend {
            *current = timeout;
        }
        self
    }

    /// Bearer token from `TASKFLOW_API_TOKEN`, when set and non-blank.
    pub fn env_api_token() -> Option<String> {
        env::var(ENV_API_TOKEN)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.backend
    }
}

/// Whole seconds, at least one.
pub fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number of seconds", raw.trim()))?;
    if secs == 0 {
        bail!("timeout must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-taskflow");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".taskflow"));
    }

    Ok(env::current_dir()?.join(".taskflow"))
}
