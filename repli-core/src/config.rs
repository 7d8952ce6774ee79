use crate::error::ConfigError;
use reqwest::header::HeaderValue;
use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::BadRepository(s.to_string());
        let (owner, name) = s.trim().split_once('/').ok_or_else(bad)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(bad());
        }
        Ok(Self { owner: owner.to_string(), name: name.to_string() })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Everything needed to talk to one repository.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub repo: RepoId,
    pub api_url: Url,
    pub branch: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .field("api_url", &self.api_url.as_str())
            .field("branch", &self.branch)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Validate raw settings. Blank values count as missing.
    pub fn new(
        token: Option<String>,
        repo: Option<String>,
        api_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let token = token.filter(|t| !t.trim().is_empty()).ok_or(ConfigError::MissingToken)?;
        let repo = repo
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigError::MissingRepository)?
            .parse::<RepoId>()?;
        let raw = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&raw)
            .map_err(|e| ConfigError::BadApiUrl { url: raw.clone(), reason: e.to_string() })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::BadApiUrl { url: raw, reason: "not a base URL".into() });
        }
        let cfg = Self { token: token.trim().to_string(), repo, api_url, branch: None, timeout: DEFAULT_TIMEOUT };
        cfg.auth_header()?;
        Ok(cfg)
    }

    /// `Authorization: token ...`, marked sensitive so it stays out of debug output.
    pub fn auth_header(&self) -> Result<HeaderValue, ConfigError> {
        let mut value =
            HeaderValue::from_str(&format!("token {}", self.token)).map_err(|_| ConfigError::BadToken)?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch.filter(|b| !b.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{api}/repos/{owner}/{repo}`
    pub fn repo_url(&self) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend(["repos", self.repo.owner.as_str(), self.repo.name.as_str()]);
        }
        url
    }
}

/// Load `.env` from the working directory into the process environment.
/// A missing file is not an error; variables already set win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring .env: {e}"),
    }
}
