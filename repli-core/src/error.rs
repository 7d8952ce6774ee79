use thiserror::Error;

/// Failure of a single remote-store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unauthorized (HTTP {0}): check token permissions")]
    Unauthorized(u16),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists (HTTP {status}): {path}")]
    Conflict { status: u16, path: String },

    #[error("server error (HTTP {0})")]
    Server(u16),

    #[error("unexpected status (HTTP {0})")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Settings that cannot be turned into a client.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Classify a non-success HTTP status for `path`.
    pub fn from_status(status: u16, path: &str) -> Self {
        match status {
            401 | 403 => StoreError::Unauthorized(status),
            404 => StoreError::NotFound(path.to_string()),
            409 | 422 => StoreError::Conflict { status, path: path.to_string() },
            500..=599 => StoreError::Server(status),
            _ => StoreError::Status(status),
        }
    }

    /// Worth retrying: 5xx responses and connection-level failures.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Server(_) | StoreError::Transport(_))
    }

    /// Operator hint for a failed listing, if the status has one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            StoreError::Unauthorized(_) => Some("this might be a token permission issue"),
            StoreError::NotFound(_) => Some("path not found; check GITHUB_REPOSITORY and the path"),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GITHUB_TOKEN not found in environment variables")]
    MissingToken,

    #[error("GITHUB_REPOSITORY not found in environment variables")]
    MissingRepository,

    #[error("repository must be \"owner/repo\", got {0:?}")]
    BadRepository(String),

    #[error("invalid API URL {url:?}: {reason}")]
    BadApiUrl { url: String, reason: String },

    #[error("GITHUB_TOKEN contains characters not allowed in an HTTP header")]
    BadToken,
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rule {0} has an empty find pattern")]
    EmptyFind(usize),

    #[error("invalid period {0:?}, expected YYYY-MM")]
    BadPeriod(String),

    #[error("read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse rules file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathMapError {
    #[error("{path:?} is outside source root {root:?}")]
    OutsideSource { path: String, root: String },
}
