use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("no platform token: set GIT_TOKEN or `token` in the config file")]
    MissingToken,

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("identity table is missing required column '{column}'")]
    MalformedTable { column: String },

    #[error("malformed grade fragment {path}: {reason}")]
    MalformedFragment { path: PathBuf, reason: String },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("not a markdown grading sheet: {0} (must end in .md)")]
    NotMarkdown(PathBuf),

    #[error("platform API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("git failed: {0}")]
    Git(String),

    #[error("failed to start {0}")]
    Spawn(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GradeError>;
