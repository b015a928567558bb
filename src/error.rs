use std::path::PathBuf;

use crate::types::{PullState, RepoError};

/// Failures while fetching a page of pull requests. All of them abort the
/// fetch; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GitHub returned {status} for {state} pull requests of {repo} (page {page}): {body}")]
    RemoteService {
        repo: String,
        state: PullState,
        page: u32,
        status: u16,
        body: String,
    },

    #[error("unexpected response for {state} pull requests of {repo} (page {page})")]
    MalformedResponse {
        repo: String,
        state: PullState,
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("request for {state} pull requests of {repo} (page {page}) failed")]
    Transport {
        repo: String,
        state: PullState,
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid request URL for {repo}")]
    InvalidUrl {
        repo: String,
        #[source]
        source: url::ParseError,
    },
}

impl FetchError {
    /// HTTP status for remote service errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RemoteService { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures while reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration found at {}; run `pr-checker --init` first", .0.display())]
    Missing(PathBuf),

    #[error("could not determine home directory for the configuration file")]
    NoHomeDir,

    #[error("failed to access configuration file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {} is not valid", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid repository '{repo}' in configuration")]
    InvalidRepo {
        repo: String,
        #[source]
        source: RepoError,
    },
}
