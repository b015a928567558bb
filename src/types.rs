use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Error returned when a repository string is not of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("repository must be in format 'owner/name', got: '{0}'")]
    InvalidFormat(String),
    #[error("repository owner must not be empty")]
    EmptyOwner,
    #[error("repository name must not be empty")]
    EmptyName,
}

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into().trim().to_string();
        let name = name.into().trim().to_string();

        if owner.is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.is_empty() {
            return Err(RepoError::EmptyName);
        }
        if owner.contains('/') || name.contains('/') {
            return Err(RepoError::InvalidFormat(format!("{owner}/{name}")));
        }

        Ok(Self { owner, name })
    }

    /// Parses `owner/name`, trimming surrounding whitespace.
    pub fn parse(repo: &str) -> Result<Self, RepoError> {
        let trimmed = repo.trim();
        let Some((owner, name)) = trimmed.split_once('/') else {
            return Err(RepoError::InvalidFormat(trimmed.to_string()));
        };
        if name.contains('/') {
            return Err(RepoError::InvalidFormat(trimmed.to_string()));
        }
        Self::new(owner, name)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Pull request state as understood by the REST `pulls` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullState {
    Open,
    Closed,
}

impl PullState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullState::Open => "open",
            PullState::Closed => "closed",
        }
    }
}

impl fmt::Display for PullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pull request states a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StateFilter {
    Open,
    Closed,
    #[default]
    Both,
}

impl StateFilter {
    /// States to query, merged (closed) before open.
    pub fn states(&self) -> &'static [PullState] {
        match self {
            StateFilter::Open => &[PullState::Open],
            StateFilter::Closed => &[PullState::Closed],
            StateFilter::Both => &[PullState::Closed, PullState::Open],
        }
    }
}

/// Whose pull requests a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ActorScope {
    /// Only the configured username.
    Me,
    /// Only the configured team usernames, without your own.
    Team,
    /// Team usernames plus the configured username.
    #[default]
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub login: String,
}

/// A pull request as returned by `GET /repos/{owner}/{name}/pulls`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: PullState,
    pub user: User,
    pub assignee: Option<User>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl PullRequest {
    pub fn author_login(&self) -> &str {
        &self.user.login
    }

    pub fn assignee_login(&self) -> Option<&str> {
        self.assignee.as_ref().map(|user| user.login.as_str())
    }

    /// True when the author or the assignee is one of `usernames`.
    pub fn involves_any(&self, usernames: &[String]) -> bool {
        let listed = |login: &str| usernames.iter().any(|name| name == login);
        listed(self.author_login()) || self.assignee_login().is_some_and(listed)
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    pub fn merged_on(&self) -> Option<NaiveDate> {
        self.merged_at.map(|at| at.date_naive())
    }
}

/// The date range and people a report is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
    pub states: StateFilter,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub usernames: Vec<String>,
}

impl QueryWindow {
    /// True when `date` lies within `[start_date, end_date]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
