//! pr-checker: report open and recently merged pull requests.
//!
//! Walks the GitHub REST `pulls` listing for each configured repository,
//! newest first, keeps pull requests authored by or assigned to the
//! configured people, and stops paging once results predate the report
//! window. Closed pull requests are reported only when merged inside the
//! window.

pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod query;
pub mod report;
pub mod types;

pub use cli::{Invocation, parse_args, parse_args_on};
pub use config::{Config, ConfigUpdate, default_config_path, init_interactive};
pub use error::{ConfigError, FetchError};
pub use github::{Forge, GitHub, PER_PAGE, resolve_token};
pub use query::fetch_pull_requests;
pub use report::{EntryKind, RepoSection, Report, ReportEntry, ReportOptions, build_report};
pub use types::{
    ActorScope, PullRequest, PullState, QueryWindow, Repo, RepoError, StateFilter, User,
};
