use std::path::PathBuf;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use clap::{CommandFactory, Parser, error::ErrorKind};

use crate::{
    config::{ConfigUpdate, default_config_path},
    github::DEFAULT_API_URL,
    report::ReportOptions,
    types::{ActorScope, StateFilter},
};

const BUILD_INFO: &str = env!("PR_CHECKER_BUILD_INFO");

/// Days covered by the report when no start date is given.
const DEFAULT_LOOKBACK_DAYS: u64 = 7;

#[derive(Parser, Debug)]
#[command(
    name = "pr-checker",
    about = "Report open and recently merged GitHub pull requests for you and your team"
)]
#[command(long_version = BUILD_INFO)]
struct CliArgs {
    /// Status of the PRs to report (leave blank for both)
    #[arg(long, value_enum, value_name = "STATUS")]
    pub status: Option<StateFilter>,

    /// First day of the report, YYYY-MM-DD (defaults to 7 days ago)
    #[arg(long = "start-date", value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Last day of the report, YYYY-MM-DD (defaults to today)
    #[arg(long = "end-date", value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Whose PRs to report: `team` is the team without you (leave blank for
    /// the team including you)
    #[arg(long, value_enum, value_name = "WHO")]
    pub who: Option<ActorScope>,

    /// Initialise the configuration interactively
    #[arg(long, conflicts_with = "update_config", help_heading = "Configuration")]
    pub init: bool,

    /// Update stored configuration with the --set-* values
    #[arg(long = "update-config", help_heading = "Configuration")]
    pub update_config: bool,

    /// Set GitHub username
    #[arg(
        long = "set-username",
        value_name = "USERNAME",
        requires = "update_config",
        help_heading = "Configuration"
    )]
    pub set_username: Option<String>,

    /// Set GitHub token
    #[arg(
        long = "set-token",
        value_name = "TOKEN",
        requires = "update_config",
        help_heading = "Configuration"
    )]
    pub set_token: Option<String>,

    /// Set team usernames (comma-separated)
    #[arg(
        long = "set-team",
        value_name = "USERNAMES",
        requires = "update_config",
        help_heading = "Configuration"
    )]
    pub set_team: Option<String>,

    /// Set repositories to check (comma-separated, e.g. PostHog/posthog)
    #[arg(
        long = "set-repos",
        value_name = "REPOS",
        requires = "update_config",
        help_heading = "Configuration"
    )]
    pub set_repos: Option<String>,

    /// Configuration file (defaults to ~/.pr_checker_config.json)
    #[arg(long, env = "PR_CHECKER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// GitHub API base URL
    #[arg(
        long = "api-url",
        env = "GITHUB_API_URL",
        default_value = DEFAULT_API_URL,
        value_name = "URL"
    )]
    pub api_url: String,
}

/// What the user asked the tool to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Init {
        config_path: PathBuf,
    },
    UpdateConfig {
        config_path: PathBuf,
        update: ConfigUpdate,
    },
    Report {
        config_path: PathBuf,
        api_url: String,
        options: ReportOptions,
    },
}

/// A usage error, reported the same way clap reports its own.
fn usage_error(kind: ErrorKind, message: impl std::fmt::Display) -> clap::Error {
    CliArgs::command().error(kind, message)
}

impl CliArgs {
    fn validate(&self) -> Result<(), clap::Error> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(usage_error(
                    ErrorKind::ArgumentConflict,
                    format!("--start-date {start} is after --end-date {end}"),
                ));
            }
        }

        Ok(())
    }

    fn report_options(&self, today: NaiveDate) -> ReportOptions {
        let end_date = self.end_date.unwrap_or(today);
        let start_date = self.start_date.unwrap_or_else(|| {
            end_date
                .min(today)
                .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
                .unwrap_or(NaiveDate::MIN)
        });

        ReportOptions {
            states: self.status.unwrap_or_default(),
            start_date,
            end_date,
            who: self.who.unwrap_or_default(),
        }
    }
}

fn build_invocation(cli: CliArgs, today: NaiveDate) -> Result<Invocation> {
    cli.validate()?;

    let options = cli.report_options(today);
    let update = ConfigUpdate {
        my_username: cli.set_username,
        token: cli.set_token,
        team_usernames: cli.set_team,
        repos: cli.set_repos,
    };

    if cli.update_config && update.is_empty() {
        return Err(usage_error(
            ErrorKind::MissingRequiredArgument,
            "--update-config needs at least one of --set-username, --set-token, --set-team, --set-repos",
        )
        .into());
    }

    if !cli.init && !cli.update_config && options.start_date > options.end_date {
        return Err(usage_error(
            ErrorKind::ArgumentConflict,
            format!(
                "--start-date {} is after the end date {} (defaults to today)",
                options.start_date, options.end_date
            ),
        )
        .into());
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    if cli.init {
        return Ok(Invocation::Init { config_path });
    }

    if cli.update_config {
        return Ok(Invocation::UpdateConfig {
            config_path,
            update,
        });
    }

    Ok(Invocation::Report {
        config_path,
        api_url: cli.api_url,
        options,
    })
}

/// Parses command-line arguments, resolving date defaults against `today`.
pub fn parse_args_on<I, T>(args: I, today: NaiveDate) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    build_invocation(cli, today)
}

/// Parses command-line arguments into an [`Invocation`]. Missing dates
/// default to the last week, ending today (local time).
pub fn parse_args<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    parse_args_on(args, Local::now().date_naive())
}
