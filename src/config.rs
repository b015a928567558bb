//! Stored credentials and preferences.
//!
//! The configuration lives in a small JSON file (by default
//! `~/.pr_checker_config.json`). It is read once per invocation and only
//! written by `--init` and `--update-config`.

use std::{
    fmt,
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::ConfigError,
    types::{ActorScope, Repo},
};

pub const CONFIG_FILE_NAME: &str = ".pr_checker_config.json";

/// Returns `~/.pr_checker_config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub my_username: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub team_usernames: Vec<String>,
    #[serde(default)]
    pub repos: Vec<String>,
}

// Keep the token out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Config")
            .field("my_username", &self.my_username)
            .field("token", &token)
            .field("team_usernames", &self.team_usernames)
            .field("repos", &self.repos)
            .finish()
    }
}

/// Fields to overwrite in a stored configuration. `None` leaves a field as
/// it is. List fields hold the raw comma-separated input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub my_username: Option<String>,
    pub token: Option<String>,
    pub team_usernames: Option<String>,
    pub repos: Option<String>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.my_username.is_none()
            && self.token.is_none()
            && self.team_usernames.is_none()
            && self.repos.is_none()
    }
}

impl Config {
    /// Reads the configuration at `path`, failing with
    /// [`ConfigError::Missing`] if there is none.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields an empty
    /// configuration.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Missing(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Writes the configuration as pretty-printed JSON. On Unix the file is
    /// readable by its owner only, since it holds the token.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut content = serde_json::to_string_pretty(self).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        content.push('\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, content).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
        }

        debug!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Applies `update`, validating any new repository list before touching
    /// the configuration.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let repos = update
            .repos
            .as_deref()
            .map(|list| {
                let repos = split_list(list);
                validate_repos(&repos)?;
                Ok::<_, ConfigError>(repos)
            })
            .transpose()?;

        if let Some(username) = update.my_username {
            self.my_username = username.trim().to_string();
        }
        if let Some(token) = update.token {
            self.token = token.trim().to_string();
        }
        if let Some(team) = update.team_usernames {
            self.team_usernames = split_list(&team);
        }
        if let Some(repos) = repos {
            self.repos = repos;
        }
        Ok(())
    }

    /// Parses the configured repositories.
    pub fn repositories(&self) -> Result<Vec<Repo>, ConfigError> {
        self.repos.iter().map(|repo| parse_repo(repo)).collect()
    }

    /// Usernames for `scope`, in configuration order without duplicates or
    /// blanks.
    pub fn usernames(&self, scope: ActorScope) -> Vec<String> {
        let me = std::slice::from_ref(&self.my_username);
        let candidates: Vec<&String> = match scope {
            ActorScope::Me => me.iter().collect(),
            ActorScope::Team => self.team_usernames.iter().collect(),
            ActorScope::Both => self.team_usernames.iter().chain(me).collect(),
        };

        let mut usernames: Vec<String> = Vec::with_capacity(candidates.len());
        for name in candidates {
            let name = name.trim();
            if !name.is_empty() && !usernames.iter().any(|seen| seen == name) {
                usernames.push(name.to_string());
            }
        }
        usernames
    }
}

fn parse_repo(repo: &str) -> Result<Repo, ConfigError> {
    Repo::parse(repo).map_err(|source| ConfigError::InvalidRepo {
        repo: repo.to_string(),
        source,
    })
}

fn validate_repos(repos: &[String]) -> Result<(), ConfigError> {
    repos.iter().try_for_each(|repo| parse_repo(repo).map(drop))
}

fn prompt<R, W>(input: &mut R, output: &mut W, question: &str) -> io::Result<String>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Asks for every setting in turn and returns the resulting configuration.
/// Existing values in `config` are replaced.
pub fn init_interactive<R, W>(
    mut config: Config,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<Config>
where
    R: BufRead,
    W: Write,
{
    let update = ConfigUpdate {
        my_username: Some(prompt(input, output, "Enter your GitHub username: ")?),
        token: Some(prompt(input, output, "Enter your GitHub token: ")?),
        team_usernames: Some(prompt(
            input,
            output,
            "Enter your team usernames (comma-separated): ",
        )?),
        repos: Some(prompt(
            input,
            output,
            "Enter the repositories you want to check (comma-separated, eg PostHog/posthog): ",
        )?),
    };

    config.apply(update)?;
    Ok(config)
}
