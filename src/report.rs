use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::Config,
    github::Forge,
    query::fetch_pull_requests,
    types::{ActorScope, PullRequest, PullState, QueryWindow, Repo, StateFilter},
};

/// Report parameters taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub states: StateFilter,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub who: ActorScope,
}

impl ReportOptions {
    /// Combines the options with the stored usernames. Fails when the
    /// selected scope has no usernames, since nothing could ever match.
    pub fn window(&self, config: &Config) -> Result<QueryWindow> {
        if self.start_date > self.end_date {
            anyhow::bail!(
                "Start date {} is after end date {}",
                self.start_date,
                self.end_date
            );
        }

        let usernames = config.usernames(self.who);
        if usernames.is_empty() {
            anyhow::bail!(
                "No usernames configured for the selected --who scope; set them with `pr-checker --update-config --set-username/--set-team`"
            );
        }

        Ok(QueryWindow {
            states: self.states,
            start_date: self.start_date,
            end_date: self.end_date,
            usernames,
        })
    }
}

/// How a pull request qualified for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Merged(NaiveDate),
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub kind: EntryKind,
    pub pull: PullRequest,
}

/// Entries for one repository, merged first, then open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSection {
    pub repo: Repo,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub window: QueryWindow,
    pub sections: Vec<RepoSection>,
}

impl Report {
    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|section| section.entries.len()).sum()
    }
}

/// Turns fetched pull requests into report entries.
///
/// Closed pull requests only qualify when merged within the window; open
/// ones need no further date check. Page order is preserved.
pub fn select_entries(
    state: PullState,
    pulls: Vec<PullRequest>,
    window: &QueryWindow,
) -> Vec<ReportEntry> {
    pulls
        .into_iter()
        .filter(|pull| pull.involves_any(&window.usernames))
        .filter_map(|pull| {
            let kind = match state {
                PullState::Open => EntryKind::Open,
                PullState::Closed => {
                    let merged_on = pull.merged_on().filter(|date| window.contains(*date))?;
                    EntryKind::Merged(merged_on)
                }
            };
            Some(ReportEntry { kind, pull })
        })
        .collect()
}

/// Fetches and filters pull requests for each repository in turn.
pub async fn build_report<F>(forge: &F, repos: &[Repo], window: &QueryWindow) -> Result<Report>
where
    F: Forge + Sync + ?Sized,
{
    let mut sections = Vec::with_capacity(repos.len());

    for repo in repos {
        let mut entries = Vec::new();

        for &state in window.states.states() {
            let pulls =
                fetch_pull_requests(forge, repo, state, window.start_date, &window.usernames)
                    .await
                    .with_context(|| {
                        format!("Failed to fetch {} pull requests for {}", state, repo)
                    })?;
            let fetched = pulls.len();
            let selected = select_entries(state, pulls, window);
            debug!(%repo, %state, fetched, selected = selected.len(), "filtered pull requests");
            entries.extend(selected);
        }

        sections.push(RepoSection {
            repo: repo.clone(),
            entries,
        });
    }

    Ok(Report {
        window: window.clone(),
        sections,
    })
}
