use chrono::NaiveDate;
use tracing::debug;

use crate::{
    error::FetchError,
    github::Forge,
    types::{PullRequest, PullState, Repo},
};

/// Fetches every pull request in `state` that involves one of `usernames`
/// and was created on or after `start_date`.
///
/// Pages are walked newest-created first. Traversal ends after the first
/// page whose oldest entry predates `start_date`, or at the first empty
/// page. Older matches on that final page are kept; callers apply their own
/// date filtering.
pub async fn fetch_pull_requests<F>(
    forge: &F,
    repo: &Repo,
    state: PullState,
    start_date: NaiveDate,
    usernames: &[String],
) -> Result<Vec<PullRequest>, FetchError>
where
    F: Forge + Sync + ?Sized,
{
    let mut page = 1;
    let mut results = Vec::new();

    loop {
        let pulls = forge.fetch_page(repo, state, page).await?;

        let Some(oldest) = pulls.last().map(PullRequest::created_on) else {
            debug!(%repo, %state, page, "empty page, stopping");
            break;
        };

        let page_len = pulls.len();
        results.extend(pulls.into_iter().filter(|pr| pr.involves_any(usernames)));

        if oldest < start_date {
            debug!(%repo, %state, page, page_len, %oldest, "reached start date, stopping");
            break;
        }
        page += 1;
    }

    Ok(results)
}
