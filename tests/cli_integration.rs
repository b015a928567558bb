use std::{collections::HashMap, path::PathBuf, sync::Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pr_checker::{
    ActorScope, Config, ConfigUpdate, EntryKind, FetchError, Forge, Invocation, PER_PAGE,
    PullRequest, PullState, QueryWindow, Repo, ReportOptions, StateFilter, User, build_report,
    fetch_pull_requests, parse_args_on,
};

/// Mock forge serving canned pages and recording every request.
pub struct MockHub {
    pages: HashMap<(String, PullState), Vec<Vec<PullRequest>>>,
    failing: Option<(PullState, u32, u16)>,
    requests: Mutex<Vec<(String, PullState, u32)>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pages(
        mut self,
        repo: &str,
        state: PullState,
        pages: Vec<Vec<PullRequest>>,
    ) -> Self {
        self.pages.insert((repo.to_string(), state), pages);
        self
    }

    pub fn failing_at(mut self, state: PullState, page: u32, status: u16) -> Self {
        self.failing = Some((state, page, status));
        self
    }

    pub fn requests(&self) -> Vec<(String, PullState, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forge for MockHub {
    async fn fetch_page(
        &self,
        repo: &Repo,
        state: PullState,
        page: u32,
    ) -> Result<Vec<PullRequest>, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((repo.to_string(), state, page));

        if let Some((failing_state, failing_page, status)) = self.failing {
            if failing_state == state && failing_page == page {
                return Err(FetchError::RemoteService {
                    repo: repo.to_string(),
                    state,
                    page,
                    status,
                    body: r#"{"message":"Bad credentials"}"#.to_string(),
                });
            }
        }

        Ok(self
            .pages
            .get(&(repo.to_string(), state))
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn pr(
    number: u64,
    author: &str,
    assignee: Option<&str>,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
) -> PullRequest {
    PullRequest {
        number,
        title: format!("Pull request {number}"),
        state: if merged_at.is_some() {
            PullState::Closed
        } else {
            PullState::Open
        },
        user: User {
            login: author.to_string(),
        },
        assignee: assignee.map(|login| User {
            login: login.to_string(),
        }),
        created_at,
        merged_at,
        html_url: format!("https://github.com/org/repo/pull/{number}"),
    }
}

fn names(usernames: &[&str]) -> Vec<String> {
    usernames.iter().map(|name| name.to_string()).collect()
}

fn window(states: StateFilter, usernames: &[&str]) -> QueryWindow {
    QueryWindow {
        states,
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 10),
        usernames: names(usernames),
    }
}

fn org_repo() -> Repo {
    Repo::new("org", "repo").unwrap()
}

/// Page of `count` pull requests by alice, newest first, starting at
/// `newest` and one hour apart.
fn full_page(first_number: u64, newest: DateTime<Utc>, count: usize) -> Vec<PullRequest> {
    (0..count)
        .map(|i| {
            pr(
                first_number + i as u64,
                "alice",
                None,
                newest - Duration::hours(i as i64),
                None,
            )
        })
        .collect()
}

#[tokio::test]
async fn test_fetch_merged_scenario() {
    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Closed,
        vec![vec![
            pr(1, "alice", None, at(2024, 1, 4, 10), Some(at(2024, 1, 5, 0))),
            pr(2, "bob", None, at(2024, 1, 3, 10), Some(at(2024, 1, 6, 12))),
        ]],
    );

    let result = fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Closed,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap();

    let numbers: Vec<u64> = result.iter().map(|pr| pr.number).collect();
    assert_eq!(numbers, vec![1]);

    let report = build_report(&hub, &[org_repo()], &window(StateFilter::Closed, &["alice"]))
        .await
        .unwrap();
    assert_eq!(report.entry_count(), 1);
    assert_eq!(report.sections[0].entries[0].pull.number, 1);
    assert_eq!(
        report.sections[0].entries[0].kind,
        EntryKind::Merged(date(2024, 1, 5))
    );
}

#[tokio::test]
async fn test_fetch_stops_after_page_reaching_start_date() {
    let page_one = full_page(1, at(2024, 1, 9, 12), PER_PAGE as usize);
    assert!(page_one.last().unwrap().created_on() >= date(2024, 1, 1));
    let page_two = vec![pr(101, "alice", None, at(2023, 12, 30, 0), None)];

    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Open,
        vec![page_one, page_two, full_page(500, at(2023, 12, 1, 0), 3)],
    );

    let result = fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Open,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap();

    assert_eq!(
        hub.requests(),
        vec![
            ("org/repo".to_string(), PullState::Open, 1),
            ("org/repo".to_string(), PullState::Open, 2),
        ]
    );
    // The older record on the final page is still kept; the caller filters
    // by date.
    assert_eq!(result.len(), 101);
}

#[tokio::test]
async fn test_fetch_continues_while_pages_are_recent() {
    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Open,
        vec![
            full_page(1, at(2024, 1, 9, 0), 2),
            full_page(3, at(2024, 1, 8, 0), 2),
        ],
    );

    let result = fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Open,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap();

    // Both pages are recent, so a third (empty) page is requested.
    let pages: Vec<u32> = hub.requests().iter().map(|(_, _, page)| *page).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn test_fetch_created_on_start_date_continues() {
    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Open,
        vec![vec![pr(1, "alice", None, at(2024, 1, 1, 0), None)]],
    );

    fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Open,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap();

    assert_eq!(hub.requests().len(), 2);
}

#[tokio::test]
async fn test_fetch_empty_repository() {
    let hub = MockHub::new();

    let result = fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Closed,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap();

    assert!(result.is_empty());
    assert_eq!(hub.requests().len(), 1);
}

#[tokio::test]
async fn test_fetch_matches_author_or_assignee() {
    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Open,
        vec![vec![
            pr(1, "alice", None, at(2024, 1, 9, 0), None),
            pr(2, "bob", Some("alice"), at(2024, 1, 8, 0), None),
            pr(3, "bob", Some("carol"), at(2024, 1, 7, 0), None),
            pr(4, "Alice", None, at(2024, 1, 6, 0), None),
            pr(5, "dave", None, at(2023, 12, 1, 0), None),
        ]],
    );

    let result = fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Open,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap();

    let numbers: Vec<u64> = result.iter().map(|pr| pr.number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn test_fetch_with_no_usernames_returns_nothing() {
    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Open,
        vec![vec![pr(1, "alice", None, at(2023, 12, 1, 0), None)]],
    );

    let result = fetch_pull_requests(&hub, &org_repo(), PullState::Open, date(2024, 1, 1), &[])
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_fetch_propagates_remote_error() {
    let hub = MockHub::new()
        .with_pages(
            "org/repo",
            PullState::Closed,
            vec![full_page(1, at(2024, 1, 9, 0), 2)],
        )
        .failing_at(PullState::Closed, 2, 401);

    let err = fetch_pull_requests(
        &hub,
        &org_repo(),
        PullState::Closed,
        date(2024, 1, 1),
        &names(&["alice"]),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("org/repo"));
    assert!(err.to_string().contains("closed"));
}

#[tokio::test]
async fn test_report_excludes_unmerged_and_out_of_window() {
    let hub = MockHub::new().with_pages(
        "org/repo",
        PullState::Closed,
        vec![vec![
            pr(1, "alice", None, at(2024, 1, 9, 0), None),
            pr(2, "alice", None, at(2024, 1, 8, 0), Some(at(2024, 1, 11, 0))),
            pr(3, "alice", None, at(2024, 1, 7, 0), Some(at(2024, 1, 10, 23))),
            pr(4, "alice", None, at(2023, 12, 20, 0), Some(at(2023, 12, 31, 0))),
        ]],
    );

    let report = build_report(&hub, &[org_repo()], &window(StateFilter::Closed, &["alice"]))
        .await
        .unwrap();

    let numbers: Vec<u64> = report.sections[0]
        .entries
        .iter()
        .map(|entry| entry.pull.number)
        .collect();
    assert_eq!(numbers, vec![3]);
}

#[tokio::test]
async fn test_report_both_states_lists_merged_first() {
    let hub = MockHub::new()
        .with_pages(
            "org/repo",
            PullState::Open,
            vec![vec![pr(10, "alice", None, at(2023, 11, 1, 0), None)]],
        )
        .with_pages(
            "org/repo",
            PullState::Closed,
            vec![vec![pr(
                11,
                "alice",
                None,
                at(2023, 12, 1, 0),
                Some(at(2024, 1, 2, 0)),
            )]],
        );

    let report = build_report(&hub, &[org_repo()], &window(StateFilter::Both, &["alice"]))
        .await
        .unwrap();

    let kinds: Vec<EntryKind> = report.sections[0]
        .entries
        .iter()
        .map(|entry| entry.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![EntryKind::Merged(date(2024, 1, 2)), EntryKind::Open]
    );

    let states: Vec<PullState> = hub.requests().iter().map(|(_, state, _)| *state).collect();
    assert_eq!(states, vec![PullState::Closed, PullState::Open]);
}

#[tokio::test]
async fn test_report_walks_repositories_in_order() {
    let hub = MockHub::new().with_pages(
        "org/other",
        PullState::Open,
        vec![vec![pr(20, "bob", None, at(2024, 1, 5, 0), None)]],
    );
    let repos = vec![org_repo(), Repo::new("org", "other").unwrap()];

    let report = build_report(&hub, &repos, &window(StateFilter::Open, &["bob"]))
        .await
        .unwrap();

    assert_eq!(report.sections.len(), 2);
    assert!(report.sections[0].entries.is_empty());
    assert_eq!(report.sections[1].repo.to_string(), "org/other");
    assert_eq!(report.sections[1].entries.len(), 1);

    let repos_requested: Vec<String> = hub
        .requests()
        .into_iter()
        .map(|(repo, _, _)| repo)
        .collect();
    assert_eq!(repos_requested[0], "org/repo");
    assert_eq!(repos_requested.last().unwrap(), "org/other");
}

#[tokio::test]
async fn test_report_error_names_repository() {
    let hub = MockHub::new().failing_at(PullState::Open, 1, 404);

    let err = build_report(&hub, &[org_repo()], &window(StateFilter::Open, &["alice"]))
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("Failed to fetch open pull requests for org/repo"));
    assert!(message.contains("404"));
}

fn today() -> NaiveDate {
    date(2024, 3, 15)
}

#[test]
fn test_cli_report_defaults() {
    let invocation = parse_args_on(
        [
            "pr-checker",
            "--config",
            "/tmp/pr-checker.json",
            "--api-url",
            "https://api.github.com",
        ],
        today(),
    )
    .unwrap();

    assert_eq!(
        invocation,
        Invocation::Report {
            config_path: PathBuf::from("/tmp/pr-checker.json"),
            api_url: "https://api.github.com".to_string(),
            options: ReportOptions {
                states: StateFilter::Both,
                start_date: date(2024, 3, 8),
                end_date: date(2024, 3, 15),
                who: ActorScope::Both,
            },
        }
    );
}

#[test]
fn test_cli_report_explicit_options() {
    let invocation = parse_args_on(
        [
            "pr-checker",
            "--config",
            "cfg.json",
            "--status",
            "closed",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-10",
            "--who",
            "me",
        ],
        today(),
    )
    .unwrap();

    let Invocation::Report { options, .. } = invocation else {
        panic!("expected a report invocation");
    };
    assert_eq!(
        options,
        ReportOptions {
            states: StateFilter::Closed,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 10),
            who: ActorScope::Me,
        }
    );
}

#[test]
fn test_cli_default_start_follows_past_end_date() {
    let invocation = parse_args_on(
        ["pr-checker", "--config", "cfg.json", "--end-date", "2024-02-01"],
        today(),
    )
    .unwrap();

    let Invocation::Report { options, .. } = invocation else {
        panic!("expected a report invocation");
    };
    assert_eq!(options.start_date, date(2024, 1, 25));
    assert_eq!(options.end_date, date(2024, 2, 1));
}

#[test]
fn test_cli_rejects_reversed_dates() {
    let result = parse_args_on(
        [
            "pr-checker",
            "--config",
            "cfg.json",
            "--start-date",
            "2024-02-01",
            "--end-date",
            "2024-01-01",
        ],
        today(),
    );
    let err = result.unwrap_err();
    let clap_err = err.downcast_ref::<clap::Error>().unwrap();
    assert_eq!(clap_err.kind(), clap::error::ErrorKind::ArgumentConflict);
    assert_eq!(clap_err.exit_code(), 2);

    let err = parse_args_on(
        ["pr-checker", "--config", "cfg.json", "--start-date", "2024-04-01"],
        today(),
    )
    .unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
    assert!(err.to_string().contains("defaults to today"));
}

#[test]
fn test_cli_rejects_malformed_date_and_status() {
    for args in [
        vec!["pr-checker", "--config", "c.json", "--start-date", "01/02/2024"],
        vec!["pr-checker", "--config", "c.json", "--status", "merged"],
        vec!["pr-checker", "--config", "c.json", "--who", "everyone"],
    ] {
        let err = parse_args_on(args, today()).unwrap_err();
        assert!(err.downcast_ref::<clap::Error>().is_some());
    }
}

#[test]
fn test_cli_init() {
    let invocation =
        parse_args_on(["pr-checker", "--init", "--config", "c.json"], today()).unwrap();
    assert_eq!(
        invocation,
        Invocation::Init {
            config_path: PathBuf::from("c.json")
        }
    );
}

#[test]
fn test_cli_update_config() {
    let invocation = parse_args_on(
        [
            "pr-checker",
            "--config",
            "c.json",
            "--update-config",
            "--set-team",
            "bob, carol",
            "--set-token",
            "ghp_new",
        ],
        today(),
    )
    .unwrap();

    assert_eq!(
        invocation,
        Invocation::UpdateConfig {
            config_path: PathBuf::from("c.json"),
            update: ConfigUpdate {
                my_username: None,
                token: Some("ghp_new".to_string()),
                team_usernames: Some("bob, carol".to_string()),
                repos: None,
            },
        }
    );
}

#[test]
fn test_cli_update_config_requires_a_value() {
    let err = parse_args_on(["pr-checker", "--config", "c.json", "--update-config"], today())
        .unwrap_err();
    assert!(err.to_string().contains("--set-username"));
    let clap_err = err.downcast_ref::<clap::Error>().unwrap();
    assert_eq!(clap_err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    assert_eq!(clap_err.exit_code(), 2);
}

#[test]
fn test_cli_help_says_team_excludes_you() {
    let err = parse_args_on(["pr-checker", "--help"], today()).unwrap_err();
    let clap_err = err.downcast_ref::<clap::Error>().unwrap();
    assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);

    let help = clap_err.to_string();
    assert!(help.contains("is the team without you"));
}

#[test]
fn test_cli_set_flags_require_update_config() {
    let err = parse_args_on(
        ["pr-checker", "--config", "c.json", "--set-username", "alice"],
        today(),
    )
    .unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
}

#[test]
fn test_cli_init_conflicts_with_update() {
    let err = parse_args_on(
        [
            "pr-checker",
            "--config",
            "c.json",
            "--init",
            "--update-config",
            "--set-username",
            "alice",
        ],
        today(),
    )
    .unwrap_err();
    assert!(err.downcast_ref::<clap::Error>().is_some());
}

#[test]
fn test_report_options_from_stored_config() {
    let config = Config {
        my_username: "alice".to_string(),
        token: String::new(),
        team_usernames: vec!["bob".to_string(), "carol".to_string()],
        repos: vec!["org/repo".to_string()],
    };
    let options = ReportOptions {
        states: StateFilter::Both,
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 10),
        who: ActorScope::Team,
    };

    let window = options.window(&config).unwrap();
    assert_eq!(window.usernames, vec!["bob", "carol"]);
    assert_eq!(config.repositories().unwrap(), vec![org_repo()]);
}
