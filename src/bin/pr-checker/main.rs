mod display;

use std::{
    io::{self, IsTerminal, Write},
    path::Path,
};

use anyhow::{Context, Result};
use display::display_report;
use pr_checker::{
    Config, ConfigUpdate, GitHub, Invocation, ReportOptions, build_report, init_interactive,
    parse_args, resolve_token,
};

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_init(config_path: &Path) -> Result<()> {
    let existing = Config::load_or_default(config_path)?;
    let mut stdout = io::stdout();
    let config = init_interactive(existing, &mut io::stdin().lock(), &mut stdout)?;
    config.save(config_path)?;
    writeln!(stdout, "Configuration saved to {}", config_path.display())?;
    Ok(())
}

fn run_update(config_path: &Path, update: ConfigUpdate) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    config.apply(update)?;
    config.save(config_path)?;
    println!("Configuration updated!");
    Ok(())
}

async fn run_report(config_path: &Path, api_url: &str, options: &ReportOptions) -> Result<()> {
    let config = Config::load(config_path)?;
    let repos = config.repositories()?;
    if repos.is_empty() {
        anyhow::bail!(
            "No repositories configured; set them with `pr-checker --update-config --set-repos owner/name,...`"
        );
    }
    let window = options.window(&config)?;

    let github = GitHub::new(api_url, resolve_token(&config.token))
        .context("Failed to set up GitHub client")?;
    let report = build_report(&github, &repos, &window).await?;

    let stdout = io::stdout();
    let styled = stdout.is_terminal();
    display_report(&report, styled, &mut stdout.lock())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let invocation = match parse_args(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    match invocation {
        Invocation::Init { config_path } => run_init(&config_path),
        Invocation::UpdateConfig {
            config_path,
            update,
        } => run_update(&config_path, update),
        Invocation::Report {
            config_path,
            api_url,
            options,
        } => run_report(&config_path, &api_url, &options).await,
    }
}
