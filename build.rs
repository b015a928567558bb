//! Build script for pr-checker - embeds build information.
//!
//! Sets `PR_CHECKER_BUILD_INFO` to a human-readable string shown by
//! `pr-checker --version`, e.g.
//! `0.1.0 (2adb30a27442+dirty, built 2025-06-10) rustc 1.88.0 (...)`.
//!
//! The commit and dirty marker are omitted when git is unavailable, such as
//! when building from a published crate.

use std::process::Command;

use chrono::Utc;

fn main() {
    ["src", "build.rs", "Cargo.toml"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    println!("cargo:rustc-env=PR_CHECKER_BUILD_INFO={}", build_info());
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}

/// Short commit hash with a `+dirty` suffix for uncommitted changes.
fn git_commit() -> Option<String> {
    let commit = command_output("git", &["rev-parse", "--short=12", "HEAD"])
        .filter(|commit| !commit.is_empty())?;
    let dirty = command_output("git", &["status", "--porcelain"])
        .is_some_and(|status| !status.is_empty());

    Some(if dirty {
        format!("{commit}+dirty")
    } else {
        commit
    })
}

fn build_info() -> String {
    let built = format!("built {}", Utc::now().format("%Y-%m-%d"));
    let details = match git_commit() {
        Some(commit) => format!("({commit}, {built})"),
        None => format!("({built})"),
    };

    [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        Some(details),
        command_output("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}
