use std::io::Write;

use anyhow::Result;
use pr_checker::{EntryKind, RepoSection, Report, ReportEntry};

const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[36m";
const MAGENTA: &str = "\x1b[35m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

const ENTRY_INDENT: &str = "   - ";
const NO_ENTRIES: &str = "   (no matching pull requests)";

fn paint(text: &str, codes: &[&str], styled: bool) -> String {
    if styled {
        format!("{}{text}{RESET}", codes.concat())
    } else {
        text.to_string()
    }
}

// Terminal control characters in titles would be interpreted by the
// terminal, so they are dropped.
fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// OSC 8 hyperlink when styled, `text (url)` otherwise.
fn hyperlink(text: &str, url: &str, styled: bool) -> String {
    let text = sanitize(text);
    let url = sanitize(url);
    if styled {
        format!("\x1b]8;;{url}\x1b\\{text}\x1b]8;;\x1b\\")
    } else {
        format!("{text} ({url})")
    }
}

fn format_entry(entry: &ReportEntry, styled: bool) -> String {
    let marker = match entry.kind {
        EntryKind::Merged(date) => paint(&format!("[merged:{date}]"), &[MAGENTA], styled),
        EntryKind::Open => paint("[open]", &[YELLOW], styled),
    };
    let author = paint(
        &format!("@{}", sanitize(entry.pull.author_login())),
        &[BLUE],
        styled,
    );
    let title = hyperlink(&entry.pull.title, &entry.pull.html_url, styled);

    format!("{ENTRY_INDENT}{marker} {author} -- {title}")
}

fn render_section<W: Write>(section: &RepoSection, styled: bool, writer: &mut W) -> Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        " - {}",
        paint(&section.repo.to_string(), &[BOLD, CYAN], styled)
    )?;

    if section.entries.is_empty() {
        writeln!(writer, "{NO_ENTRIES}")?;
    }
    for entry in &section.entries {
        writeln!(writer, "{}", format_entry(entry, styled))?;
    }
    Ok(())
}

/// Writes the report: a heading naming the people and dates, then one block
/// per repository.
pub fn display_report<W: Write>(report: &Report, styled: bool, writer: &mut W) -> Result<()> {
    let window = &report.window;
    writeln!(
        writer,
        "PRs for {} between {} and {}",
        window.usernames.join(", "),
        window.start_date,
        window.end_date
    )?;

    for section in &report.sections {
        render_section(section, styled, writer)?;
    }
    Ok(())
}
