use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::status::StatusEntry;
use crate::types::{CheckResult, GitErrorKind, LinkCorrectionResult, LinkErrorKind};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Path relative to `root` with forward slashes, or as is when outside it.
pub fn display_path(path: &Path, root: &Path) -> String {
    return match path.strip_prefix(root) {
        Ok(relative) => crate::paths::to_slash(relative),
        Err(_) => path.display().to_string(),
    };
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    for line in render_error(e).lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Print a markdown report to stdout, headings in bold.
pub fn print_report(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            println!("{BOLD}{line}{RESET}");
        } else {
            println!("{line}");
        }
    }
}

/// Check findings grouped per file, then a one-line summary.
pub fn render_check(result: &CheckResult, root: &Path, documents: usize) -> String {
    if !result.has_errors() {
        return format!("All {documents} documents OK\n");
    }

    let mut by_file: BTreeMap<&Path, Vec<String>> = BTreeMap::new();
    for error in result.git_errors() {
        let line = match error.kind {
            GitErrorKind::Uncommitted => "- UNCOMMITTED: local changes are not committed".to_string(),
            GitErrorKind::Untracked => "- UNTRACKED: file has no commit history".to_string(),
        };
        by_file.entry(&error.file).or_default().push(line);
    }
    for error in result.link_errors() {
        let line = match error.kind {
            LinkErrorKind::AnchorNotFound => format!(
                "- ANCHOR_NOT_FOUND `{}`: no heading `{}` in `{}`",
                error.raw_destination,
                error.anchor.as_deref().unwrap_or_default(),
                display_path(&error.resolved_target, root)
            ),
            LinkErrorKind::FileNotFound => format!(
                "- FILE_NOT_FOUND `{}`: `{}` does not exist",
                error.raw_destination,
                display_path(&error.resolved_target, root)
            ),
        };
        by_file.entry(&error.source_file).or_default().push(line);
    }

    let mut out = String::new();
    for (file, lines) in &by_file {
        let _ = writeln!(out, "# {}\n", display_path(file, root));
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{} of {documents} documents with errors: {} git, {} links",
        by_file.len(),
        result.git_errors().len(),
        result.link_errors().len()
    );
    return out;
}

/// One line per corrected file, every mismatch message, then totals.
pub fn render_corrections(results: &[LinkCorrectionResult], root: &Path, dry_run: bool) -> String {
    let verb = if dry_run { "would correct" } else { "corrected" };
    let mut out = String::new();
    let mut anchors = 0_usize;
    let mut assets = 0_usize;
    let mut front_matter = 0_usize;
    let mut files = 0_usize;

    for result in results {
        anchors = anchors.saturating_add(result.anchor_corrections());
        assets = assets.saturating_add(result.asset_corrections());
        front_matter = front_matter.saturating_add(result.front_matter_corrections());
        if result.total_corrections() > 0 {
            files = files.saturating_add(1);
            let _ = writeln!(
                out,
                "{verb} {}: {} anchors, {} assets, {} front matter",
                display_path(result.target_file(), root),
                result.anchor_corrections(),
                result.asset_corrections(),
                result.front_matter_corrections()
            );
        }
    }

    let errors: Vec<&String> = results.iter().flat_map(|r| return r.errors()).collect();
    if !errors.is_empty() {
        out.push_str("\n# Structural mismatches\n\n");
        for error in &errors {
            let _ = writeln!(out, "- {error}");
        }
    }

    let _ = writeln!(
        out,
        "\n{files} of {} documents {verb}: {anchors} anchors, {assets} assets, {front_matter} front matter, {} errors",
        results.len(),
        errors.len()
    );
    return out;
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigInvalid { path, reason } => format!(
            "\
# Error: Invalid Config

`{}`: {reason}

## Fix

Edit the file; see `doclink --help` for the keys it accepts.
",
            path.display()
        ),

        Error::GitFailed { path, reason } => format!(
            "\
# Error: Git Failed

git could not answer for `{}`:

    {reason}

## Fix

Run doclink inside a git work tree, or pass `--no-git` to `check`.
",
            path.display()
        ),

        Error::GitTimeout { path, timeout_secs } => format!(
            "\
# Error: Git Timed Out

git did not answer for `{}` within {timeout_secs}s.

## Fix

Raise `git_timeout_secs` in `{CONFIG_FILE}`.
",
            path.display()
        ),

        Error::MissingParent { path } => format!(
            "\
# Error: No Parent Directory

`{}` has no parent directory to resolve links from.
",
            path.display()
        ),

        Error::OutsideRoot { path, root } => format!(
            "\
# Error: Outside Root

`{}` is not under `{}`.

## Fix

Check `source` and `targets` in `{CONFIG_FILE}`, or pass `--target`.
",
            path.display(),
            root.display()
        ),

        Error::Uncommitted { path } => format!(
            "\
# Error: Uncommitted Source

`{}` has local changes or no history.

## Fix

Commit the source document, then mark its translation again.
",
            path.display()
        ),

        _ => render_generic(e),
    };
}

/// Diagnostics for wrapped library errors.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::Glob(e) => format!(
            "\
# Error: Invalid Glob

{e}

## Fix

Correct the pattern in `include` or `exclude` of `{CONFIG_FILE}`.
"
        ),
        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
        Error::ParseFailed { file, reason } => format!(
            "\
# Error: Parse Failed

Could not parse `{}`: {reason}
",
            file.display()
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}
"
        ),
        Error::Yaml(e) => format!(
            "\
# Error: Invalid Front Matter

{e}
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Status lines per document, diffs indented below outdated ones.
pub fn render_status(entries: &[StatusEntry], root: &Path) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<9} {}",
            entry.state.label(),
            display_path(&entry.translated_file, root)
        );
        if let Some(diff) = &entry.diff {
            for line in diff.lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    return out;
}
