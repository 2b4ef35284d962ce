//! Translation freshness: which translated documents lag behind their source.
//!
//! A translated document records the source commit it was translated from in
//! a front matter field. `mark` writes that field; `report` compares it with
//! the source's history.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::batch;
use crate::config::Config;
use crate::error::Error;
use crate::frontmatter::{self, FrontMatter};
use crate::git::VersionControl;

/// Freshness of one translated counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Freshness {
    /// Translated from the current source content.
    Current,
    /// No translated counterpart exists.
    Missing,
    /// The source changed since the recorded commit.
    Outdated,
    /// Version control could not answer for this document.
    Unknown,
    /// The counterpart records no source commit.
    Unmarked,
}

impl Freshness {
    /// Label used in the text report.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Current => "CURRENT",
            Self::Missing => "MISSING",
            Self::Outdated => "OUTDATED",
            Self::Unknown => "UNKNOWN",
            Self::Unmarked => "UNMARKED",
        };
    }

    /// Whether this state makes `status` exit non-zero.
    pub const fn needs_work(self) -> bool {
        return matches!(self, Self::Missing | Self::Outdated);
    }
}

/// Status of one source document in one target tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Latest commit of the source, when known.
    pub current_commit: Option<String>,
    /// `git diff` from the recorded to the current commit, when requested.
    pub diff: Option<String>,
    /// Commit recorded in the translated document.
    pub recorded_commit: Option<String>,
    /// The source document.
    pub source_file: PathBuf,
    /// Freshness verdict.
    pub state: Freshness,
    /// Where the translated counterpart lives (or would live).
    pub translated_file: PathBuf,
}

/// Record the source's current commit in `translated_file`'s front matter.
/// Returns the recorded hash.
///
/// # Errors
///
/// Returns `Error::OutsideRoot` if the file is in no target tree,
/// `Error::Uncommitted` if the source has local changes or no history,
/// git errors from the queries, or I/O and YAML errors from the rewrite.
pub fn mark(vcs: &dyn VersionControl, config: &Config, translated_file: &Path) -> Result<String, Error> {
    let target_root = config
        .targets
        .iter()
        .find(|t| return translated_file.starts_with(t))
        .ok_or_else(|| {
            return Error::OutsideRoot {
                path: translated_file.to_path_buf(),
                root: config.targets.first().unwrap_or(&config.root).clone(),
            };
        })?;
    let source_file = config.source_path(translated_file, target_root)?;

    if !vcs.is_committed(&source_file)? {
        return Err(Error::Uncommitted { path: source_file });
    }
    let Some(hash) = vcs.current_commit_hash(&source_file)? else {
        return Err(Error::Uncommitted { path: source_file });
    };

    let content = std::fs::read_to_string(translated_file)?;
    let (raw, body) = frontmatter::split(&content);
    let mut front_matter = match raw {
        Some(raw) => FrontMatter::parse(raw.yaml)?,
        None => FrontMatter::default(),
    };
    front_matter.set_values(&config.source_commit_field, std::slice::from_ref(&hash));
    std::fs::write(translated_file, format!("{}{body}", front_matter.serialize()?))?;

    tracing::info!(file = %translated_file.display(), commit = %hash, "marked");
    return Ok(hash);
}

/// Status of every source document in `target_root`, in input order.
///
/// # Errors
///
/// Returns `Error::OutsideRoot` if a source is not under the source root.
pub fn report(
    vcs: &dyn VersionControl,
    config: &Config,
    sources: &[PathBuf],
    target_root: &Path,
    with_diff: bool,
) -> Result<Vec<StatusEntry>, Error> {
    return batch::run(sources, config.jobs, |source| {
        return status_of(vcs, config, source, target_root, with_diff);
    })
    .into_iter()
    .collect();
}

/// Status of one source document in `target_root`.
///
/// # Errors
///
/// Returns `Error::OutsideRoot` if `source_file` is not under the source root.
pub fn status_of(
    vcs: &dyn VersionControl,
    config: &Config,
    source_file: &Path,
    target_root: &Path,
    with_diff: bool,
) -> Result<StatusEntry, Error> {
    let translated_file = config.translated_path(source_file, target_root)?;
    let mut entry = StatusEntry {
        current_commit: None,
        diff: None,
        recorded_commit: None,
        source_file: source_file.to_path_buf(),
        state: Freshness::Missing,
        translated_file,
    };
    if !entry.translated_file.is_file() {
        return Ok(entry);
    }

    entry.recorded_commit = recorded_commit(&entry.translated_file, &config.source_commit_field);
    let Some(recorded) = entry.recorded_commit.clone() else {
        entry.state = Freshness::Unmarked;
        return Ok(entry);
    };

    entry.state = match compare(vcs, source_file, &recorded) {
        Ok((state, current)) => {
            entry.current_commit = current;
            state
        },
        Err(e) => {
            tracing::warn!(file = %source_file.display(), error = %e, "cannot determine freshness");
            Freshness::Unknown
        },
    };

    if with_diff
        && entry.state == Freshness::Outdated
        && let Some(current) = entry.current_commit.as_deref()
    {
        entry.diff = vcs.diff(source_file, &recorded, current).unwrap_or_else(|e| {
            tracing::warn!(file = %source_file.display(), error = %e, "cannot diff source");
            return None;
        });
    }
    return Ok(entry);
}

/// Compare the recorded commit with the source's history.
///
/// # Errors
///
/// Returns git errors, or `Error::Io` if the source cannot be read.
fn compare(
    vcs: &dyn VersionControl,
    source_file: &Path,
    recorded: &str,
) -> Result<(Freshness, Option<String>), Error> {
    let Some(current) = vcs.current_commit_hash(source_file)? else {
        return Ok((Freshness::Unknown, None));
    };
    if current == recorded {
        return Ok((Freshness::Current, Some(current)));
    }
    // A newer commit may have left this file's content as it was.
    let then = vcs.file_content_at_commit(source_file, recorded)?;
    let now = std::fs::read_to_string(source_file)?;
    if then.as_deref() == Some(now.as_str()) {
        return Ok((Freshness::Current, Some(current)));
    }
    return Ok((Freshness::Outdated, Some(current)));
}

/// Commit recorded in the front matter of `translated_file`, if any.
fn recorded_commit(translated_file: &Path, field: &str) -> Option<String> {
    let content = match std::fs::read_to_string(translated_file) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(file = %translated_file.display(), error = %e, "cannot read translated document");
            return None;
        },
    };
    let (raw, _) = frontmatter::split(&content);
    let front_matter = match FrontMatter::parse(raw?.yaml) {
        Ok(front_matter) => front_matter,
        Err(e) => {
            tracing::warn!(file = %translated_file.display(), error = %e, "unreadable front matter");
            return None;
        },
    };
    return front_matter
        .values(field)
        .into_iter()
        .map(|v| return v.trim().to_string())
        .find(|v| return !v.is_empty());
}
