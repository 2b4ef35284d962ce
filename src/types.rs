/// Report aggregates produced by the checker and the corrector.
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Why a source file failed the git status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GitErrorKind {
    /// Has history, but local modifications or an unstaged state.
    Uncommitted,
    /// No commit touches the file (or its status could not be determined).
    Untracked,
}

/// A source file that is not cleanly committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitError {
    /// The offending file.
    pub file: PathBuf,
    /// Untracked or uncommitted.
    pub kind: GitErrorKind,
}

/// Why an internal link failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkErrorKind {
    /// Target exists, but has no heading with the anchor's slug.
    AnchorNotFound,
    /// Resolved target path does not exist.
    FileNotFound,
}

/// One broken internal link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkError {
    /// Anchor part of the destination, if any.
    pub anchor: Option<String>,
    /// File missing or anchor missing.
    pub kind: LinkErrorKind,
    /// Destination as written.
    pub raw_destination: String,
    /// Absolute path the destination resolved to.
    pub resolved_target: PathBuf,
    /// Document containing the link.
    pub source_file: PathBuf,
}

/// Everything a `check` run found. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Git status findings, in input file order.
    git_errors: Vec<GitError>,
    /// Broken links, in input file and document order.
    link_errors: Vec<LinkError>,
}

impl CheckResult {
    /// Git status findings.
    pub fn git_errors(&self) -> &[GitError] {
        return &self.git_errors;
    }

    /// Whether anything was found.
    pub fn has_errors(&self) -> bool {
        return !self.git_errors.is_empty() || !self.link_errors.is_empty();
    }

    /// Broken links.
    pub fn link_errors(&self) -> &[LinkError] {
        return &self.link_errors;
    }

    /// Build from findings; the result owns its lists.
    pub const fn new(git_errors: Vec<GitError>, link_errors: Vec<LinkError>) -> Self {
        return Self { git_errors, link_errors };
    }
}

/// Outcome of correcting one translated document.
///
/// Non-empty `errors` still comes with best-effort `corrected_content`:
/// links that could not be corrected are passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCorrectionResult {
    /// Anchors remapped by heading position.
    anchor_corrections: usize,
    /// Asset paths recomputed relative to the translated file.
    asset_corrections: usize,
    /// Reassembled document text.
    #[serde(skip)]
    corrected_content: String,
    /// Structural mismatch messages, deduplicated, in encounter order.
    errors: Vec<String>,
    /// Front matter fields whose value changed.
    front_matter_corrections: usize,
    /// The translated document.
    target_file: PathBuf,
}

impl LinkCorrectionResult {
    /// Anchors remapped by heading position.
    pub const fn anchor_corrections(&self) -> usize {
        return self.anchor_corrections;
    }

    /// Asset paths recomputed relative to the translated file.
    pub const fn asset_corrections(&self) -> usize {
        return self.asset_corrections;
    }

    /// Reassembled document text.
    pub fn corrected_content(&self) -> &str {
        return &self.corrected_content;
    }

    /// Structural mismatch messages.
    pub fn errors(&self) -> &[String] {
        return &self.errors;
    }

    /// Front matter fields whose value changed.
    pub const fn front_matter_corrections(&self) -> usize {
        return self.front_matter_corrections;
    }

    /// Build a result; see `CorrectionCounts` for the counters.
    pub fn new(target_file: &Path, corrected_content: String, counts: CorrectionCounts, errors: Vec<String>) -> Self {
        return Self {
            anchor_corrections: counts.anchors,
            asset_corrections: counts.assets,
            corrected_content,
            errors,
            front_matter_corrections: counts.front_matter,
            target_file: target_file.to_path_buf(),
        };
    }

    /// The translated document.
    pub fn target_file(&self) -> &Path {
        return &self.target_file;
    }

    /// Sum of all correction counters.
    pub const fn total_corrections(&self) -> usize {
        return self
            .anchor_corrections
            .saturating_add(self.asset_corrections)
            .saturating_add(self.front_matter_corrections);
    }
}

/// Running tallies while a document is being corrected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionCounts {
    /// Anchor remaps.
    pub anchors: usize,
    /// Asset path recomputations.
    pub assets: usize,
    /// Changed front matter fields.
    pub front_matter: usize,
}
