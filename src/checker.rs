//! Link integrity and git status validation of source documents.
//!
//! Validation failures are report data: every file is checked completely
//! and checking one file never aborts another.

use std::path::Path;

use crate::batch;
use crate::cache::AnchorCache;
use crate::collector::collect_links;
use crate::frontmatter;
use crate::git::VersionControl;
use crate::grammar::is_markdown;
use crate::headings::{AnchorSet, HeadingAnchorIndex};
use crate::markdown::Document;
use crate::paths;
use crate::reference::LinkReference;
use crate::scanner::Scan;
use crate::types::{CheckResult, GitError, GitErrorKind, LinkError, LinkErrorKind};

/// Findings for a single document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FileCheck {
    /// Git status finding, if the file is not cleanly committed.
    pub git_error: Option<GitError>,
    /// Broken links in document order.
    pub link_errors: Vec<LinkError>,
}

/// Validates documents of a source tree against the file system.
pub struct IntegrityChecker<'a> {
    /// Per-run anchor sets of link targets.
    cache: &'a AnchorCache,
    /// Root that `/`-prefixed paths resolve against.
    repository_root: &'a Path,
    /// Git status collaborator; `None` skips the git check.
    vcs: Option<&'a dyn VersionControl>,
}

impl<'a> IntegrityChecker<'a> {
    /// Check a whole scan on `jobs` workers. Unreadable files count as untracked.
    pub fn check_all(&self, scan: &Scan, jobs: usize) -> CheckResult {
        let reports = batch::run(&scan.files, jobs, |(file, content)| return self.check_file(file, content));

        let mut git_errors = Vec::new();
        let mut link_errors = Vec::new();
        for report in reports {
            git_errors.extend(report.git_error);
            link_errors.extend(report.link_errors);
        }
        for file in &scan.unreadable {
            git_errors.push(GitError {
                file: file.clone(),
                kind: GitErrorKind::Untracked,
            });
        }

        tracing::info!(
            files = scan.files.len().saturating_add(scan.unreadable.len()),
            git_errors = git_errors.len(),
            link_errors = link_errors.len(),
            "check finished"
        );
        return CheckResult::new(git_errors, link_errors);
    }

    /// Check one document: git status first, then every internal link.
    pub fn check_file(&self, file: &Path, content: &str) -> FileCheck {
        tracing::debug!(file = %file.display(), "checking");
        let git_error = self.vcs.and_then(|vcs| return git_status(vcs, file));
        let link_errors = self.check_links(file, content);
        return FileCheck { git_error, link_errors };
    }

    /// Validate one anchor against `anchors`; empty anchors are not checked.
    fn check_anchor(anchor: &str, anchors: &AnchorSet) -> bool {
        let wanted = paths::decode(anchor).to_lowercase();
        return wanted.is_empty() || anchors.contains(&wanted);
    }

    /// Validate every internal link of `content`.
    fn check_links(&self, file: &Path, content: &str) -> Vec<LinkError> {
        let (_, body) = frontmatter::split(content);
        let document = match Document::parse(body) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "cannot parse document; links not checked");
                return Vec::new();
            },
        };

        let base_dir = file.parent().unwrap_or(self.repository_root);
        let mut own_anchors: Option<AnchorSet> = None;
        let mut errors = Vec::new();

        for reference in collect_links(&document) {
            if reference.is_external {
                continue;
            }
            if reference.is_anchor_only() {
                let anchors = own_anchors
                    .get_or_insert_with(|| return HeadingAnchorIndex::from_document(&document).to_anchor_set());
                let anchor = reference.anchor.as_deref().unwrap_or_default();
                if !Self::check_anchor(anchor, anchors) {
                    errors.push(link_error(file, file, &reference, LinkErrorKind::AnchorNotFound));
                }
                continue;
            }
            if let Some(error) = self.check_path(file, base_dir, &reference) {
                errors.push(error);
            }
        }
        return errors;
    }

    /// Validate a reference that has a path component.
    fn check_path(&self, file: &Path, base_dir: &Path, reference: &LinkReference) -> Option<LinkError> {
        let raw_path = reference.path.as_deref().unwrap_or_default();
        if raw_path.is_empty() {
            return None;
        }
        let target = paths::resolve(&paths::decode(raw_path), base_dir, self.repository_root);
        if !target.exists() {
            return Some(link_error(file, &target, reference, LinkErrorKind::FileNotFound));
        }

        let anchor = reference.anchor.as_deref()?;
        if !target.is_file() || !is_markdown(&target) {
            return None;
        }
        if Self::check_anchor(anchor, &self.cache.anchor_set(&target)) {
            return None;
        }
        return Some(link_error(file, &target, reference, LinkErrorKind::AnchorNotFound));
    }

    /// Checker over `repository_root`; pass `None` to skip git status checks.
    pub fn new(cache: &'a AnchorCache, repository_root: &'a Path, vcs: Option<&'a dyn VersionControl>) -> Self {
        return Self {
            cache,
            repository_root,
            vcs,
        };
    }
}

/// Git status of one file. Query failures are reported as untracked.
fn git_status(vcs: &dyn VersionControl, file: &Path) -> Option<GitError> {
    let kind = match vcs.is_committed(file) {
        Ok(true) => return None,
        Ok(false) => match vcs.current_commit_hash(file) {
            Ok(Some(_)) => GitErrorKind::Uncommitted,
            Ok(None) => GitErrorKind::Untracked,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "git history query failed");
                GitErrorKind::Untracked
            },
        },
        Err(e) => {
            tracing::warn!(file = %file.display(), error = %e, "git status query failed");
            GitErrorKind::Untracked
        },
    };
    return Some(GitError {
        file: file.to_path_buf(),
        kind,
    });
}

/// Build a `LinkError` for `reference` found in `file`.
fn link_error(file: &Path, target: &Path, reference: &LinkReference, kind: LinkErrorKind) -> LinkError {
    return LinkError {
        anchor: reference.anchor.clone(),
        kind,
        raw_destination: reference.raw.clone(),
        resolved_target: target.to_path_buf(),
        source_file: file.to_path_buf(),
    };
}
