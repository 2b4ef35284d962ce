//! CLI commands for doclink: check, correct, status, mark.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::batch;
use crate::cache::AnchorCache;
use crate::checker::IntegrityChecker;
use crate::config::{CONFIG_FILE, Config};
use crate::corrector::LinkCorrector;
use crate::diagnostics;
use crate::error::Error;
use crate::git::{GitCli, VersionControl};
use crate::paths;
use crate::scanner;
use crate::status;
use crate::types::LinkCorrectionResult;

/// Report format for `check`, `correct`, and `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Serialized result records.
    Json,
    /// Markdown for humans.
    Text,
}

/// Validate every link (and, unless disabled, the git status) of the source
/// tree. Derived trees nested in the source are not checked.
///
/// # Errors
///
/// Returns config errors, or `Error::Json` if the report cannot be serialized.
pub fn check(root: &Path, format: Format, no_git: bool, jobs: Option<usize>) -> Result<ExitCode, Error> {
    let mut config = Config::load(root)?;
    if no_git {
        config.check_git = false;
    }
    if let Some(jobs) = jobs {
        config.jobs = jobs;
    }

    let mut scan = scanner::scan(&config.source, &config);
    scan.files.retain(|(path, _)| return !config.in_target_tree(path));
    scan.unreadable.retain(|path| return !config.in_target_tree(path));
    let cache = AnchorCache::default();
    let git = GitCli::new(config.git_timeout);
    let vcs: Option<&dyn VersionControl> = if config.check_git { Some(&git) } else { None };
    let result = IntegrityChecker::new(&cache, &config.root, vcs).check_all(&scan, config.jobs);
    tracing::debug!(anchor_sets = cache.anchor_set_count(), "anchor cache");

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => {
            let documents = scan.files.len().saturating_add(scan.unreadable.len());
            diagnostics::print_report(&diagnostics::render_check(&result, &config.root, documents));
        },
    }

    if result.has_errors() {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Rewrite the links of every translated counterpart in the target trees.
///
/// # Errors
///
/// Returns config errors, contract violations from the corrector, or I/O
/// errors writing corrected files.
pub fn correct(
    root: &Path,
    targets: &[PathBuf],
    dry_run: bool,
    format: Format,
    jobs: Option<usize>,
) -> Result<ExitCode, Error> {
    let mut config = load_with_targets(root, targets)?;
    if let Some(jobs) = jobs {
        config.jobs = jobs;
    }

    let sources = source_documents(&config);
    let cache = AnchorCache::default();
    let corrector = LinkCorrector::new(&cache, &config);
    let mut results: Vec<LinkCorrectionResult> = Vec::new();

    for target_root in &config.targets {
        let corrected = batch::run(&sources, config.jobs, |source| {
            return corrector.correct_counterpart(source, target_root);
        });
        for result in corrected {
            let Some(result) = result? else {
                continue;
            };
            if result.total_corrections() > 0 && !dry_run {
                std::fs::write(result.target_file(), result.corrected_content())?;
            }
            results.push(result);
        }
    }

    tracing::debug!(heading_indices = cache.heading_index_count(), "anchor cache");
    tracing::info!(
        documents = results.len(),
        corrected = results.iter().filter(|r| return r.total_corrections() > 0).count(),
        dry_run,
        "correct finished"
    );
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        Format::Text => {
            diagnostics::print_report(&diagnostics::render_corrections(&results, &config.root, dry_run));
        },
    }

    if results.iter().any(|r| return !r.errors().is_empty()) {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Load config and apply `--target` overrides; at least one target must remain.
///
/// # Errors
///
/// Returns config errors, or `Error::ConfigInvalid` if no target is configured.
fn load_with_targets(root: &Path, targets: &[PathBuf]) -> Result<Config, Error> {
    let config = Config::load(root)?.with_targets(targets);
    if config.targets.is_empty() {
        return Err(Error::ConfigInvalid {
            path: config.root.join(CONFIG_FILE),
            reason: "no target trees: set `targets` or pass --target".to_string(),
        });
    }
    return Ok(config);
}

/// Record the current source commit in each translated file.
///
/// # Errors
///
/// Returns the first failure; files before it stay marked.
pub fn mark(root: &Path, files: &[PathBuf]) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let git = GitCli::new(config.git_timeout);
    for file in files {
        let file = paths::normalize_path(&std::path::absolute(file)?);
        let hash = status::mark(&git, &config, &file)?;
        println!("marked {} at {hash}", diagnostics::display_path(&file, &config.root));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Selected source documents, excluding any derived tree nested in the source.
fn source_documents(config: &Config) -> Vec<PathBuf> {
    return scanner::selected_paths(&config.source, config)
        .into_iter()
        .filter(|p| return !config.in_target_tree(p))
        .collect();
}

/// Report translation freshness of every source document per target tree.
///
/// # Errors
///
/// Returns config errors, `Error::OutsideRoot` for an unmappable source, or
/// `Error::Json` if the report cannot be serialized.
pub fn status(root: &Path, targets: &[PathBuf], diff: bool, format: Format) -> Result<ExitCode, Error> {
    let config = load_with_targets(root, targets)?;
    let git = GitCli::new(config.git_timeout);
    let sources = source_documents(&config);

    let mut entries = Vec::new();
    for target_root in &config.targets {
        entries.extend(status::report(&git, &config, &sources, target_root, diff)?);
    }
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        Format::Text => diagnostics::print_report(&diagnostics::render_status(&entries, &config.root)),
    }

    let needs_work = entries.iter().any(|e| return e.state.needs_work());

    if needs_work {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}
