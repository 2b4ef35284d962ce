//! File watcher: runs `check` on startup, then re-runs on changes in the
//! source and target trees.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands::{self, Format};
use crate::config::Config;
use crate::diagnostics;
use crate::error::Error;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the source and target trees
/// recursively and re-checks after each burst of changes.
///
/// # Errors
///
/// Returns errors from config loading or watcher setup.
pub fn run(root: &Path, no_git: bool) -> Result<ExitCode, Error> {
    tracing::info!("initial check");
    let mut last_code = run_check(root, no_git);

    let config = Config::load(root)?;
    let dirs = watch_dirs(&config);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    for dir in &dirs {
        watcher.watch(dir, RecursiveMode::Recursive).map_err(|e| {
            return Error::WatchFailed {
                reason: format!("cannot watch {}: {e}", dir.display()),
            };
        })?;
    }
    tracing::info!(directories = dirs.len(), "watching, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        tracing::info!("change detected, re-checking");
        last_code = run_check(root, no_git);
    }

    return Ok(last_code);
}

/// Run check once and print its report. Fatal errors are printed, not returned.
fn run_check(root: &Path, no_git: bool) -> ExitCode {
    return match commands::check(root, Format::Text, no_git, None) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2_u8)
        },
    };
}

/// Existing source and target roots; a target nested in the source is
/// already covered by the recursive source watch.
fn watch_dirs(config: &Config) -> Vec<PathBuf> {
    let mut dirs = vec![config.source.clone()];
    for target in &config.targets {
        if !target.starts_with(&config.source) {
            dirs.push(target.clone());
        }
    }
    dirs.retain(|d| return d.is_dir());
    return dirs;
}
