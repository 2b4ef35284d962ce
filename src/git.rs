//! Version-control queries behind a small synchronous interface.
//!
//! The production implementation shells out to `git`, one process per
//! query, each bounded by a timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::Error;

/// How often a running git child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Queries the checker, `status`, and `mark` need from version control.
/// Every call may fail with a recoverable error for that one path.
pub trait VersionControl: Sync {
    /// Hash of the latest commit touching `path`, `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` or `Error::GitTimeout`.
    fn current_commit_hash(&self, path: &Path) -> Result<Option<String>, Error>;

    /// Diff of `path` between two commits, `None` if unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` or `Error::GitTimeout`.
    fn diff(&self, path: &Path, from: &str, to: &str) -> Result<Option<String>, Error>;

    /// Content of `path` at commit `hash`, `None` if it did not exist there.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` or `Error::GitTimeout`.
    fn file_content_at_commit(&self, path: &Path, hash: &str) -> Result<Option<String>, Error>;

    /// Tracked and free of local modifications.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` or `Error::GitTimeout`.
    fn is_committed(&self, path: &Path) -> Result<bool, Error>;
}

/// `git` command line client.
#[derive(Debug, Clone, Copy)]
pub struct GitCli {
    /// Bound on each git invocation.
    timeout: Duration,
}

/// Captured result of one git invocation.
struct GitOutput {
    /// Captured standard error.
    stderr: String,
    /// Captured standard output.
    stdout: String,
    /// Exit status was zero.
    success: bool,
}

impl GitCli {
    /// Run a prepared git command for `path`, killing it after the timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed` if git cannot be spawned, `Error::GitTimeout`
    /// if it does not exit in time, or `Error::Io` if waiting fails.
    fn execute(&self, path: &Path, mut command: Command) -> Result<GitOutput, Error> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                return Error::GitFailed {
                    path: path.to_path_buf(),
                    reason: format!("cannot spawn git: {e}"),
                };
            })?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::GitTimeout {
                    path: path.to_path_buf(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        return Ok(GitOutput {
            stderr: stderr.join().unwrap_or_default(),
            stdout: stdout.join().unwrap_or_default(),
            success: status.success(),
        });
    }

    /// Client whose invocations are killed after `timeout`.
    pub const fn new(timeout: Duration) -> Self {
        return Self { timeout };
    }

    /// Run a query that must succeed; non-zero exit becomes `GitFailed`.
    ///
    /// # Errors
    ///
    /// Returns `Error::GitFailed`, `Error::GitTimeout`, or `Error::Io`.
    fn query(&self, path: &Path, args: &[&str], pathspec: bool) -> Result<String, Error> {
        let output = self.execute(path, git_command(path, args, pathspec)?)?;
        if !output.success {
            return Err(Error::GitFailed {
                path: path.to_path_buf(),
                reason: output.stderr.trim().to_string(),
            });
        }
        return Ok(output.stdout);
    }
}

impl VersionControl for GitCli {
    fn current_commit_hash(&self, path: &Path) -> Result<Option<String>, Error> {
        let stdout = self.query(path, &["log", "-n", "1", "--format=%H"], true)?;
        let hash = stdout.trim();
        return Ok((!hash.is_empty()).then(|| return hash.to_string()));
    }

    fn diff(&self, path: &Path, from: &str, to: &str) -> Result<Option<String>, Error> {
        let stdout = self.query(path, &["diff", from, to], true)?;
        return Ok((!stdout.trim().is_empty()).then_some(stdout));
    }

    fn file_content_at_commit(&self, path: &Path, hash: &str) -> Result<Option<String>, Error> {
        let name = file_name(path)?;
        let object = format!("{hash}:./{name}");
        let output = self.execute(path, git_command(path, &["show", &object], false)?)?;
        return Ok(output.success.then_some(output.stdout));
    }

    fn is_committed(&self, path: &Path) -> Result<bool, Error> {
        let status = self.query(path, &["status", "--porcelain", "--ignored"], true)?;
        if !status.trim().is_empty() {
            return Ok(false);
        }
        // A clean status is also what git reports for paths it does not know.
        let tracked = self.execute(path, git_command(path, &["ls-files", "--error-unmatch"], true)?)?;
        return Ok(tracked.success);
    }
}

/// Read a pipe to the end on a helper thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    return std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        return String::from_utf8_lossy(&buf).into_owned();
    });
}

/// Final component of `path` as UTF-8.
///
/// # Errors
///
/// Returns `Error::GitFailed` if the path has no usable file name.
fn file_name(path: &Path) -> Result<String, Error> {
    return path
        .file_name()
        .and_then(|n| return n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            return Error::GitFailed {
                path: path.to_path_buf(),
                reason: "path has no file name".to_string(),
            };
        });
}

/// `git -C <dir> <args> [-- <name>]` for a file, run from its directory.
///
/// # Errors
///
/// Returns `Error::GitFailed` if the path has no usable file name.
fn git_command(path: &Path, args: &[&str], pathspec: bool) -> Result<Command, Error> {
    let dir = path.parent().filter(|d| return !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut command = Command::new("git");
    command.arg("-C").arg(dir).args(args);
    if pathspec {
        command.arg("--").arg(file_name(path)?);
    }
    return Ok(command);
}

/// In-memory `VersionControl` for tests.
#[cfg(test)]
pub mod fake {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use super::VersionControl;
    use crate::error::Error;

    /// Scripted answers per path. Paths absent from every map are untracked.
    #[derive(Debug, Default)]
    pub struct FakeVcs {
        /// Paths whose queries fail.
        pub broken: Vec<PathBuf>,
        /// Paths reported as committed and clean.
        pub committed: Vec<PathBuf>,
        /// Content at (path, hash).
        pub contents: HashMap<(PathBuf, String), String>,
        /// Latest commit per path.
        pub hashes: HashMap<PathBuf, String>,
    }

    impl FakeVcs {
        /// Simulated git failure for every query.
        fn fail_if_broken(&self, path: &Path) -> Result<(), Error> {
            if self.broken.iter().any(|p| p == path) {
                return Err(Error::GitFailed {
                    path: path.to_path_buf(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(())
        }
    }

    impl VersionControl for FakeVcs {
        fn current_commit_hash(&self, path: &Path) -> Result<Option<String>, Error> {
            self.fail_if_broken(path)?;
            Ok(self.hashes.get(path).cloned())
        }

        fn diff(&self, path: &Path, from: &str, to: &str) -> Result<Option<String>, Error> {
            self.fail_if_broken(path)?;
            Ok((from != to).then(|| format!("diff {from}..{to}")))
        }

        fn file_content_at_commit(&self, path: &Path, hash: &str) -> Result<Option<String>, Error> {
            self.fail_if_broken(path)?;
            Ok(self.contents.get(&(path.to_path_buf(), hash.to_string())).cloned())
        }

        fn is_committed(&self, path: &Path) -> Result<bool, Error> {
            self.fail_if_broken(path)?;
            Ok(self.committed.iter().any(|p| p == path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["-c", "user.name=doclink", "-c", "user.email=doclink@example.com"])
            .args(args)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&status.stderr));
    }

    #[test]
    fn committed_modified_and_untracked() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        git(root, &["init", "-q"]);
        std::fs::write(root.join("a.md"), "# A\n").unwrap();
        git(root, &["add", "a.md"]);
        git(root, &["commit", "-q", "-m", "first"]);

        let cli = GitCli::new(Duration::from_secs(30));
        let a = root.join("a.md");
        assert!(cli.is_committed(&a).unwrap());
        let first = cli.current_commit_hash(&a).unwrap().unwrap();
        assert_eq!(first.len(), 40);

        std::fs::write(&a, "# A changed\n").unwrap();
        assert!(!cli.is_committed(&a).unwrap());

        git(root, &["commit", "-q", "-am", "second"]);
        let second = cli.current_commit_hash(&a).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(cli.file_content_at_commit(&a, &first).unwrap().as_deref(), Some("# A\n"));
        assert!(cli.diff(&a, &first, &second).unwrap().unwrap().contains("+# A changed"));
        assert!(cli.diff(&a, &second, &second).unwrap().is_none());

        let b = root.join("b.md");
        std::fs::write(&b, "# B\n").unwrap();
        assert!(!cli.is_committed(&b).unwrap());
        assert!(cli.current_commit_hash(&b).unwrap().is_none());
        assert!(cli.file_content_at_commit(&b, &second).unwrap().is_none());
    }

    #[test]
    fn outside_a_repository_is_an_error() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "# A\n").unwrap();
        let cli = GitCli::new(Duration::from_secs(30));
        assert!(matches!(cli.is_committed(&file), Err(Error::GitFailed { .. })));
    }
}
