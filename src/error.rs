/// Crate-level error types for doclink diagnostics.
use std::path::PathBuf;

/// Fatal conditions only. Broken links, git status findings, and heading
/// count mismatches are report data, never an `Error`. Each variant names
/// the file or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.doclink.toml` parsed but holds an unusable value.
    #[error("invalid config {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the offending config file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A git invocation exited unsuccessfully or could not be spawned.
    #[error("git failed for {}: {reason}", path.display())]
    GitFailed {
        /// File the git query was about.
        path: PathBuf,
        /// Captured stderr or spawn failure.
        reason: String,
    },

    /// A git invocation did not finish within the configured bound.
    #[error("git timed out after {timeout_secs}s for {}", path.display())]
    GitTimeout {
        /// File the git query was about.
        path: PathBuf,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },

    /// A configured include/exclude pattern is not a valid glob.
    #[error("glob: {0}")]
    Glob(
        /// The wrapped glob compilation error.
        #[from]
        globset::Error,
    ),

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A translated file has no parent directory to resolve links from.
    #[error("no parent directory: {}", path.display())]
    MissingParent {
        /// The parentless path.
        path: PathBuf,
    },

    /// A file was mapped against a tree root it does not live under.
    #[error("{} is not under {}", path.display(), root.display())]
    OutsideRoot {
        /// File that was mapped.
        path: PathBuf,
        /// Root it was expected under.
        root: PathBuf,
    },

    /// Tree-sitter failed to parse a markdown document.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File (or fragment) that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// `mark` was asked to record a commit for a source with local changes.
    #[error("source has uncommitted changes: {}", path.display())]
    Uncommitted {
        /// The dirty source file.
        path: PathBuf,
    },

    /// The file system watcher could not be set up.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description from the watcher backend.
        reason: String,
    },

    /// Front matter could not be serialized back to YAML.
    #[error("yaml: {0}")]
    Yaml(
        /// The wrapped YAML error.
        #[from]
        serde_yaml::Error,
    ),
}
