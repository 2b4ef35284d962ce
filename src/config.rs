use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::Error;
use crate::paths;

/// Name of the config file looked up in the root directory.
pub const CONFIG_FILE: &str = ".doclink.toml";

/// Project configuration loaded from `.doclink.toml`.
///
/// All directories are absolute and normalized. Include/exclude globs are
/// matched against paths relative to the tree being scanned.
#[derive(Debug, Clone)]
pub struct Config {
    /// Run the git status part of `check`.
    pub check_git: bool,
    /// Compiled exclusion globs.
    exclude: GlobSet,
    /// Upper bound on each git invocation.
    pub git_timeout: Duration,
    /// Compiled file-selection globs.
    include: GlobSet,
    /// Worker threads for batch runs; 0 means available parallelism.
    pub jobs: usize,
    /// Repository root; `/`-prefixed link paths resolve against it.
    pub root: PathBuf,
    /// Root of the source tree.
    pub source: PathBuf,
    /// Front matter field `mark` records the source commit in.
    pub source_commit_field: String,
    /// Roots of the derived (translated) trees.
    pub targets: Vec<PathBuf>,
    /// Front matter fields whose values are translated text.
    pub translatable_front_matter: Vec<String>,
}

/// Raw TOML structure for `.doclink.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DoclinkTomlConfig {
    /// See `Config::check_git`.
    #[serde(default = "default_true")]
    check_git: bool,
    /// Exclusion globs.
    #[serde(default)]
    exclude: Vec<String>,
    /// Timeout in seconds for git invocations.
    #[serde(default = "default_git_timeout_secs")]
    git_timeout_secs: u64,
    /// File-selection globs.
    #[serde(default = "default_include")]
    include: Vec<String>,
    /// See `Config::jobs`.
    #[serde(default)]
    jobs: usize,
    /// Source tree, relative to the root.
    #[serde(default = "default_source")]
    source: String,
    /// See `Config::source_commit_field`.
    #[serde(default = "default_source_commit_field")]
    source_commit_field: String,
    /// Derived trees, relative to the root.
    #[serde(default)]
    targets: Vec<String>,
    /// See `Config::translatable_front_matter`.
    #[serde(default = "default_translatable_front_matter")]
    translatable_front_matter: Vec<String>,
}

impl Config {
    /// Whether `path` lies in one of the derived trees.
    pub fn in_target_tree(&self, path: &Path) -> bool {
        return self.targets.iter().any(|t| return path.starts_with(t));
    }

    /// Whether `path` is selected by the include globs and not excluded,
    /// judged relative to `tree_root`. Paths outside the tree never are.
    pub fn is_selected(&self, path: &Path, tree_root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(tree_root) else {
            return false;
        };
        let relative = paths::to_slash(relative);
        return self.include.is_match(&relative) && !self.exclude.is_match(&relative);
    }

    /// Whether `path` is a translatable document: a selected file under the
    /// source root and outside every derived tree. Directories under the
    /// source root count as mirrored too.
    pub fn is_translatable(&self, path: &Path) -> bool {
        if !path.starts_with(&self.source) || self.in_target_tree(path) {
            return false;
        }
        if path.is_dir() {
            return true;
        }
        return self.is_selected(path, &self.source);
    }

    /// Load config from `.doclink.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, `Error::Glob` for a bad
    /// pattern, or `Error::ConfigInvalid` for an unusable value.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let root = paths::normalize_path(&std::path::absolute(root)?);
        let path = root.join(CONFIG_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::defaults(),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::from_raw(&root, &path, raw);
    }

    /// Map a translated file back to its source counterpart.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingParent` if the file has no parent directory,
    /// or `Error::OutsideRoot` if it is not under `target_root`.
    pub fn source_path(&self, translated: &Path, target_root: &Path) -> Result<PathBuf, Error> {
        if translated.parent().is_none() {
            return Err(Error::MissingParent { path: translated.to_path_buf() });
        }
        let relative = translated.strip_prefix(target_root).map_err(|_err| {
            return Error::OutsideRoot {
                path: translated.to_path_buf(),
                root: target_root.to_path_buf(),
            };
        })?;
        return Ok(self.source.join(relative));
    }

    /// Map a source file to its counterpart in `target_root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutsideRoot` if the file is not under the source root.
    pub fn translated_path(&self, source_file: &Path, target_root: &Path) -> Result<PathBuf, Error> {
        let relative = source_file.strip_prefix(&self.source).map_err(|_err| {
            return Error::OutsideRoot {
                path: source_file.to_path_buf(),
                root: self.source.clone(),
            };
        })?;
        return Ok(target_root.join(relative));
    }

    /// Replace the configured targets with `targets`, relative to the root.
    pub fn with_targets(mut self, targets: &[PathBuf]) -> Self {
        if !targets.is_empty() {
            self.targets = targets.iter().map(|t| return self.absolute(t)).collect();
        }
        return self;
    }

    /// Resolve a configured directory against the root.
    fn absolute(&self, dir: &Path) -> PathBuf {
        return paths::normalize_path(&self.root.join(dir));
    }

    /// Defaults used when no config file exists.
    fn defaults() -> DoclinkTomlConfig {
        return DoclinkTomlConfig {
            check_git: true,
            exclude: Vec::new(),
            git_timeout_secs: default_git_timeout_secs(),
            include: default_include(),
            jobs: 0,
            source: default_source(),
            source_commit_field: default_source_commit_field(),
            targets: Vec::new(),
            translatable_front_matter: default_translatable_front_matter(),
        };
    }

    /// Validate and compile the raw TOML values.
    ///
    /// # Errors
    ///
    /// Returns `Error::Glob` or `Error::ConfigInvalid`.
    fn from_raw(root: &Path, path: &Path, raw: DoclinkTomlConfig) -> Result<Self, Error> {
        if raw.git_timeout_secs == 0 {
            return Err(Error::ConfigInvalid {
                path: path.to_path_buf(),
                reason: "git_timeout_secs must be positive".to_string(),
            });
        }
        if raw.include.is_empty() {
            return Err(Error::ConfigInvalid {
                path: path.to_path_buf(),
                reason: "include must name at least one pattern".to_string(),
            });
        }

        let source = paths::normalize_path(&root.join(&raw.source));
        let targets: Vec<PathBuf> = raw
            .targets
            .iter()
            .map(|t| return paths::normalize_path(&root.join(t)))
            .collect();
        if let Some(overlap) = targets.iter().find(|t| return **t == source) {
            return Err(Error::ConfigInvalid {
                path: path.to_path_buf(),
                reason: format!("target {} is the source tree", overlap.display()),
            });
        }

        return Ok(Self {
            check_git: raw.check_git,
            exclude: compile_globs(&raw.exclude)?,
            git_timeout: Duration::from_secs(raw.git_timeout_secs),
            include: compile_globs(&raw.include)?,
            jobs: raw.jobs,
            root: root.to_path_buf(),
            source,
            source_commit_field: raw.source_commit_field,
            targets,
            translatable_front_matter: raw.translatable_front_matter,
        });
    }
}

/// Compile a list of glob patterns into one matcher.
///
/// # Errors
///
/// Returns `Error::Glob` for an invalid pattern.
fn compile_globs(patterns: &[String]) -> Result<GlobSet, Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    return Ok(builder.build()?);
}

/// Serde default helper.
const fn default_git_timeout_secs() -> u64 {
    return 10;
}

/// Serde default helper.
fn default_include() -> Vec<String> {
    return vec!["**/*.md".to_string()];
}

/// Serde default helper.
fn default_source() -> String {
    return ".".to_string();
}

/// Serde default helper.
fn default_source_commit_field() -> String {
    return "source_commit".to_string();
}

/// Serde default helper.
fn default_translatable_front_matter() -> Vec<String> {
    return vec!["title".to_string(), "description".to_string()];
}

/// Serde default helper.
const fn default_true() -> bool {
    return true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, content: &str) {
        std::fs::write(dir.join(CONFIG_FILE), content).unwrap();
    }

    #[test]
    fn defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.check_git);
        assert!(config.targets.is_empty());
        assert_eq!(config.source, config.root);
        assert_eq!(config.translatable_front_matter, vec!["title", "description"]);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "source = [");
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "sorce = \"docs\"\n");
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn target_equal_to_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "source = \"docs\"\ntargets = [\"./docs\"]\n");
        assert!(matches!(Config::load(dir.path()), Err(Error::ConfigInvalid { .. })));
    }

    #[test]
    fn translatable_respects_globs_and_root() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "source = \"docs/en\"\ntargets = [\"docs/cs\"]\nexclude = [\"drafts/**\"]\n",
        );
        let config = Config::load(dir.path()).unwrap();

        assert!(config.is_translatable(&config.source.join("guide/setup.md")));
        assert!(!config.is_translatable(&config.source.join("img/logo.png")));
        assert!(!config.is_translatable(&config.source.join("drafts/wip.md")));
        assert!(!config.is_translatable(&config.root.join("README.md")));
    }

    #[test]
    fn nested_target_trees_are_not_translatable() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "targets = [\"i18n/cs\"]\n");
        let config = Config::load(dir.path()).unwrap();

        assert!(config.is_translatable(&config.root.join("guide.md")));
        assert!(config.in_target_tree(&config.root.join("i18n/cs/guide.md")));
        assert!(!config.is_translatable(&config.root.join("i18n/cs/guide.md")));
    }

    #[test]
    fn source_and_translated_mapping() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "source = \"docs/en\"\ntargets = [\"docs/cs\"]\n");
        let config = Config::load(dir.path()).unwrap();
        let target = config.targets[0].clone();

        let translated = config.translated_path(&config.source.join("a/b.md"), &target).unwrap();
        assert_eq!(translated, target.join("a/b.md"));
        assert_eq!(config.source_path(&translated, &target).unwrap(), config.source.join("a/b.md"));
        assert!(matches!(
            config.source_path(&config.root.join("other.md"), &target),
            Err(Error::OutsideRoot { .. })
        ));
    }

    #[test]
    fn parentless_translated_file_is_a_contract_violation() {
        let config = Config::load(tempfile::tempdir().unwrap().path()).unwrap();
        assert!(matches!(
            config.source_path(Path::new("/"), Path::new("/")),
            Err(Error::MissingParent { .. })
        ));
    }
}
