use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;

/// Documents of one tree, in lexicographic path order.
#[derive(Debug, Default)]
pub struct Scan {
    /// `(absolute path, content)` for every readable selected file.
    pub files: Vec<(PathBuf, String)>,
    /// Selected files that could not be read as UTF-8 text.
    pub unreadable: Vec<PathBuf>,
}

/// Walk `tree_root` and read every file the config's include/exclude globs
/// select, judged relative to `tree_root`. Paths are absolute when
/// `tree_root` is. A missing tree yields an empty scan.
pub fn scan(tree_root: &Path, config: &Config) -> Scan {
    let mut scan = Scan::default();

    for entry in WalkDir::new(tree_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
    {
        let path = entry.path();
        if !config.is_selected(path, tree_root) {
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => scan.files.push((path.to_path_buf(), content)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read document");
                scan.unreadable.push(path.to_path_buf());
            },
        }
    }

    // Walk order is per directory; the feed is ordered by full path.
    scan.files.sort_by(|a, b| return a.0.cmp(&b.0));
    scan.unreadable.sort();
    tracing::debug!(root = %tree_root.display(), files = scan.files.len(), "scanned tree");
    return scan;
}

/// Paths of the selected files under `tree_root`, without reading them.
pub fn selected_paths(tree_root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(tree_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && config.is_selected(e.path(), tree_root))
        .map(walkdir::DirEntry::into_path)
        .collect();
    paths.sort();
    return paths;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(".doclink.toml"), "exclude = [\"drafts/**\"]\n").unwrap();
        std::fs::create_dir_all(root.join("b")).unwrap();
        std::fs::create_dir_all(root.join("drafts")).unwrap();
        std::fs::write(root.join("b/z.md"), "# Z\n").unwrap();
        std::fs::write(root.join("a.md"), "# A\n").unwrap();
        std::fs::write(root.join("b.md"), "# B\n").unwrap();
        std::fs::write(root.join("logo.png"), [0_u8, 1, 2]).unwrap();
        std::fs::write(root.join("drafts/wip.md"), "# WIP\n").unwrap();
        let config = Config::load(root).unwrap();
        (dir, config)
    }

    #[test]
    fn selects_sorted_markdown_only() {
        let (_dir, config) = tree();
        let scan = scan(&config.source, &config);
        let names: Vec<String> = scan
            .files
            .iter()
            .map(|(p, _)| p.strip_prefix(&config.source).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        // Ordered component-wise: directory `b` sorts before `b.md`.
        assert_eq!(names, vec!["a.md", "b/z.md", "b.md"]);
        assert_eq!(scan.files[0].1, "# A\n");
        assert!(scan.unreadable.is_empty());
    }

    #[test]
    fn selected_paths_match_scan() {
        let (_dir, config) = tree();
        let paths = selected_paths(&config.source, &config);
        let scanned: Vec<PathBuf> = scan(&config.source, &config).files.into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, scanned);
    }

    #[test]
    fn invalid_utf8_is_reported_unreadable() {
        let (_dir, config) = tree();
        std::fs::write(config.source.join("bad.md"), [0xff_u8, 0xfe, 0x00]).unwrap();
        let scan = scan(&config.source, &config);
        assert_eq!(scan.unreadable, vec![config.source.join("bad.md")]);
    }

    #[test]
    fn missing_tree_is_empty() {
        let (_dir, config) = tree();
        let scan = scan(&config.source.join("nope"), &config);
        assert!(scan.files.is_empty());
    }
}
