//! Link correction for translated documents.
//!
//! Headings of a translated document cannot be matched to the source by
//! text, so anchors are remapped by heading position: the slug's index in
//! the source document selects the slug at the same index in the
//! translation. Asset paths are recomputed relative to the translated file.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use crate::cache::AnchorCache;
use crate::collector::collect_located_links;
use crate::config::Config;
use crate::error::Error;
use crate::frontmatter::{self, FrontMatter, RawFrontMatter};
use crate::headings::HeadingAnchorIndex;
use crate::markdown::Document;
use crate::paths;
use crate::reference::LinkReference;
use crate::types::{CorrectionCounts, LinkCorrectionResult};

/// State of correcting one translated document.
struct DocumentPass<'p> {
    /// Shared heading indices.
    cache: &'p AnchorCache,
    /// Run configuration.
    config: &'p Config,
    /// Structural mismatch messages, deduplicated.
    errors: Vec<String>,
    /// Headings of the translated document itself.
    own_index: Arc<HeadingAnchorIndex>,
    /// Directory of the source counterpart; link paths resolve against it.
    source_dir: &'p Path,
    /// Source counterpart of the translated document.
    source_file: &'p Path,
    /// Directory of the translated document.
    target_dir: &'p Path,
    /// Root of the translated tree.
    target_root: &'p Path,
    /// The translated document.
    translated_file: &'p Path,
}

/// A document and its ordered heading index.
struct IndexedFile<'f> {
    /// Absolute path of the document.
    file: &'f Path,
    /// Its headings.
    index: &'f HeadingAnchorIndex,
}

/// Rewrites internal links of translated documents.
pub struct LinkCorrector<'a> {
    /// Per-run heading indices of source and translated documents.
    cache: &'a AnchorCache,
    /// Source tree, selection globs, and front matter policy.
    config: &'a Config,
}

impl<'a> LinkCorrector<'a> {
    /// Correct `content` of `translated_file`, whose structural counterpart is
    /// `source_file`, within the translated tree rooted at `target_root`.
    ///
    /// Mismatches are collected in the result; the affected links are left as written.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingParent` if either file has no parent directory.
    pub fn correct(
        &self,
        translated_file: &Path,
        content: &str,
        source_file: &Path,
        target_root: &Path,
    ) -> Result<LinkCorrectionResult, Error> {
        let target_dir = translated_file.parent().ok_or_else(|| {
            return Error::MissingParent {
                path: translated_file.to_path_buf(),
            };
        })?;
        let source_dir = source_file.parent().ok_or_else(|| {
            return Error::MissingParent {
                path: source_file.to_path_buf(),
            };
        })?;

        let (front_matter, body) = frontmatter::split(content);
        let document = match Document::parse(body) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::warn!(file = %translated_file.display(), error = %e, "cannot parse document; body left as is");
                None
            },
        };

        let mut pass = DocumentPass {
            cache: self.cache,
            config: self.config,
            errors: Vec::new(),
            own_index: Arc::new(document.as_ref().map(HeadingAnchorIndex::from_document).unwrap_or_default()),
            source_dir,
            source_file,
            target_dir,
            target_root,
            translated_file,
        };

        let mut counts = CorrectionCounts::default();
        let corrected_front_matter = match front_matter {
            Some(raw) => pass.correct_front_matter(raw, &mut counts),
            None => String::new(),
        };
        let corrected_body = match &document {
            Some(document) => pass.rewrite_document(body, document, &mut counts),
            None => body.to_string(),
        };

        tracing::debug!(
            file = %translated_file.display(),
            anchors = counts.anchors,
            assets = counts.assets,
            front_matter = counts.front_matter,
            mismatches = pass.errors.len(),
            "corrected"
        );
        return Ok(LinkCorrectionResult::new(
            translated_file,
            format!("{corrected_front_matter}{corrected_body}"),
            counts,
            pass.errors,
        ));
    }

    /// Correct the counterpart of `source_file` in `target_root`, read from disk.
    /// Returns `None` when there is no readable counterpart.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutsideRoot` if `source_file` is not under the source
    /// root, or `Error::MissingParent` as `correct` does.
    pub fn correct_counterpart(
        &self,
        source_file: &Path,
        target_root: &Path,
    ) -> Result<Option<LinkCorrectionResult>, Error> {
        let translated_file = self.config.translated_path(source_file, target_root)?;
        if !translated_file.is_file() {
            tracing::debug!(source = %source_file.display(), "no translated counterpart");
            return Ok(None);
        }
        let content = match std::fs::read_to_string(&translated_file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %translated_file.display(), error = %e, "cannot read translated document");
                return Ok(None);
            },
        };
        return self.correct(&translated_file, &content, source_file, target_root).map(Some);
    }

    /// Corrector sharing `cache` across documents of one run.
    pub const fn new(cache: &'a AnchorCache, config: &'a Config) -> Self {
        return Self { cache, config };
    }
}

impl DocumentPass<'_> {
    /// Correct front matter fields and re-serialize only when one changed.
    fn correct_front_matter(&mut self, raw: RawFrontMatter<'_>, counts: &mut CorrectionCounts) -> String {
        let mut front_matter = match FrontMatter::parse(raw.yaml) {
            Ok(front_matter) => front_matter,
            Err(e) => {
                tracing::warn!(file = %self.translated_file.display(), error = %e, "front matter left as is");
                return raw.block.to_string();
            },
        };

        // Link rewrites inside field values count as field corrections only.
        let mut scratch = CorrectionCounts::default();
        let mut changed = 0_usize;
        for key in front_matter.keys() {
            let values = front_matter.values(&key);
            if values.is_empty() {
                continue;
            }
            let translatable = self.config.translatable_front_matter.contains(&key);
            let rewritten: Vec<String> = values
                .iter()
                .map(|value| {
                    if translatable {
                        return self.rewrite_markdown(value, &mut scratch);
                    }
                    return self.rewrite_file_value(value).unwrap_or_else(|| return value.clone());
                })
                .collect();
            if rewritten != values {
                tracing::debug!(file = %self.translated_file.display(), field = %key, "rewrote front matter field");
                front_matter.set_values(&key, &rewritten);
                changed = changed.saturating_add(1);
            }
        }

        if changed == 0 {
            return raw.block.to_string();
        }
        return match front_matter.serialize() {
            Ok(block) => {
                counts.front_matter = counts.front_matter.saturating_add(changed);
                block
            },
            Err(e) => {
                tracing::warn!(file = %self.translated_file.display(), error = %e, "cannot serialize front matter");
                raw.block.to_string()
            },
        };
    }

    /// Record a heading count mismatch once per document pair.
    fn mismatch(&mut self, source: &IndexedFile<'_>, translated: &IndexedFile<'_>) {
        let message = format!(
            "heading count mismatch: {} has {} headings, {} has {}",
            source.file.display(),
            source.index.len(),
            translated.file.display(),
            translated.index.len()
        );
        if !self.errors.contains(&message) {
            tracing::warn!(%message);
            tracing::debug!(
                source = ?source.index.anchors(),
                translated = ?translated.index.anchors(),
                "heading sequences"
            );
            self.errors.push(message);
        }
    }

    /// Slug at the source anchor's position in the translated index.
    /// `None` leaves the anchor as written: dangling anchors silently,
    /// count mismatches with a recorded error.
    fn remap_anchor(&mut self, anchor: &str, source: &IndexedFile<'_>, translated: &IndexedFile<'_>) -> Option<String> {
        let decoded = paths::decode(anchor);
        let position = source.index.index_of(&decoded)?;
        if source.index.len() != translated.index.len() {
            self.mismatch(source, translated);
            return None;
        }
        let slug = translated.index.get(position)?;
        if slug.is_empty() || slug == decoded {
            return None;
        }
        return Some(slug.to_string());
    }

    /// Anchor-only reference into the translated document itself.
    fn rewrite_anchor_only(&mut self, anchor: &str, counts: &mut CorrectionCounts) -> Option<String> {
        let source_index = self.cache.heading_index(self.source_file)?;
        let own_index = Arc::clone(&self.own_index);
        let slug = self.remap_anchor(
            anchor,
            &IndexedFile {
                file: self.source_file,
                index: &source_index,
            },
            &IndexedFile {
                file: self.translated_file,
                index: &own_index,
            },
        )?;
        counts.anchors = counts.anchors.saturating_add(1);
        return Some(format!("#{slug}"));
    }

    /// Path to a non-translatable file, recomputed from the translated directory.
    fn rewrite_asset(
        &self,
        raw_path: &str,
        resolved: &Path,
        anchor: Option<&str>,
        counts: &mut CorrectionCounts,
    ) -> Option<String> {
        if !resolved.exists() {
            return None;
        }
        let route = paths::relative_route(self.target_dir, resolved);
        if route == paths::decode(raw_path) {
            return None;
        }
        counts.assets = counts.assets.saturating_add(1);
        let encoded = paths::encode(&route);
        return Some(match anchor {
            Some(anchor) => format!("{encoded}#{anchor}"),
            None => encoded,
        });
    }

    /// New destination for `reference`, or `None` to leave it as written.
    fn rewrite_destination(&mut self, reference: &LinkReference, counts: &mut CorrectionCounts) -> Option<String> {
        if reference.is_external || reference.is_absolute {
            return None;
        }
        if reference.is_anchor_only() {
            return self.rewrite_anchor_only(reference.anchor.as_deref()?, counts);
        }

        let raw_path = reference.path.as_deref()?;
        if raw_path.is_empty() {
            return None;
        }
        let resolved = paths::resolve(&paths::decode(raw_path), self.source_dir, &self.config.root);
        if self.config.is_translatable(&resolved) {
            let anchor = reference.anchor.as_deref()?;
            return self.rewrite_mirrored(raw_path, &resolved, anchor, counts);
        }
        return self.rewrite_asset(raw_path, &resolved, reference.anchor.as_deref(), counts);
    }

    /// Rewrite every link in a parsed `text`, right to left so spans stay valid.
    fn rewrite_document(&mut self, text: &str, document: &Document, counts: &mut CorrectionCounts) -> String {
        let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
        for located in collect_located_links(document) {
            if let Some(destination) = self.rewrite_destination(&located.reference, counts) {
                tracing::debug!(
                    file = %self.translated_file.display(),
                    from = %located.reference.raw,
                    to = %destination,
                    "rewrote link"
                );
                replacements.push((located.span, destination));
            }
        }

        replacements.sort_by_key(|(span, _)| return span.start);
        let mut out = text.to_string();
        for (span, destination) in replacements.into_iter().rev() {
            if out.get(span.clone()).is_some() {
                out.replace_range(span, &destination);
            }
        }
        return out;
    }

    /// Non-translatable front matter value that names an existing file.
    fn rewrite_file_value(&self, value: &str) -> Option<String> {
        if !paths::looks_like_file_reference(value) {
            return None;
        }
        let resolved = paths::resolve(value.trim(), self.source_dir, &self.config.root);
        if !resolved.is_file() {
            return None;
        }
        let route = paths::relative_route(self.target_dir, &resolved);
        return (route != value).then_some(route);
    }

    /// Parse `text` as markdown and rewrite its links.
    fn rewrite_markdown(&mut self, text: &str, counts: &mut CorrectionCounts) -> String {
        return match Document::parse(text) {
            Ok(document) => self.rewrite_document(text, &document, counts),
            Err(e) => {
                tracing::warn!(file = %self.translated_file.display(), error = %e, "cannot parse field value");
                text.to_string()
            },
        };
    }

    /// Link to another translatable document: the path is mirrored as is,
    /// the anchor is remapped against the translated counterpart.
    fn rewrite_mirrored(
        &mut self,
        raw_path: &str,
        resolved: &Path,
        anchor: &str,
        counts: &mut CorrectionCounts,
    ) -> Option<String> {
        if !resolved.is_file() {
            return None;
        }
        let counterpart = self.config.translated_path(resolved, self.target_root).ok()?;
        if !counterpart.is_file() {
            return None;
        }
        let source_index = self.cache.heading_index(resolved)?;
        let translated_index = self.cache.heading_index(&counterpart)?;
        let slug = self.remap_anchor(
            anchor,
            &IndexedFile {
                file: resolved,
                index: &source_index,
            },
            &IndexedFile {
                file: &counterpart,
                index: &translated_index,
            },
        )?;
        counts.anchors = counts.anchors.saturating_add(1);
        return Some(format!("{raw_path}#{slug}"));
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    struct Tree {
        _dir: tempfile::TempDir,
        config: Config,
    }

    impl Tree {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(".doclink.toml"), "source = \"en\"\ntargets = [\"cs\"]\n").unwrap();
            let config = Config::load(dir.path()).unwrap();
            Self { _dir: dir, config }
        }

        fn source(&self, relative: &str, content: &str) -> PathBuf {
            write(&self.config.source.join(relative), content)
        }

        fn target(&self, relative: &str, content: &str) -> PathBuf {
            write(&self.config.targets[0].join(relative), content)
        }

        fn target_root(&self) -> &Path {
            &self.config.targets[0]
        }
    }

    fn write(path: &Path, content: &str) -> PathBuf {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        path.to_path_buf()
    }

    fn correct(tree: &Tree, cache: &AnchorCache, translated: &Path, content: &str, source: &Path) -> LinkCorrectionResult {
        LinkCorrector::new(cache, &tree.config)
            .correct(translated, content, source, tree.target_root())
            .unwrap()
    }

    const SOURCE_GUIDE: &str = "# Alpha\n\n## Beta\n\n## Gamma\n\n\
        [b](#beta) ![logo](img/logo.png) [other](other.md#second) [web](https://example.com/#beta)\n";
    const TRANSLATED_GUIDE: &str = "# Alfa\n\n## Béta\n\n## Gama\n\n\
        [b](#beta) ![logo](img/logo.png) [other](other.md#second) [web](https://example.com/#beta)\n";

    fn guide_tree() -> (Tree, PathBuf, PathBuf) {
        let tree = Tree::new();
        let source = tree.source("guide.md", SOURCE_GUIDE);
        tree.source("other.md", "# First\n\n## Second\n");
        tree.source("img/logo.png", "png");
        let translated = tree.target("guide.md", TRANSLATED_GUIDE);
        tree.target("other.md", "# První\n\n## Druhá\n");
        (tree, source, translated)
    }

    #[test]
    fn remaps_anchors_by_position_and_relocates_assets() {
        let (tree, source, translated) = guide_tree();
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, TRANSLATED_GUIDE, &source);

        assert!(result.errors().is_empty(), "{:?}", result.errors());
        assert_eq!(
            result.corrected_content(),
            "# Alfa\n\n## Béta\n\n## Gama\n\n\
             [b](#béta) ![logo](../en/img/logo.png) [other](other.md#druhá) [web](https://example.com/#beta)\n"
        );
        assert_eq!(result.anchor_corrections(), 2);
        assert_eq!(result.asset_corrections(), 1);
        assert_eq!(result.front_matter_corrections(), 0);
        assert_eq!(result.target_file(), translated);
    }

    #[test]
    fn relocated_asset_lands_on_the_same_file() {
        let (tree, source, translated) = guide_tree();
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, TRANSLATED_GUIDE, &source);

        let from_source = paths::resolve("img/logo.png", source.parent().unwrap(), &tree.config.root);
        let from_translated = paths::resolve("../en/img/logo.png", translated.parent().unwrap(), &tree.config.root);
        assert!(result.corrected_content().contains("(../en/img/logo.png)"));
        assert_eq!(from_source, from_translated);
    }

    #[test]
    fn correction_is_idempotent() {
        let (tree, source, translated) = guide_tree();
        let cache = AnchorCache::default();
        let first = correct(&tree, &cache, &translated, TRANSLATED_GUIDE, &source);
        let second = correct(&tree, &cache, &translated, first.corrected_content(), &source);

        assert_eq!(second.corrected_content(), first.corrected_content());
        assert_eq!(second.total_corrections(), 0);
        assert!(second.errors().is_empty());
    }

    #[test]
    fn heading_count_mismatch_is_reported_and_links_kept() {
        let tree = Tree::new();
        let source = tree.source("guide.md", "# A\n\n## B\n\n## C\n");
        let content = "# A'\n\n## B'\n\n[one](#b) [two](#c) [dangling](#zzz)\n";
        let translated = tree.target("guide.md", content);
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, content, &source);

        assert_eq!(result.corrected_content(), content);
        assert_eq!(result.anchor_corrections(), 0);
        assert_eq!(result.errors().len(), 1);
        let message = &result.errors()[0];
        assert!(message.contains(&source.display().to_string()));
        assert!(message.contains(&translated.display().to_string()));
        assert!(message.contains("has 3 headings"));
        assert!(message.contains("has 2"));
    }

    #[test]
    fn dangling_source_anchor_is_silent() {
        let tree = Tree::new();
        let source = tree.source("guide.md", "# A\n");
        let content = "# A'\n\n## Extra\n\n[x](#missing)\n";
        let translated = tree.target("guide.md", content);
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, content, &source);
        assert_eq!(result.corrected_content(), content);
        assert!(result.errors().is_empty());
    }

    #[test]
    fn missing_counterpart_leaves_cross_document_anchor() {
        let tree = Tree::new();
        let source = tree.source("guide.md", "# A\n");
        tree.source("other.md", "# Second\n");
        let content = "# A'\n\n[o](other.md#second)\n";
        let translated = tree.target("guide.md", content);
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, content, &source);
        assert_eq!(result.corrected_content(), content);
        assert_eq!(result.total_corrections(), 0);
    }

    #[test]
    fn code_blocks_and_absolute_links_are_untouched() {
        let tree = Tree::new();
        let source = tree.source("guide.md", "# A\n");
        tree.source("img/a.png", "png");
        let content = "# A'\n\n```\n![x](img/a.png)\n```\n\n![y](/img/a.png)\n";
        let translated = tree.target("guide.md", content);
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, content, &source);
        assert_eq!(result.corrected_content(), content);
    }

    #[test]
    fn asset_paths_are_percent_encoded_and_keep_anchor() {
        let tree = Tree::new();
        let source = tree.source("docs/guide.md", "# A\n");
        tree.source("docs/files/my manual.pdf", "%PDF");
        let content = "# A'\n\n[m](<files/my manual.pdf#page=2>)\n";
        let translated = tree.target("docs/guide.md", content);
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, content, &source);
        assert_eq!(
            result.corrected_content(),
            "# A'\n\n[m](<../../en/docs/files/my%20manual.pdf#page=2>)\n"
        );
        assert_eq!(result.asset_corrections(), 1);
    }

    #[test]
    fn front_matter_fields() {
        let (tree, source, translated) = guide_tree();
        let content = format!(
            "---\ntitle: 'Viz [b](#beta)'\nimage: img/logo.png\nversion: Release 2.0\nauthor: Jana\n---\n{TRANSLATED_GUIDE}"
        );
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, &content, &source);

        assert_eq!(result.front_matter_corrections(), 2);
        assert_eq!(result.anchor_corrections(), 2);
        let (raw, body) = frontmatter::split(result.corrected_content());
        let fields = FrontMatter::parse(raw.unwrap().yaml).unwrap();
        assert_eq!(fields.values("title"), vec!["Viz [b](#béta)"]);
        assert_eq!(fields.values("image"), vec!["../en/img/logo.png"]);
        assert_eq!(fields.values("version"), vec!["Release 2.0"]);
        assert_eq!(fields.values("author"), vec!["Jana"]);
        assert!(body.starts_with("# Alfa\n"));
    }

    #[test]
    fn unchanged_front_matter_keeps_its_text() {
        let (tree, source, translated) = guide_tree();
        let block = "---\n# a comment\ntitle:   Hello   # trailing\n---\n";
        let content = format!("{block}# Alfa\n");
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, &content, &source);
        assert!(result.corrected_content().starts_with(block));
        assert_eq!(result.front_matter_corrections(), 0);
    }

    #[test]
    fn invalid_front_matter_is_left_alone() {
        let (tree, source, translated) = guide_tree();
        let content = "---\ntitle: [unclosed\n---\n# Alfa\n";
        let cache = AnchorCache::default();
        let result = correct(&tree, &cache, &translated, content, &source);
        assert_eq!(result.corrected_content(), content);
    }

    #[test]
    fn parentless_translated_file_is_fatal() {
        let tree = Tree::new();
        let cache = AnchorCache::default();
        let corrector = LinkCorrector::new(&cache, &tree.config);
        let source = tree.config.source.join("a.md");
        assert!(matches!(
            corrector.correct(Path::new("/"), "# A\n", &source, tree.target_root()),
            Err(Error::MissingParent { .. })
        ));
    }

    #[test]
    fn counterpart_lookup() {
        let (tree, source, _translated) = guide_tree();
        let lonely = tree.source("lonely.md", "# Lonely\n");
        let cache = AnchorCache::default();
        let corrector = LinkCorrector::new(&cache, &tree.config);
        assert!(corrector.correct_counterpart(&lonely, tree.target_root()).unwrap().is_none());
        let result = corrector.correct_counterpart(&source, tree.target_root()).unwrap().unwrap();
        assert_eq!(result.anchor_corrections(), 2);
        assert!(matches!(
            corrector.correct_counterpart(&tree.config.root.join("x.md"), tree.target_root()),
            Err(Error::OutsideRoot { .. })
        ));
    }
}
