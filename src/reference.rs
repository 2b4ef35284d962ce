//! Decomposition of raw link destinations into path and anchor parts.

use serde::Serialize;

/// Destination prefixes that mark a link as pointing outside the tree.
/// Compared case-insensitively.
const EXTERNAL_PREFIXES: [&str; 6] = ["http://", "https://", "mailto:", "tel:", "ftp://", "//"];

/// A link or image destination exactly as written, split into its parts.
///
/// External references carry neither path nor anchor. A non-external
/// reference is either anchor-only (`#slug`) or has a path, which may
/// still carry a trailing anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReference {
    /// Text after the first `#`, if any.
    pub anchor: Option<String>,
    /// Path starts with `/` and resolves against the repository root.
    pub is_absolute: bool,
    /// Scheme-qualified or protocol-relative destination.
    pub is_external: bool,
    /// Text before the first `#`; `None` for anchor-only references.
    pub path: Option<String>,
    /// The destination string as written in the markup.
    pub raw: String,
}

impl LinkReference {
    /// Anchor-only reference into the containing document.
    pub fn is_anchor_only(&self) -> bool {
        return !self.is_external && self.path.is_none();
    }

    /// Parse a destination. Total: every input yields a value.
    pub fn parse(raw: &str) -> Self {
        if has_external_prefix(raw) {
            return Self {
                anchor: None,
                is_absolute: false,
                is_external: true,
                path: None,
                raw: raw.to_string(),
            };
        }

        let (path, anchor) = match raw.split_once('#') {
            None => (Some(raw.to_string()), None),
            Some(("", anchor)) => (None, Some(anchor.to_string())),
            Some((path, anchor)) => (Some(path.to_string()), Some(anchor.to_string())),
        };
        let is_absolute = path.as_deref().is_some_and(|p| return p.starts_with('/'));

        return Self {
            anchor,
            is_absolute,
            is_external: false,
            path,
            raw: raw.to_string(),
        };
    }
}

/// Whether `value` starts with one of the external scheme prefixes.
pub fn has_external_prefix(value: &str) -> bool {
    return EXTERNAL_PREFIXES.iter().any(|prefix| {
        return value
            .get(..prefix.len())
            .is_some_and(|head| return head.eq_ignore_ascii_case(prefix));
    });
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn external_schemes_are_not_decomposed() {
        for raw in [
            "https://example.com/a.md#x",
            "HTTP://EXAMPLE.COM",
            "mailto:someone@example.com",
            "tel:+420123",
            "ftp://files.example.com/a",
            "//cdn.example.com/lib.js",
        ] {
            let reference = LinkReference::parse(raw);
            assert!(reference.is_external, "{raw}");
            assert_eq!(reference.path, None);
            assert_eq!(reference.anchor, None);
            assert!(!reference.is_absolute);
        }
    }

    #[test]
    fn anchor_only() {
        let reference = LinkReference::parse("#getting-started");
        assert!(reference.is_anchor_only());
        assert_eq!(reference.path, None);
        assert_eq!(reference.anchor.as_deref(), Some("getting-started"));
    }

    #[test]
    fn path_with_anchor_splits_on_first_hash() {
        let reference = LinkReference::parse("../guide/setup.md#step-1#extra");
        assert_eq!(reference.path.as_deref(), Some("../guide/setup.md"));
        assert_eq!(reference.anchor.as_deref(), Some("step-1#extra"));
        assert!(!reference.is_absolute);
    }

    #[test]
    fn path_without_anchor() {
        let reference = LinkReference::parse("images/diagram.png");
        assert_eq!(reference.path.as_deref(), Some("images/diagram.png"));
        assert_eq!(reference.anchor, None);
    }

    #[test]
    fn root_relative_is_absolute() {
        let reference = LinkReference::parse("/docs/index.md#top");
        assert!(reference.is_absolute);
        assert_eq!(reference.path.as_deref(), Some("/docs/index.md"));
    }

    #[test]
    fn lone_hash_is_empty_anchor() {
        let reference = LinkReference::parse("#");
        assert!(reference.is_anchor_only());
        assert_eq!(reference.anchor.as_deref(), Some(""));
    }

    #[test]
    fn multibyte_prefix_does_not_panic() {
        let reference = LinkReference::parse("čí");
        assert_eq!(reference.path.as_deref(), Some("čí"));
    }

    proptest! {
        #[test]
        fn parsing_is_total(raw in ".*") {
            let reference = LinkReference::parse(&raw);
            prop_assert_eq!(&reference.raw, &raw);
            if reference.is_external {
                prop_assert!(reference.path.is_none() && reference.anchor.is_none());
            } else {
                prop_assert!(reference.path.is_some() || reference.anchor.is_some());
            }
        }
    }
}
