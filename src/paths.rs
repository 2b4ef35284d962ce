//! Lexical path handling: normalization, percent coding, relative routes,
//! and the "looks like a file reference" heuristic for front matter values.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;

use crate::reference::has_external_prefix;

/// Characters escaped when writing a recomputed path back into markdown.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'(')
    .add(b')')
    .add(b'<')
    .add(b'>');

/// A final path segment ending in a short alphanumeric extension.
#[allow(clippy::expect_used, reason = "constant pattern")]
static EXTENSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)[^/\\]\.[a-z0-9]{1,8}$").expect("valid regex"));

/// Decode a link path or anchor as written in markdown: backslash escapes of
/// ASCII punctuation are removed, then percent escapes are decoded. Invalid
/// UTF-8 is replaced lossily.
pub fn decode(raw: &str) -> String {
    return percent_decode_str(&unescape(raw)).decode_utf8_lossy().into_owned();
}

/// Percent-encode a path for use as a markdown link destination.
/// Non-ASCII characters are encoded too.
pub fn encode(path: &str) -> String {
    return utf8_percent_encode(path, PATH_ESCAPES).to_string();
}

/// Heuristic for front matter values that are not translatable text: does
/// `value` look like a relative file reference?
///
/// Rejects empty values, multi-line values, scheme-qualified values, anchors,
/// and absolute paths. Accepts values containing a path separator or ending
/// in an extension-like suffix. Callers still confirm the file exists.
///
/// # Panics
///
/// Panics if the hardcoded extension regex is invalid (compile-time invariant).
pub fn looks_like_file_reference(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.contains('\n') || value.starts_with('#') {
        return false;
    }
    if has_external_prefix(value) || has_scheme(value) {
        return false;
    }
    if value.starts_with('/') || value.starts_with('\\') || Path::new(value).is_absolute() {
        return false;
    }
    return value.contains('/') || value.contains('\\') || EXTENSION_SUFFIX.is_match(value);
}

/// `scheme:` prefix of any kind (`data:`, `urn:`, `javascript:`).
fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| return c.is_ascii_alphabetic());
    return starts_alpha
        && scheme.len() > 1
        && chars.all(|c| return c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop; never pops the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => match components.last() {
            Some(Component::Normal(_)) => {
                components.pop();
            },
            Some(Component::Prefix(_) | Component::RootDir) => {},
            _ => components.push(component),
        },
        other => components.push(other),
    }
}

/// Route from directory `from_dir` to `target`, `/`-separated.
/// Both paths must be absolute and normalized.
pub fn relative_route(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = target.components().collect();
    let common = from.iter().zip(to.iter()).take_while(|(a, b)| return a == b).count();

    let mut parts: Vec<String> = Vec::new();
    for _ in from.iter().skip(common) {
        parts.push("..".to_string());
    }
    for component in to.iter().skip(common) {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    if parts.is_empty() {
        return ".".to_string();
    }
    return parts.join("/");
}

/// Resolve a decoded link path: absolute paths against `repository_root`,
/// relative ones against `base_dir`. The result is normalized.
pub fn resolve(decoded: &str, base_dir: &Path, repository_root: &Path) -> PathBuf {
    if let Some(stripped) = decoded.strip_prefix('/') {
        return normalize_path(&repository_root.join(stripped));
    }
    return normalize_path(&base_dir.join(decoded));
}

/// `/`-separated rendering of a relative path.
pub fn to_slash(path: &Path) -> String {
    return path
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
}

/// Drop the backslash of every `\` + ASCII punctuation pair. Other
/// backslashes (Windows separators) stay.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            let _ = chars.next();
            continue;
        }
        out.push(c);
    }
    return out;
}
