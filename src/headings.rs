//! Ordered heading anchors of a document.

use std::collections::HashSet;

use crate::error::Error;
use crate::frontmatter;
use crate::markdown::{self, Document, Node};
use crate::slug::slugify;

/// Deduplicated anchors used for existence checks. Never contains `""`.
pub type AnchorSet = HashSet<String>;

/// One slug per heading, in document order, duplicates kept.
///
/// Headings whose flattened text is empty are skipped. A heading with text
/// but no letters or digits keeps its position with an empty slug, so
/// positions stay aligned between variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingAnchorIndex {
    /// Slugs in heading order.
    anchors: Vec<String>,
}

impl HeadingAnchorIndex {
    /// Full ordered sequence.
    pub fn anchors(&self) -> &[String] {
        return &self.anchors;
    }

    /// Build from a parsed document.
    pub fn from_document(document: &Document) -> Self {
        let mut anchors = Vec::new();
        visit(&document.nodes, &mut anchors);
        return Self { anchors };
    }

    /// Build from raw file content; front matter is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseFailed` if the body cannot be parsed.
    pub fn from_markdown(content: &str) -> Result<Self, Error> {
        let (_, body) = frontmatter::split(content);
        let document = Document::parse(body)?;
        return Ok(Self::from_document(&document));
    }

    /// Slug at position `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        return self.anchors.get(index).map(String::as_str);
    }

    /// Position of the first heading whose slug equals `slug`, ignoring case.
    pub fn index_of(&self, slug: &str) -> Option<usize> {
        let wanted = slug.to_lowercase();
        return self.anchors.iter().position(|a| return a.to_lowercase() == wanted);
    }

    /// Whether the document has no headings.
    pub fn is_empty(&self) -> bool {
        return self.anchors.is_empty();
    }

    /// Number of headings.
    pub fn len(&self) -> usize {
        return self.anchors.len();
    }

    /// Deduplicated, lowercased anchors without empty slugs.
    pub fn to_anchor_set(&self) -> AnchorSet {
        return self
            .anchors
            .iter()
            .filter(|a| return !a.is_empty())
            .map(|a| return a.to_lowercase())
            .collect();
    }
}

/// Top-down walk recording one slug per heading.
fn visit(nodes: &[Node], anchors: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::FencedCode | Node::IndentedCode => {},
            Node::Heading { children } => {
                let text = markdown::plain_text(children);
                let text = text.trim();
                if !text.is_empty() {
                    anchors.push(slugify(text));
                }
            },
            Node::Image { .. } | Node::InlineCode(_) | Node::Link { .. } | Node::Other(_) | Node::Text(_) => {
                visit(node.children(), anchors);
            },
        }
    }
}
