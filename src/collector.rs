//! Link and image references of a document, in document order.

use std::ops::Range;

use crate::markdown::{Document, Node};
use crate::reference::LinkReference;

/// A reference together with the byte span of its destination text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedLink {
    /// Parsed destination.
    pub reference: LinkReference,
    /// Byte range of the destination in the parsed source.
    pub span: Range<usize>,
}

/// Every link and image reference outside code blocks, in document order.
pub fn collect_links(document: &Document) -> Vec<LinkReference> {
    return collect_located_links(document)
        .into_iter()
        .map(|located| return located.reference)
        .collect();
}

/// Like `collect_links`, keeping destination spans for rewriting.
pub fn collect_located_links(document: &Document) -> Vec<LocatedLink> {
    let mut links = Vec::new();
    visit(&document.nodes, &mut links);
    return links;
}

/// Top-down walk. Code blocks are not descended into; code spans are leaves.
fn visit(nodes: &[Node], links: &mut Vec<LocatedLink>) {
    for node in nodes {
        match node {
            Node::FencedCode | Node::IndentedCode => {},
            Node::Image { children, destination } | Node::Link { children, destination } => {
                links.push(LocatedLink {
                    reference: LinkReference::parse(&destination.raw),
                    span: destination.span.clone(),
                });
                visit(children, links);
            },
            Node::Heading { .. } | Node::InlineCode(_) | Node::Other(_) | Node::Text(_) => {
                visit(node.children(), links);
            },
        }
    }
}
