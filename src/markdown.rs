//! Markdown document tree: tree-sitter CST folded into a closed set of node kinds.
//!
//! Block structure comes from the block grammar; every `inline` block node is
//! re-parsed with the inline grammar over its own byte ranges, so link
//! destination spans are absolute offsets into the parsed source.

use std::ops::Range;
use std::path::Path;

use tree_sitter::{Node as TsNode, Parser};

use crate::error::Error;
use crate::grammar::{self, Grammar};

/// A link or image destination with its byte span in the parsed source.
/// Angle brackets around the destination are not part of `raw` or `span`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Destination text as written.
    pub raw: String,
    /// Byte range of `raw` in the parsed source.
    pub span: Range<usize>,
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Fenced code block. Its content is never folded.
    FencedCode,
    /// ATX or setext heading.
    Heading {
        /// Inline content of the heading.
        children: Vec<Node>,
    },
    /// Image; children are the alt text.
    Image {
        /// Alt text content.
        children: Vec<Node>,
        /// Image source.
        destination: Destination,
    },
    /// Indented code block. Its content is never folded.
    IndentedCode,
    /// Code span content without its backtick delimiters.
    InlineCode(String),
    /// Inline link or link reference definition.
    Link {
        /// Link text content (empty for reference definitions).
        children: Vec<Node>,
        /// Link target.
        destination: Destination,
    },
    /// Any other block or inline container.
    Other(Vec<Node>),
    /// Literal text.
    Text(String),
}

impl Node {
    /// Child nodes; empty for leaves and code blocks.
    pub fn children(&self) -> &[Node] {
        return match self {
            Self::Heading { children }
            | Self::Image { children, .. }
            | Self::Link { children, .. }
            | Self::Other(children) => children.as_slice(),
            Self::FencedCode | Self::IndentedCode | Self::InlineCode(_) | Self::Text(_) => &[],
        };
    }
}

/// A parsed markdown document (front matter already removed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Top-level block nodes in document order.
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parse markdown source into a document tree.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseFailed` if a grammar cannot be loaded or
    /// tree-sitter gives up on the block parse.
    pub fn parse(source: &str) -> Result<Self, Error> {
        let label = Path::new("<markdown>");
        let mut block = grammar::parser_for(Grammar::Block, label)?;
        let mut inline = grammar::parser_for(Grammar::Inline, label)?;

        let tree = block.parse(source, None).ok_or_else(|| {
            return Error::ParseFailed {
                file: label.to_path_buf(),
                reason: "tree-sitter returned None".to_string(),
            };
        })?;

        let mut builder = Builder { inline: &mut inline, source };
        let nodes = builder.block_children(tree.root_node());
        return Ok(Self { nodes });
    }
}

/// Concatenate the literal text under `nodes`, in encounter order.
/// Code spans contribute their content; link and image text is included.
pub fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    push_plain_text(nodes, &mut out);
    return out;
}

/// Recursive worker for `plain_text`.
fn push_plain_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::InlineCode(text) | Node::Text(text) => out.push_str(text),
            Node::FencedCode | Node::IndentedCode => {},
            Node::Heading { .. } | Node::Image { .. } | Node::Link { .. } | Node::Other(_) => {
                push_plain_text(node.children(), out);
            },
        }
    }
}

/// Folds CST nodes into `Node`s, re-parsing inline content as it goes.
struct Builder<'a> {
    /// Parser loaded with the inline grammar; ranges are reset per block.
    inline: &'a mut Parser,
    /// The full source the block tree was parsed from.
    source: &'a str,
}

impl Builder<'_> {
    /// Fold one block-grammar node.
    fn block(&mut self, node: TsNode<'_>) -> Node {
        return match node.kind() {
            "atx_heading" | "setext_heading" => self.heading(node),
            "fenced_code_block" => Node::FencedCode,
            "html_block" | "minus_metadata" | "plus_metadata" => Node::Other(Vec::new()),
            "indented_code_block" => Node::IndentedCode,
            "inline" => Node::Other(self.inline_content(node)),
            "link_reference_definition" => reference_definition(node, self.source),
            "pipe_table_cell" if find_named_child(node, "inline").is_none() => {
                Node::Other(self.inline_content(node))
            },
            _ => Node::Other(self.block_children(node)),
        };
    }

    /// Fold every named child of a block node.
    fn block_children(&mut self, node: TsNode<'_>) -> Vec<Node> {
        let mut cursor = node.walk();
        let children: Vec<TsNode<'_>> = node.named_children(&mut cursor).collect();
        let mut nodes = Vec::with_capacity(children.len());
        for child in children {
            nodes.push(self.block(child));
        }
        return nodes;
    }

    /// Fold an ATX or setext heading. Only its text content is kept.
    fn heading(&mut self, node: TsNode<'_>) -> Node {
        let mut cursor = node.walk();
        let content = node
            .children(&mut cursor)
            .find(|c| return c.kind() == "paragraph" || c.kind() == "inline");

        let inline = content.and_then(|c| {
            if c.kind() == "inline" {
                return Some(c);
            }
            return find_named_child(c, "inline");
        });
        let children = inline.map(|i| return self.inline_content(i)).unwrap_or_default();
        return Node::Heading { children };
    }

    /// Parse the inline content of one block node with the inline grammar.
    /// Block continuation markers inside the node are excluded from the parse.
    fn inline_content(&mut self, node: TsNode<'_>) -> Vec<Node> {
        let ranges = included_ranges(node);
        if ranges.is_empty() {
            return Vec::new();
        }
        let source = self.source;
        let fallback = || return vec![Node::Text(text_of(node, source).to_string())];

        if self.inline.set_included_ranges(&ranges).is_err() {
            return fallback();
        }
        let Some(tree) = self.inline.parse(source, None) else {
            return fallback();
        };
        return inline_nodes(tree.root_node(), node.start_byte(), node.end_byte(), source);
    }
}

/// Destination of a `link_destination` node, without angle brackets.
fn destination_of(node: TsNode<'_>, source: &str) -> Destination {
    let span = node.byte_range();
    let text = text_of(node, source);
    if text.len() >= 2 && text.starts_with('<') && text.ends_with('>') {
        let inner = span.start.saturating_add(1)..span.end.saturating_sub(1);
        let raw = source.get(inner.clone()).unwrap_or("").to_string();
        return Destination { raw, span: inner };
    }
    return Destination { raw: text.to_string(), span };
}

/// First named child of the given kind.
fn find_named_child<'t>(node: TsNode<'t>, kind: &str) -> Option<TsNode<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| return c.kind() == kind);
    return found;
}

/// Ranges covering `node` minus its block continuation markers (`> `,
/// list indentation). Inline punctuation tokens stay in.
fn included_ranges(node: TsNode<'_>) -> Vec<tree_sitter::Range> {
    let mut ranges = Vec::new();
    let mut start_byte = node.start_byte();
    let mut start_point = node.start_position();

    let mut cursor = node.walk();
    let markers = node
        .children(&mut cursor)
        .filter(|c| return c.kind() == "block_continuation");
    for child in markers {
        if child.start_byte() > start_byte {
            ranges.push(tree_sitter::Range {
                start_byte,
                end_byte: child.start_byte(),
                start_point,
                end_point: child.start_position(),
            });
        }
        start_byte = child.end_byte();
        start_point = child.end_position();
    }

    if node.end_byte() > start_byte {
        ranges.push(tree_sitter::Range {
            start_byte,
            end_byte: node.end_byte(),
            start_point,
            end_point: node.end_position(),
        });
    }
    return ranges;
}

/// Fold one inline-grammar node. Delimiters produce nothing.
fn inline_node(node: TsNode<'_>, source: &str) -> Option<Node> {
    let node = match node.kind() {
        "backslash_escape" => Node::Text(text_of(node, source).chars().skip(1).collect()),
        "code_span" => Node::InlineCode(code_span_content(node, source).to_string()),
        "code_span_delimiter" | "emphasis_delimiter" => return None,
        "email_autolink" | "uri_autolink" => Node::Text(text_of(node, source).to_string()),
        "hard_line_break" => Node::Text("\n".to_string()),
        "html_tag" => Node::Other(Vec::new()),
        "image" => link_like(node, source, true),
        "inline_link" => link_like(node, source, false),
        "collapsed_reference_link" | "full_reference_link" | "shortcut_link" => {
            let text = find_named_child(node, "link_text");
            let children = text
                .map(|t| return inline_nodes(t, t.start_byte(), t.end_byte(), source))
                .unwrap_or_default();
            Node::Other(children)
        },
        _ => Node::Other(inline_nodes(node, node.start_byte(), node.end_byte(), source)),
    };
    return Some(node);
}

/// Fold the named children of an inline container, turning the gaps
/// between them into text nodes.
fn inline_nodes(node: TsNode<'_>, start: usize, end: usize, source: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut offset = start;

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        push_gap(&mut nodes, source, offset, child.start_byte());
        if let Some(folded) = inline_node(child, source) {
            nodes.push(folded);
        }
        offset = offset.max(child.end_byte());
    }
    push_gap(&mut nodes, source, offset, end);
    return nodes;
}

/// Code span text between its opening and closing delimiters.
fn code_span_content<'s>(node: TsNode<'_>, source: &'s str) -> &'s str {
    let mut cursor = node.walk();
    let delimiters: Vec<TsNode<'_>> = node
        .named_children(&mut cursor)
        .filter(|c| return c.kind() == "code_span_delimiter")
        .collect();
    let (Some(open), Some(close)) = (delimiters.first(), delimiters.last()) else {
        return text_of(node, source);
    };
    return source.get(open.end_byte()..close.start_byte()).unwrap_or("");
}

/// Fold an inline link or image into its text and destination.
/// A link without destination (`[text]()`) keeps only its text.
fn link_like(node: TsNode<'_>, source: &str, is_image: bool) -> Node {
    let mut children = Vec::new();
    let mut destination = None;

    let mut cursor = node.walk();
    for part in node.named_children(&mut cursor) {
        match part.kind() {
            "image_description" | "link_text" => {
                children = inline_nodes(part, part.start_byte(), part.end_byte(), source);
            },
            "link_destination" => destination = Some(destination_of(part, source)),
            _ => {},
        }
    }

    return match destination {
        None => Node::Other(children),
        Some(destination) if is_image => Node::Image { children, destination },
        Some(destination) => Node::Link { children, destination },
    };
}

/// Append `source[start..end]` as a text node when non-empty.
fn push_gap(nodes: &mut Vec<Node>, source: &str, start: usize, end: usize) {
    if start >= end {
        return;
    }
    if let Some(text) = source.get(start..end) {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Fold a `[label]: destination` definition into a childless link.
fn reference_definition(node: TsNode<'_>, source: &str) -> Node {
    return match find_named_child(node, "link_destination") {
        None => Node::Other(Vec::new()),
        Some(dest) => Node::Link {
            children: Vec::new(),
            destination: destination_of(dest, source),
        },
    };
}

/// Source text of a node; empty if the range is not on a char boundary.
fn text_of<'s>(node: TsNode<'_>, source: &'s str) -> &'s str {
    return source.get(node.byte_range()).unwrap_or("");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(doc: &Document) -> Vec<String> {
        let mut out = Vec::new();
        collect_headings(&doc.nodes, &mut out);
        out
    }

    fn collect_headings(nodes: &[Node], out: &mut Vec<String>) {
        for node in nodes {
            if let Node::Heading { children } = node {
                out.push(plain_text(children).trim().to_string());
            }
            collect_headings(node.children(), out);
        }
    }

    fn first_inline(node: TsNode<'_>) -> Option<TsNode<'_>> {
        if node.kind() == "inline" {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<TsNode<'_>> = node.named_children(&mut cursor).collect();
        children.into_iter().find_map(first_inline)
    }

    fn destinations(nodes: &[Node], out: &mut Vec<Destination>) {
        for node in nodes {
            match node {
                Node::Link { destination, .. } | Node::Image { destination, .. } => {
                    out.push(destination.clone());
                },
                _ => {},
            }
            destinations(node.children(), out);
        }
    }

    #[test]
    fn atx_and_setext_headings_in_order() {
        let source = "# Title\n\nIntro.\n\n## Second *part*\n\nThird\n-----\n";
        let doc = Document::parse(source).unwrap();
        assert_eq!(
            headings(&doc),
            vec!["Title", "Second part", "Third"]
        );
    }

    #[test]
    fn heading_code_span_is_flattened_without_backticks() {
        let doc = Document::parse("## The `init` command\n").unwrap();
        assert_eq!(headings(&doc), vec!["The init command"]);
    }

    #[test]
    fn link_destination_span_points_into_source() {
        let source = "See [setup](guide/setup.md#install) and ![logo](img/logo.png).\n";
        let doc = Document::parse(source).unwrap();
        let mut found = Vec::new();
        destinations(&doc.nodes, &mut found);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw, "guide/setup.md#install");
        assert_eq!(&source[found[0].span.clone()], "guide/setup.md#install");
        assert_eq!(found[1].raw, "img/logo.png");
        assert_eq!(&source[found[1].span.clone()], "img/logo.png");
    }

    #[test]
    fn angle_bracket_destination_excludes_brackets() {
        let source = "[file](<my file.md>)\n";
        let doc = Document::parse(source).unwrap();
        let mut found = Vec::new();
        destinations(&doc.nodes, &mut found);
        assert_eq!(found[0].raw, "my file.md");
        assert_eq!(&source[found[0].span.clone()], "my file.md");
    }

    #[test]
    fn fenced_code_content_is_a_leaf() {
        let source = "```md\n[not a link](a.md)\n```\n";
        let doc = Document::parse(source).unwrap();
        let mut found = Vec::new();
        destinations(&doc.nodes, &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn reference_definition_is_a_link() {
        let source = "Read [the guide][g].\n\n[g]: docs/guide.md#usage\n";
        let doc = Document::parse(source).unwrap();
        let mut found = Vec::new();
        destinations(&doc.nodes, &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "docs/guide.md#usage");
    }

    #[test]
    fn inline_ranges_keep_link_punctuation() {
        let source = "See [gone](missing.md) and *more*.\n";
        let mut block = grammar::parser_for(Grammar::Block, Path::new("t.md")).unwrap();
        let tree = block.parse(source, None).unwrap();
        let inline = first_inline(tree.root_node()).unwrap();

        let ranges = included_ranges(inline);
        let covered: String = ranges
            .iter()
            .map(|r| &source[r.start_byte..r.end_byte])
            .collect();
        assert_eq!(covered.trim_end(), "See [gone](missing.md) and *more*.");
    }

    #[test]
    fn continuation_markers_are_cut_from_inline_ranges() {
        let source = "> one [a](a.md)\n> two [b](b.md)\n";
        let doc = Document::parse(source).unwrap();
        let mut found = Vec::new();
        destinations(&doc.nodes, &mut found);
        let raws: Vec<&str> = found.iter().map(|d| d.raw.as_str()).collect();
        assert_eq!(raws, vec!["a.md", "b.md"]);
    }

    #[test]
    fn links_inside_block_quotes_keep_absolute_spans() {
        let source = "> first line\n> see [b](b.md)\n";
        let doc = Document::parse(source).unwrap();
        let mut found = Vec::new();
        destinations(&doc.nodes, &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(&source[found[0].span.clone()], "b.md");
    }
}
