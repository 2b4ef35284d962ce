/// Tree-sitter markdown grammars and parser construction.
use std::path::Path;

use tree_sitter::{Language, Parser};

use crate::error::Error;

/// Which of the two markdown grammars a parser is built for.
#[derive(Debug, Clone, Copy)]
pub enum Grammar {
    /// Block structure: headings, code blocks, paragraphs, lists.
    Block,
    /// Inline content of one block: links, images, code spans, emphasis.
    Inline,
}

impl Grammar {
    /// The tree-sitter language for this grammar.
    fn language(self) -> Language {
        return match self {
            Self::Block => tree_sitter_md::LANGUAGE.into(),
            Self::Inline => tree_sitter_md::INLINE_LANGUAGE.into(),
        };
    }
}

/// Build a parser for one markdown grammar.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the grammar is ABI-incompatible with the
/// linked tree-sitter runtime.
pub fn parser_for(grammar: Grammar, file: &Path) -> Result<Parser, Error> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.language())
        .map_err(|err| {
            return Error::ParseFailed {
                file: file.to_path_buf(),
                reason: err.to_string(),
            };
        })?;
    return Ok(parser);
}

/// Whether a path names a markdown document by extension.
pub fn is_markdown(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");
    return ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown");
}
