//! Parsers for Obsidian-flavoured Markdown.

pub mod code_block;
pub mod frontmatter;
pub mod markdown;
pub mod wikilink;

pub use code_block::{find_fenced_ranges, Fence};
pub use frontmatter::{extract_frontmatter, split_frontmatter};
pub use markdown::{parse_blocks, Blocks};
pub use wikilink::{find_wikilinks, resolve_wikilinks, WikiLink};

use crate::types::{Frontmatter, TypedBlock};

/// A note body run through the whole parsing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNote {
    pub frontmatter: Frontmatter,
    pub blocks: Vec<TypedBlock>,
}

/// Frontmatter extraction, wikilink resolution, then block parsing.
pub fn parse_note(text: &str) -> ParsedNote {
    let (frontmatter, body) = extract_frontmatter(text);
    let body = resolve_wikilinks(body);
    let blocks = parse_blocks(&body).collect();

    ParsedNote {
        frontmatter,
        blocks,
    }
}
