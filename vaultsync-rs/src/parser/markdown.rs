//! Line-oriented Markdown block parser.
//!
//! Each line outside a code fence yields at most one [`TypedBlock`]. Rules
//! are tried in order and the first match wins:
//!
//! 1. `#`, `##` or `###` followed by a space is a heading. Deeper headings
//!    are plain paragraphs.
//! 2. A line that is exactly `![alt](http(s)://...)` is an image. Images
//!    with local or scheme-less URLs stay paragraphs.
//! 3. `- `, `* `, `1. ` start list items; `- [ ]` and `- [x]` are todos.
//! 4. `>` starts a quote.
//! 5. ```` ``` ```` or `~~~` opens a fenced code block.
//! 6. Any other non-blank line is a paragraph. Blank lines produce nothing.
//!
//! Parsing never fails; unknown syntax ends up in a paragraph.

use crate::parser::code_block::{info_language, Fence};
use crate::types::{ListKind, TypedBlock};
use regex::Regex;
use std::str::Lines;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,3}) (.*)$").unwrap());

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[[^\]]*\]\((https?://[^\s)]+)\)$").unwrap());

/// Indent, marker, then the item text.
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)([-*]|\d+\.)[ \t]+(.*)$").unwrap());

static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ xX])\](?:[ \t]+(.*))?$").unwrap());

/// Columns of indentation per nesting level.
const INDENT_PER_LEVEL: usize = 2;

/// Columns a tab counts for.
const TAB_WIDTH: usize = 4;

/// Parse a note body into blocks.
///
/// The returned iterator is lazy and cheap to clone; cloning it (or calling
/// this again) restarts parsing from the top with identical results.
pub fn parse_blocks(body: &str) -> Blocks<'_> {
    Blocks {
        lines: body.lines(),
    }
}

/// Lazy sequence of [`TypedBlock`]s over a note body.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    lines: Lines<'a>,
}

impl Iterator for Blocks<'_> {
    type Item = TypedBlock;

    fn next(&mut self) -> Option<TypedBlock> {
        loop {
            let line = self.lines.next()?;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.classify(line));
        }
    }
}

impl Blocks<'_> {
    fn classify(&mut self, line: &str) -> TypedBlock {
        if let Some(cap) = HEADING.captures(line) {
            return TypedBlock::Heading {
                level: cap[1].len() as u8,
                text: cap[2].trim().to_string(),
            };
        }

        let trimmed = line.trim();

        if let Some(cap) = IMAGE.captures(trimmed) {
            return TypedBlock::Image {
                url: cap[1].to_string(),
            };
        }

        if let Some(item) = parse_list_item(line) {
            return item;
        }

        if let Some(quote) = trimmed.strip_prefix('>') {
            let text = quote.strip_prefix(' ').unwrap_or(quote);
            return TypedBlock::Quote {
                text: text.trim_end().to_string(),
            };
        }

        if let Some((fence, info)) = Fence::open(line) {
            return self.read_code_block(fence, info_language(info));
        }

        TypedBlock::Paragraph {
            text: trimmed.to_string(),
        }
    }

    /// Consume lines up to and including the closing fence.
    fn read_code_block(&mut self, fence: Fence, language: Option<String>) -> TypedBlock {
        let mut content: Vec<&str> = Vec::new();
        for line in self.lines.by_ref() {
            if fence.closes(line) {
                break;
            }
            content.push(line);
        }

        TypedBlock::Code {
            language,
            text: content.join("\n"),
        }
    }
}

fn parse_list_item(line: &str) -> Option<TypedBlock> {
    let cap = LIST_ITEM.captures(line)?;
    let depth = indent_depth(&cap[1]);
    let marker = &cap[2];
    let rest = cap[3].trim_end();

    if marker == "-" || marker == "*" {
        if let Some(todo) = CHECKBOX.captures(rest) {
            let checked = !cap_str(&todo, 1).trim().is_empty();
            return Some(TypedBlock::todo(cap_str(&todo, 2), checked, depth));
        }
        return Some(TypedBlock::bullet(rest, depth));
    }

    Some(TypedBlock::ListItem {
        kind: ListKind::Ordered,
        checked: None,
        text: rest.to_string(),
        depth,
    })
}

fn cap_str<'t>(cap: &regex::Captures<'t>, i: usize) -> &'t str {
    cap.get(i).map(|m| m.as_str()).unwrap_or("")
}

/// Nesting depth from leading whitespace.
fn indent_depth(indent: &str) -> usize {
    let columns: usize = indent
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum();
    columns / INDENT_PER_LEVEL
}
