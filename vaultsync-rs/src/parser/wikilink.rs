//! Wikilink and embed resolution to plain text.

use crate::parser::code_block::{find_fenced_ranges, is_in_code_block};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

// Wikilink pattern: [[target]] or [[target|alias]], optionally embedded with !
// (!?)            - Optional ! for embeds (group 1)
// \[\[            - Opening [[
// ([^\]\|\n]+)    - Target, heading/block suffix included (group 2)
// (?:\|([^\]\n]*))? - Alias (group 3)
// \]\]            - Closing ]]
static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\]\|\n]+)(?:\|([^\]\n]*))?\]\]").unwrap());

/// A wikilink or embed found in a note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// Link target, including any `#heading` or `#^block` suffix.
    pub target: String,
    /// Display text after `|`, if non-empty.
    pub alias: Option<String>,
    /// Whether this is an embed (`![[...]]`).
    pub embed: bool,
    /// Byte range of the whole link in the source.
    pub span: Range<usize>,
}

impl WikiLink {
    /// Returns the display text for this link.
    pub fn display_text(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }

    /// Plain text that replaces the link.
    ///
    /// Media embeds become a placeholder since local files are not uploaded.
    pub fn replacement(&self) -> Cow<'_, str> {
        if self.embed && is_media_embed(&self.target) {
            Cow::Owned(format!("[Image: {}]", self.target))
        } else {
            Cow::Borrowed(self.display_text())
        }
    }
}

/// Find all wikilinks and embeds outside fenced code blocks.
pub fn find_wikilinks(content: &str) -> Vec<WikiLink> {
    let code_ranges = find_fenced_ranges(content);

    WIKILINK
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            if is_in_code_block(whole.start(), &code_ranges) {
                return None;
            }

            let embed = cap.get(1).is_some_and(|m| !m.as_str().is_empty());
            let target = cap.get(2)?.as_str().trim().to_string();
            let alias = cap
                .get(3)
                .map(|m| m.as_str().trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string);

            Some(WikiLink {
                target,
                alias,
                embed,
                span: whole.range(),
            })
        })
        .collect()
}

/// Replace every wikilink with plain inline text.
///
/// `[[Target]]` becomes `Target`, `[[Target|Display]]` becomes `Display`.
/// Standard Markdown links and images are left alone, as is anything inside
/// a fenced code block.
pub fn resolve_wikilinks(content: &str) -> Cow<'_, str> {
    let links = find_wikilinks(content);
    if links.is_empty() {
        return Cow::Borrowed(content);
    }

    let mut resolved = String::with_capacity(content.len());
    let mut last = 0;
    for link in &links {
        resolved.push_str(&content[last..link.span.start]);
        resolved.push_str(&link.replacement());
        last = link.span.end;
    }
    resolved.push_str(&content[last..]);

    Cow::Owned(resolved)
}

/// Check if a target looks like an image or media file.
pub fn is_media_embed(target: &str) -> bool {
    const MEDIA: &[&str] = &[
        ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".mp3", ".wav", ".ogg",
        ".mp4", ".webm", ".pdf",
    ];
    let lower = target.to_lowercase();
    MEDIA.iter().any(|ext| lower.ends_with(ext))
}
