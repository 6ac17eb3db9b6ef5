//! Fenced code block detection.

use std::ops::Range;

/// An opening code fence: three or more backticks or tildes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence {
    /// Fence character (`` ` `` or `~`).
    pub marker: char,
    /// Number of fence characters on the opening line.
    pub len: usize,
}

impl Fence {
    /// Recognise an opening fence line. Returns the fence and its info string.
    pub fn open(line: &str) -> Option<(Fence, &str)> {
        let trimmed = line.trim();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }

        // `len` counts single-byte characters, so it is also a byte offset.
        let info = trimmed[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }

        Some((Fence { marker, len }, info))
    }

    /// Whether `line` closes this fence: only fence characters of the same
    /// kind, at least as many as the opener.
    pub fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.len && trimmed.chars().all(|c| c == self.marker)
    }
}

/// Language tag from a fence info string: its first word.
pub fn info_language(info: &str) -> Option<String> {
    info.split_whitespace().next().map(str::to_string)
}

/// Byte ranges of fenced code blocks, fence lines included.
///
/// An unclosed fence extends to the end of the content.
pub fn find_fenced_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(Fence, usize)> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let end = offset + line.len();
        match open {
            Some((fence, start)) => {
                if fence.closes(line) {
                    ranges.push(start..end);
                    open = None;
                }
            }
            None => {
                if let Some((fence, _)) = Fence::open(line) {
                    open = Some((fence, offset));
                }
            }
        }
        offset = end;
    }

    if let Some((_, start)) = open {
        ranges.push(start..content.len());
    }

    ranges
}

/// Check if a byte offset is inside any fenced block.
pub fn is_in_code_block(offset: usize, ranges: &[Range<usize>]) -> bool {
    ranges.iter().any(|r| r.contains(&offset))
}
