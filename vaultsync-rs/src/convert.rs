//! Mapping of parsed Markdown blocks onto Notion blocks.
//!
//! Conversion is pure: no I/O, no state beyond the list nesting of the
//! sequence being converted.

use crate::types::{ListKind, TypedBlock};
use serde_json::{json, Map, Value};

/// Maximum characters in one Notion rich-text segment.
pub const MAX_TEXT_LEN: usize = 2000;

/// Language used for code blocks without a tag.
pub const PLAIN_TEXT_LANGUAGE: &str = "plain text";

/// A block in the remote service's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBlock {
    Heading { level: u8, text: String },
    BulletedListItem { text: String, children: Vec<RemoteBlock> },
    NumberedListItem { text: String, children: Vec<RemoteBlock> },
    ToDo { text: String, checked: bool, children: Vec<RemoteBlock> },
    Quote { text: String },
    Code { language: String, text: String },
    Image { url: String },
    Paragraph { text: String },
}

impl RemoteBlock {
    /// The Notion block type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            RemoteBlock::Heading { level: 1, .. } => "heading_1",
            RemoteBlock::Heading { level: 2, .. } => "heading_2",
            RemoteBlock::Heading { .. } => "heading_3",
            RemoteBlock::BulletedListItem { .. } => "bulleted_list_item",
            RemoteBlock::NumberedListItem { .. } => "numbered_list_item",
            RemoteBlock::ToDo { .. } => "to_do",
            RemoteBlock::Quote { .. } => "quote",
            RemoteBlock::Code { .. } => "code",
            RemoteBlock::Image { .. } => "image",
            RemoteBlock::Paragraph { .. } => "paragraph",
        }
    }

    /// Nested blocks. Only list items have them.
    pub fn children(&self) -> &[RemoteBlock] {
        match self {
            RemoteBlock::BulletedListItem { children, .. }
            | RemoteBlock::NumberedListItem { children, .. }
            | RemoteBlock::ToDo { children, .. } => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<RemoteBlock>> {
        match self {
            RemoteBlock::BulletedListItem { children, .. }
            | RemoteBlock::NumberedListItem { children, .. }
            | RemoteBlock::ToDo { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Render the block as a Notion API block object, children included.
    pub fn to_json(&self) -> Value {
        self.to_json_limited(usize::MAX, usize::MAX)
    }

    /// Render the block with at most `levels` of nested children and at most
    /// `max_children` children per block. Whatever is cut off has to be
    /// appended separately.
    pub fn to_json_limited(&self, levels: usize, max_children: usize) -> Value {
        let mut body = match self {
            RemoteBlock::Heading { text, .. }
            | RemoteBlock::BulletedListItem { text, .. }
            | RemoteBlock::NumberedListItem { text, .. }
            | RemoteBlock::Quote { text }
            | RemoteBlock::Paragraph { text } => json!({ "rich_text": rich_text(text) }),
            RemoteBlock::ToDo { text, checked, .. } => json!({
                "rich_text": rich_text(text),
                "checked": checked,
            }),
            RemoteBlock::Code { language, text } => json!({
                "rich_text": rich_text(text),
                "language": language,
            }),
            RemoteBlock::Image { url } => json!({
                "type": "external",
                "external": { "url": url },
            }),
        };

        let children = self.children();
        if levels > 0 && !children.is_empty() {
            body["children"] = Value::Array(
                children
                    .iter()
                    .take(max_children)
                    .map(|child| child.to_json_limited(levels - 1, max_children))
                    .collect(),
            );
        }

        let mut block = Map::new();
        block.insert("object".to_string(), json!("block"));
        block.insert("type".to_string(), json!(self.type_name()));
        block.insert(self.type_name().to_string(), body);
        Value::Object(block)
    }
}

/// Convert a block sequence, nesting list items by depth.
///
/// A list item becomes a child of the closest preceding list item one level
/// up. Depth is clamped to one deeper than the previous list item, and to 0
/// for a list item that follows a non-list block.
pub fn convert_blocks<I>(blocks: I) -> Vec<RemoteBlock>
where
    I: IntoIterator<Item = TypedBlock>,
{
    let mut out = Vec::new();
    let mut previous_depth: Option<usize> = None;

    for block in blocks {
        if let TypedBlock::ListItem { depth, .. } = block {
            let depth = clamp_depth(depth, previous_depth);
            previous_depth = Some(depth);
            attach(&mut out, depth, convert_block(block));
        } else {
            previous_depth = None;
            out.push(convert_block(block));
        }
    }

    out
}

/// Convert a single block without nesting.
pub fn convert_block(block: TypedBlock) -> RemoteBlock {
    match block {
        TypedBlock::Heading { level, text } => RemoteBlock::Heading {
            level: level.clamp(1, 3),
            text,
        },
        TypedBlock::ListItem {
            kind: ListKind::Unordered,
            text,
            ..
        } => RemoteBlock::BulletedListItem {
            text,
            children: Vec::new(),
        },
        TypedBlock::ListItem {
            kind: ListKind::Ordered,
            text,
            ..
        } => RemoteBlock::NumberedListItem {
            text,
            children: Vec::new(),
        },
        TypedBlock::ListItem {
            kind: ListKind::Todo,
            checked,
            text,
            ..
        } => RemoteBlock::ToDo {
            text,
            checked: checked.unwrap_or(false),
            children: Vec::new(),
        },
        TypedBlock::Quote { text } => RemoteBlock::Quote { text },
        TypedBlock::Code { language, text } => RemoteBlock::Code {
            language: language.unwrap_or_else(|| PLAIN_TEXT_LANGUAGE.to_string()),
            text,
        },
        TypedBlock::Image { url } => RemoteBlock::Image { url },
        TypedBlock::Paragraph { text } => RemoteBlock::Paragraph { text },
    }
}

/// Effective nesting depth of a list item.
pub fn clamp_depth(depth: usize, previous: Option<usize>) -> usize {
    match previous {
        Some(previous) => depth.min(previous + 1),
        None => 0,
    }
}

fn attach(siblings: &mut Vec<RemoteBlock>, depth: usize, block: RemoteBlock) {
    if depth > 0 {
        if let Some(children) = siblings.last_mut().and_then(RemoteBlock::children_mut) {
            return attach(children, depth - 1, block);
        }
    }
    siblings.push(block);
}

/// Total number of blocks, nested ones included.
pub fn count_blocks(blocks: &[RemoteBlock]) -> usize {
    blocks.iter().map(|b| 1 + count_blocks(b.children())).sum()
}

/// Notion rich-text array for plain text, split into segments that respect
/// the per-segment length limit.
pub fn rich_text(text: &str) -> Value {
    Value::Array(
        split_text(text, MAX_TEXT_LEN)
            .into_iter()
            .map(|chunk| json!({ "type": "text", "text": { "content": chunk } }))
            .collect(),
    )
}

/// Split text into pieces of at most `max` characters on char boundaries.
pub fn split_text(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bullet(text: &str, children: Vec<RemoteBlock>) -> RemoteBlock {
        RemoteBlock::BulletedListItem {
            text: text.to_string(),
            children,
        }
    }

    #[test]
    fn test_headings_map_by_level() {
        let out = convert_blocks(vec![
            TypedBlock::heading(1, "a"),
            TypedBlock::heading(2, "b"),
            TypedBlock::heading(3, "c"),
        ]);
        let types: Vec<_> = out.iter().map(RemoteBlock::type_name).collect();
        assert_eq!(types, vec!["heading_1", "heading_2", "heading_3"]);
    }

    #[test]
    fn test_every_kind_maps_once_in_order() {
        let input = vec![
            TypedBlock::heading(2, "Title"),
            TypedBlock::paragraph("para"),
            TypedBlock::Quote {
                text: "q".to_string(),
            },
            TypedBlock::Image {
                url: "https://a.com/y.png".to_string(),
            },
            TypedBlock::Code {
                language: Some("rust".to_string()),
                text: "fn x() {}".to_string(),
            },
            TypedBlock::numbered("n", 0),
        ];
        let out = convert_blocks(input);
        assert_eq!(
            out.iter().map(RemoteBlock::type_name).collect::<Vec<_>>(),
            vec!["heading_2", "paragraph", "quote", "image", "code", "numbered_list_item"]
        );
    }

    #[test]
    fn test_todo_checked_carried() {
        let out = convert_blocks(vec![
            TypedBlock::todo("Done", true, 0),
            TypedBlock::todo("Pending", false, 0),
        ]);
        assert_eq!(
            out,
            vec![
                RemoteBlock::ToDo {
                    text: "Done".to_string(),
                    checked: true,
                    children: vec![],
                },
                RemoteBlock::ToDo {
                    text: "Pending".to_string(),
                    checked: false,
                    children: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_code_language_default() {
        let out = convert_block(TypedBlock::Code {
            language: None,
            text: "x".to_string(),
        });
        assert_eq!(
            out,
            RemoteBlock::Code {
                language: "plain text".to_string(),
                text: "x".to_string(),
            }
        );

        let out = convert_block(TypedBlock::Code {
            language: Some("python".to_string()),
            text: "x".to_string(),
        });
        assert!(matches!(out, RemoteBlock::Code { ref language, .. } if language == "python"));
    }

    #[test]
    fn test_nested_lists() {
        let out = convert_blocks(vec![
            TypedBlock::bullet("a", 0),
            TypedBlock::bullet("a1", 1),
            TypedBlock::bullet("a1x", 2),
            TypedBlock::bullet("a2", 1),
            TypedBlock::bullet("b", 0),
        ]);
        assert_eq!(
            out,
            vec![
                bullet(
                    "a",
                    vec![bullet("a1", vec![bullet("a1x", vec![])]), bullet("a2", vec![])]
                ),
                bullet("b", vec![]),
            ]
        );
        assert_eq!(count_blocks(&out), 5);
    }

    #[test]
    fn test_depth_skip_is_clamped() {
        let out = convert_blocks(vec![TypedBlock::bullet("a", 0), TypedBlock::bullet("deep", 3)]);
        assert_eq!(out, vec![bullet("a", vec![bullet("deep", vec![])])]);
    }

    #[test]
    fn test_first_item_after_paragraph_is_top_level() {
        let out = convert_blocks(vec![
            TypedBlock::paragraph("intro"),
            TypedBlock::bullet("indented", 2),
            TypedBlock::bullet("child", 3),
        ]);
        assert_eq!(
            out,
            vec![
                RemoteBlock::Paragraph {
                    text: "intro".to_string()
                },
                bullet("indented", vec![bullet("child", vec![])]),
            ]
        );
    }

    #[test]
    fn test_paragraph_breaks_list_nesting() {
        let out = convert_blocks(vec![
            TypedBlock::bullet("a", 0),
            TypedBlock::paragraph("p"),
            TypedBlock::bullet("b", 1),
        ]);
        assert_eq!(out.len(), 3);
        assert!(out[2].children().is_empty());
    }

    #[test]
    fn test_mixed_kinds_nest() {
        let out = convert_blocks(vec![
            TypedBlock::numbered("step", 0),
            TypedBlock::todo("sub task", true, 1),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].children()[0].type_name(), "to_do");
    }

    #[test]
    fn test_clamp_depth() {
        assert_eq!(clamp_depth(5, None), 0);
        assert_eq!(clamp_depth(5, Some(1)), 2);
        assert_eq!(clamp_depth(0, Some(3)), 0);
        assert_eq!(clamp_depth(2, Some(2)), 2);
    }

    #[test]
    fn test_order_preserved() {
        let input: Vec<TypedBlock> = (0..50)
            .map(|i| TypedBlock::paragraph(format!("p{}", i)))
            .collect();
        let out = convert_blocks(input.clone());
        let texts: Vec<String> = out
            .iter()
            .map(|b| match b {
                RemoteBlock::Paragraph { text } => text.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        let expected: Vec<String> = (0..50).map(|i| format!("p{}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_to_json_shapes() {
        let todo = RemoteBlock::ToDo {
            text: "t".to_string(),
            checked: true,
            children: vec![bullet("c", vec![])],
        };
        let json = todo.to_json();
        assert_eq!(json["object"], "block");
        assert_eq!(json["type"], "to_do");
        assert_eq!(json["to_do"]["checked"], true);
        assert_eq!(json["to_do"]["rich_text"][0]["text"]["content"], "t");
        assert_eq!(json["to_do"]["children"][0]["type"], "bulleted_list_item");

        let image = RemoteBlock::Image {
            url: "https://a.com/y.png".to_string(),
        }
        .to_json();
        assert_eq!(image["image"]["external"]["url"], "https://a.com/y.png");

        let code = RemoteBlock::Code {
            language: "plain text".to_string(),
            text: "x".to_string(),
        }
        .to_json();
        assert_eq!(code["code"]["language"], "plain text");
        assert!(code["code"].get("children").is_none());
    }

    #[test]
    fn test_to_json_limited_cuts_depth_and_width() {
        let tree = bullet(
            "a",
            vec![
                bullet("b", vec![bullet("c", vec![])]),
                bullet("b2", vec![]),
                bullet("b3", vec![]),
            ],
        );

        let json = tree.to_json_limited(1, 2);
        let children = json["bulleted_list_item"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["bulleted_list_item"]["rich_text"][0]["text"]["content"], "b");
        assert!(children[0]["bulleted_list_item"].get("children").is_none());

        let flat = tree.to_json_limited(0, 100);
        assert!(flat["bulleted_list_item"].get("children").is_none());

        assert_eq!(tree.to_json(), tree.to_json_limited(usize::MAX, usize::MAX));
    }

    #[test]
    fn test_long_text_split_into_segments() {
        let text = "é".repeat(MAX_TEXT_LEN * 2 + 5);
        let json = rich_text(&text);
        let segments = json.as_array().unwrap();
        assert_eq!(segments.len(), 3);
        let rebuilt: String = segments
            .iter()
            .map(|s| s["text"]["content"].as_str().unwrap())
            .collect();
        assert_eq!(rebuilt, text);
        assert_eq!(
            segments[0]["text"]["content"].as_str().unwrap().chars().count(),
            MAX_TEXT_LEN
        );
    }

    #[test]
    fn test_split_text_empty() {
        assert!(split_text("", 10).is_empty());
        assert_eq!(split_text("abc", 2), vec!["ab", "c"]);
    }
}
