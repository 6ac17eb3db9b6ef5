//! YAML frontmatter extraction.

use crate::types::Frontmatter;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::Value;
use std::collections::BTreeSet;

/// Frontmatter split result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    /// The raw YAML string (without delimiters).
    pub yaml: Option<&'a str>,
    /// The content after the frontmatter.
    pub content: &'a str,
}

/// Split content into raw frontmatter and body.
///
/// The header must open with a `---` line at the very start of the file and
/// close with a `---` line. Without a closing delimiter the whole text is body.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    let no_header = FrontmatterSplit {
        yaml: None,
        content,
    };

    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return no_header;
    };
    if first.trim_end_matches(['\r', '\n']) != "---" || !first.ends_with('\n') {
        return no_header;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = content[yaml_start..offset].trim_end_matches(['\r', '\n']);
            return FrontmatterSplit {
                yaml: Some(yaml),
                content: &content[offset + line.len()..],
            };
        }
        offset += line.len();
    }

    no_header
}

/// Extract recognised metadata and the remaining body.
///
/// Never fails: YAML that does not parse yields default metadata (the header
/// is still stripped), and each malformed key falls back to its default on
/// its own.
pub fn extract_frontmatter(content: &str) -> (Frontmatter, &str) {
    let split = split_frontmatter(content);
    let Some(yaml) = split.yaml else {
        return (Frontmatter::default(), content);
    };

    let value = if yaml.trim().is_empty() {
        Value::Null
    } else {
        match serde_yaml::from_str::<Value>(yaml) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("ignoring unparseable frontmatter: {}", e);
                Value::Null
            }
        }
    };

    (frontmatter_from_value(&value), split.content)
}

/// Build [`Frontmatter`] from a parsed YAML header.
pub fn frontmatter_from_value(value: &Value) -> Frontmatter {
    let Some(map) = value.as_mapping() else {
        return Frontmatter::default();
    };
    let get = |key: &str| map.get(Value::String(key.to_string()));

    let title = get("title")
        .and_then(scalar_to_string)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let tags = get("tags")
        .or_else(|| get("tag"))
        .map(parse_tags)
        .unwrap_or_default();

    let date = get("date")
        .and_then(parse_date)
        .or_else(|| get("created").and_then(parse_date));

    Frontmatter { title, tags, date }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Tags from a YAML sequence, or from a string split on commas (or on
/// whitespace when there is no comma).
fn parse_tags(value: &Value) -> BTreeSet<String> {
    let raw: Vec<String> = match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(s) if s.contains(',') => s.split(',').map(str::to_string).collect(),
        Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        _ => Vec::new(),
    };

    raw.iter()
        .map(|t| t.trim().trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive ISO datetimes.
fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}
