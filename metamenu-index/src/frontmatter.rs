//! YAML frontmatter and inline field parsing for markdown documents
//!
//! Frontmatter is a YAML mapping delimited by `---` lines at the start of the
//! document. Inline fields are body lines of the form `Key:: value`.

use serde_json::{Map, Value};

use crate::error::{IndexError, Result};
use crate::tags;

/// Frontmatter mapping and the body that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterResult {
    /// Parsed YAML mapping (None if no frontmatter)
    pub metadata: Option<Map<String, Value>>,
    /// Remaining content after frontmatter removal
    pub content: String,
}

/// Parse YAML frontmatter from content
///
/// # Format
/// ```markdown
/// ---
/// fileClass: Book
/// tags: [reading]
/// ---
/// Body goes here
/// ```
pub fn parse_frontmatter(content: &str) -> Result<FrontmatterResult> {
    let content = content.trim_start_matches('\u{feff}');

    if !content.starts_with("---") {
        return Ok(FrontmatterResult {
            metadata: None,
            content: content.to_string(),
        });
    }

    let after_first_delimiter = &content[3..];
    let start_pos = if after_first_delimiter.starts_with('\n') {
        4 // "---\n"
    } else if after_first_delimiter.starts_with("\r\n") {
        5 // "---\r\n"
    } else {
        return Ok(FrontmatterResult {
            metadata: None,
            content: content.to_string(),
        });
    };

    let Some(end_pos) = find_closing_delimiter(&content[start_pos..]) else {
        return Ok(FrontmatterResult {
            metadata: None,
            content: content.to_string(),
        });
    };

    let yaml_content = &content[start_pos..start_pos + end_pos];
    let remaining = &content[start_pos + end_pos..];
    let remaining = remaining
        .strip_prefix("---")
        .unwrap_or(remaining)
        .trim_start_matches('\r')
        .trim_start_matches('\n');

    let metadata = if yaml_content.trim().is_empty() {
        None
    } else {
        match serde_yaml_ng::from_str::<Value>(yaml_content)? {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(IndexError::malformed(
                    "<frontmatter>",
                    format!("frontmatter is not a mapping: {other}"),
                ))
            }
        }
    };

    Ok(FrontmatterResult {
        metadata,
        content: remaining.to_string(),
    })
}

/// Find the closing frontmatter delimiter ("---" on its own line)
fn find_closing_delimiter(content: &str) -> Option<usize> {
    let mut pos = 0;
    for line in content.split_inclusive('\n') {
        if line.trim() == "---" {
            return Some(pos);
        }
        pos += line.len();
    }
    None
}

/// `Key:: value` lines of a body, in order. Lines inside fenced code blocks
/// are skipped.
pub fn inline_field_lines(body: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut in_fenced_block = false;
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fenced_block = !in_fenced_block;
            continue;
        }
        if in_fenced_block {
            continue;
        }
        let trimmed = trimmed.trim_start_matches(['-', '*', '>', ' ']);
        let Some((key, value)) = trimmed.split_once("::") else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.contains('`') || key.contains('[') {
            continue;
        }
        fields.push((key.to_string(), value.trim().to_string()));
    }
    fields
}

/// A markdown document split into the parts the index reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub frontmatter: Option<Map<String, Value>>,
    pub body: String,
    /// `#tag` values from frontmatter and body, nested tags expanded
    pub tags: Vec<String>,
    pub inline_fields: Map<String, Value>,
}

impl ParsedDocument {
    /// Parse a document. Malformed frontmatter is logged and treated as absent,
    /// so one broken document never hides the rest of the corpus.
    pub fn parse(path: &str, content: &str) -> Self {
        let FrontmatterResult { metadata, content } = match parse_frontmatter(content) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(%path, %e, "ignoring malformed frontmatter");
                FrontmatterResult {
                    metadata: None,
                    content: content.to_string(),
                }
            }
        };

        let mut all_tags = metadata
            .as_ref()
            .map(tags::frontmatter_tags)
            .unwrap_or_default();
        all_tags.extend(tags::parse_tags(&content));
        let tags = tags::normalize(all_tags);

        let inline_fields = inline_field_lines(&content)
            .into_iter()
            .map(|(k, v)| {
                let value = if v.is_empty() {
                    Value::Null
                } else {
                    Value::String(v)
                };
                (k, value)
            })
            .collect();

        Self {
            frontmatter: metadata,
            body: content,
            tags,
            inline_fields,
        }
    }

    /// Materialized values: inline fields overlaid by frontmatter.
    pub fn values(&self) -> Map<String, Value> {
        let mut values = self.inline_fields.clone();
        if let Some(frontmatter) = &self.frontmatter {
            for (k, v) in frontmatter {
                values.insert(k.clone(), v.clone());
            }
        }
        values
    }
}
