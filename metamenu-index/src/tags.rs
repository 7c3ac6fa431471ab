//! Parse `#tag` patterns from markdown text and frontmatter.
//!
//! A tag is `#` followed by any run of characters that are not whitespace,
//! `#` or punctuation. `/` is kept, so `#books/fiction` is one nested tag; the
//! index treats every ancestor of a nested tag (`#books`) as present too.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Characters that end a tag in body text.
const TAG_TERMINATORS: &[u8] = b"#,.;:!?()[]{}\"'`";

/// Extract unique tag names (without the `#` prefix) from markdown text.
///
/// Skips tags inside fenced code blocks and inline code spans. Headings
/// (`# Title`, `## Title`) are not tags.
pub fn parse_tags(text: &str) -> Vec<String> {
    let mut tags = BTreeSet::new();
    let mut in_fenced_block = false;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fenced_block = !in_fenced_block;
            continue;
        }
        if in_fenced_block {
            continue;
        }

        if trimmed.starts_with('#') && trimmed.chars().nth(1).is_none_or(|c| c == '#' || c == ' ')
        {
            continue;
        }

        let bytes = line.as_bytes();
        let len = bytes.len();
        let mut i = 0;

        while i < len {
            if bytes[i] == b'`' {
                i += 1;
                while i < len && bytes[i] != b'`' {
                    i += 1;
                }
                if i < len {
                    i += 1;
                }
                continue;
            }

            if bytes[i] == b'#' {
                let preceded_ok =
                    i == 0 || !bytes[i - 1].is_ascii_alphanumeric() && bytes[i - 1] != b'_';
                if preceded_ok {
                    let start = i + 1;
                    let mut end = start;
                    while end < len
                        && !bytes[end].is_ascii_whitespace()
                        && !TAG_TERMINATORS.contains(&bytes[end])
                    {
                        end += 1;
                    }
                    let slug = line[start..end].trim_end_matches('/');
                    if !slug.is_empty() {
                        tags.insert(slug.to_string());
                        i = end;
                        continue;
                    }
                }
            }

            i += 1;
        }
    }

    tags.into_iter().collect()
}

/// Tags declared in frontmatter under `tags` or `tag`, as a list or as a
/// comma/space separated string.
pub fn frontmatter_tags(frontmatter: &Map<String, Value>) -> Vec<String> {
    let mut tags = Vec::new();
    for key in ["tags", "tag"] {
        match frontmatter.get(key) {
            Some(Value::Array(items)) => {
                tags.extend(items.iter().filter_map(Value::as_str).map(str::to_string))
            }
            Some(Value::String(s)) => tags.extend(
                s.split(|c: char| c == ',' || c.is_whitespace())
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    tags
}

/// Normalize raw tag names: strip `#`, drop empties, expand nested tags to
/// include every ancestor, prefix with `#`. The result is sorted and unique.
pub fn normalize(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for tag in raw {
        let tag = tag.trim().trim_start_matches('#').trim_matches('/');
        if tag.is_empty() || tag.contains(char::is_whitespace) {
            continue;
        }
        let mut prefix = String::new();
        for segment in tag.split('/').filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            tags.insert(format!("#{prefix}"));
        }
    }
    tags.into_iter().collect()
}

/// Case-insensitive tag comparison, ignoring a leading `#` on either side.
pub fn same_tag(a: &str, b: &str) -> bool {
    a.trim_start_matches('#')
        .eq_ignore_ascii_case(b.trim_start_matches('#'))
}
