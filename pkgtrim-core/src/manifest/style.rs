use super::outline::{self, Node, Span};
use crate::{Result, TrimError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const STYLE_FILE: &str = ".yam.yaml";

/// Formatting options read from a `.yam.yaml` next to the manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatStyle {
    /// Paths (`.`, `.pipeline`, ...) whose children are separated by exactly
    /// one blank line.
    #[serde(default)]
    pub gap: Vec<String>,
}

impl FormatStyle {
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(STYLE_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path).map_err(|source| TrimError::ReadFile {
            path: path.clone(),
            source,
        })?;

        let style: Self = serde_yaml::from_str(&data).map_err(|err| TrimError::Parse {
            path: path.clone(),
            reason: err.to_string(),
        })?;

        Ok(Some(style))
    }

    pub fn apply(&self, lines: &mut Vec<String>) {
        for gap in &self.gap {
            apply_gap(lines, gap);
        }
    }
}

fn apply_gap(lines: &mut Vec<String>, path: &str) {
    let segments: Vec<&str> = path
        .trim_start_matches('.')
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();

    let root = outline::parse(lines.as_slice());
    let spans: Vec<Span> = match root.resolve(segments.as_slice()) {
        Some(Node::Mapping(entries)) => entries.iter().map(|entry| entry.span).collect(),
        Some(Node::Sequence(items)) => items.iter().map(|item| item.span).collect(),
        _ => return,
    };

    // Back to front, so earlier spans stay valid while lines shift.
    for pair in spans.windows(2).rev() {
        let end = scalar_tail_end(lines, pair[0].end, pair[1].start);
        let next = leading_comment_start(lines, pair[1].start, end);

        let between = &lines[end..next];
        if between.iter().any(|line| !outline::is_blank(line)) {
            continue;
        }

        lines.splice(end..next, [String::new()]);
    }
}

/// Extends `end` past comments that sit deeper than the line at `next`.
/// Those continue a block scalar rather than introduce the next node.
fn scalar_tail_end(lines: &[String], end: usize, next: usize) -> usize {
    let indent = outline::indentation(&lines[next]);
    let mut tail = end;

    for (offset, line) in lines[end..next].iter().enumerate() {
        if outline::is_blank(line) {
            continue;
        }
        if !outline::is_comment(line) || outline::indentation(line) <= indent {
            break;
        }
        tail = end + offset + 1;
    }

    tail
}

fn leading_comment_start(lines: &[String], start: usize, floor: usize) -> usize {
    let indent = outline::indentation(&lines[start]);
    let mut start = start;
    while start > floor
        && outline::is_comment(&lines[start - 1])
        && outline::indentation(&lines[start - 1]) <= indent
    {
        start -= 1;
    }
    start
}
